use crate::linalg::{Point, Ray, RayDifferential, Transform, Vector};
use crate::monte_carlo::concentric_sample_disk;
use crate::sampler::Sample;

// ─── Perspective camera ─────────────────────────────────────────────────────

/// A perspective camera with an optional thin lens for depth of field.
///
/// Construction pre-composes the raster → screen → camera transform chain
/// into a single `raster_cam` transform, so generating a ray is one point
/// transform, a normalize, and one transform to world space.
pub struct Camera {
    cam_world: Transform,
    raster_cam: Transform,
    /// Camera-space offsets of one raster step in x and y, used to build the
    /// differential rays.
    dx: Vector,
    dy: Vector,
    /// Lens radius; zero disables depth of field.
    aperture: f32,
    focal_dist: f32,
}

impl Camera {
    /// `cam_world` positions the camera in the scene, `fov` is the vertical
    /// field of view in degrees. A non-zero `aperture` turns on the thin-lens
    /// model focusing at `focal_dist`.
    pub fn new(
        cam_world: Transform,
        fov: f32,
        aperture: f32,
        focal_dist: f32,
        xres: usize,
        yres: usize,
    ) -> Self {
        // In screen space the shorter image axis has half-length 1 and the
        // longer one half-length aspect-ratio.
        let aspect = xres as f32 / yres as f32;
        let (sx, sy) = if aspect > 1.0 { (aspect, 1.0) } else { (1.0, 1.0 / aspect) };
        let screen_raster = Transform::scale(xres as f32, yres as f32, 1.0)
            * Transform::scale(1.0 / (2.0 * sx), 1.0 / (2.0 * sy), 1.0)
            * Transform::translate(Vector::new(sx, sy, 0.0));
        let cam_screen = Transform::perspective(fov, 1.0, 1000.0);
        let raster_cam = cam_screen.inverse() * screen_raster.inverse();
        let origin = raster_cam.apply_point(Point::origin());
        Self {
            cam_world,
            raster_cam,
            dx: raster_cam.apply_point(Point::new(1.0, 0.0, 0.0)) - origin,
            dy: raster_cam.apply_point(Point::new(0.0, 1.0, 0.0)) - origin,
            aperture,
            focal_dist,
        }
    }

    /// Refocuses a camera-space ray through the thin lens: the original ray's
    /// intersection with the plane `z = focal_dist` is held fixed while the
    /// origin jitters across the lens disk, so only out-of-focus geometry
    /// blurs.
    fn apply_lens(&self, ray: &mut Ray, lens: [f32; 2]) {
        let t = self.focal_dist / ray.d.z;
        let focal_pt = ray.at(t);
        ray.o = Point::new(lens[0], lens[1], 0.0);
        ray.d = (focal_pt - ray.o).normalized();
    }

    fn lens_sample(&self, sample: &Sample) -> [f32; 2] {
        let disk = concentric_sample_disk(sample.lens);
        [disk[0] * self.aperture, disk[1] * self.aperture]
    }

    /// Generates the world-space camera ray for an image sample.
    pub fn generate_ray(&self, sample: &Sample) -> Ray {
        let px = self
            .raster_cam
            .apply_point(Point::new(sample.img[0], sample.img[1], 0.0));
        let mut ray = Ray::new(Point::origin(), Vector::from(px).normalized());
        ray.time = sample.time;
        if self.aperture > 0.0 {
            self.apply_lens(&mut ray, self.lens_sample(sample));
        }
        self.cam_world.apply_ray(&ray)
    }

    /// Generates the camera ray plus the rays for the neighboring pixels in
    /// x and y. The same lens sample is shared by all three so depth of field
    /// blurs the differentials coherently.
    pub fn generate_ray_differential(&self, sample: &Sample) -> RayDifferential {
        let px = self
            .raster_cam
            .apply_point(Point::new(sample.img[0], sample.img[1], 0.0));
        let dir = Vector::from(px);
        let mut rd = RayDifferential::new(Point::origin(), dir.normalized());
        rd.ray.time = sample.time;
        rd.rx = Ray::new(Point::origin(), (dir + self.dx).normalized());
        rd.ry = Ray::new(Point::origin(), (dir + self.dy).normalized());
        if self.aperture > 0.0 {
            let lens = self.lens_sample(sample);
            self.apply_lens(&mut rd.ray, lens);
            self.apply_lens(&mut rd.rx, lens);
            self.apply_lens(&mut rd.ry, lens);
        }
        self.cam_world.apply_ray_differential(&rd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinhole(xres: usize, yres: usize) -> Camera {
        let cam_world = Transform::look_at(
            Point::new(0.0, 0.0, -5.0),
            Point::origin(),
            Vector::new(0.0, 1.0, 0.0),
        );
        Camera::new(cam_world, 45.0, 0.0, 1.0, xres, yres)
    }

    fn sample_at(x: f32, y: f32) -> Sample {
        Sample {
            img: [x, y],
            lens: [0.5, 0.5],
            time: 0.0,
        }
    }

    #[test]
    fn center_ray_points_at_target() {
        let cam = pinhole(64, 64);
        let ray = cam.generate_ray(&sample_at(32.0, 32.0));
        assert!((ray.o - Point::new(0.0, 0.0, -5.0)).length() < 1e-4);
        // Looking from -z toward the origin
        assert!(ray.d.z > 0.99);
        assert!((ray.d.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn corner_rays_diverge() {
        let cam = pinhole(64, 64);
        let a = cam.generate_ray(&sample_at(0.0, 0.0));
        let b = cam.generate_ray(&sample_at(64.0, 64.0));
        assert!(a.d.dot(b.d) < 1.0 - 1e-3);
    }

    #[test]
    fn differentials_are_one_pixel_apart() {
        let cam = pinhole(64, 64);
        let rd = cam.generate_ray_differential(&sample_at(32.0, 32.0));
        assert!(rd.has_differentials());
        let next = cam.generate_ray(&sample_at(33.0, 32.0));
        assert!((rd.rx.d - next.d).length() < 1e-4);
    }

    #[test]
    fn lens_rays_converge_at_focal_plane() {
        let cam_world = Transform::IDENTITY;
        let cam = Camera::new(cam_world, 45.0, 0.25, 10.0, 64, 64);
        let mut s = sample_at(32.0, 32.0);
        let a = cam.generate_ray(&s);
        s.lens = [0.1, 0.9];
        let b = cam.generate_ray(&s);
        // Different lens samples give different origins
        assert!((a.o - b.o).length() > 1e-5);
        // Both rays pass through the same focal point
        let ta = 10.0 / a.d.z;
        let tb = 10.0 / b.d.z;
        assert!((a.at(ta) - b.at(tb)).length() < 1e-3);
    }
}
