use std::sync::Arc;

use super::Volume;
use crate::film::{Color, BLACK};
use crate::geometry::BBox;
use crate::linalg::{Point, Ray, Transform, Vector};

/// Places a volume in the scene with a transform, and aggregates child
/// volume nodes. Queries at a point sum over every volume containing it,
/// each evaluated in its own object space.
pub struct VolumeNode {
    volume: Option<Arc<dyn Volume>>,
    transform: Transform,
    inv_transform: Transform,
    children: Vec<VolumeNode>,
    name: String,
}

impl VolumeNode {
    pub fn new(volume: Option<Arc<dyn Volume>>, transform: Transform, name: impl Into<String>) -> Self {
        Self {
            volume,
            inv_transform: transform.inverse(),
            transform,
            children: Vec::new(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_child(&mut self, child: VolumeNode) {
        self.children.push(child);
    }

    pub fn bound(&self) -> BBox {
        let mut b = match &self.volume {
            Some(v) => self.transform.apply_bbox(&v.bound()),
            None => BBox::empty(),
        };
        for c in &self.children {
            b = b.union(&c.bound());
        }
        b
    }

    /// The overlap of the world-space ray with any volume in this subtree,
    /// widened over the children.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        let mut range: Option<(f32, f32)> = None;
        if let Some(v) = &self.volume {
            let local = self.inv_transform.apply_ray(ray);
            if let Some(t) = v.intersect(&local) {
                range = Some(t);
            }
        }
        // Children were placed in world space as the transform stack was
        // applied at build time, so they see the world-space ray
        for c in &self.children {
            if let Some(t) = c.intersect(ray) {
                range = Some(match range {
                    Some(r) => (r.0.min(t.0), r.1.max(t.1)),
                    None => t,
                });
            }
        }
        range
    }

    pub fn absorption(&self, p: Point, v: Vector) -> Color {
        let mut out = self
            .volume
            .as_ref()
            .map(|vol| vol.absorption(self.inv_transform.apply_point(p), v))
            .unwrap_or(BLACK);
        for c in &self.children {
            out += c.absorption(p, v);
        }
        out
    }

    pub fn scattering(&self, p: Point, v: Vector) -> Color {
        let mut out = self
            .volume
            .as_ref()
            .map(|vol| vol.scattering(self.inv_transform.apply_point(p), v))
            .unwrap_or(BLACK);
        for c in &self.children {
            out += c.scattering(p, v);
        }
        out
    }

    pub fn attenuation(&self, p: Point, v: Vector) -> Color {
        let mut out = self
            .volume
            .as_ref()
            .map(|vol| vol.attenuation(self.inv_transform.apply_point(p), v))
            .unwrap_or(BLACK);
        for c in &self.children {
            out += c.attenuation(p, v);
        }
        out
    }

    pub fn emission(&self, p: Point, v: Vector) -> Color {
        let mut out = self
            .volume
            .as_ref()
            .map(|vol| vol.emission(self.inv_transform.apply_point(p), v))
            .unwrap_or(BLACK);
        for c in &self.children {
            out += c.emission(p, v);
        }
        out
    }

    pub fn optical_thickness(&self, ray: &Ray, step: f32, offset: f32) -> Color {
        let mut out = self
            .volume
            .as_ref()
            .map(|vol| vol.optical_thickness(&self.inv_transform.apply_ray(ray), step, offset))
            .unwrap_or(BLACK);
        for c in &self.children {
            out += c.optical_thickness(ray, step, offset);
        }
        out
    }

    /// Phase function averaged by presence: the first volume containing the
    /// point wins; empty space scatters nothing.
    pub fn phase(&self, p: Point, w_i: Vector, w_o: Vector) -> f32 {
        if let Some(v) = &self.volume {
            let local = self.inv_transform.apply_point(p);
            if v.bound().inside(local) {
                return v.phase(local, w_i, w_o);
            }
        }
        for c in &self.children {
            let ph = c.phase(p, w_i, w_o);
            if ph != 0.0 {
                return ph;
            }
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::HomogeneousVolume;

    fn unit_fog() -> Arc<dyn Volume> {
        Arc::new(HomogeneousVolume::new(
            Color::broadcast(0.5),
            BLACK,
            BLACK,
            0.0,
            BBox::new(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0)),
        ))
    }

    #[test]
    fn transformed_volume_moves_with_its_node() {
        let node = VolumeNode::new(
            Some(unit_fog()),
            Transform::translate(Vector::new(10.0, 0.0, 0.0)),
            "fog",
        );
        assert!(!node.attenuation(Point::new(10.0, 0.0, 0.0), Vector::new(1.0, 0.0, 0.0)).is_black());
        assert!(node.attenuation(Point::origin(), Vector::new(1.0, 0.0, 0.0)).is_black());
        let ray = Ray::new(Point::new(10.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        let (t0, t1) = node.intersect(&ray).unwrap();
        assert!((t0 - 4.0).abs() < 1e-4 && (t1 - 6.0).abs() < 1e-4);
    }

    #[test]
    fn children_aggregate() {
        let mut root = VolumeNode::new(None, Transform::IDENTITY, "root");
        root.add_child(VolumeNode::new(Some(unit_fog()), Transform::IDENTITY, "a"));
        root.add_child(VolumeNode::new(Some(unit_fog()), Transform::IDENTITY, "b"));
        // Overlapping children sum their coefficients
        let at = root.attenuation(Point::origin(), Vector::new(1.0, 0.0, 0.0));
        assert!((at.r - 1.0).abs() < 1e-5);
    }
}
