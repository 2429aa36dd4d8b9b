//! Radiance estimation: the surface integrators (Whitted, path,
//! bidirectional path), the volume integrators (emission, single
//! scattering), and the direct-lighting helpers they share.

mod bidir_path;
mod emission;
mod path;
mod single_scattering;
mod whitted;

pub use bidir_path::BidirPathIntegrator;
pub use emission::EmissionIntegrator;
pub use path::PathIntegrator;
pub use single_scattering::SingleScatteringIntegrator;
pub use whitted::WhittedIntegrator;

use bumpalo::Bump;

use crate::film::{Color, BLACK};
use crate::geometry::DifferentialGeometry;
use crate::light::{AreaLight, Light};
use crate::linalg::{Normal, Point, Ray, RayDifferential, Vector};
use crate::material::{Bsdf, BxdfType};
use crate::monte_carlo::power_heuristic;
use crate::renderer::Renderer;
use crate::sampler::Sampler;
use crate::scene::Scene;

// ─── Integrator traits ──────────────────────────────────────────────────────

/// Estimates the radiance leaving a surface hit back along the ray.
pub trait SurfaceIntegrator: Send + Sync {
    fn illumination<'a>(
        &self,
        scene: &'a Scene,
        renderer: &Renderer,
        ray: &RayDifferential,
        dg: &mut DifferentialGeometry<'a>,
        sampler: &mut dyn Sampler,
        arena: &'a Bump,
    ) -> Color;
}

/// Estimates emitted/in-scattered radiance and beam transmittance through
/// participating media along a ray segment.
pub trait VolumeIntegrator: Send + Sync {
    /// Returns `(radiance, transmittance)` for the segment: the medium's own
    /// contribution plus how much background radiance survives the trip.
    fn radiance(
        &self,
        scene: &Scene,
        renderer: &Renderer,
        ray: &RayDifferential,
        sampler: &mut dyn Sampler,
        arena: &Bump,
    ) -> (Color, Color);

    fn transmittance(
        &self,
        scene: &Scene,
        renderer: &Renderer,
        ray: &RayDifferential,
        sampler: &mut dyn Sampler,
        arena: &Bump,
    ) -> Color;
}

// ─── Direct lighting helpers ────────────────────────────────────────────────

/// Estimates direct illumination at `p` by uniformly selecting one light and
/// scaling its single-light estimate by the light count; the expectation
/// over `comp` equals the sum over all lights.
#[allow(clippy::too_many_arguments)]
pub fn uniform_sample_one_light(
    scene: &Scene,
    renderer: &Renderer,
    p: Point,
    n: Normal,
    w_o: Vector,
    bsdf: &Bsdf,
    light_sample: ([f32; 2], f32),
    bsdf_sample: ([f32; 2], f32),
) -> Color {
    let lights = scene.lights();
    if lights.is_empty() {
        return BLACK;
    }
    let light_num = ((light_sample.1 * lights.len() as f32) as usize).min(lights.len() - 1);
    let light = lights[light_num].as_ref();
    let flags = BxdfType::ALL.difference(BxdfType::SPECULAR);
    lights.len() as f32
        * estimate_direct(
            scene,
            renderer,
            p,
            n,
            w_o,
            bsdf,
            light,
            light_sample.0,
            bsdf_sample,
            flags,
        )
}

/// Direct lighting from one light with multiple importance sampling: sample
/// the light, then sample the BSDF, and weight both estimators by the power
/// heuristic. Delta lights skip the BSDF half, which could never hit them.
#[allow(clippy::too_many_arguments)]
pub fn estimate_direct(
    scene: &Scene,
    _renderer: &Renderer,
    p: Point,
    n: Normal,
    w_o: Vector,
    bsdf: &Bsdf,
    light: &dyn Light,
    l_sample: [f32; 2],
    bsdf_sample: ([f32; 2], f32),
    flags: BxdfType,
) -> Color {
    let mut direct = BLACK;

    // Light sampling half
    let ls = light.sample_at(p, l_sample);
    if ls.pdf > 0.0 && !ls.radiance.is_black() {
        let f = bsdf.f(w_o, ls.w_i, flags);
        if !f.is_black() && !ls.occlusion.occluded(scene) {
            if light.is_delta() {
                // MIS would be incorrect against a delta distribution
                direct += f * ls.radiance * ls.w_i.dot_normal(n).abs() / ls.pdf;
            } else {
                let pdf_bsdf = bsdf.pdf(w_o, ls.w_i, flags);
                let weight = power_heuristic(1.0, ls.pdf, 1.0, pdf_bsdf);
                direct += f * ls.radiance * ls.w_i.dot_normal(n).abs() * weight / ls.pdf;
            }
        }
    }

    // BSDF sampling half
    if !light.is_delta() {
        let (f, w_i, pdf_bsdf, sampled_type) = bsdf.sample(w_o, bsdf_sample.0, bsdf_sample.1, flags);
        if pdf_bsdf > 0.0 && !f.is_black() {
            let mut weight = 1.0;
            if !sampled_type.contains(BxdfType::SPECULAR) {
                let pdf_light = light.pdf(p, w_i);
                if pdf_light == 0.0 {
                    return direct;
                }
                weight = power_heuristic(1.0, pdf_bsdf, 1.0, pdf_light);
            }
            // Only counts if the sampled direction actually reaches this light
            let mut ray = Ray::segment(p, w_i, 0.001, f32::INFINITY);
            let mut dg = DifferentialGeometry::default();
            let mut li = BLACK;
            if scene.root().intersect(&mut ray, &mut dg) {
                if let Some(hit_light) = dg.node.and_then(|node| node.area_light()) {
                    if same_light(hit_light, light) {
                        li = hit_light.radiance(dg.point, dg.normal, -w_i);
                    }
                }
            }
            if !li.is_black() {
                direct += f * li * w_i.dot_normal(n).abs() * weight / pdf_bsdf;
            }
        }
    }
    direct
}

/// Identity comparison between the area light attached to a hit node and a
/// sampled light handle.
#[inline]
fn same_light(a: &AreaLight, b: &dyn Light) -> bool {
    std::ptr::addr_eq(a as *const AreaLight, b as *const dyn Light)
}

// ─── Specular recursion helpers ─────────────────────────────────────────────

/// Traces perfect specular reflection, propagating ray differentials with
/// Igehy's (1999) derivative formulas so texture filtering stays sharp in
/// mirrors.
pub fn spec_reflect(
    ray: &RayDifferential,
    bsdf: &Bsdf,
    renderer: &Renderer,
    scene: &Scene,
    sampler: &mut dyn Sampler,
    arena: &Bump,
) -> Color {
    let n = bsdf.dg.normal;
    let p = bsdf.dg.point;
    let w_o = -ray.d;
    let mut u_sample = [[0.0f32; 2]; 1];
    let mut c_sample = [0.0f32; 1];
    sampler.get_2d(&mut u_sample);
    sampler.get_1d(&mut c_sample);
    let (f, w_i, pdf, _) = bsdf.sample(
        w_o,
        u_sample[0],
        c_sample[0],
        BxdfType::REFLECTION | BxdfType::SPECULAR,
    );
    if pdf <= 0.0 || f.is_black() || w_i.dot_normal(n).abs() == 0.0 {
        return BLACK;
    }
    let mut refl = RayDifferential::child(p, w_i, &ray.ray, 0.001);
    if ray.has_differentials() {
        refl.rx = Ray::child(p + bsdf.dg.dp_dx, w_i, &ray.ray, 0.001);
        refl.ry = Ray::child(p + bsdf.dg.dp_dy, w_i, &ray.ray, 0.001);
        let dg = &bsdf.dg;
        let dn_dx = Vector::from(dg.dn_du * dg.du_dx + dg.dn_dv * dg.dv_dx);
        let dn_dy = Vector::from(dg.dn_du * dg.du_dy + dg.dn_dv * dg.dv_dy);
        let dd_dx = -ray.rx.d - w_o;
        let dd_dy = -ray.ry.d - w_o;
        let ddn_dx = dd_dx.dot_normal(n) + w_o.dot(dn_dx);
        let ddn_dy = dd_dy.dot_normal(n) + w_o.dot(dn_dy);
        refl.rx.d =
            w_i - dd_dx + 2.0 * (w_o.dot_normal(n) * dn_dx + ddn_dx * Vector::from(n));
        refl.ry.d =
            w_i - dd_dy + 2.0 * (w_o.dot_normal(n) * dn_dy + ddn_dy * Vector::from(n));
    }
    let li = renderer.illumination(&mut refl, scene, sampler, arena);
    f * li * w_i.dot_normal(n).abs() / pdf
}

/// Traces perfect specular transmission with refracted ray differentials.
pub fn spec_transmit(
    ray: &RayDifferential,
    bsdf: &Bsdf,
    renderer: &Renderer,
    scene: &Scene,
    sampler: &mut dyn Sampler,
    arena: &Bump,
) -> Color {
    let n = bsdf.dg.normal;
    let p = bsdf.dg.point;
    let w_o = -ray.d;
    let mut u_sample = [[0.0f32; 2]; 1];
    let mut c_sample = [0.0f32; 1];
    sampler.get_2d(&mut u_sample);
    sampler.get_1d(&mut c_sample);
    let (f, w_i, pdf, _) = bsdf.sample(
        w_o,
        u_sample[0],
        c_sample[0],
        BxdfType::TRANSMISSION | BxdfType::SPECULAR,
    );
    if pdf <= 0.0 || f.is_black() || w_i.dot_normal(n).abs() == 0.0 {
        return BLACK;
    }
    let mut refr = RayDifferential::child(p, w_i, &ray.ray, 0.001);
    if ray.has_differentials() {
        refr.rx = Ray::child(p + bsdf.dg.dp_dx, w_i, &ray.ray, 0.001);
        refr.ry = Ray::child(p + bsdf.dg.dp_dy, w_i, &ray.ray, 0.001);
        let eta = if w_o.dot_normal(n) < 0.0 {
            1.0 / bsdf.eta
        } else {
            bsdf.eta
        };
        let dg = &bsdf.dg;
        let dn_dx = Vector::from(dg.dn_du * dg.du_dx + dg.dn_dv * dg.dv_dx);
        let dn_dy = Vector::from(dg.dn_du * dg.du_dy + dg.dn_dv * dg.dv_dy);
        let dd_dx = -ray.rx.d - w_o;
        let dd_dy = -ray.ry.d - w_o;
        let ddn_dx = dd_dx.dot_normal(n) + w_o.dot(dn_dx);
        let ddn_dy = dd_dy.dot_normal(n) + w_o.dot(dn_dy);
        let mu = eta * ray.d.dot_normal(n) - w_i.dot_normal(n);
        let dmu_dx =
            (eta - eta * eta * ray.d.dot_normal(n) / w_i.dot_normal(n)) * ddn_dx;
        let dmu_dy =
            (eta - eta * eta * ray.d.dot_normal(n) / w_i.dot_normal(n)) * ddn_dy;
        refr.rx.d = w_i + eta * dd_dx - (mu * dn_dx + dmu_dx * Vector::from(n));
        refr.ry.d = w_i + eta * dd_dy - (mu * dn_dy + dmu_dy * Vector::from(n));
    }
    let li = renderer.illumination(&mut refr, scene, sampler, arena);
    f * li * w_i.dot_normal(n).abs() / pdf
}
