use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;

use super::{uniform_sample_one_light, SurfaceIntegrator};
use crate::film::{Color, BLACK, WHITE};
use crate::geometry::DifferentialGeometry;
use crate::linalg::{Ray, RayDifferential, Vector};
use crate::material::{Bsdf, BxdfType};
use crate::renderer::Renderer;
use crate::sampler::Sampler;
use crate::scene::Scene;

// ─── Bidirectional path integrator ──────────────────────────────────────────

/// One vertex of a camera or light subpath.
struct PathVertex<'a> {
    dg: DifferentialGeometry<'a>,
    bsdf: &'a Bsdf<'a>,
    w_o: Vector,
    w_i: Vector,
    /// Path throughput up to (and excluding) this vertex's own scattering.
    throughput: Color,
    specular_bounce: bool,
    /// Number of purely specular lobes on this vertex's BSDF, which inflate
    /// the count of alternative path constructions.
    num_specular: usize,
}

/// Bidirectional path tracing: a camera subpath and a light subpath are
/// traced independently, then every compatible vertex pair is connected with
/// a visibility ray. Each complete path of a given length could have been
/// built several ways, so contributions are down-weighted by the number of
/// constructions, excluding those blocked by specular vertices.
pub struct BidirPathIntegrator {
    min_depth: u32,
    max_depth: u32,
}

impl BidirPathIntegrator {
    pub fn new(min_depth: u32, max_depth: u32) -> Self {
        Self {
            min_depth,
            max_depth,
        }
    }

    /// Traces a subpath, recording a vertex at every scattering event. The
    /// returned vertices stop at the first miss, material-less hit, or
    /// roulette termination.
    fn trace_path<'a>(
        &self,
        scene: &'a Scene,
        renderer: &Renderer,
        start: &RayDifferential,
        weight: Color,
        sampler: &mut dyn Sampler,
        arena: &'a Bump,
    ) -> BumpVec<'a, PathVertex<'a>> {
        let n = self.max_depth as usize;
        let path_samples_u = arena.alloc_slice_fill_copy(n, [0.0f32; 2]);
        let path_samples_comp = arena.alloc_slice_fill_copy(n, 0.0f32);
        sampler.get_2d(path_samples_u);
        sampler.get_1d(path_samples_comp);

        let mut path = BumpVec::with_capacity_in(n, arena);
        let mut ray = *start;
        let mut throughput = weight;
        for bounce in 0..n {
            let mut dg = DifferentialGeometry::default();
            if !scene.root().intersect(&mut ray.ray, &mut dg) {
                break;
            }
            let Some(material) = dg.node.and_then(|node| node.material()) else {
                break;
            };
            dg.compute_differentials(&ray);
            let bsdf = material.bsdf(&dg, arena);
            let w_o = -ray.d;
            let (f, w_i, pdf, sampled_type) = bsdf.sample(
                w_o,
                path_samples_u[bounce],
                path_samples_comp[bounce],
                BxdfType::ALL,
            );
            let specular_bounce = sampled_type.contains(BxdfType::SPECULAR);
            let num_specular = bsdf.num_matching(
                BxdfType::SPECULAR | BxdfType::REFLECTION | BxdfType::TRANSMISSION,
            );
            path.push(PathVertex {
                dg,
                bsdf,
                w_o,
                w_i,
                throughput,
                specular_bounce,
                num_specular,
            });
            if f.is_black() || pdf == 0.0 {
                break;
            }
            let v = path.last().expect("vertex was just pushed");
            let survival = f * v.w_i.dot_normal(v.bsdf.dg.normal).abs() / pdf;
            throughput *= survival;
            if bounce as u32 > self.min_depth {
                let cont_prob = survival.luminance().min(1.0);
                if sampler.random_float() > cont_prob {
                    break;
                }
                throughput /= cont_prob;
            }
            throughput *= renderer.transmittance(scene, &ray, sampler, arena);
            ray = RayDifferential::child(v.bsdf.dg.point, v.w_i, &ray.ray, 0.001);
        }
        path
    }

    /// Direct-lighting sweep over the camera subpath alone, used when no
    /// usable light subpath exists. Mirrors the unidirectional estimator.
    fn camera_luminance(
        &self,
        scene: &Scene,
        renderer: &Renderer,
        cam_path: &[PathVertex],
        sampler: &mut dyn Sampler,
        arena: &Bump,
    ) -> Color {
        let n = cam_path.len();
        let l_u = arena.alloc_slice_fill_copy(n, [0.0f32; 2]);
        let l_comp = arena.alloc_slice_fill_copy(n, 0.0f32);
        let b_u = arena.alloc_slice_fill_copy(n, [0.0f32; 2]);
        let b_comp = arena.alloc_slice_fill_copy(n, 0.0f32);
        sampler.get_2d(l_u);
        sampler.get_1d(l_comp);
        sampler.get_2d(b_u);
        sampler.get_1d(b_comp);

        let mut illum = BLACK;
        let mut prev_specular = true;
        for (i, v) in cam_path.iter().enumerate() {
            let p = v.bsdf.dg.point;
            let normal = v.bsdf.dg.normal;
            if prev_specular {
                if let Some(area) = v.dg.node.and_then(|node| node.area_light()) {
                    illum += v.throughput * area.radiance(p, normal, v.w_o);
                }
            }
            illum += v.throughput
                * uniform_sample_one_light(
                    scene,
                    renderer,
                    p,
                    normal,
                    v.w_o,
                    v.bsdf,
                    (l_u[i], l_comp[i]),
                    (b_u[i], b_comp[i]),
                );
            prev_specular = v.specular_bounce;
        }
        illum
    }

    /// The full bidirectional estimate: per-camera-vertex direct lighting
    /// weighted by the alternative-construction count, plus every visible
    /// camera-light vertex connection with its geometric coupling term.
    #[allow(clippy::too_many_arguments)]
    fn bidir_luminance(
        &self,
        scene: &Scene,
        renderer: &Renderer,
        cam_path: &[PathVertex],
        light_path: &[PathVertex],
        sampler: &mut dyn Sampler,
        arena: &Bump,
    ) -> Color {
        let n_cam = cam_path.len();
        let l_u = arena.alloc_slice_fill_copy(n_cam, [0.0f32; 2]);
        let l_comp = arena.alloc_slice_fill_copy(n_cam, 0.0f32);
        let b_u = arena.alloc_slice_fill_copy(n_cam, [0.0f32; 2]);
        let b_comp = arena.alloc_slice_fill_copy(n_cam, 0.0f32);
        sampler.get_2d(l_u);
        sampler.get_1d(l_comp);
        sampler.get_2d(b_u);
        sampler.get_1d(b_comp);

        // num_spec_verts[k]: how many length-k constructions are blocked by
        // a specular vertex on either side
        let num_verts = n_cam + light_path.len() + 2;
        let num_spec_verts = arena.alloc_slice_fill_copy(num_verts, 0usize);
        for (i, cv) in cam_path.iter().enumerate() {
            for (j, lv) in light_path.iter().enumerate() {
                if cv.specular_bounce || lv.specular_bounce {
                    num_spec_verts[i + j + 2] += 1;
                }
            }
        }

        let mut illum = BLACK;
        let mut prev_specular = true;
        for (i, v_c) in cam_path.iter().enumerate() {
            let p_c = v_c.bsdf.dg.point;
            let n_c = v_c.bsdf.dg.normal;
            if prev_specular {
                if let Some(area) = v_c.dg.node.and_then(|node| node.area_light()) {
                    illum += v_c.throughput * area.radiance(p_c, n_c, v_c.w_o);
                }
            }
            let direct = v_c.throughput
                * uniform_sample_one_light(
                    scene,
                    renderer,
                    p_c,
                    n_c,
                    v_c.w_o,
                    v_c.bsdf,
                    (l_u[i], l_comp[i]),
                    (b_u[i], b_comp[i]),
                );
            prev_specular = v_c.specular_bounce;
            illum += direct / (i + 1 - num_spec_verts[i + 1]).max(1) as f32;

            if v_c.specular_bounce {
                continue;
            }
            for (j, v_l) in light_path.iter().enumerate() {
                if v_l.specular_bounce {
                    continue;
                }
                let p_l = v_l.bsdf.dg.point;
                let n_l = v_l.bsdf.dg.normal;
                let w = (p_l - p_c).normalized();
                let f_c = v_c.bsdf.f(v_c.w_o, w, BxdfType::ALL)
                    * (1 + v_c.num_specular) as f32;
                let f_l = v_l.bsdf.f(-w, v_l.w_o, BxdfType::ALL)
                    * (1 + v_l.num_specular) as f32;
                if f_c.is_black() || f_l.is_black() {
                    continue;
                }
                let mut vis = Ray::segment(p_c, p_l - p_c, 0.001, 0.999);
                let mut dg = DifferentialGeometry::default();
                if !scene.root().intersect(&mut vis, &mut dg) {
                    let weight =
                        1.0 / (i + j + 2 - num_spec_verts[i + j + 2]).max(1) as f32;
                    let geom_term = w.dot_normal(n_c).abs() * w.dot_normal(n_l).abs()
                        / p_l.distance_squared(p_c);
                    let transmit = renderer.transmittance(
                        scene,
                        &RayDifferential::from(vis),
                        sampler,
                        arena,
                    );
                    illum += v_c.throughput
                        * f_c
                        * geom_term
                        * f_l
                        * v_l.throughput
                        * weight
                        * transmit;
                }
            }
        }
        illum
    }
}

impl SurfaceIntegrator for BidirPathIntegrator {
    fn illumination<'a>(
        &self,
        scene: &'a Scene,
        renderer: &Renderer,
        r: &RayDifferential,
        _dg: &mut DifferentialGeometry<'a>,
        sampler: &mut dyn Sampler,
        arena: &'a Bump,
    ) -> Color {
        // Re-trace the camera path from scratch so its vertices record the
        // full scattering state
        let mut ray = *r;
        ray.ray.t_max = f32::INFINITY;
        let cam_path = self.trace_path(scene, renderer, &ray, WHITE, sampler, arena);
        if cam_path.is_empty() {
            return BLACK;
        }

        let lights = scene.lights();
        if lights.is_empty() {
            return BLACK;
        }
        let mut l_u = [[0.0f32; 2]; 2];
        let mut l_comp = [0.0f32; 2];
        sampler.get_2d(&mut l_u);
        sampler.get_1d(&mut l_comp);
        let light_num = ((l_comp[0] * lights.len() as f32) as usize).min(lights.len() - 1);
        let light = &lights[light_num];
        let emit = light.sample_emit(l_u[0], l_u[1]);
        if emit.radiance.is_black() || emit.pdf == 0.0 {
            return self.camera_luminance(scene, renderer, &cam_path, sampler, arena);
        }
        let light_weight = emit.radiance
            * (emit.ray.d.dot_normal(emit.normal.normalized()).abs() / emit.pdf);
        let light_start = RayDifferential::from(emit.ray);
        let light_path =
            self.trace_path(scene, renderer, &light_start, light_weight, sampler, arena);
        self.bidir_luminance(scene, renderer, &cam_path, &light_path, sampler, arena)
    }
}
