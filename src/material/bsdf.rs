use super::{Bxdf, BxdfType};
use crate::film::{Color, BLACK};
use crate::geometry::DifferentialGeometry;
use crate::linalg::{Normal, Vector};

/// The most lobes a single BSDF can carry.
const MAX_BXDFS: usize = 8;

// ─── BSDF ───────────────────────────────────────────────────────────────────

/// The aggregate scattering function at a shading point: up to eight BxDF
/// lobes plus the orthonormal shading frame that maps directions between
/// world space and the lobes' shading space.
///
/// The BSDF and its lobes live in the per-sample arena; the `'a` lifetime
/// ties every reference to that frame so nothing can leak past the arena
/// reset.
pub struct Bsdf<'a> {
    /// Shading frame: `normal` is z, `bitangent` x, `tangent` y.
    normal: Normal,
    geom_normal: Normal,
    bitangent: Vector,
    tangent: Vector,
    bxdfs: [Option<&'a Bxdf<'a>>; MAX_BXDFS],
    n_bxdfs: usize,
    pub dg: DifferentialGeometry<'a>,
    /// Relative index of refraction across the surface, for the specular
    /// transmission differentials.
    pub eta: f32,
}

impl<'a> Bsdf<'a> {
    /// Builds the shading frame from the hit record, orthonormalizing the
    /// primary tangent against the shading normal. Hits with a degenerate
    /// parameterization (e.g. sphere poles, where ∂P/∂u vanishes) get an
    /// arbitrary frame about the normal instead.
    pub fn new(dg: DifferentialGeometry<'a>, eta: f32) -> Self {
        let normal = dg.normal;
        let mut bitangent = if dg.dp_du.length_squared() > 1e-12 {
            dg.dp_du.normalized()
        } else {
            crate::linalg::coordinate_system(Vector::from(normal)).0
        };
        let tangent = normal.cross_vector(bitangent).normalized();
        bitangent = tangent.cross(Vector::from(normal)).normalized();
        Self {
            normal,
            geom_normal: dg.geom_normal,
            bitangent,
            tangent,
            bxdfs: [None; MAX_BXDFS],
            n_bxdfs: 0,
            dg,
            eta,
        }
    }

    /// Adds a lobe. Panics past the fixed capacity; materials are static
    /// compositions that never approach it.
    pub fn add(&mut self, bxdf: &'a Bxdf<'a>) {
        assert!(self.n_bxdfs < MAX_BXDFS, "BSDF lobe capacity exceeded");
        self.bxdfs[self.n_bxdfs] = Some(bxdf);
        self.n_bxdfs += 1;
    }

    pub fn num_bxdfs(&self) -> usize {
        self.n_bxdfs
    }

    pub fn num_matching(&self, flags: BxdfType) -> usize {
        self.iter().filter(|b| b.matches(flags)).count()
    }

    fn iter(&self) -> impl Iterator<Item = &'a Bxdf<'a>> + '_ {
        self.bxdfs[..self.n_bxdfs].iter().map(|b| b.unwrap())
    }

    fn matching_at(&self, mut i: usize, flags: BxdfType) -> Option<&'a Bxdf<'a>> {
        for b in self.iter() {
            if b.matches(flags) {
                if i == 0 {
                    return Some(b);
                }
                i -= 1;
            }
        }
        None
    }

    #[inline]
    pub fn to_shading(&self, v: Vector) -> Vector {
        Vector::new(
            v.dot(self.bitangent),
            v.dot(self.tangent),
            v.dot_normal(self.normal),
        )
    }

    #[inline]
    pub fn from_shading(&self, v: Vector) -> Vector {
        Vector::new(
            self.bitangent.x * v.x + self.tangent.x * v.y + self.normal.x * v.z,
            self.bitangent.y * v.x + self.tangent.y * v.y + self.normal.y * v.z,
            self.bitangent.z * v.x + self.tangent.z * v.y + self.normal.z * v.z,
        )
    }

    /// Evaluates the matching lobes for a world-space direction pair.
    ///
    /// Whether the pair is a reflection or a transmission is judged against
    /// the *geometric* normal, not the shading normal, and the flags are
    /// masked accordingly. Classifying with the shading normal instead lets
    /// normal-mapped surfaces leak light at grazing angles.
    pub fn f(&self, w_o_world: Vector, w_i_world: Vector, mut flags: BxdfType) -> Color {
        let w_o = self.to_shading(w_o_world);
        let w_i = self.to_shading(w_i_world);
        if w_o_world.dot_normal(self.geom_normal) * w_i_world.dot_normal(self.geom_normal) > 0.0 {
            flags.remove(BxdfType::TRANSMISSION);
        } else {
            flags.remove(BxdfType::REFLECTION);
        }
        let mut color = BLACK;
        for b in self.iter() {
            if b.matches(flags) {
                color += b.f(w_o, w_i);
            }
        }
        color
    }

    /// Samples an incident direction from the matching lobes: `comp` picks
    /// the lobe, `u` drives its sampling. Returns
    /// `(f, w_i_world, pdf, sampled_type)`.
    ///
    /// For a non-specular lobe with other matching lobes present, the pdf is
    /// recomputed as the mean over all matching lobes and `f` re-evaluated
    /// as their sum, since any of them could have produced the direction. A
    /// specular lobe's delta pdf of 1 is left untouched.
    pub fn sample(
        &self,
        w_o_world: Vector,
        u: [f32; 2],
        comp: f32,
        flags: BxdfType,
    ) -> (Color, Vector, f32, BxdfType) {
        let n_matching = self.num_matching(flags);
        if n_matching == 0 {
            return (BLACK, Vector::zero(), 0.0, BxdfType::empty());
        }
        let select = ((comp * n_matching as f32) as usize).min(n_matching - 1);
        let bxdf = self.matching_at(select, flags).unwrap();

        let w_o = self.to_shading(w_o_world);
        let (mut f, w_i, mut pdf) = bxdf.sample(w_o, u);
        if pdf == 0.0 {
            return (BLACK, Vector::zero(), 0.0, BxdfType::empty());
        }
        let w_i_world = self.from_shading(w_i);

        if !bxdf.is_specular() && n_matching > 1 {
            pdf = self.pdf(w_o_world, w_i_world, flags);
            f = self.f(w_o_world, w_i_world, flags);
        }
        (f, w_i_world, pdf, bxdf.bxdf_type())
    }

    /// Mean pdf over the matching lobes for a world-space direction pair.
    pub fn pdf(&self, w_o_world: Vector, w_i_world: Vector, flags: BxdfType) -> f32 {
        let w_o = self.to_shading(w_o_world);
        let w_i = self.to_shading(w_i_world);
        let mut pdf = 0.0;
        let mut n = 0;
        for b in self.iter() {
            if b.matches(flags) {
                pdf += b.pdf(w_o, w_i);
                n += 1;
            }
        }
        if n > 0 {
            pdf / n as f32
        } else {
            0.0
        }
    }

    /// Sum of the matching lobes' hemispherical-directional reflectance.
    pub fn rho_hd(&self, w_o_world: Vector, samples: &[[f32; 2]], flags: BxdfType) -> Color {
        let w_o = self.to_shading(w_o_world);
        self.iter()
            .filter(|b| b.matches(flags))
            .fold(BLACK, |acc, b| acc + b.rho_hd(w_o, samples))
    }

    /// Sum of the matching lobes' hemispherical-hemispherical reflectance.
    pub fn rho_hh(
        &self,
        samples_a: &[[f32; 2]],
        samples_b: &[[f32; 2]],
        flags: BxdfType,
    ) -> Color {
        self.iter()
            .filter(|b| b.matches(flags))
            .fold(BLACK, |acc, b| acc + b.rho_hh(samples_a, samples_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Fresnel, Lambertian, SpecularReflection, SpecularTransmission};
    use crate::linalg::Point;

    fn flat_dg<'a>() -> DifferentialGeometry<'a> {
        DifferentialGeometry {
            point: Point::origin(),
            normal: Normal::new(0.0, 0.0, 1.0),
            geom_normal: Normal::new(0.0, 0.0, 1.0),
            dp_du: Vector::new(1.0, 0.0, 0.0),
            dp_dv: Vector::new(0.0, 1.0, 0.0),
            ..Default::default()
        }
    }

    #[test]
    fn shading_space_round_trip() {
        let bsdf = Bsdf::new(flat_dg(), 1.0);
        let v = Vector::new(0.3, -0.4, 0.5);
        let back = bsdf.from_shading(bsdf.to_shading(v));
        assert!((back - v).length() < 1e-5);
        // The shading normal maps to +z
        assert!((bsdf.to_shading(Vector::new(0.0, 0.0, 1.0)) - Vector::new(0.0, 0.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn geometric_normal_masks_transmission() {
        let lobes = [
            Lambertian::new(Color::broadcast(0.5)),
            SpecularTransmission::new(Color::broadcast(1.0), 1.0, 1.5),
        ];
        let mut bsdf = Bsdf::new(flat_dg(), 1.5);
        bsdf.add(&lobes[0]);
        bsdf.add(&lobes[1]);
        let above = Vector::new(0.0, 0.0, 1.0);
        let below = Vector::new(0.0, 0.0, -1.0);
        // Same-side pair: the diffuse reflection lobe fires
        assert!(!bsdf.f(above, above, BxdfType::ALL).is_black());
        // Opposite-side pair: reflection lobes are masked out, and the
        // transmission lobe is a delta that evaluates to zero
        assert!(bsdf.f(above, below, BxdfType::ALL).is_black());
    }

    #[test]
    fn sample_with_no_matching_lobes_is_zero() {
        let lobe = Lambertian::new(Color::broadcast(0.5));
        let mut bsdf = Bsdf::new(flat_dg(), 1.0);
        bsdf.add(&lobe);
        let (f, _, pdf, ty) = bsdf.sample(
            Vector::new(0.0, 0.0, 1.0),
            [0.5, 0.5],
            0.5,
            BxdfType::ALL_TRANSMISSION,
        );
        assert!(f.is_black());
        assert_eq!(pdf, 0.0);
        assert_eq!(ty, BxdfType::empty());
    }

    #[test]
    fn specular_sample_keeps_delta_pdf() {
        let lobes = [
            SpecularReflection::new(Color::broadcast(0.9), Fresnel::NoOp),
            Lambertian::new(Color::broadcast(0.5)),
        ];
        let mut bsdf = Bsdf::new(flat_dg(), 1.0);
        bsdf.add(&lobes[0]);
        bsdf.add(&lobes[1]);
        let w_o = Vector::new(0.4, 0.0, 0.9165).normalized();
        // comp = 0 selects the specular lobe (first match)
        let (f, w_i, pdf, ty) = bsdf.sample(w_o, [0.5, 0.5], 0.0, BxdfType::ALL);
        assert!(ty.contains(BxdfType::SPECULAR));
        assert_eq!(pdf, 1.0, "delta pdf must not be averaged");
        assert!(!f.is_black());
        let mirror = Vector::new(-w_o.x, -w_o.y, w_o.z);
        assert!((w_i - mirror).length() < 1e-4);
    }

    #[test]
    fn diffuse_sample_averages_pdf_over_matches() {
        let lobes = [
            Lambertian::new(Color::broadcast(0.4)),
            Lambertian::new(Color::broadcast(0.2)),
        ];
        let mut bsdf = Bsdf::new(flat_dg(), 1.0);
        bsdf.add(&lobes[0]);
        bsdf.add(&lobes[1]);
        let w_o = Vector::new(0.1, 0.2, 0.97).normalized();
        let (f, w_i, pdf, _) = bsdf.sample(w_o, [0.3, 0.6], 0.9, BxdfType::ALL);
        // Both lobes share the cosine pdf, so the average equals either one
        assert!((pdf - bsdf.pdf(w_o, w_i, BxdfType::ALL)).abs() < 1e-6);
        // f sums both lobes
        let expected = bsdf.f(w_o, w_i, BxdfType::ALL);
        assert!((f.r - expected.r).abs() < 1e-6);
    }

    #[test]
    fn rho_hh_of_diffuse_stack_is_bounded() {
        let lobes = [
            Lambertian::new(Color::broadcast(0.5)),
            Lambertian::new(Color::broadcast(0.4)),
        ];
        let mut bsdf = Bsdf::new(flat_dg(), 1.0);
        bsdf.add(&lobes[0]);
        bsdf.add(&lobes[1]);
        let rho = bsdf.rho_hh(&[], &[], BxdfType::ALL);
        assert!(rho.r <= 1.0 && rho.g <= 1.0 && rho.b <= 1.0);
    }
}
