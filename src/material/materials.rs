use std::sync::Arc;

use bumpalo::Bump;

use super::{
    Bsdf, BtdfAdapter, Fresnel, Lambertian, Material, MicrofacetDistribution, OrenNayar,
    SpecularReflection, SpecularTransmission, TorranceSparrow,
};
use crate::film::{Color, WHITE};
use crate::geometry::DifferentialGeometry;
use crate::texture::Texture;

// ─── Concrete materials ─────────────────────────────────────────────────────
//
// A material is a recipe: per hit it evaluates its textures and assembles the
// BSDF lobes in the caller's arena. Nothing here outlives the sample.

/// Purely diffuse surface; a roughness above zero switches the lobe from
/// Lambertian to Oren-Nayar.
pub struct Matte {
    kd: Arc<dyn Texture>,
    sigma: f32,
}

impl Matte {
    pub fn new(kd: Arc<dyn Texture>, sigma: f32) -> Self {
        Self { kd, sigma }
    }
}

impl Material for Matte {
    fn bsdf<'a>(&self, dg: &DifferentialGeometry<'a>, arena: &'a Bump) -> &'a Bsdf<'a> {
        let kd = self.kd.sample(dg);
        let mut bsdf = Bsdf::new(*dg, 1.0);
        let lobe = if self.sigma == 0.0 {
            arena.alloc(Lambertian::new(kd))
        } else {
            arena.alloc(OrenNayar::new(kd, self.sigma))
        };
        bsdf.add(lobe);
        arena.alloc(bsdf)
    }
}

/// Smooth dielectric: perfect specular reflection plus transmission with a
/// shared index of refraction, split by the Fresnel equations.
pub struct Glass {
    reflect: Color,
    transmit: Color,
    eta: f32,
}

impl Glass {
    pub fn new(reflect: Color, transmit: Color, eta: f32) -> Self {
        Self {
            reflect,
            transmit,
            eta,
        }
    }
}

impl Material for Glass {
    fn bsdf<'a>(&self, dg: &DifferentialGeometry<'a>, arena: &'a Bump) -> &'a Bsdf<'a> {
        let mut bsdf = Bsdf::new(*dg, self.eta);
        bsdf.add(arena.alloc(SpecularReflection::new(
            self.reflect,
            Fresnel::dielectric(1.0, self.eta),
        )));
        bsdf.add(arena.alloc(SpecularTransmission::new(self.transmit, 1.0, self.eta)));
        arena.alloc(bsdf)
    }
}

/// Perfectly smooth conductor: a single specular lobe weighted by the
/// conductor Fresnel term.
pub struct SpecularMetal {
    eta: Color,
    k: Color,
}

impl SpecularMetal {
    pub fn new(eta: Color, k: Color) -> Self {
        Self { eta, k }
    }

    /// An idealized mirror that reflects everything.
    pub fn mirror() -> Self {
        Self {
            eta: WHITE,
            k: Color::broadcast(0.0),
        }
    }
}

impl Material for SpecularMetal {
    fn bsdf<'a>(&self, dg: &DifferentialGeometry<'a>, arena: &'a Bump) -> &'a Bsdf<'a> {
        let fresnel = if self.k.is_black() {
            Fresnel::NoOp
        } else {
            Fresnel::conductor(self.eta, self.k)
        };
        let mut bsdf = Bsdf::new(*dg, 1.0);
        bsdf.add(arena.alloc(SpecularReflection::new(WHITE, fresnel)));
        arena.alloc(bsdf)
    }
}

/// Rough conductor: Torrance-Sparrow with a Blinn distribution whose
/// exponent is the reciprocal of the roughness.
pub struct Metal {
    eta: Color,
    k: Color,
    roughness: f32,
}

impl Metal {
    pub fn new(eta: Color, k: Color, roughness: f32) -> Self {
        Self { eta, k, roughness }
    }
}

impl Material for Metal {
    fn bsdf<'a>(&self, dg: &DifferentialGeometry<'a>, arena: &'a Bump) -> &'a Bsdf<'a> {
        let mut bsdf = Bsdf::new(*dg, 1.0);
        bsdf.add(arena.alloc(TorranceSparrow::new(
            WHITE,
            Fresnel::conductor(self.eta, self.k),
            MicrofacetDistribution::blinn(1.0 / self.roughness),
        )));
        arena.alloc(bsdf)
    }
}

/// Diffuse substrate under a glossy dielectric coat.
pub struct Plastic {
    kd: Arc<dyn Texture>,
    ks: Color,
    roughness: f32,
}

impl Plastic {
    pub fn new(kd: Arc<dyn Texture>, ks: Color, roughness: f32) -> Self {
        Self { kd, ks, roughness }
    }
}

impl Material for Plastic {
    fn bsdf<'a>(&self, dg: &DifferentialGeometry<'a>, arena: &'a Bump) -> &'a Bsdf<'a> {
        let mut bsdf = Bsdf::new(*dg, 1.0);
        bsdf.add(arena.alloc(Lambertian::new(self.kd.sample(dg))));
        bsdf.add(arena.alloc(TorranceSparrow::new(
            self.ks,
            Fresnel::dielectric(1.5, 1.0),
            MicrofacetDistribution::blinn(1.0 / self.roughness),
        )));
        arena.alloc(bsdf)
    }
}

/// Diffuse reflection plus diffuse transmission, the latter built by
/// flipping a Lambertian lobe across the surface with the BTDF adapter.
pub struct Translucent {
    kd: Arc<dyn Texture>,
    reflect: Color,
    transmit: Color,
}

impl Translucent {
    pub fn new(kd: Arc<dyn Texture>, reflect: Color, transmit: Color) -> Self {
        Self {
            kd,
            reflect,
            transmit,
        }
    }
}

impl Material for Translucent {
    fn bsdf<'a>(&self, dg: &DifferentialGeometry<'a>, arena: &'a Bump) -> &'a Bsdf<'a> {
        let kd = self.kd.sample(dg);
        let mut bsdf = Bsdf::new(*dg, 1.0);
        if !self.reflect.is_black() {
            bsdf.add(arena.alloc(Lambertian::new(kd * self.reflect)));
        }
        if !self.transmit.is_black() {
            let inner = arena.alloc(Lambertian::new(kd * self.transmit));
            bsdf.add(arena.alloc(BtdfAdapter::new(inner)));
        }
        arena.alloc(bsdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{Normal, Point, Vector};
    use crate::material::BxdfType;
    use crate::texture::ConstantTexture;

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
    fn matte_builds_one_diffuse_lobe() {
        let arena = Bump::new();
        let mat = Matte::new(Arc::new(ConstantTexture::new(Color::broadcast(0.7))), 0.0);
        let dg = flat_dg();
        let bsdf = mat.bsdf(&dg, &arena);
        assert_eq!(bsdf.num_bxdfs(), 1);
        assert_eq!(bsdf.num_matching(BxdfType::ALL_REFLECTION), 1);
        assert_eq!(bsdf.num_matching(BxdfType::ALL_TRANSMISSION), 0);
    }

    #[test]
    fn glass_builds_both_specular_lobes() {
        let arena = Bump::new();
        let mat = Glass::new(WHITE, WHITE, 1.5);
        let dg = flat_dg();
        let bsdf = mat.bsdf(&dg, &arena);
        assert_eq!(bsdf.num_bxdfs(), 2);
        assert_eq!(
            bsdf.num_matching(BxdfType::SPECULAR | BxdfType::REFLECTION),
            1
        );
        assert_eq!(
            bsdf.num_matching(BxdfType::SPECULAR | BxdfType::TRANSMISSION),
            1
        );
        assert!((bsdf.eta - 1.5).abs() < 1e-6);
    }

    #[test]
    fn translucent_carries_a_transmission_lobe() {
        let arena = Bump::new();
        let mat = Translucent::new(
            Arc::new(ConstantTexture::new(Color::broadcast(0.8))),
            Color::broadcast(0.5),
            Color::broadcast(0.5),
        );
        let dg = flat_dg();
        let bsdf = mat.bsdf(&dg, &arena);
        assert_eq!(bsdf.num_bxdfs(), 2);
        assert_eq!(bsdf.num_matching(BxdfType::ALL_TRANSMISSION), 1);
    }

    #[test]
    fn plastic_mixes_diffuse_and_glossy() {
        let arena = Bump::new();
        let mat = Plastic::new(
            Arc::new(ConstantTexture::new(Color::broadcast(0.6))),
            Color::broadcast(0.3),
            0.05,
        );
        let dg = flat_dg();
        let bsdf = mat.bsdf(&dg, &arena);
        assert_eq!(bsdf.num_matching(BxdfType::REFLECTION | BxdfType::DIFFUSE), 1);
        assert_eq!(bsdf.num_matching(BxdfType::REFLECTION | BxdfType::GLOSSY), 1);
    }
}
