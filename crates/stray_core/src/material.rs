//! Surface materials and BRDF sampling.
//!
//! A closed enum replaces the usual virtual hierarchy: reflective
//! surfaces (diffuse + max-Phong specular), flat emitters, and the
//! environment map as the material of the infinite sphere. Materials
//! are pure functions of their immutable fields plus caller geometry.

use std::f32::consts::PI;
use std::sync::Arc;

use rand::Rng;
use stray_math::{average, sample_cosine_hemisphere, sample_phong_lobe, OrthonormalBasis, Vec3};

use crate::envmap::EnvMap;

/// Cosine threshold below which a configuration counts as back-facing.
const COS_EPSILON: f32 = 1e-6;

/// Surface appearance, dispatched by pattern match.
#[derive(Clone)]
pub enum Material {
    /// Diffuse + specular reflector (Lambert + energy-conserving max-Phong).
    Surface {
        diffuse: Vec3,
        specular: Vec3,
        shininess: f32,
    },
    /// Flat emitter; does not reflect.
    Light { radiance: Vec3 },
    /// The environment map acting as the material of the infinite sphere.
    Sky(Arc<EnvMap>),
}

impl Material {
    /// Diffuse + specular surface.
    ///
    /// Energy conservation (`average(diffuse) + average(specular) <= 1`)
    /// is the scene builder's responsibility and is not enforced here.
    pub fn surface(diffuse: Vec3, specular: Vec3, shininess: f32) -> Self {
        Self::Surface {
            diffuse,
            specular,
            shininess,
        }
    }

    /// Pure emitter with the given radiance.
    pub fn light(radiance: Vec3) -> Self {
        Self::Light { radiance }
    }

    /// Environment-map material.
    pub fn sky(map: Arc<EnvMap>) -> Self {
        Self::Sky(map)
    }

    /// True if the material emits light.
    pub fn is_emissive(&self) -> bool {
        match self {
            Self::Surface { .. } => false,
            Self::Light { radiance } => *radiance != Vec3::ZERO,
            Self::Sky(_) => true,
        }
    }

    /// True if the material reflects light (has a BRDF worth sampling).
    pub fn is_reflective(&self) -> bool {
        match self {
            Self::Surface { diffuse, specular, .. } => {
                average(*diffuse) + average(*specular) > 0.0
            }
            Self::Light { .. } | Self::Sky(_) => false,
        }
    }

    /// Mean specular albedo; drives Russian-roulette continuation.
    pub fn specular_average(&self) -> f32 {
        match self {
            Self::Surface { specular, .. } => average(*specular),
            Self::Light { .. } | Self::Sky(_) => 0.0,
        }
    }

    /// Radiance emitted toward `-dir`, where `dir` is the direction the
    /// querying ray was travelling.
    pub fn emitted(&self, dir: Vec3) -> Vec3 {
        match self {
            Self::Surface { .. } => Vec3::ZERO,
            Self::Light { radiance } => *radiance,
            Self::Sky(map) => map.radiance_bilinear(dir),
        }
    }

    /// Evaluate the BRDF for unit vectors `n` (surface normal), `v`
    /// (toward the viewer) and `l` (toward the light).
    ///
    /// Zero for back-facing configurations and outside the specular
    /// reflection cone.
    pub fn brdf(&self, n: Vec3, v: Vec3, l: Vec3) -> Vec3 {
        let Self::Surface {
            diffuse,
            specular,
            shininess,
        } = self
        else {
            return Vec3::ZERO;
        };

        let cos_l = n.dot(l);
        let cos_v = n.dot(v);
        if cos_l <= COS_EPSILON || cos_v <= COS_EPSILON {
            return Vec3::ZERO;
        }

        let mut result = *diffuse / PI;

        let cos_alpha = reflect(l, n).dot(v);
        if cos_alpha > 0.0 {
            // Max-Phong: dividing by max(cos_l, cos_v) keeps the lobe
            // symmetric and energy conserving.
            let strength =
                (shininess + 2.0) / (2.0 * PI) * cos_alpha.powf(*shininess) / cos_l.max(cos_v);
            result += *specular * strength;
        }
        result
    }

    /// Importance-sample an outgoing direction for viewer direction `v`.
    ///
    /// Russian roulette across the mixture: cosine-weighted diffuse with
    /// probability `average(diffuse)`, Phong lobe about the mirror
    /// direction with probability `average(specular)`; `None` means the
    /// remaining probability mass absorbed the path.
    pub fn sample_direction<R: Rng + ?Sized>(&self, n: Vec3, v: Vec3, rng: &mut R) -> Option<Vec3> {
        let Self::Surface {
            diffuse,
            specular,
            shininess,
        } = self
        else {
            return None;
        };

        let avg_diffuse = average(*diffuse);
        let avg_specular = average(*specular);
        let u: f32 = rng.gen();

        if u < avg_diffuse {
            let local = sample_cosine_hemisphere(rng.gen(), rng.gen());
            Some(OrthonormalBasis::from_normal(n).to_world(local))
        } else if u < avg_diffuse + avg_specular {
            // Lobe around the mirror direction; the result may dip below
            // the surface, which the pdf and BRDF then evaluate to zero.
            let mirror = reflect(v, n);
            let local = sample_phong_lobe(rng.gen(), rng.gen(), *shininess);
            Some(OrthonormalBasis::from_normal(mirror).to_world(local))
        } else {
            None
        }
    }

    /// Density of [`Material::sample_direction`] producing `l`, in
    /// solid-angle measure.
    pub fn sample_pdf(&self, n: Vec3, v: Vec3, l: Vec3) -> f32 {
        let Self::Surface {
            diffuse,
            specular,
            shininess,
        } = self
        else {
            return 0.0;
        };

        let cos_l = n.dot(l);
        let cos_v = n.dot(v);
        if cos_l <= COS_EPSILON || cos_v <= COS_EPSILON {
            return 0.0;
        }

        let mut pdf = average(*diffuse) * cos_l / PI;
        let cos_alpha = reflect(v, n).dot(l);
        if cos_alpha > 0.0 {
            pdf += average(*specular) * (shininess + 1.0) / (2.0 * PI) * cos_alpha.powf(*shininess);
        }
        pdf
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Surface {
                diffuse,
                specular,
                shininess,
            } => f
                .debug_struct("Surface")
                .field("diffuse", diffuse)
                .field("specular", specular)
                .field("shininess", shininess)
                .finish(),
            Self::Light { radiance } => {
                f.debug_struct("Light").field("radiance", radiance).finish()
            }
            Self::Sky(map) => f
                .debug_struct("Sky")
                .field("size", &(map.width(), map.height()))
                .finish(),
        }
    }
}

/// Mirror `v` about the unit normal `n`.
#[inline]
fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    2.0 * v.dot(n) * n - v
}
