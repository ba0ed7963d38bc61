//! Monte Carlo radiance estimators.
//!
//! Two top-level estimators share their sampling building blocks:
//!
//! - [`trace`] computes single-bounce direct lighting, averaging a
//!   configurable split of light-source samples and BRDF samples and
//!   optionally combining the two techniques with the balance heuristic
//!   (multiple importance sampling).
//! - [`path_trace`] extends this to multiple bounces with next-event
//!   estimation at each vertex and Russian-roulette termination.

use rand::Rng;
use stray_core::{Material, ObjectId, Scene};
use stray_math::{Ray, Vec3};

/// How a pixel's radiance estimate is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// All samples drawn on light sources.
    LightSource,
    /// All samples drawn from the BRDF.
    Brdf,
    /// Half light samples, half BRDF samples, combined naively.
    HalfWeight,
    /// Half/half split combined with the balance heuristic.
    MultipleImportance,
    /// Multi-bounce path tracing with next-event estimation.
    PathTracing,
}

impl RenderMode {
    /// Fraction of the per-pixel budget spent on light sampling.
    pub fn light_weight(self) -> f32 {
        match self {
            Self::LightSource => 1.0,
            Self::Brdf => 0.0,
            Self::HalfWeight | Self::MultipleImportance => 0.5,
            Self::PathTracing => 0.5,
        }
    }

    /// Split a per-pixel sample budget into (light, BRDF) counts.
    pub fn sample_counts(self, samples_per_pixel: u32) -> (u32, u32) {
        let n_light = (self.light_weight() * samples_per_pixel as f32).round() as u32;
        let n_light = n_light.min(samples_per_pixel);
        (n_light, samples_per_pixel - n_light)
    }
}

/// Estimator settings, passed explicitly into the render loop.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub mode: RenderMode,
    /// Estimator samples per pixel per iteration.
    pub samples_per_pixel: u32,
    /// Safety bound on path length in path-tracing mode.
    pub max_bounces: u32,
    pub seed: u64,
    pub parallel: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::MultipleImportance,
            samples_per_pixel: 16,
            max_bounces: 16,
            seed: 0,
            parallel: true,
        }
    }
}

/// Estimate radiance along `ray` with the configured estimator.
pub fn estimate_radiance<R: Rng + ?Sized>(
    scene: &Scene,
    ray: &Ray,
    config: &RenderConfig,
    rng: &mut R,
) -> Vec3 {
    match config.mode {
        RenderMode::PathTracing => path_trace(scene, ray, config, rng),
        _ => trace(scene, ray, config, rng),
    }
}

/// Single-bounce direct-lighting estimator.
///
/// Adds the hit point's own emission, then averages `n_light` light
/// samples and `n_brdf` BRDF samples per the mode's split. Under
/// [`RenderMode::MultipleImportance`] each sample is divided by the sum
/// of both techniques' densities at its direction instead of the
/// generating density alone.
pub fn trace<R: Rng + ?Sized>(
    scene: &Scene,
    ray: &Ray,
    config: &RenderConfig,
    rng: &mut R,
) -> Vec3 {
    let Some(hit) = scene.first_intersect(ray, None) else {
        return Vec3::ZERO;
    };
    let object = scene.object(hit.object);
    let mut radiance = object.material.emitted(ray.direction);
    if !object.material.is_reflective() {
        return radiance;
    }

    let n = hit.normal;
    let v = -ray.direction;
    let p = hit.position;
    let mis = config.mode == RenderMode::MultipleImportance;
    let (n_light, n_brdf) = config.mode.sample_counts(config.samples_per_pixel);

    if n_light > 0 {
        let mut sum = Vec3::ZERO;
        for _ in 0..n_light {
            sum += light_sample_estimate(scene, hit.object, &object.material, p, n, v, mis, rng);
        }
        radiance += sum / n_light as f32;
    }

    if n_brdf > 0 {
        let mut sum = Vec3::ZERO;
        for _ in 0..n_brdf {
            sum += brdf_sample_estimate(scene, hit.object, &object.material, p, n, v, mis, rng);
        }
        radiance += sum / n_brdf as f32;
    }

    radiance
}

/// Multi-bounce estimator with next-event estimation.
///
/// At each vertex: add emission, add one light sample at half weight,
/// halve the throughput (the BRDF continuation carries the other half),
/// then continue along a BRDF-sampled direction under Russian roulette
/// with continuation probability `min(0.9, average(specular))`.
pub fn path_trace<R: Rng + ?Sized>(
    scene: &Scene,
    ray: &Ray,
    config: &RenderConfig,
    rng: &mut R,
) -> Vec3 {
    let mut radiance = Vec3::ZERO;
    let mut throughput = Vec3::ONE;
    let mut current = *ray;
    let mut skip: Option<ObjectId> = None;

    for _bounce in 0..config.max_bounces {
        let Some(hit) = scene.first_intersect(&current, skip) else {
            break;
        };
        let object = scene.object(hit.object);
        radiance += throughput * object.material.emitted(current.direction);
        if !object.material.is_reflective() {
            break;
        }

        let n = hit.normal;
        let v = -current.direction;
        let p = hit.position;

        let nee = light_sample_estimate(scene, hit.object, &object.material, p, n, v, false, rng);
        radiance += throughput * 0.5 * nee;
        throughput *= 0.5;

        let Some(dir) = object.material.sample_direction(n, v, rng) else {
            break;
        };
        let cos_surface = n.dot(dir);
        if cos_surface <= 0.0 {
            break;
        }
        let pdf = object.material.sample_pdf(n, v, dir);
        if pdf <= 0.0 {
            break;
        }
        throughput *= object.material.brdf(n, v, dir) * cos_surface / pdf;

        let p_continue = object.material.specular_average().min(0.9);
        if rng.gen::<f32>() >= p_continue {
            break;
        }
        throughput /= p_continue;

        current = Ray::new(p, dir);
        skip = Some(hit.object);
    }

    radiance
}

/// One light-sampling contribution at a shading point.
///
/// Draws a point on an emitter, tests visibility, and weighs the
/// transported radiance by the light-sampling density (plus the BRDF
/// density under `mis`). All failure paths are worth zero.
#[allow(clippy::too_many_arguments)]
fn light_sample_estimate<R: Rng + ?Sized>(
    scene: &Scene,
    shading_object: ObjectId,
    material: &Material,
    p: Vec3,
    n: Vec3,
    v: Vec3,
    mis: bool,
    rng: &mut R,
) -> Vec3 {
    let Ok(light) = scene.sample_light_source(rng) else {
        return Vec3::ZERO;
    };
    let dir = (light.point - p).normalize_or_zero();
    if n.dot(dir) <= 0.0 {
        return Vec3::ZERO;
    }
    let brdf = material.brdf(n, v, dir);
    if brdf == Vec3::ZERO {
        return Vec3::ZERO;
    }
    let pdf_light = scene.light_pdf(light.object, p, light.point, light.normal, dir);
    if pdf_light <= 0.0 {
        return Vec3::ZERO;
    }

    let shadow = Ray::new(p, dir);
    match scene.first_intersect(&shadow, Some(shading_object)) {
        Some(blocker) if blocker.object == light.object => {}
        _ => return Vec3::ZERO,
    }

    let denom = if mis {
        pdf_light + material.sample_pdf(n, v, dir)
    } else {
        pdf_light
    };
    if denom <= 0.0 {
        return Vec3::ZERO;
    }
    scene.light_emission(light.object, dir) * brdf * n.dot(dir) / denom
}

/// One BRDF-sampling contribution at a shading point.
///
/// Draws a direction from the material's importance distribution and
/// collects radiance only if the ray lands on an emitter.
#[allow(clippy::too_many_arguments)]
fn brdf_sample_estimate<R: Rng + ?Sized>(
    scene: &Scene,
    shading_object: ObjectId,
    material: &Material,
    p: Vec3,
    n: Vec3,
    v: Vec3,
    mis: bool,
    rng: &mut R,
) -> Vec3 {
    let Some(dir) = material.sample_direction(n, v, rng) else {
        return Vec3::ZERO;
    };
    let cos_surface = n.dot(dir);
    if cos_surface <= 0.0 {
        return Vec3::ZERO;
    }
    let pdf_brdf = material.sample_pdf(n, v, dir);
    if pdf_brdf <= 0.0 {
        return Vec3::ZERO;
    }
    let brdf = material.brdf(n, v, dir);
    if brdf == Vec3::ZERO {
        return Vec3::ZERO;
    }

    let Some(hit) = scene.first_intersect(&Ray::new(p, dir), Some(shading_object)) else {
        return Vec3::ZERO;
    };
    let target = scene.object(hit.object);
    if !target.material.is_emissive() {
        return Vec3::ZERO;
    }

    let denom = if mis {
        pdf_brdf + scene.light_pdf(hit.object, p, hit.position, hit.normal, dir)
    } else {
        pdf_brdf
    };
    if denom <= 0.0 {
        return Vec3::ZERO;
    }
    target.material.emitted(dir) * brdf * cos_surface / denom
}
