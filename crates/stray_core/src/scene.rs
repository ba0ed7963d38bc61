//! Scene: object arena, intersection queries and light selection.
//!
//! Objects live in a flat arena addressed by [`ObjectId`]; hits and
//! light samples carry ids, never pointers, so nothing dangles across
//! scene rebuilds. The intersection query is a linear nearest-hit scan,
//! deliberate for the small scenes this renderer targets.

use std::sync::Arc;

use log::info;
use rand::Rng;
use stray_math::{average, Ray, Vec3};
use thiserror::Error;

use crate::envmap::EnvMap;
use crate::material::Material;
use crate::shape::{Shape, FAR_DISTANCE};

/// Bound on light-selection retries for degenerate scenes.
const MAX_LIGHT_RETRIES: usize = 64;

/// Handle into the scene's object arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub usize);

/// A shape paired with its material and precomputed emitted power.
#[derive(Debug, Clone)]
pub struct Object {
    pub shape: Shape,
    pub material: Material,
    /// Total emitted power; zero for non-emitters.
    pub power: f32,
}

/// Result of a nearest-hit query. `t` is infinite for the environment.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub object: ObjectId,
    pub t: f32,
    pub position: Vec3,
    pub normal: Vec3,
}

/// A point sampled on an emitter, consumed within one estimator step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    pub object: ObjectId,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Errors from power-proportional light selection.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LightSampleError {
    #[error("scene has no light source (total power is zero)")]
    NoLightSource,
    #[error("light selection failed after {MAX_LIGHT_RETRIES} attempts")]
    RetriesExhausted,
}

/// Object arena, camera-independent scene state.
#[derive(Default)]
pub struct Scene {
    objects: Vec<Object>,
    total_power: f32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object; emitted power is derived from shape and material.
    pub fn add_object(&mut self, shape: Shape, material: Material) -> ObjectId {
        let power = match &material {
            Material::Light { radiance } => {
                std::f32::consts::PI * shape.area() * average(*radiance)
            }
            Material::Sky(map) => map.power(),
            Material::Surface { .. } => 0.0,
        };
        self.total_power += power;
        let id = ObjectId(self.objects.len());
        self.objects.push(Object {
            shape,
            material,
            power,
        });
        id
    }

    /// Add the environment sphere backed by an importance-sampled map.
    pub fn add_environment(&mut self, map: Arc<EnvMap>) -> ObjectId {
        let id = self.add_object(Shape::Environment, Material::sky(map));
        info!(
            "environment added: power {:.3}, scene total {:.3}",
            self.objects[id.0].power, self.total_power
        );
        id
    }

    #[inline]
    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id.0]
    }

    #[inline]
    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    /// Sum of all objects' emitted power.
    #[inline]
    pub fn total_power(&self) -> f32 {
        self.total_power
    }

    /// Nearest hit along the ray, optionally skipping one object (used
    /// to avoid immediate self-reintersection after a bounce).
    ///
    /// The environment intersects at infinite t, so it is returned only
    /// when nothing finite is in the way.
    pub fn first_intersect(&self, ray: &Ray, skip: Option<ObjectId>) -> Option<Hit> {
        let mut best: Option<Hit> = None;
        for (index, object) in self.objects.iter().enumerate() {
            if skip == Some(ObjectId(index)) {
                continue;
            }
            if let Some(hit) = object.shape.intersect(ray) {
                if best.map_or(true, |b| hit.t < b.t) {
                    best = Some(Hit {
                        object: ObjectId(index),
                        t: hit.t,
                        position: hit.position,
                        normal: hit.normal,
                    });
                }
            }
        }
        best
    }

    /// Select an emitter proportionally to its power and sample a point
    /// on it.
    ///
    /// Floating-point error can leave the selection walk without a
    /// winner; retries are bounded so a degenerate scene fails instead
    /// of spinning forever.
    pub fn sample_light_source<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<LightSample, LightSampleError> {
        if self.total_power <= 0.0 {
            return Err(LightSampleError::NoLightSource);
        }

        for _ in 0..MAX_LIGHT_RETRIES {
            let threshold = rng.gen::<f32>() * self.total_power;
            let mut running = 0.0;
            for (index, object) in self.objects.iter().enumerate() {
                if object.power <= 0.0 {
                    continue;
                }
                running += object.power;
                if running > threshold {
                    if let Some(sample) = self.sample_point_on(ObjectId(index), object, rng) {
                        return Ok(sample);
                    }
                    break;
                }
            }
        }
        Err(LightSampleError::RetriesExhausted)
    }

    fn sample_point_on<R: Rng + ?Sized>(
        &self,
        id: ObjectId,
        object: &Object,
        rng: &mut R,
    ) -> Option<LightSample> {
        match &object.material {
            Material::Sky(map) => {
                let (dir, pdf) = map.sample_direction(rng.gen(), rng.gen());
                if pdf <= 0.0 {
                    return None;
                }
                Some(LightSample {
                    object: id,
                    point: dir * FAR_DISTANCE,
                    normal: -dir,
                })
            }
            _ => {
                let (point, normal) = object.shape.sample_point(rng)?;
                Some(LightSample {
                    object: id,
                    point,
                    normal,
                })
            }
        }
    }

    /// Solid-angle density of light sampling producing direction `dir`
    /// from `origin`, where `point`/`normal` locate the sampled point on
    /// the emitter.
    ///
    /// Includes the emitter's power share, so this is the density of the
    /// whole light-sampling technique, comparable against a BRDF pdf.
    pub fn light_pdf(
        &self,
        id: ObjectId,
        origin: Vec3,
        point: Vec3,
        normal: Vec3,
        dir: Vec3,
    ) -> f32 {
        let object = &self.objects[id.0];
        if object.power <= 0.0 || self.total_power <= 0.0 {
            return 0.0;
        }
        let share = object.power / self.total_power;

        match &object.material {
            Material::Sky(map) => map.pdf(dir) * share,
            _ => {
                let cos_light = normal.dot(-dir);
                if cos_light <= 0.0 {
                    return 0.0;
                }
                let dist_sq = (point - origin).length_squared();
                // Area pdf 1/area, converted to solid angle.
                share / object.shape.area() * dist_sq / cos_light
            }
        }
    }

    /// Radiance the emitter sends along `-dir` toward the receiver.
    ///
    /// The environment uses the nearest texel so the radiance matches
    /// the texel its sampling distribution selected.
    pub fn light_emission(&self, id: ObjectId, dir: Vec3) -> Vec3 {
        match &self.objects[id.0].material {
            Material::Sky(map) => map.radiance(dir),
            material => material.emitted(dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn diffuse() -> Material {
        Material::surface(Vec3::splat(0.5), Vec3::ZERO, 1.0)
    }

    #[test]
    fn test_first_intersect_picks_nearest() {
        let mut scene = Scene::new();
        let far = scene.add_object(Shape::sphere(Vec3::new(0.0, 0.0, -5.0), 1.0), diffuse());
        let near = scene.add_object(Shape::sphere(Vec3::new(0.0, 0.0, -2.0), 0.5), diffuse());

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hit = scene.first_intersect(&ray, None).unwrap();
        assert_eq!(hit.object, near);
        assert!((hit.t - 1.5).abs() < 1e-5);

        // Skipping the near sphere exposes the far one.
        let hit = scene.first_intersect(&ray, Some(near)).unwrap();
        assert_eq!(hit.object, far);
    }

    #[test]
    fn test_environment_is_fallback() {
        let mut scene = Scene::new();
        let image = crate::hdr::HdrImage::from_pixels(8, 4, vec![Vec3::ONE; 32]);
        let env = scene.add_environment(Arc::new(EnvMap::from_image(&image)));
        let sphere = scene.add_object(Shape::sphere(Vec3::new(0.0, 0.0, -2.0), 0.5), diffuse());

        let toward = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert_eq!(scene.first_intersect(&toward, None).unwrap().object, sphere);

        let away = Ray::new(Vec3::ZERO, Vec3::Y);
        let hit = scene.first_intersect(&away, None).unwrap();
        assert_eq!(hit.object, env);
        assert_eq!(hit.t, f32::INFINITY);
    }

    #[test]
    fn test_miss_with_no_environment() {
        let mut scene = Scene::new();
        scene.add_object(Shape::sphere(Vec3::new(0.0, 0.0, -2.0), 0.5), diffuse());
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        assert!(scene.first_intersect(&ray, None).is_none());
    }

    #[test]
    fn test_emitter_power() {
        let mut scene = Scene::new();
        let id = scene.add_object(
            Shape::sphere(Vec3::ZERO, 1.0),
            Material::light(Vec3::splat(2.0)),
        );
        // pi * area * average(Le) = pi * 4pi * 2.
        let expected = std::f32::consts::PI * 4.0 * std::f32::consts::PI * 2.0;
        assert!((scene.object(id).power - expected).abs() < 1e-2);
        assert!((scene.total_power() - expected).abs() < 1e-2);
    }

    #[test]
    fn test_light_selection_is_power_proportional() {
        // Powers 1 and 3: the second light should win ~75% of the time.
        let mut scene = Scene::new();
        let radius = 1.0;
        let area = 4.0 * std::f32::consts::PI * radius * radius;
        let le_for = |power: f32| power / (std::f32::consts::PI * area);

        let a = scene.add_object(
            Shape::sphere(Vec3::new(-5.0, 0.0, 0.0), radius),
            Material::light(Vec3::splat(le_for(1.0))),
        );
        let b = scene.add_object(
            Shape::sphere(Vec3::new(5.0, 0.0, 0.0), radius),
            Material::light(Vec3::splat(le_for(3.0))),
        );
        assert!((scene.total_power() - 4.0).abs() < 1e-4);

        let mut rng = SmallRng::seed_from_u64(123);
        let trials = 10_000;
        let mut picked_b = 0;
        for _ in 0..trials {
            let sample = scene.sample_light_source(&mut rng).unwrap();
            if sample.object == b {
                picked_b += 1;
            } else {
                assert_eq!(sample.object, a);
            }
        }
        let fraction = picked_b as f32 / trials as f32;
        assert!((fraction - 0.75).abs() < 0.02, "fraction {fraction}");
    }

    #[test]
    fn test_zero_power_scene_errors() {
        let mut scene = Scene::new();
        scene.add_object(Shape::sphere(Vec3::ZERO, 1.0), diffuse());
        let mut rng = SmallRng::seed_from_u64(0);
        assert_eq!(
            scene.sample_light_source(&mut rng),
            Err(LightSampleError::NoLightSource)
        );
    }

    #[test]
    fn test_light_pdf_solid_angle_conversion() {
        let mut scene = Scene::new();
        let id = scene.add_object(
            Shape::sphere(Vec3::new(0.0, 5.0, 0.0), 1.0),
            Material::light(Vec3::ONE),
        );

        // Sampled point on the underside of the sphere, facing the origin.
        let point = Vec3::new(0.0, 4.0, 0.0);
        let normal = Vec3::NEG_Y;
        let origin = Vec3::ZERO;
        let dir = (point - origin).normalize();

        let area = scene.object(id).shape.area();
        let expected = 1.0 / area * 16.0 / 1.0; // share = 1, dist^2 = 16, cos = 1
        let pdf = scene.light_pdf(id, origin, point, normal, dir);
        assert!((pdf - expected).abs() < 1e-4, "pdf {pdf} vs {expected}");

        // Back-facing sample point contributes nothing.
        assert_eq!(scene.light_pdf(id, origin, point, Vec3::Y, dir), 0.0);
    }

    #[test]
    fn test_light_sample_points_lie_on_emitter() {
        let mut scene = Scene::new();
        let center = Vec3::new(2.0, 3.0, 4.0);
        scene.add_object(Shape::sphere(center, 0.5), Material::light(Vec3::ONE));
        let mut rng = SmallRng::seed_from_u64(77);
        for _ in 0..200 {
            let sample = scene.sample_light_source(&mut rng).unwrap();
            assert!(((sample.point - center).length() - 0.5).abs() < 1e-4);
            assert!((sample.normal.length() - 1.0).abs() < 1e-4);
        }
    }
}
