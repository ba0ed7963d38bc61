//! Built-in scenes.

use std::f32::consts::PI;
use std::sync::Arc;

use stray_core::hdr::HdrImage;
use stray_core::{EnvMap, Material, Scene, Shape};
use stray_math::Vec3;
use stray_renderer::Camera;

/// Scene preset selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenePreset {
    /// Closed box with two spheres under a rectangular ceiling light.
    Cornell,
    /// Emissive spheres over a diffuse ground plane.
    Spheres,
    /// A glossy sphere lit by an environment map.
    Environment,
}

/// Build a preset scene with its camera placement.
///
/// `env` replaces the procedural sky in the `Environment` preset; the
/// other presets ignore it.
pub fn build(preset: ScenePreset, env: Option<Arc<EnvMap>>) -> (Scene, Camera) {
    match preset {
        ScenePreset::Cornell => cornell(),
        ScenePreset::Spheres => spheres(),
        ScenePreset::Environment => {
            let map = env.unwrap_or_else(|| Arc::new(EnvMap::from_image(&procedural_sky(256, 128))));
            environment(map)
        }
    }
}

fn cornell() -> (Scene, Camera) {
    let mut scene = Scene::new();
    let white = Material::surface(Vec3::splat(0.73), Vec3::ZERO, 1.0);
    let red = Material::surface(Vec3::new(0.65, 0.05, 0.05), Vec3::ZERO, 1.0);
    let green = Material::surface(Vec3::new(0.12, 0.45, 0.15), Vec3::ZERO, 1.0);

    // Box interior, 2 units on a side, centered on the origin.
    let s = 1.0;
    // Floor, ceiling, back wall.
    scene.add_object(
        Shape::rect(Vec3::new(-s, -s, -s), Vec3::X * 2.0 * s, Vec3::Z * 2.0 * s),
        white.clone(),
    );
    scene.add_object(
        Shape::rect(Vec3::new(-s, s, -s), Vec3::X * 2.0 * s, Vec3::Z * 2.0 * s),
        white.clone(),
    );
    scene.add_object(
        Shape::rect(Vec3::new(-s, -s, -s), Vec3::X * 2.0 * s, Vec3::Y * 2.0 * s),
        white.clone(),
    );
    // Side walls.
    scene.add_object(
        Shape::rect(Vec3::new(-s, -s, -s), Vec3::Y * 2.0 * s, Vec3::Z * 2.0 * s),
        red,
    );
    scene.add_object(
        Shape::rect(Vec3::new(s, -s, -s), Vec3::Y * 2.0 * s, Vec3::Z * 2.0 * s),
        green,
    );
    // Ceiling light.
    scene.add_object(
        Shape::rect(
            Vec3::new(-0.3, s - 1e-3, -0.3),
            Vec3::X * 0.6,
            Vec3::Z * 0.6,
        ),
        Material::light(Vec3::splat(12.0)),
    );
    // A diffuse and a glossy sphere.
    scene.add_object(
        Shape::sphere(Vec3::new(-0.4, -0.7, -0.3), 0.3),
        Material::surface(Vec3::splat(0.6), Vec3::ZERO, 1.0),
    );
    scene.add_object(
        Shape::sphere(Vec3::new(0.45, -0.65, 0.2), 0.35),
        Material::surface(Vec3::splat(0.25), Vec3::splat(0.6), 60.0),
    );

    let camera = Camera::new()
        .with_position(Vec3::new(0.0, 0.0, 3.2), Vec3::ZERO, Vec3::Y)
        .with_vertical_fov(40.0);
    (scene, camera)
}

fn spheres() -> (Scene, Camera) {
    let mut scene = Scene::new();
    scene.add_object(
        Shape::rect(
            Vec3::new(-20.0, 0.0, -20.0),
            Vec3::X * 40.0,
            Vec3::Z * 40.0,
        ),
        Material::surface(Vec3::splat(0.5), Vec3::ZERO, 1.0),
    );
    scene.add_object(
        Shape::sphere(Vec3::new(-1.5, 1.0, 0.0), 0.5),
        Material::light(Vec3::new(6.0, 2.0, 1.0)),
    );
    scene.add_object(
        Shape::sphere(Vec3::new(1.5, 1.5, -1.0), 0.75),
        Material::light(Vec3::new(1.0, 2.5, 6.0)),
    );
    scene.add_object(
        Shape::sphere(Vec3::new(0.0, 0.8, 1.0), 0.8),
        Material::surface(Vec3::splat(0.3), Vec3::splat(0.5), 40.0),
    );

    let camera = Camera::new()
        .with_position(Vec3::new(0.0, 2.0, 6.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
        .with_vertical_fov(50.0);
    (scene, camera)
}

fn environment(map: Arc<EnvMap>) -> (Scene, Camera) {
    let mut scene = Scene::new();
    scene.add_environment(map);
    scene.add_object(
        Shape::sphere(Vec3::new(0.0, 0.0, 0.0), 1.0),
        Material::surface(Vec3::splat(0.2), Vec3::splat(0.7), 120.0),
    );
    scene.add_object(
        Shape::rect(
            Vec3::new(-4.0, -1.0, -4.0),
            Vec3::X * 8.0,
            Vec3::Z * 8.0,
        ),
        Material::surface(Vec3::splat(0.6), Vec3::ZERO, 1.0),
    );

    let camera = Camera::new()
        .with_position(Vec3::new(0.0, 1.0, 4.0), Vec3::ZERO, Vec3::Y)
        .with_vertical_fov(45.0);
    (scene, camera)
}

/// A gradient sky with a sun disc, used when no panorama is supplied.
pub fn procedural_sky(width: usize, height: usize) -> HdrImage {
    let sun_dir = Vec3::new(0.5, 0.6, 0.4).normalize();
    let horizon = Vec3::new(0.9, 0.8, 0.7);
    let zenith = Vec3::new(0.2, 0.4, 0.9);
    let ground = Vec3::splat(0.15);

    let mut image = HdrImage::new(width, height);
    for y in 0..height {
        let theta = PI * (y as f32 + 0.5) / height as f32;
        for x in 0..width {
            let phi = 2.0 * PI * (x as f32 + 0.5) / width as f32;
            let dir = stray_math::spherical_to_direction(theta, phi);

            let mut color = if dir.y >= 0.0 {
                horizon.lerp(zenith, dir.y)
            } else {
                ground
            };
            // 3-degree sun disc with a soft edge.
            let cos_sun = dir.dot(sun_dir);
            if cos_sun > 0.9986 {
                let edge = ((cos_sun - 0.9986) / 0.0014).min(1.0);
                color += Vec3::new(60.0, 55.0, 45.0) * edge;
            }
            image.set_pixel(x, y, color);
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_have_light() {
        for preset in [
            ScenePreset::Cornell,
            ScenePreset::Spheres,
            ScenePreset::Environment,
        ] {
            let (scene, _) = build(preset, None);
            assert!(scene.total_power() > 0.0, "{preset:?}");
            assert!(!scene.objects().is_empty());
        }
    }

    #[test]
    fn test_procedural_sky_has_bright_sun() {
        let sky = procedural_sky(128, 64);
        let max = sky
            .pixels
            .iter()
            .map(|p| p.max_element())
            .fold(0.0f32, f32::max);
        assert!(max > 10.0, "sun disc missing, max {max}");
    }
}
