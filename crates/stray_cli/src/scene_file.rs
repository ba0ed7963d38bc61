//! JSON scene descriptions.
//!
//! A small declarative vocabulary mirroring the presets: a camera, a
//! list of shapes with materials, and an optional environment panorama.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use stray_core::{hdr, EnvMap, Material, Scene, Shape};
use stray_math::Vec3;
use stray_renderer::Camera;

#[derive(Debug, Deserialize)]
pub struct SceneFile {
    pub camera: CameraDesc,
    pub objects: Vec<ObjectDesc>,
    /// Path to a Radiance .hdr panorama, relative to the scene file.
    #[serde(default)]
    pub environment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CameraDesc {
    pub look_from: [f32; 3],
    pub look_at: [f32; 3],
    #[serde(default = "default_vup")]
    pub vup: [f32; 3],
    #[serde(default = "default_vfov")]
    pub vfov: f32,
}

fn default_vup() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

fn default_vfov() -> f32 {
    60.0
}

#[derive(Debug, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ObjectDesc {
    Sphere {
        center: [f32; 3],
        radius: f32,
        material: MaterialDesc,
    },
    Rect {
        corner: [f32; 3],
        edge_u: [f32; 3],
        edge_v: [f32; 3],
        material: MaterialDesc,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialDesc {
    Surface {
        diffuse: [f32; 3],
        #[serde(default)]
        specular: [f32; 3],
        #[serde(default = "default_shininess")]
        shininess: f32,
    },
    Light {
        radiance: [f32; 3],
    },
}

fn default_shininess() -> f32 {
    1.0
}

impl MaterialDesc {
    fn build(&self) -> Material {
        match self {
            Self::Surface {
                diffuse,
                specular,
                shininess,
            } => Material::surface(Vec3::from(*diffuse), Vec3::from(*specular), *shininess),
            Self::Light { radiance } => Material::light(Vec3::from(*radiance)),
        }
    }
}

/// Load a scene description and build the scene and camera it declares.
pub fn load<P: AsRef<Path>>(path: P) -> Result<(Scene, Camera)> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading scene file {}", path.display()))?;
    let desc: SceneFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing scene file {}", path.display()))?;
    build(&desc, path.parent().unwrap_or_else(|| Path::new(".")))
}

fn build(desc: &SceneFile, base_dir: &Path) -> Result<(Scene, Camera)> {
    let mut scene = Scene::new();

    if let Some(env_path) = &desc.environment {
        let full = base_dir.join(env_path);
        let image = hdr::load_hdr(&full)
            .with_context(|| format!("loading environment map {}", full.display()))?;
        scene.add_environment(Arc::new(EnvMap::from_image(&image)));
    }

    for object in &desc.objects {
        match object {
            ObjectDesc::Sphere {
                center,
                radius,
                material,
            } => {
                scene.add_object(
                    Shape::sphere(Vec3::from(*center), *radius),
                    material.build(),
                );
            }
            ObjectDesc::Rect {
                corner,
                edge_u,
                edge_v,
                material,
            } => {
                scene.add_object(
                    Shape::rect(
                        Vec3::from(*corner),
                        Vec3::from(*edge_u),
                        Vec3::from(*edge_v),
                    ),
                    material.build(),
                );
            }
        }
    }

    let camera = Camera::new()
        .with_position(
            Vec3::from(desc.camera.look_from),
            Vec3::from(desc.camera.look_at),
            Vec3::from(desc.camera.vup),
        )
        .with_vertical_fov(desc.camera.vfov);
    Ok((scene, camera))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_build() {
        let json = r#"{
            "camera": { "look_from": [0, 1, 5], "look_at": [0, 0, 0], "vfov": 45 },
            "objects": [
                { "shape": "sphere", "center": [0, 1, 0], "radius": 0.5,
                  "material": { "type": "light", "radiance": [4, 4, 4] } },
                { "shape": "rect", "corner": [-5, 0, -5],
                  "edge_u": [10, 0, 0], "edge_v": [0, 0, 10],
                  "material": { "type": "surface", "diffuse": [0.5, 0.5, 0.5] } }
            ]
        }"#;
        let desc: SceneFile = serde_json::from_str(json).unwrap();
        let (scene, _camera) = build(&desc, Path::new(".")).unwrap();
        assert_eq!(scene.objects().len(), 2);
        assert!(scene.total_power() > 0.0);
    }

    #[test]
    fn test_defaults_applied() {
        let json = r#"{
            "camera": { "look_from": [0, 0, 1], "look_at": [0, 0, 0] },
            "objects": []
        }"#;
        let desc: SceneFile = serde_json::from_str(json).unwrap();
        assert_eq!(desc.camera.vfov, 60.0);
        assert_eq!(desc.camera.vup, [0.0, 1.0, 0.0]);
        assert!(desc.environment.is_none());
    }

    #[test]
    fn test_unknown_shape_rejected() {
        let json = r#"{
            "camera": { "look_from": [0, 0, 1], "look_at": [0, 0, 0] },
            "objects": [ { "shape": "torus", "material": { "type": "light", "radiance": [1,1,1] } } ]
        }"#;
        assert!(serde_json::from_str::<SceneFile>(json).is_err());
    }
}
