//! Stray Core - Scene model for the stray renderer.
//!
//! This crate provides:
//!
//! - **Scene types**: `Scene`, `Object`, `Shape`, `Material`
//! - **Environment lighting**: `EnvMap` importance sampling built from an
//!   equirectangular panorama, plus `Distribution1D` underneath it
//! - **Radiance HDR I/O**: `HdrImage` with RGBE read/write
//!
//! # Example
//!
//! ```ignore
//! use stray_core::hdr::load_hdr;
//! use stray_core::{EnvMap, Material, Scene, Shape};
//!
//! // Build a scene lit by a panorama
//! let map = EnvMap::from_image(&load_hdr("sky.hdr")?);
//! let mut scene = Scene::new();
//! scene.add_environment(map);
//! scene.add_object(
//!     Shape::sphere(Vec3::ZERO, 1.0),
//!     Material::surface(Vec3::splat(0.5), Vec3::splat(0.2), 30.0),
//! );
//! ```

pub mod distribution;
pub mod envmap;
pub mod hdr;
pub mod material;
pub mod scene;
pub mod shape;

// Re-export commonly used types
pub use distribution::Distribution1D;
pub use envmap::EnvMap;
pub use hdr::HdrImage;
pub use material::Material;
pub use scene::{Hit, LightSample, LightSampleError, Object, ObjectId, Scene};
pub use shape::Shape;
