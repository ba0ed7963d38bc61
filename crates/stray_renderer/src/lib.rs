//! Stray Renderer - Monte Carlo estimators and render drivers.
//!
//! This crate provides:
//!
//! - **Camera**: pinhole look-at ray generation
//! - **Film**: per-pixel running mean across iterations
//! - **Integrators**: single-bounce direct lighting with multiple
//!   importance sampling, and a multi-bounce path tracer
//! - **Drivers**: a per-iteration render pass, parallel over pixel rows

pub mod camera;
pub mod film;
pub mod integrator;
pub mod render;
pub mod tonemap;

pub use camera::Camera;
pub use film::Film;
pub use integrator::{estimate_radiance, path_trace, trace, RenderConfig, RenderMode};
pub use render::render_iteration;
pub use tonemap::Tonemap;
