// Re-export glam for convenience
pub use glam::*;

// Stray math types
mod basis;
mod color;
mod ray;
mod spherical;

pub use basis::{sample_cosine_hemisphere, sample_phong_lobe, OrthonormalBasis};
pub use color::{average, luminance};
pub use ray::Ray;
pub use spherical::{direction_to_spherical, spherical_to_direction};
