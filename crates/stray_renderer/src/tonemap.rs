//! HDR to LDR tone mapping operators.

use stray_math::Vec3;

/// Tone mapping operator applied before gamma encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tonemap {
    /// Clamp to [0, 1] with no curve.
    #[default]
    Clamp,
    /// Reinhard global operator: x / (1 + x).
    Reinhard,
    /// ACES filmic approximation (Narkowicz fit).
    Aces,
}

impl Tonemap {
    /// Map linear HDR radiance to the [0, 1] range.
    pub fn apply(self, color: Vec3) -> Vec3 {
        match self {
            Self::Clamp => color.clamp(Vec3::ZERO, Vec3::ONE),
            Self::Reinhard => color / (color + Vec3::ONE),
            Self::Aces => {
                let x = color;
                let mapped = (x * (2.51 * x + Vec3::splat(0.03)))
                    / (x * (2.43 * x + Vec3::splat(0.59)) + Vec3::splat(0.14));
                mapped.clamp(Vec3::ZERO, Vec3::ONE)
            }
        }
    }
}
