use crate::Vec3;

/// Mean of the three channels.
#[inline]
pub fn average(v: Vec3) -> f32 {
    (v.x + v.y + v.z) / 3.0
}

/// Rec. 709 luma of a linear RGB color.
#[inline]
pub fn luminance(v: Vec3) -> f32 {
    v.x * 0.2126 + v.y * 0.7152 + v.z * 0.0722
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average() {
        assert_eq!(average(Vec3::new(1.0, 2.0, 3.0)), 2.0);
        assert_eq!(average(Vec3::ZERO), 0.0);
    }

    #[test]
    fn test_luminance_weights_sum_to_one() {
        assert!((luminance(Vec3::ONE) - 1.0).abs() < 1e-6);
        // Green dominates.
        assert!(luminance(Vec3::Y) > luminance(Vec3::X));
        assert!(luminance(Vec3::X) > luminance(Vec3::Z));
    }
}
