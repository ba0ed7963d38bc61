use std::f32::consts::PI;

use crate::Vec3;

/// Map a unit direction to spherical angles (theta, phi).
///
/// Theta is measured from +Y in [0, pi]; phi winds around Y from +X toward
/// +Z in [0, 2*pi). This is the mapping used by equirectangular panoramas.
pub fn direction_to_spherical(dir: Vec3) -> (f32, f32) {
    let theta = dir.y.clamp(-1.0, 1.0).acos();
    let mut phi = dir.z.atan2(dir.x);
    if phi < 0.0 {
        phi += 2.0 * PI;
    }
    (theta, phi)
}

/// Inverse of [`direction_to_spherical`]; returns a unit direction.
pub fn spherical_to_direction(theta: f32, phi: f32) -> Vec3 {
    let sin_theta = theta.sin();
    Vec3::new(sin_theta * phi.cos(), theta.cos(), sin_theta * phi.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axes_map_to_expected_angles() {
        let (theta, _) = direction_to_spherical(Vec3::Y);
        assert!(theta.abs() < 1e-6);

        let (theta, phi) = direction_to_spherical(Vec3::X);
        assert!((theta - PI / 2.0).abs() < 1e-6);
        assert!(phi.abs() < 1e-6);

        let (theta, phi) = direction_to_spherical(Vec3::Z);
        assert!((theta - PI / 2.0).abs() < 1e-6);
        assert!((phi - PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_spherical_round_trip() {
        let dirs = [
            Vec3::new(0.0, 0.6, 0.8),
            Vec3::new(-0.48, 0.64, -0.6).normalize(),
            Vec3::NEG_X,
            Vec3::new(0.2, -0.9, 0.1).normalize(),
        ];
        for dir in dirs {
            let (theta, phi) = direction_to_spherical(dir);
            let back = spherical_to_direction(theta, phi);
            assert!((back - dir).length() < 1e-5, "{dir:?} -> {back:?}");
        }
    }

    #[test]
    fn test_phi_range() {
        // -Z should land in the upper half of the phi range, not negative.
        let (_, phi) = direction_to_spherical(Vec3::NEG_Z);
        assert!((phi - 3.0 * PI / 2.0).abs() < 1e-5);
    }
}
