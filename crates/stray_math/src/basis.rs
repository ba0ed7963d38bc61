use std::f32::consts::PI;

use crate::Vec3;

/// Right-handed orthonormal frame around a unit normal.
///
/// Local space puts the normal on +Z, so hemisphere samplers below can be
/// fed straight into [`OrthonormalBasis::to_world`].
#[derive(Debug, Copy, Clone)]
pub struct OrthonormalBasis {
    tangent: Vec3,
    bitangent: Vec3,
    normal: Vec3,
}

impl OrthonormalBasis {
    /// Build a frame whose +Z axis is `normal`. `normal` must be unit length.
    pub fn from_normal(normal: Vec3) -> Self {
        let helper = if normal.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
        let tangent = normal.cross(helper).normalize();
        let bitangent = normal.cross(tangent);
        Self {
            tangent,
            bitangent,
            normal,
        }
    }

    /// Map a local-frame vector (normal on +Z) into world space.
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.tangent * local.x + self.bitangent * local.y + self.normal * local.z
    }
}

/// Cosine-weighted hemisphere direction in the local frame (+Z up).
///
/// Density is cos(theta) / pi over the hemisphere.
pub fn sample_cosine_hemisphere(u1: f32, u2: f32) -> Vec3 {
    let r = u1.sqrt();
    let phi = 2.0 * PI * u2;
    let z = (1.0 - u1).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Phong-lobe direction around +Z in the local frame.
///
/// Density is (shininess + 1) / (2 pi) * cos(alpha)^shininess, where alpha
/// is the angle to +Z.
pub fn sample_phong_lobe(u1: f32, u2: f32, shininess: f32) -> Vec3 {
    let cos_alpha = u1.powf(1.0 / (shininess + 1.0));
    let sin_alpha = (1.0 - cos_alpha * cos_alpha).max(0.0).sqrt();
    let phi = 2.0 * PI * u2;
    Vec3::new(sin_alpha * phi.cos(), sin_alpha * phi.sin(), cos_alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_is_orthonormal() {
        for normal in [Vec3::Y, Vec3::NEG_Z, Vec3::new(0.6, 0.48, 0.64)] {
            let basis = OrthonormalBasis::from_normal(normal);
            let t = basis.to_world(Vec3::X);
            let b = basis.to_world(Vec3::Y);
            let n = basis.to_world(Vec3::Z);

            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!((b.length() - 1.0).abs() < 1e-5);
            assert!(t.dot(b).abs() < 1e-5);
            assert!(t.dot(n).abs() < 1e-5);
            assert!(b.dot(n).abs() < 1e-5);
            assert!((n - normal).length() < 1e-5);
        }
    }

    #[test]
    fn test_cosine_sample_in_upper_hemisphere() {
        let mut u = 0.05;
        while u < 1.0 {
            let d = sample_cosine_hemisphere(u, 1.0 - u);
            assert!((d.length() - 1.0).abs() < 1e-5);
            assert!(d.z >= 0.0);
            u += 0.1;
        }
    }

    #[test]
    fn test_phong_lobe_tightens_with_shininess() {
        // Same random pair, higher exponent, direction closer to +Z.
        let wide = sample_phong_lobe(0.5, 0.25, 1.0);
        let tight = sample_phong_lobe(0.5, 0.25, 200.0);
        assert!(tight.z > wide.z);
        assert!((tight.length() - 1.0).abs() < 1e-5);
    }
}
