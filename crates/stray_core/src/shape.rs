//! Intersectable geometry.
//!
//! A closed enum of the three shape kinds the scene knows about. The
//! `Environment` variant is the infinite sphere: it intersects every
//! ray at t = +infinity, so any finite hit shadows it.

use std::f32::consts::PI;

use rand::Rng;
use stray_math::{Ray, Vec3};

/// Minimum hit distance; avoids self-reintersection after a bounce.
pub const T_MIN: f32 = 1e-4;

/// Stand-in distance for points on the environment sphere.
pub const FAR_DISTANCE: f32 = 1e8;

/// Geometry of a ray/shape intersection.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    /// Distance along the ray; `f32::INFINITY` for the environment.
    pub t: f32,
    pub position: Vec3,
    /// Unit normal, flipped to face the incoming ray.
    pub normal: Vec3,
}

/// Scene geometry, dispatched by pattern match.
#[derive(Debug, Clone)]
pub enum Shape {
    Sphere { center: Vec3, radius: f32 },
    Rect { corner: Vec3, edge_u: Vec3, edge_v: Vec3 },
    /// The infinite environment sphere; always hit, at infinite distance.
    Environment,
}

impl Shape {
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::Sphere { center, radius }
    }

    /// Parallelogram spanned by two edges from a corner.
    pub fn rect(corner: Vec3, edge_u: Vec3, edge_v: Vec3) -> Self {
        Self::Rect {
            corner,
            edge_u,
            edge_v,
        }
    }

    /// Intersect with a ray; hits closer than [`T_MIN`] are rejected.
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        match self {
            Self::Sphere { center, radius } => {
                let oc = *center - ray.origin;
                let h = ray.direction.dot(oc);
                let c = oc.length_squared() - radius * radius;
                let discriminant = h * h - c;
                if discriminant < 0.0 {
                    return None;
                }

                let sqrtd = discriminant.sqrt();
                let mut t = h - sqrtd;
                if t <= T_MIN {
                    t = h + sqrtd;
                    if t <= T_MIN {
                        return None;
                    }
                }

                let position = ray.at(t);
                let normal = (position - *center) / *radius;
                Some(face_forward(ray, t, position, normal))
            }
            Self::Rect {
                corner,
                edge_u,
                edge_v,
            } => {
                let normal = edge_u.cross(*edge_v);
                let denom = ray.direction.dot(normal);
                if denom.abs() < 1e-8 {
                    return None;
                }

                let t = (*corner - ray.origin).dot(normal) / denom;
                if t <= T_MIN {
                    return None;
                }

                // Express the hit in edge coordinates and require both
                // parameters to land inside [0, 1].
                let local = ray.at(t) - *corner;
                let uu = edge_u.length_squared();
                let vv = edge_v.length_squared();
                let uv = edge_u.dot(*edge_v);
                let lu = local.dot(*edge_u);
                let lv = local.dot(*edge_v);
                let det = uu * vv - uv * uv;
                if det.abs() < 1e-12 {
                    return None;
                }
                let a = (lu * vv - lv * uv) / det;
                let b = (lv * uu - lu * uv) / det;
                if !(0.0..=1.0).contains(&a) || !(0.0..=1.0).contains(&b) {
                    return None;
                }

                let position = ray.at(t);
                Some(face_forward(ray, t, position, normal.normalize()))
            }
            Self::Environment => {
                // Always hit, beyond every finite object.
                let position = ray.at(FAR_DISTANCE);
                Some(Intersection {
                    t: f32::INFINITY,
                    position,
                    normal: -ray.direction,
                })
            }
        }
    }

    /// Surface area; infinite for the environment sphere.
    pub fn area(&self) -> f32 {
        match self {
            Self::Sphere { radius, .. } => 4.0 * PI * radius * radius,
            Self::Rect { edge_u, edge_v, .. } => edge_u.cross(*edge_v).length(),
            Self::Environment => f32::INFINITY,
        }
    }

    /// Uniformly sample a point on the surface with its outward normal.
    ///
    /// `None` for the environment, which is sampled through its
    /// [`crate::EnvMap`] distribution instead.
    pub fn sample_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(Vec3, Vec3)> {
        match self {
            Self::Sphere { center, radius } => {
                let z = 1.0 - 2.0 * rng.gen::<f32>();
                let phi = 2.0 * PI * rng.gen::<f32>();
                let r = (1.0f32 - z * z).max(0.0).sqrt();
                let normal = Vec3::new(r * phi.cos(), z, r * phi.sin());
                Some((*center + normal * *radius, normal))
            }
            Self::Rect {
                corner,
                edge_u,
                edge_v,
            } => {
                let point = *corner + *edge_u * rng.gen::<f32>() + *edge_v * rng.gen::<f32>();
                Some((point, edge_u.cross(*edge_v).normalize()))
            }
            Self::Environment => None,
        }
    }
}

/// Flip the normal to face the incoming ray.
fn face_forward(ray: &Ray, t: f32, position: Vec3, normal: Vec3) -> Intersection {
    let normal = if ray.direction.dot(normal) > 0.0 {
        -normal
    } else {
        normal
    };
    Intersection {
        t,
        position,
        normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_sphere_hit_distance() {
        let sphere = Shape::sphere(Vec3::new(0.0, 0.0, -2.0), 0.5);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hit = sphere.intersect(&ray).unwrap();
        assert!((hit.t - 1.5).abs() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Shape::sphere(Vec3::new(0.0, 0.0, -2.0), 0.5);
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        assert!(sphere.intersect(&ray).is_none());
    }

    #[test]
    fn test_sphere_hit_from_inside() {
        let sphere = Shape::sphere(Vec3::ZERO, 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let hit = sphere.intersect(&ray).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-5);
        // Normal faces back toward the origin.
        assert!((hit.normal - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_sphere_behind_ray() {
        let sphere = Shape::sphere(Vec3::new(0.0, 0.0, 2.0), 0.5);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(sphere.intersect(&ray).is_none());
    }

    #[test]
    fn test_rect_hit_and_edges() {
        let rect = Shape::rect(Vec3::new(-1.0, -1.0, -3.0), Vec3::X * 2.0, Vec3::Y * 2.0);

        let hit = rect
            .intersect(&Ray::new(Vec3::ZERO, Vec3::NEG_Z))
            .unwrap();
        assert!((hit.t - 3.0).abs() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-5);

        // Just outside the edge parameterization.
        let miss = Ray::new(Vec3::new(1.5, 0.0, 0.0), Vec3::NEG_Z);
        assert!(rect.intersect(&miss).is_none());

        // Parallel to the plane.
        let parallel = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(rect.intersect(&parallel).is_none());
    }

    #[test]
    fn test_environment_always_hits() {
        let env = Shape::Environment;
        for dir in [Vec3::X, Vec3::NEG_Y, Vec3::new(0.3, -0.5, 0.8).normalize()] {
            let hit = env.intersect(&Ray::new(Vec3::splat(10.0), dir)).unwrap();
            assert_eq!(hit.t, f32::INFINITY);
            assert!((hit.normal + dir).length() < 1e-5);
        }
    }

    #[test]
    fn test_areas() {
        let sphere = Shape::sphere(Vec3::ZERO, 2.0);
        assert!((sphere.area() - 16.0 * PI).abs() < 1e-3);

        let rect = Shape::rect(Vec3::ZERO, Vec3::X * 3.0, Vec3::Z * 2.0);
        assert!((rect.area() - 6.0).abs() < 1e-5);

        assert_eq!(Shape::Environment.area(), f32::INFINITY);
    }

    #[test]
    fn test_sphere_sample_point_on_surface() {
        let sphere = Shape::sphere(Vec3::new(1.0, 2.0, 3.0), 0.75);
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..100 {
            let (point, normal) = sphere.sample_point(&mut rng).unwrap();
            assert!(((point - Vec3::new(1.0, 2.0, 3.0)).length() - 0.75).abs() < 1e-4);
            assert!((normal.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_rect_sample_point_in_bounds() {
        let rect = Shape::rect(Vec3::ZERO, Vec3::X * 2.0, Vec3::Z * 3.0);
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..100 {
            let (point, normal) = rect.sample_point(&mut rng).unwrap();
            assert!((0.0..=2.0).contains(&point.x));
            assert!((0.0..=3.0).contains(&point.z));
            assert_eq!(point.y, 0.0);
            assert!((normal - Vec3::NEG_Y).length() < 1e-5 || (normal - Vec3::Y).length() < 1e-5);
        }
    }
}
