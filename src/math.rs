use glam::{Mat4, Vec3, Vec4};

/// Tolerance used for near-zero direction components.
pub const EPSILON: f32 = 0.000001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::unit()
    }
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The `[0,1]^3` cube every terrain lives in before its node transform.
    pub fn unit() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ONE,
        }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Box enclosing all eight transformed corners.
    pub fn transform(&self, m: &Mat4) -> Aabb {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for corner in self.corners() {
            let p = m.transform_point3(corner);
            min = min.min(p);
            max = max.max(p);
        }
        Aabb { min, max }
    }

    /// Distance from `pos` to the closest point of the box, zero when inside.
    pub fn nearest_distance(&self, pos: Vec3) -> f32 {
        let center = (self.min + self.max) * 0.5;
        let extent = (self.max - self.min) * 0.5;
        ((pos - center).abs() - extent).max(Vec3::ZERO).length()
    }

    /// Slab test for the half-line `origin + t * dir`, `t >= 0`.
    pub fn intersects_ray(&self, origin: Vec3, dir: Vec3) -> bool {
        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d.abs() <= EPSILON {
                if o < lo || o > hi {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

/// Plane in `normal . p + dist = 0` form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub dist: f32,
}

impl Plane {
    /// Plane through three points, normal following `(b - a) x (c - a)`.
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        Self {
            normal,
            dist: -normal.dot(a),
        }
    }

    fn from_vec4(v: Vec4) -> Self {
        let normal = v.truncate();
        let len = normal.length();
        if len <= EPSILON {
            return Self {
                normal: Vec3::ZERO,
                dist: v.w,
            };
        }
        Self {
            normal: normal / len,
            dist: v.w / len,
        }
    }

    /// Signed distance; positive on the side the normal points to.
    pub fn distance_to_point(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.dist
    }
}

/// Six inward facing clip planes (left, right, bottom, top, near, far).
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the planes of an OpenGL style (`-1..1` depth) view-projection matrix.
    pub fn from_view_proj(view_proj: &Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);
        Self {
            planes: [
                Plane::from_vec4(r3 + r0),
                Plane::from_vec4(r3 - r0),
                Plane::from_vec4(r3 + r1),
                Plane::from_vec4(r3 - r1),
                Plane::from_vec4(r3 + r2),
                Plane::from_vec4(r3 - r2),
            ],
        }
    }

    /// `true` when the box lies completely outside one of the planes.
    pub fn cull_box(&self, b: &Aabb) -> bool {
        self.planes.iter().any(|plane| {
            let positive = Vec3::select(plane.normal.cmpge(Vec3::ZERO), b.max, b.min);
            plane.distance_to_point(positive) < 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_distance_is_zero_inside() {
        let b = Aabb::unit();
        assert_eq!(b.nearest_distance(Vec3::splat(0.5)), 0.0);
        assert!((b.nearest_distance(Vec3::new(3.0, 0.5, 0.5)) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn transform_covers_rotated_box() {
        let m = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let b = Aabb::unit().transform(&m);
        assert!((b.min.z + 1.0).abs() < 1e-5);
        assert!(b.max.x > 0.99);
    }

    #[test]
    fn ray_slab_test() {
        let b = Aabb::unit();
        assert!(b.intersects_ray(Vec3::new(0.5, 10.0, 0.5), Vec3::NEG_Y));
        assert!(!b.intersects_ray(Vec3::new(0.5, 10.0, 0.5), Vec3::Y));
        assert!(!b.intersects_ray(Vec3::new(2.0, 10.0, 0.5), Vec3::NEG_Y));
    }

    #[test]
    fn frustum_culls_box_behind_camera() {
        let proj = Mat4::perspective_rh_gl(1.0, 1.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::new(0.5, 0.5, 5.0), Vec3::new(0.5, 0.5, 0.0), Vec3::Y);
        let frustum = Frustum::from_view_proj(&(proj * view));
        assert!(!frustum.cull_box(&Aabb::unit()));
        let behind = Aabb::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(1.0, 1.0, 11.0));
        assert!(frustum.cull_box(&behind));
    }
}
