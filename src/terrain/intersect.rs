use glam::Vec3;

use super::heightfield::HeightField;
use crate::math::EPSILON;

/// Parameter range `[t1, t2]` of the segment `origin + t * dir`, `t` in `[0, 1]`, inside the
/// unit footprint on the x/z plane.
fn clip_to_footprint(origin: Vec3, dir: Vec3) -> Option<(f32, f32)> {
    let mut t1 = 0.0f32;
    let mut t2 = 1.0f32;
    for (o, d) in [(origin.x, dir.x), (origin.z, dir.z)] {
        if d.abs() <= EPSILON {
            if !(0.0..=1.0).contains(&o) {
                return None;
            }
            continue;
        }
        let ta = -o / d;
        let tb = (1.0 - o) / d;
        t1 = t1.max(ta.min(tb));
        t2 = t2.min(ta.max(tb));
    }
    (t1 <= t2).then_some((t1, t2))
}

impl HeightField {
    /// First crossing of the segment `origin..origin + dir` with the height field, in the
    /// terrain's local space. A vertical ray is not bounded by the length of `dir`.
    ///
    /// The footprint part of the segment is walked pixel by pixel. A hit is reported at the
    /// first step where the ray passes the sampled surface, at that pixel's position and
    /// the ray's height there.
    pub fn intersect_ray(&self, origin: Vec3, dir: Vec3) -> Option<Vec3> {
        let (t1, t2) = clip_to_footprint(origin, dir)?;
        let start_x = (origin.x + t1 * dir.x).clamp(0.0, 1.0);
        let start_z = (origin.z + t1 * dir.z).clamp(0.0, 1.0);
        let end_x = (origin.x + t2 * dir.x).clamp(0.0, 1.0);
        let end_z = (origin.z + t2 * dir.z).clamp(0.0, 1.0);
        let dir = dir.try_normalize()?;

        let n = self.size() as f32;
        let pixel_scale = n + 1.0;

        let mut x = (start_x * pixel_scale) as i64;
        let mut y = (start_z * pixel_scale) as i64;
        let mut height1 = self.height_at_pixel(x, y);

        if dir.x.abs() <= EPSILON && dir.z.abs() <= EPSILON {
            let towards = (height1 < origin.y && dir.y < 0.0) || (height1 > origin.y && dir.y > 0.0);
            return towards.then_some(Vec3::new(origin.x, height1, origin.z));
        }

        // Ray height as a function of the footprint coordinate that moves the most.
        let ray_height = |px: f32, pz: f32| {
            if dir.x.abs() > dir.z.abs() {
                origin.y + dir.y * (px - origin.x) / dir.x
            } else {
                origin.y + dir.y * (pz - origin.z) / dir.z
            }
        };

        let mut dx = ((end_x - start_x) * pixel_scale) as i64;
        let mut dy = ((end_z - start_z) * pixel_scale) as i64;
        let inc_x = dx.signum();
        let inc_y = dy.signum();
        dx = dx.abs();
        dy = dy.abs();

        let (par_x, par_y, fast, slow) = if dx > dy {
            (inc_x, 0, dy, dx)
        } else {
            (0, inc_y, dx, dy)
        };
        let mut err = slow / 2;

        let mut prev_y = ray_height(start_x, start_z);
        for _ in 0..slow {
            err -= fast;
            if err < 0 {
                err += slow;
                x += inc_x;
                y += inc_y;
            } else {
                x += par_x;
                y += par_y;
            }
            let height2 = self.height_at_pixel(x, y);

            let pos_x = x as f32 / n;
            let pos_z = y as f32 / n;
            let pos_y = ray_height(pos_x, pos_z);

            let falling_through = prev_y >= pos_y && prev_y >= height1 && pos_y <= height2;
            let rising_through = prev_y <= pos_y && prev_y <= height1 && pos_y >= height2;
            if falling_through || rising_through {
                return Some(Vec3::new(pos_x, pos_y, pos_z));
            }

            height1 = height2;
            prev_y = pos_y;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plateau() -> HeightField {
        HeightField::from_fn(32, |_, _| 32768)
    }

    #[test]
    fn vertical_ray_hits_flat_ground() {
        let field = HeightField::flat(64);
        let hit = field
            .intersect_ray(Vec3::new(0.5, 10.0, 0.5), Vec3::NEG_Y)
            .unwrap();
        assert!(hit.y.abs() < 1e-4);
        assert_eq!((hit.x, hit.z), (0.5, 0.5));
    }

    #[test]
    fn vertical_ray_pointing_away_misses() {
        let field = plateau();
        assert!(field.intersect_ray(Vec3::new(0.5, 10.0, 0.5), Vec3::Y).is_none());
        let from_below = field.intersect_ray(Vec3::new(0.5, -1.0, 0.5), Vec3::Y).unwrap();
        assert!((from_below.y - 0.5).abs() < 1e-3);
    }

    #[test]
    fn slanted_ray_reports_step_position() {
        let field = plateau();
        let hit = field
            .intersect_ray(Vec3::new(0.1, 1.0, 0.5), Vec3::new(0.8, -1.0, 0.0))
            .unwrap();
        assert!((hit.x - 0.5).abs() <= 1.0 / 16.0);
        assert!((hit.y - 0.5).abs() < 0.05);
        assert_eq!(hit.z, 0.5);
    }

    #[test]
    fn rising_ray_hits_from_below() {
        let field = plateau();
        let hit = field
            .intersect_ray(Vec3::new(0.1, 0.0, 0.5), Vec3::new(0.8, 1.0, 0.0))
            .unwrap();
        assert!((hit.x - 0.5).abs() <= 1.0 / 16.0);
    }

    #[test]
    fn diagonal_ray_walks_both_axes() {
        let field = plateau();
        let hit = field
            .intersect_ray(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, -1.0, 1.0))
            .unwrap();
        assert!((hit.x - 0.5).abs() < 0.1);
        assert!((hit.z - 0.5).abs() < 0.1);
    }

    #[test]
    fn direction_length_does_not_move_the_hit() {
        let field = plateau();
        let origin = Vec3::new(0.1, 1.0, 0.5);
        let dir = Vec3::new(0.8, -1.0, 0.0);
        let unit = field.intersect_ray(origin, dir).unwrap();
        let long = field.intersect_ray(origin, dir * 10.0).unwrap();
        assert!((unit - long).length() < 1e-5);
        assert!((long.x - 0.5).abs() <= 1.0 / 16.0);
    }

    #[test]
    fn segment_ends_at_origin_plus_dir() {
        let field = plateau();
        let origin = Vec3::new(0.1, 1.0, 0.5);
        // ends at (0.2, 0.9), still above the plateau
        assert!(field
            .intersect_ray(origin, Vec3::new(0.1, -0.1, 0.0))
            .is_none());
        assert!(field
            .intersect_ray(origin, Vec3::new(1.0, -1.0, 0.0))
            .is_some());
    }

    #[test]
    fn misses() {
        let field = plateau();
        // leaves upwards
        assert!(field
            .intersect_ray(Vec3::new(0.1, 1.0, 0.5), Vec3::new(0.8, 1.0, 0.0))
            .is_none());
        // outside the footprint
        assert!(field
            .intersect_ray(Vec3::new(2.0, 10.0, 0.5), Vec3::NEG_Y)
            .is_none());
        // horizontal above the plateau
        assert!(field
            .intersect_ray(Vec3::new(-1.0, 0.8, 0.3), Vec3::X)
            .is_none());
        assert!(field.intersect_ray(Vec3::new(0.5, 1.0, 0.5), Vec3::ZERO).is_none());
    }

    #[test]
    fn clip_keeps_footprint_span() {
        let (t1, t2) = clip_to_footprint(Vec3::new(-1.0, 0.0, 0.5), Vec3::X * 4.0).unwrap();
        assert_eq!((t1, t2), (0.25, 0.5));
        let (t1, t2) = clip_to_footprint(Vec3::new(0.5, 0.0, 0.5), Vec3::X * 0.25).unwrap();
        assert_eq!((t1, t2), (0.0, 1.0));
        assert!(clip_to_footprint(Vec3::new(-1.0, 0.0, 0.5), Vec3::X * 0.5).is_none());
        assert!(clip_to_footprint(Vec3::new(-1.0, 0.0, 0.5), Vec3::NEG_X).is_none());
        assert!(clip_to_footprint(Vec3::new(0.5, 0.0, 1.5), Vec3::X).is_none());
    }
}
