/// Extents below this are treated as degenerate when splitting, and clamped
/// when computing surface areas so flat boxes never zero out a SAH cost.
pub const EXTENT_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: glam::Vec3A,
    pub max: glam::Vec3A,
}

impl Default for AABB {
    /// The empty box: growing it by any point yields that point's box
    fn default() -> Self {
        Self {
            min: glam::Vec3A::splat(f32::INFINITY),
            max: glam::Vec3A::splat(-f32::INFINITY),
        }
    }
}

impl AABB {
    /// Grow the box to contain a new point
    #[inline]
    pub fn grow(&mut self, point: glam::Vec3A) {
        self.max = self.max.max(point);
        self.min = self.min.min(point);
    }

    /// Grow the box to contain another box
    #[inline]
    pub fn grow_aabb(&mut self, other: &AABB) {
        self.max = self.max.max(other.max);
        self.min = self.min.min(other.min);
    }

    /// If the AABB is valid (min <= max)
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    #[inline]
    pub fn contains_aabb(&self, other: &AABB) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    #[inline]
    pub fn center(&self) -> glam::Vec3A {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> glam::Vec3A {
        self.max - self.min
    }

    /// Total surface area, with each extent clamped to [`EXTENT_EPSILON`]
    pub fn surface_area(&self) -> f32 {
        let e = self.extent().max(glam::Vec3A::splat(EXTENT_EPSILON));
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use glam::Vec3A;

    use rand::{thread_rng, Rng};

    use approx::*;

    #[test]
    fn default_is_grow_identity() {
        let mut rng = thread_rng();
        let point: Vec3A = rng.gen();

        let mut aabb = AABB::default();
        assert!(!aabb.is_valid());

        aabb.grow(point);
        assert!(aabb.is_valid());
        assert_relative_eq!(aabb.min, point);
        assert_relative_eq!(aabb.max, point);
    }

    #[test]
    fn grow_keeps_min_below_max() {
        let mut rng = thread_rng();
        let mut aabb = AABB::default();
        for _ in 0..64 {
            aabb.grow(rng.gen::<Vec3A>() * 20.0 - Vec3A::splat(10.0));
            assert!(aabb.is_valid());
        }
    }

    #[test]
    fn grow_aabb_contains_both() {
        let mut rng = thread_rng();
        let mut a = AABB::default();
        let mut b = AABB::default();
        for _ in 0..8 {
            a.grow(rng.gen());
            b.grow(rng.gen::<Vec3A>() + Vec3A::splat(2.0));
        }

        let mut joined = a;
        joined.grow_aabb(&b);
        assert!(joined.contains_aabb(&a));
        assert!(joined.contains_aabb(&b));
    }

    #[test]
    fn surface_area_of_unit_cube() {
        let aabb = AABB {
            min: Vec3A::ZERO,
            max: Vec3A::ONE,
        };
        assert_abs_diff_eq!(aabb.surface_area(), 6.0, epsilon = 1e-6);
    }

    #[test]
    fn surface_area_of_flat_box_is_positive() {
        // A zero-thickness box must not produce a zero area that would
        // collapse a SAH cost to zero.
        let aabb = AABB {
            min: Vec3A::ZERO,
            max: Vec3A::new(1.0, 1.0, 0.0),
        };
        assert!(aabb.surface_area() > 2.0);
    }
}
