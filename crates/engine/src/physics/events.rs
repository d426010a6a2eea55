use glam::Vec2;

/// A collision transition between two tagged bodies.
///
/// Sensor intersections are reported through the same channel as solid
/// contacts; `started` is `true` when the pair began touching and `false`
/// when it separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    pub a: u64,
    pub b: u64,
    pub started: bool,
}

impl CollisionPair {
    /// When one side of the pair carries `tag`, returns the other side.
    pub fn other(&self, tag: u64) -> Option<u64> {
        if self.a == tag {
            Some(self.b)
        } else if self.b == tag {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Axis-aligned bounding region in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_returns_opposite_side() {
        let pair = CollisionPair {
            a: 3,
            b: 9,
            started: true,
        };
        assert_eq!(pair.other(3), Some(9));
        assert_eq!(pair.other(9), Some(3));
        assert_eq!(pair.other(7), None);
    }

    #[test]
    fn bounds_overlap_is_inclusive_at_edges() {
        let a = Bounds::new(Vec2::ZERO, Vec2::new(10.0, 10.0));
        let touching = Bounds::new(Vec2::new(10.0, 0.0), Vec2::new(20.0, 10.0));
        let separate = Bounds::new(Vec2::new(10.1, 0.0), Vec2::new(20.0, 10.0));
        assert!(a.overlaps(&touching));
        assert!(!a.overlaps(&separate));
    }

    #[test]
    fn bounds_fully_inside_overlap() {
        let outer = Bounds::new(Vec2::ZERO, Vec2::new(100.0, 100.0));
        let inner = Bounds::new(Vec2::new(40.0, 40.0), Vec2::new(60.0, 60.0));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn center_and_size_derive_from_corners() {
        let bounds = Bounds::new(Vec2::new(-2.0, 0.0), Vec2::new(6.0, 8.0));
        assert_eq!(bounds.center(), Vec2::new(2.0, 4.0));
        assert_eq!(bounds.size(), Vec2::new(8.0, 8.0));
    }
}
