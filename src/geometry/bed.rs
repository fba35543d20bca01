//! Bed tilt model.
//!
//! The bed is modelled as four planes meeting at the bed center, each spanned
//! by the center and two adjacent calibration corners. The center is the Z0
//! reference, so its height is always zero.

use super::plane::Plane;
use super::vector::Vector3;
use crate::config::BedConfig;

/// Margin by which calibration triangles are grown before containment tests.
const TRIANGLE_MARGIN: f32 = 0.01;

/// Calibration corner of the bed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Corner {
    /// Largest X, largest Y.
    BackRight,
    /// Smallest X, largest Y.
    BackLeft,
    /// Smallest X, smallest Y.
    FrontLeft,
    /// Largest X, smallest Y.
    FrontRight,
}

impl Corner {
    /// All corners in storage order.
    pub const ALL: [Corner; 4] = [
        Corner::BackRight,
        Corner::BackLeft,
        Corner::FrontLeft,
        Corner::FrontRight,
    ];

    const fn index(self) -> usize {
        match self {
            Corner::BackRight => 0,
            Corner::BackLeft => 1,
            Corner::FrontLeft => 2,
            Corner::FrontRight => 3,
        }
    }
}

/// Side of the bed, naming one of the four planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Side {
    /// Front-left, front-right, center.
    Front,
    /// Back-left, back-right, center.
    Back,
    /// Back-left, front-left, center.
    Left,
    /// Back-right, front-right, center.
    Right,
}

/// Plane selection for a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Region {
    /// Single plane.
    Plane(Side),
    /// Outer corner zone, averaging two adjacent planes.
    Blend(Side, Side),
}

/// Calibrated bed surface.
#[derive(Debug, Clone)]
pub struct BedGeometry {
    corners: [Vector3; 4],
    center: Vector3,
    front: Plane,
    back: Plane,
    left: Plane,
    right: Plane,
}

impl BedGeometry {
    /// Flat bed with corners placed around the configured center.
    pub fn new(config: &BedConfig) -> Self {
        let (cx, cy) = (config.center_x.value(), config.center_y.value());
        let distance = config.calibration_distance.value();

        let mut corners = [Vector3::default(); 4];
        corners[Corner::BackRight.index()] = Vector3::new(cx + distance, cy + distance, 0.0);
        corners[Corner::BackLeft.index()] = Vector3::new(cx - distance, cy + distance, 0.0);
        corners[Corner::FrontLeft.index()] = Vector3::new(cx - distance, cy - distance, 0.0);
        corners[Corner::FrontRight.index()] = Vector3::new(cx + distance, cy - distance, 0.0);

        let mut geometry = Self {
            corners,
            center: Vector3::new(cx, cy, 0.0),
            front: Plane::default(),
            back: Plane::default(),
            left: Plane::default(),
            right: Plane::default(),
        };
        geometry.rebuild();
        geometry
    }

    /// Calibration point of a corner, with its current height.
    #[inline]
    pub fn corner(&self, corner: Corner) -> Vector3 {
        self.corners[corner.index()]
    }

    /// Bed center.
    #[inline]
    pub fn center(&self) -> Vector3 {
        self.center
    }

    /// Plane of one side.
    pub fn plane(&self, side: Side) -> &Plane {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Set the height of one corner and regenerate the planes.
    pub fn set_corner_height(&mut self, corner: Corner, height: f32) {
        self.corners[corner.index()].z = height;
        self.rebuild();
    }

    /// Set all corner heights (storage order) and regenerate the planes.
    pub fn set_corner_heights(&mut self, heights: [f32; 4]) {
        for corner in Corner::ALL {
            self.corners[corner.index()].z = heights[corner.index()];
        }
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let back_left = self.corner(Corner::BackLeft);
        let back_right = self.corner(Corner::BackRight);
        let front_left = self.corner(Corner::FrontLeft);
        let front_right = self.corner(Corner::FrontRight);

        self.back = Plane::from_points(back_left, back_right, self.center);
        self.left = Plane::from_points(back_left, front_left, self.center);
        self.right = Plane::from_points(back_right, front_right, self.center);
        self.front = Plane::from_points(front_left, front_right, self.center);
    }

    /// Plane selection for `(x, y)`.
    ///
    /// Outside the calibration rectangle the half-plane tests pick an edge
    /// plane, or blend two planes in the outer corner zones. Inside, the
    /// point is tested against the four wedges meeting at the center.
    pub fn region_for(&self, x: f32, y: f32) -> Region {
        let front_left = self.corner(Corner::FrontLeft);
        let back_left = self.corner(Corner::BackLeft);
        let front_right = self.corner(Corner::FrontRight);
        let back_right = self.corner(Corner::BackRight);

        let (min_x, max_x) = (front_left.x, front_right.x);
        let (min_y, max_y) = (front_left.y, back_right.y);

        let left = x < min_x;
        let right = x > max_x;
        let front = y < min_y;
        let back = y > max_y;

        match (left, right, front, back) {
            (true, _, _, true) => Region::Blend(Side::Back, Side::Left),
            (true, _, true, _) => Region::Blend(Side::Front, Side::Left),
            (_, true, true, _) => Region::Blend(Side::Front, Side::Right),
            (_, true, _, true) => Region::Blend(Side::Back, Side::Right),
            (true, ..) => Region::Plane(Side::Left),
            (_, true, ..) => Region::Plane(Side::Right),
            (.., true) => Region::Plane(Side::Back),
            (_, _, true, _) => Region::Plane(Side::Front),
            _ => {
                let point = (x, y);
                if point_in_triangle(point, self.center, front_left, back_left) {
                    Region::Plane(Side::Left)
                } else if point_in_triangle(point, self.center, front_right, back_right) {
                    Region::Plane(Side::Right)
                } else if point_in_triangle(point, self.center, back_left, back_right) {
                    Region::Plane(Side::Back)
                } else {
                    Region::Plane(Side::Front)
                }
            }
        }
    }

    /// Bed height relative to the center at `(x, y)`.
    pub fn height_adjustment(&self, x: f32, y: f32) -> f32 {
        match self.region_for(x, y) {
            Region::Plane(side) => self.plane(side).height_at(x, y),
            Region::Blend(a, b) => {
                (self.plane(a).height_at(x, y) + self.plane(b).height_at(x, y)) / 2.0
            }
        }
    }
}

/// Orientation of `p` relative to the directed edge `a → b` (xy only).
fn edge_sign(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    (p.0 - b.0) * (a.1 - b.1) - (a.0 - b.0) * (p.1 - b.1)
}

/// Move `v` outward by the margin along the bisector away from `a` and `b`.
fn grow(v: Vector3, a: Vector3, b: Vector3) -> (f32, f32) {
    let flat = |p: Vector3| Vector3::new(p.x, p.y, 0.0);
    let outward = ((flat(v) - flat(a)) + (flat(v) - flat(b))).normalized();
    let moved = flat(v) + outward * TRIANGLE_MARGIN;
    (moved.x, moved.y)
}

/// Containment test against a triangle grown slightly at each vertex, so
/// points on a shared edge or vertex belong to the first wedge tested.
fn point_in_triangle(p: (f32, f32), v1: Vector3, v2: Vector3, v3: Vector3) -> bool {
    let a = grow(v1, v2, v3);
    let b = grow(v2, v1, v3);
    let c = grow(v3, v1, v2);

    let s1 = edge_sign(p, a, b) < 0.0;
    let s2 = edge_sign(p, b, c) < 0.0;
    let s3 = edge_sign(p, c, a) < 0.0;
    s1 == s2 && s2 == s3
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn calibrated() -> BedGeometry {
        let mut bed = BedGeometry::new(&BedConfig::default());
        bed.set_corner_heights([0.42, -0.17, 0.31, -0.08]);
        bed
    }

    #[test]
    fn test_corner_positions() {
        let bed = BedGeometry::new(&BedConfig::default());
        assert_eq!(bed.corner(Corner::FrontLeft), Vector3::new(9.0, 5.0, 0.0));
        assert_eq!(bed.corner(Corner::BackRight), Vector3::new(99.0, 95.0, 0.0));
    }

    #[test]
    fn test_corner_regions_contain_corner() {
        let bed = calibrated();
        let expected = [
            (Corner::BackRight, Side::Right),
            (Corner::BackLeft, Side::Left),
            (Corner::FrontLeft, Side::Left),
            (Corner::FrontRight, Side::Right),
        ];

        for (corner, side) in expected {
            let p = bed.corner(corner);
            assert_eq!(bed.region_for(p.x, p.y), Region::Plane(side));
            assert!(bed.plane(side).vertices().contains(&p));
        }
    }

    #[test]
    fn test_corner_heights_exact() {
        let bed = calibrated();
        for corner in Corner::ALL {
            let p = bed.corner(corner);
            assert_eq!(bed.height_adjustment(p.x, p.y), p.z);
        }
        assert_eq!(bed.height_adjustment(54.0, 50.0), 0.0);
    }

    #[test]
    fn test_interior_wedges() {
        let bed = calibrated();
        assert_eq!(bed.region_for(20.0, 50.0), Region::Plane(Side::Left));
        assert_eq!(bed.region_for(90.0, 50.0), Region::Plane(Side::Right));
        assert_eq!(bed.region_for(54.0, 90.0), Region::Plane(Side::Back));
        assert_eq!(bed.region_for(54.0, 10.0), Region::Plane(Side::Front));
    }

    #[test]
    fn test_outer_zones() {
        let bed = calibrated();
        assert_eq!(bed.region_for(0.0, 50.0), Region::Plane(Side::Left));
        assert_eq!(bed.region_for(105.0, 50.0), Region::Plane(Side::Right));
        assert_eq!(bed.region_for(54.0, 100.0), Region::Plane(Side::Back));
        assert_eq!(bed.region_for(54.0, -1.0), Region::Plane(Side::Front));
        assert_eq!(bed.region_for(0.0, 100.0), Region::Blend(Side::Back, Side::Left));
        assert_eq!(bed.region_for(0.0, 0.0), Region::Blend(Side::Front, Side::Left));
        assert_eq!(bed.region_for(105.0, 0.0), Region::Blend(Side::Front, Side::Right));
        assert_eq!(bed.region_for(105.0, 100.0), Region::Blend(Side::Back, Side::Right));
    }

    #[test]
    fn test_flat_bed_has_no_adjustment() {
        let bed = BedGeometry::new(&BedConfig::default());
        for &(x, y) in &[(0.0, 0.0), (54.0, 50.0), (30.0, 70.0), (110.0, -5.0)] {
            assert!(bed.height_adjustment(x, y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_edge_continuity_between_wedges() {
        let bed = calibrated();
        // On the diagonal from the center to the front-left corner both
        // adjacent planes agree.
        let (x, y) = (31.5, 27.5);
        let left = bed.plane(Side::Left).height_at(x, y);
        let front = bed.plane(Side::Front).height_at(x, y);
        assert!((left - front).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_height_query_is_idempotent(x in -20.0f32..130.0, y in -20.0f32..120.0) {
            let bed = calibrated();
            let first = bed.height_adjustment(x, y);
            let second = bed.height_adjustment(x, y);
            prop_assert_eq!(first.to_bits(), second.to_bits());
        }
    }
}
