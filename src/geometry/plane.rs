//! Planes through three calibrated points.

use super::vector::Vector3;

/// Plane `a·x + b·y + c·z + d = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaneEquation {
    /// X coefficient.
    pub a: f32,
    /// Y coefficient.
    pub b: f32,
    /// Z coefficient.
    pub c: f32,
    /// Constant term.
    pub d: f32,
}

impl PlaneEquation {
    /// Plane through three points.
    ///
    /// The normal is `(p2 - p1) × (p3 - p1)` and `d` places `p1` on the plane.
    /// Collinear points produce a zero normal.
    pub fn from_points(p1: Vector3, p2: Vector3, p3: Vector3) -> Self {
        let normal = (p2 - p1).cross(p3 - p1);
        Self {
            a: normal.x,
            b: normal.y,
            c: normal.z,
            d: -normal.dot(p1),
        }
    }

    /// Solve the equation for z, or 0 for a vertical plane.
    pub fn solve_z(&self, x: f32, y: f32) -> f32 {
        if self.c == 0.0 {
            0.0
        } else {
            (self.a * x + self.b * y + self.d) / -self.c
        }
    }
}

/// Plane defined by a calibration triangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Plane {
    equation: PlaneEquation,
    vertices: [Vector3; 3],
}

impl Plane {
    /// Plane through three points, remembering them as its vertices.
    pub fn from_points(p1: Vector3, p2: Vector3, p3: Vector3) -> Self {
        Self {
            equation: PlaneEquation::from_points(p1, p2, p3),
            vertices: [p1, p2, p3],
        }
    }

    /// Plane coefficients.
    #[inline]
    pub fn equation(&self) -> &PlaneEquation {
        &self.equation
    }

    /// Defining points.
    #[inline]
    pub fn vertices(&self) -> &[Vector3; 3] {
        &self.vertices
    }

    /// Height of the plane above `(x, y)`, or 0 for a vertical plane.
    ///
    /// Evaluated as a weighted sum of the vertex heights, which is the plane
    /// equation solved for z, so each vertex yields its own height exactly.
    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        if self.equation.c == 0.0 {
            return 0.0;
        }

        let [p1, p2, p3] = self.vertices;
        let (e1x, e1y) = (p2.x - p1.x, p2.y - p1.y);
        let (e2x, e2y) = (p3.x - p1.x, p3.y - p1.y);
        let (vx, vy) = (x - p1.x, y - p1.y);

        let area = e1x * e2y - e1y * e2x;
        let w2 = (vx * e2y - vy * e2x) / area;
        let w3 = (e1x * vy - e1y * vx) / area;
        let w1 = 1.0 - w2 - w3;

        w1 * p1.z + w2 * p2.z + w3 * p3.z
    }
}
