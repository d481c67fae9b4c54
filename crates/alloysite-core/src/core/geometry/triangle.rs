use nalgebra::Point2;

/// A triangle in the surface plane, used to decide whether a subsurface atom lies
/// beneath a three-fold hollow site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub p1: Point2<f64>,
    pub p2: Point2<f64>,
    pub p3: Point2<f64>,
}

impl Triangle {
    pub fn new(p1: Point2<f64>, p2: Point2<f64>, p3: Point2<f64>) -> Self {
        Self { p1, p2, p3 }
    }

    /// Returns `true` if `p` lies strictly inside the triangle.
    ///
    /// `p` is written as `p1 + a·(p2 − p1) + b·(p3 − p1)`; the point is interior when
    /// `a > 0`, `b > 0` and `a + b < 1`. Points on an edge or a vertex are exterior,
    /// and a degenerate (collinear) triangle contains no point.
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        let v1 = self.p2 - self.p1;
        let v2 = self.p3 - self.p1;
        let v = p - self.p1;

        let det_v1_v2 = v1.perp(&v2);
        if det_v1_v2 == 0.0 {
            return false;
        }

        let a = v.perp(&v2) / det_v1_v2;
        let b = -v.perp(&v1) / det_v1_v2;
        a > 0.0 && b > 0.0 && a + b < 1.0
    }
}
