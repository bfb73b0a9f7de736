//! Collision detection based on line segments.

use super::{Line, Position};

pub trait HasCollision {
    fn has_collision(&self, lines: &[Line]) -> bool {
        let outline = self.outline();
        outline
            .iter()
            .any(|edge| lines.iter().any(|line| intersect_segments(edge, line).is_some()))
    }

    /// Edges of the object's physical footprint in world coordinates.
    fn outline(&self) -> Vec<Line>;
}

/// Intersection point of two line segments, endpoints included.
///
/// Collinear overlapping segments have no single intersection point and are reported as `None`.
pub fn intersect_segments(a: &Line, b: &Line) -> Option<Position> {
    let r = a.p2 - a.p1;
    let s = b.p2 - b.p1;
    let denominator = r.x() * s.y() - r.y() * s.x();

    if denominator.abs() < f64::EPSILON {
        return None;
    }

    let qp = b.p1 - a.p1;
    let t = (qp.x() * s.y() - qp.y() * s.x()) / denominator;
    let u = (qp.x() * r.y() - qp.y() * r.x()) / denominator;

    if (-f64::EPSILON..=1.0 + f64::EPSILON).contains(&t)
        && (-f64::EPSILON..=1.0 + f64::EPSILON).contains(&u)
    {
        Some(a.p1.lerp(a.p2, t))
    } else {
        None
    }
}
