//! Save/restore stack of affine transforms.

use std::f64::consts::FRAC_PI_2;

use super::BackendError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transform {
    Translate { x: f64, y: f64 },
    /// Clockwise on screen, in radians.
    Rotate(f64),
}

impl Transform {
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        match *self {
            Transform::Translate { x: dx, y: dy } => (x + dx, y + dy),
            Transform::Rotate(angle) => {
                let distance = x.hypot(y);
                let polar = (-x).atan2(y) + angle + FRAC_PI_2;
                (distance * polar.cos(), distance * polar.sin())
            }
        }
    }
}

/// Frames of transforms opened by `push` on top of a base frame. The base frame cannot be popped,
/// so transforms issued outside any `push` still apply.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformStack {
    base: Vec<Transform>,
    frames: Vec<Vec<Transform>>,
}

impl TransformStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop(&mut self) -> Result<Vec<Transform>, BackendError> {
        self.frames.pop().ok_or(BackendError::UnbalancedRestore)
    }

    /// Number of frames above the base frame.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn translate(&mut self, x: f64, y: f64) {
        self.current().push(Transform::Translate { x, y });
    }

    pub fn rotate(&mut self, angle: f64) {
        self.current().push(Transform::Rotate(angle));
    }

    pub fn reset(&mut self) {
        self.base.clear();
        self.frames.clear();
    }

    /// Maps a point through every active transform, the most recent one first.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        std::iter::once(&self.base)
            .chain(&self.frames)
            .flatten()
            .rev()
            .fold((x, y), |(x, y), transform| transform.apply(x, y))
    }

    /// Innermost frame. The base frame is always there underneath the saved ones.
    fn current(&mut self) -> &mut Vec<Transform> {
        self.frames.last_mut().unwrap_or(&mut self.base)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const EPSILON: f64 = 1e-9;

    #[rstest]
    #[case::quarter_turn(0.5 * PI, (1.0, 0.0), (0.0, 1.0))]
    #[case::half_turn(PI, (1.0, 2.0), (-1.0, -2.0))]
    #[case::backwards(-0.5 * PI, (0.0, 1.0), (1.0, 0.0))]
    #[case::origin(1.0, (0.0, 0.0), (0.0, 0.0))]
    fn test_rotate(#[case] angle: f64, #[case] point: (f64, f64), #[case] expected: (f64, f64)) {
        let (x, y) = Transform::Rotate(angle).apply(point.0, point.1);
        assert_abs_diff_eq!(x, expected.0, epsilon = EPSILON);
        assert_abs_diff_eq!(y, expected.1, epsilon = EPSILON);
    }

    #[test]
    fn test_latest_transform_applies_first() {
        let mut stack = TransformStack::new();
        stack.push();
        stack.translate(10.0, 5.0);
        stack.rotate(0.5 * PI);
        let (x, y) = stack.apply(1.0, 0.0);
        assert_abs_diff_eq!(x, 10.0, epsilon = EPSILON);
        assert_abs_diff_eq!(y, 6.0, epsilon = EPSILON);
    }

    #[test]
    fn test_balanced_push_pop_is_identity() {
        let mut stack = TransformStack::new();
        stack.push();
        stack.translate(3.0, 4.0);
        stack.push();
        stack.rotate(1.2);
        assert_eq!(stack.depth(), 2);
        stack.pop().unwrap();
        stack.pop().unwrap();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.apply(7.0, -2.0), (7.0, -2.0));
    }

    #[test]
    fn test_pop_without_push_fails() {
        let mut stack = TransformStack::new();
        stack.translate(1.0, 1.0);
        assert!(matches!(stack.pop(), Err(BackendError::UnbalancedRestore)));
        assert_eq!(stack.apply(0.0, 0.0), (1.0, 1.0));
    }

    #[test]
    fn test_reset_clears_base_and_frames() {
        let mut stack = TransformStack::new();
        stack.translate(1.0, 1.0);
        stack.push();
        stack.rotate(0.5 * PI);
        stack.reset();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.apply(2.0, 3.0), (2.0, 3.0));
        stack.translate(5.0, 0.0);
        assert_eq!(stack.apply(0.0, 0.0), (5.0, 0.0));
    }
}
