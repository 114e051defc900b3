use crate::math::{left_normal, Point2, Vector2};

use super::envelope_2d::Envelope2D;

/// A straight segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Point2,
    pub end: Point2,
}

impl Line {
    #[must_use]
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    /// Direction vector `end - start`, not normalized.
    #[must_use]
    pub fn direction(&self) -> Vector2 {
        self.end - self.start
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    /// Returns `true` when both endpoints coincide exactly.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// Point at parameter `t`, where 0 is the start and 1 the end.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2 {
        self.start + self.direction() * t
    }

    #[must_use]
    pub fn envelope(&self) -> Envelope2D {
        Envelope2D::new(self.start.x, self.start.y, self.end.x, self.end.y)
    }

    /// The segment translated by `distance` along its left unit normal.
    /// A degenerate segment is returned unchanged.
    #[must_use]
    pub fn offset(&self, distance: f64) -> Self {
        let len = self.length();
        if len == 0.0 {
            return *self;
        }
        let shift = left_normal(&self.direction()) * (distance / len);
        Self {
            start: self.start + shift,
            end: self.end + shift,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn offset_moves_left_for_positive_distance() {
        let line = Line::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        let up = line.offset(2.0);
        assert_relative_eq!(up.start.y, 2.0);
        assert_relative_eq!(up.end.y, 2.0);
        let down = line.offset(-1.0);
        assert_relative_eq!(down.start.y, -1.0);
        assert_relative_eq!(down.length(), 10.0);
    }

    #[test]
    fn envelope_and_midpoint() {
        let line = Line::new(Point2::new(3.0, 1.0), Point2::new(-1.0, 5.0));
        assert_eq!(line.envelope(), Envelope2D::new(-1.0, 1.0, 3.0, 5.0));
        assert_eq!(line.point_at(0.5), Point2::new(1.0, 3.0));
        assert!(!line.is_degenerate());
    }
}
