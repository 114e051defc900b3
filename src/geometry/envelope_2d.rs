use crate::error::{GeometryError, Result};
use crate::math::Point2;

use super::envelope_1d::Envelope1D;

/// Cohen-Sutherland reclassification passes before a clip gives up.
const MAX_CLIP_PASSES: usize = 8;

/// Outcome of clipping a segment against an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClip {
    /// The segment misses the envelope.
    Outside,
    /// The segment lies inside and was not modified.
    Inside,
    /// At least one endpoint was moved onto the boundary.
    Clipped { start_moved: bool, end_moved: bool },
}

impl LineClip {
    fn from_moves(start_moved: bool, end_moved: bool) -> Self {
        if start_moved || end_moved {
            Self::Clipped {
                start_moved,
                end_moved,
            }
        } else {
            Self::Inside
        }
    }

    /// Numeric clip code: 0 outside, 1 start moved, 2 end moved, 3 both
    /// moved, 4 fully inside.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Outside => 0,
            Self::Inside => 4,
            Self::Clipped {
                start_moved,
                end_moved,
            } => u8::from(start_moved) | (u8::from(end_moved) << 1),
        }
    }

    /// Returns `true` if some part of the segment survived.
    #[must_use]
    pub fn is_visible(self) -> bool {
        self != Self::Outside
    }
}

/// Which ends of a segment are extended to infinity before clipping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineExtension {
    pub start: bool,
    pub end: bool,
}

impl LineExtension {
    /// No extension: plain segment clipping.
    pub const SEGMENT: Self = Self {
        start: false,
        end: false,
    };
    /// Ray from the start point through the end point.
    pub const RAY: Self = Self {
        start: false,
        end: true,
    };
    /// Infinite line through both points.
    pub const LINE: Self = Self {
        start: true,
        end: true,
    };
}

/// Result of [`Envelope2D::clip_line_extended`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtendedClip {
    pub clip: LineClip,
    /// Parameters of the clipped endpoints on the original segment. NaN when
    /// the segment is outside.
    pub segment_params: [f64; 2],
    /// Boundary-arc distance of each clipped endpoint, when it lies on the
    /// boundary.
    pub boundary_distances: [Option<f64>; 2],
}

impl ExtendedClip {
    fn outside() -> Self {
        Self {
            clip: LineClip::Outside,
            segment_params: [f64::NAN; 2],
            boundary_distances: [None; 2],
        }
    }
}

/// An axis-aligned rectangle. Empty when any coordinate is NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope2D {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Default for Envelope2D {
    fn default() -> Self {
        Self::empty()
    }
}

impl Envelope2D {
    /// Creates a normalized envelope from two opposite corners.
    #[must_use]
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            xmin: x0.min(x1),
            ymin: y0.min(y1),
            xmax: x0.max(x1),
            ymax: y0.max(y1),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            xmin: f64::NAN,
            ymin: f64::NAN,
            xmax: f64::NAN,
            ymax: f64::NAN,
        }
    }

    /// The degenerate envelope covering a single point.
    #[must_use]
    pub fn from_point(p: &Point2) -> Self {
        Self {
            xmin: p.x,
            ymin: p.y,
            xmax: p.x,
            ymax: p.y,
        }
    }

    /// Bounding box of a point set; empty for an empty slice.
    #[must_use]
    pub fn from_points(points: &[Point2]) -> Self {
        let mut env = Self::empty();
        for p in points {
            env.merge_point(p);
        }
        env
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.xmin.is_nan() || self.ymin.is_nan() || self.xmax.is_nan() || self.ymax.is_nan()
    }

    pub fn set_empty(&mut self) {
        *self = Self::empty();
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.xmax - self.xmin
        }
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.ymax - self.ymin
        }
    }

    #[must_use]
    pub fn center(&self) -> Point2 {
        Point2::new(0.5 * (self.xmin + self.xmax), 0.5 * (self.ymin + self.ymax))
    }

    /// Projection onto the x axis.
    #[must_use]
    pub fn x_interval(&self) -> Envelope1D {
        if self.is_empty() {
            Envelope1D::empty()
        } else {
            Envelope1D {
                vmin: self.xmin,
                vmax: self.xmax,
            }
        }
    }

    /// Projection onto the y axis.
    #[must_use]
    pub fn y_interval(&self) -> Envelope1D {
        if self.is_empty() {
            Envelope1D::empty()
        } else {
            Envelope1D {
                vmin: self.ymin,
                vmax: self.ymax,
            }
        }
    }

    /// Grows the envelope to cover `p`.
    pub fn merge_point(&mut self, p: &Point2) {
        if self.is_empty() {
            *self = Self::from_point(p);
            return;
        }
        self.xmin = self.xmin.min(p.x);
        self.ymin = self.ymin.min(p.y);
        self.xmax = self.xmax.max(p.x);
        self.ymax = self.ymax.max(p.y);
    }

    /// Grows the envelope to cover `other`. Merging an empty envelope is a
    /// no-op; merging into an empty envelope adopts `other`.
    pub fn merge(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        self.xmin = self.xmin.min(other.xmin);
        self.ymin = self.ymin.min(other.ymin);
        self.xmax = self.xmax.max(other.xmax);
        self.ymax = self.ymax.max(other.ymax);
    }

    /// Shrinks to the overlap with `other`.
    ///
    /// Returns `false` and leaves `self` empty when the two are disjoint.
    pub fn intersect(&mut self, other: &Self) -> bool {
        if !self.is_intersecting(other) {
            self.set_empty();
            return false;
        }
        self.xmin = self.xmin.max(other.xmin);
        self.ymin = self.ymin.max(other.ymin);
        self.xmax = self.xmax.min(other.xmax);
        self.ymax = self.ymax.min(other.ymax);
        true
    }

    /// Closed-box overlap test. Empty envelopes never intersect because
    /// every comparison against NaN is false.
    #[must_use]
    pub fn is_intersecting(&self, other: &Self) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }

    #[must_use]
    pub fn contains_point(&self, p: &Point2) -> bool {
        self.xmin <= p.x && p.x <= self.xmax && self.ymin <= p.y && p.y <= self.ymax
    }

    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.xmin <= other.xmin
            && other.xmax <= self.xmax
            && self.ymin <= other.ymin
            && other.ymax <= self.ymax
    }

    /// Moves the sides outwards by `dx` and `dy`. Negative values shrink; an
    /// envelope that turns inside out becomes empty.
    pub fn inflate(&mut self, dx: f64, dy: f64) {
        if self.is_empty() {
            return;
        }
        self.xmin -= dx;
        self.xmax += dx;
        self.ymin -= dy;
        self.ymax += dy;
        if self.xmin > self.xmax || self.ymin > self.ymax {
            self.set_empty();
        }
    }

    /// Returns a copy inflated by `d` on every side.
    #[must_use]
    pub fn inflated(&self, d: f64) -> Self {
        let mut copy = *self;
        copy.inflate(d, d);
        copy
    }

    /// Corner by index: 0 lower-left, 1 upper-left, 2 upper-right,
    /// 3 lower-right.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::IndexOutOfBounds` for an index above 3.
    pub fn corner(&self, index: usize) -> Result<Point2> {
        match index {
            0 => Ok(Point2::new(self.xmin, self.ymin)),
            1 => Ok(Point2::new(self.xmin, self.ymax)),
            2 => Ok(Point2::new(self.xmax, self.ymax)),
            3 => Ok(Point2::new(self.xmax, self.ymin)),
            _ => Err(GeometryError::IndexOutOfBounds {
                what: "corner",
                index,
                len: 4,
            }
            .into()),
        }
    }

    /// The four corners in clockwise order starting at the lower-left.
    #[must_use]
    pub fn corners(&self) -> [Point2; 4] {
        [
            Point2::new(self.xmin, self.ymin),
            Point2::new(self.xmin, self.ymax),
            Point2::new(self.xmax, self.ymax),
            Point2::new(self.xmax, self.ymin),
        ]
    }

    /// Squared distance from `p` to the box; zero inside.
    #[must_use]
    pub fn sqr_distance_to_point(&self, p: &Point2) -> f64 {
        let dx = (self.xmin - p.x).max(p.x - self.xmax).max(0.0);
        let dy = (self.ymin - p.y).max(p.y - self.ymax).max(0.0);
        dx * dx + dy * dy
    }

    /// Squared distance between two boxes; zero when they intersect.
    #[must_use]
    pub fn sqr_distance(&self, other: &Self) -> f64 {
        let dx = (other.xmin - self.xmax).max(self.xmin - other.xmax).max(0.0);
        let dy = (other.ymin - self.ymax).max(self.ymin - other.ymax).max(0.0);
        dx * dx + dy * dy
    }

    fn outcode(&self, p: &Point2) -> u8 {
        let mut code = 0;
        if p.x < self.xmin {
            code |= 1;
        } else if p.x > self.xmax {
            code |= 4;
        }
        if p.y < self.ymin {
            code |= 2;
        } else if p.y > self.ymax {
            code |= 8;
        }
        code
    }

    /// Clips the segment `p0 -> p1` in place (Cohen-Sutherland).
    ///
    /// Moved endpoints land exactly on the side they were clipped against.
    pub fn clip_line(&self, p0: &mut Point2, p1: &mut Point2) -> LineClip {
        if self.is_empty() {
            return LineClip::Outside;
        }
        let mut c0 = self.outcode(p0);
        let mut c1 = self.outcode(p1);
        let mut start_moved = false;
        let mut end_moved = false;
        for _ in 0..MAX_CLIP_PASSES {
            if c0 | c1 == 0 {
                return LineClip::from_moves(start_moved, end_moved);
            }
            if c0 & c1 != 0 {
                return LineClip::Outside;
            }
            let moving_start = c0 != 0;
            let code = if moving_start { c0 } else { c1 };
            let (a, b) = (*p0, *p1);
            let moved = if code & 8 != 0 {
                Point2::new(a.x + (b.x - a.x) * (self.ymax - a.y) / (b.y - a.y), self.ymax)
            } else if code & 2 != 0 {
                Point2::new(a.x + (b.x - a.x) * (self.ymin - a.y) / (b.y - a.y), self.ymin)
            } else if code & 4 != 0 {
                Point2::new(self.xmax, a.y + (b.y - a.y) * (self.xmax - a.x) / (b.x - a.x))
            } else {
                Point2::new(self.xmin, a.y + (b.y - a.y) * (self.xmin - a.x) / (b.x - a.x))
            };
            if moving_start {
                *p0 = moved;
                c0 = self.outcode(p0);
                start_moved = true;
            } else {
                *p1 = moved;
                c1 = self.outcode(p1);
                end_moved = true;
            }
        }
        LineClip::Outside
    }

    /// Clips `p0 -> p1` in place (Liang-Barsky), optionally extending the
    /// segment past either endpoint first.
    pub fn clip_line_extended(
        &self,
        p0: &mut Point2,
        p1: &mut Point2,
        extension: LineExtension,
    ) -> ExtendedClip {
        if self.is_empty() {
            return ExtendedClip::outside();
        }
        let delta = *p1 - *p0;
        let initial = [
            if extension.start { f64::NEG_INFINITY } else { 0.0 },
            if extension.end { f64::INFINITY } else { 1.0 },
        ];
        if delta.x == 0.0 && delta.y == 0.0 {
            if !self.contains_point(p0) {
                return ExtendedClip::outside();
            }
            let d = self.boundary_distance(p0);
            return ExtendedClip {
                clip: LineClip::Inside,
                segment_params: [0.0, 1.0],
                boundary_distances: [d, d],
            };
        }

        let mut t = initial;
        let constraints = [
            (-delta.x, p0.x - self.xmin),
            (delta.x, self.xmax - p0.x),
            (-delta.y, p0.y - self.ymin),
            (delta.y, self.ymax - p0.y),
        ];
        for (den, num) in constraints {
            if !clip_line_auxiliary(den, num, &mut t) {
                return ExtendedClip::outside();
            }
        }

        #[allow(clippy::float_cmp)]
        let start_moved = t[0] != initial[0];
        #[allow(clippy::float_cmp)]
        let end_moved = t[1] != initial[1];
        let origin = *p0;
        if end_moved {
            *p1 = self.snap_to_boundary(&(origin + delta * t[1]));
        }
        if start_moved {
            *p0 = self.snap_to_boundary(&(origin + delta * t[0]));
        }
        ExtendedClip {
            clip: LineClip::from_moves(start_moved, end_moved),
            segment_params: t,
            boundary_distances: [self.boundary_distance(p0), self.boundary_distance(p1)],
        }
    }

    /// Moves `p` onto the boundary: points outside are clamped, points
    /// strictly inside go to the nearest side.
    #[must_use]
    pub fn snap_to_boundary(&self, p: &Point2) -> Point2 {
        let x = p.x.clamp(self.xmin, self.xmax);
        let y = p.y.clamp(self.ymin, self.ymax);
        let to_left = x - self.xmin;
        let to_top = self.ymax - y;
        let to_right = self.xmax - x;
        let to_bottom = y - self.ymin;
        let nearest = to_left.min(to_top).min(to_right).min(to_bottom);
        if nearest <= 0.0 {
            Point2::new(x, y)
        } else if nearest == to_left {
            Point2::new(self.xmin, y)
        } else if nearest == to_top {
            Point2::new(x, self.ymax)
        } else if nearest == to_right {
            Point2::new(self.xmax, y)
        } else {
            Point2::new(x, self.ymin)
        }
    }

    /// Distance along the boundary from the lower-left corner, walking
    /// clockwise: up the left side, along the top, down the right side and
    /// back along the bottom. `None` if `p` is not exactly on the boundary.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn boundary_distance(&self, p: &Point2) -> Option<f64> {
        if !self.contains_point(p) {
            return None;
        }
        let w = self.width();
        let h = self.height();
        if p.x == self.xmin {
            Some(p.y - self.ymin)
        } else if p.y == self.ymax {
            Some(h + p.x - self.xmin)
        } else if p.x == self.xmax {
            Some(h + w + self.ymax - p.y)
        } else if p.y == self.ymin {
            Some(2.0 * h + w + self.xmax - p.x)
        } else {
            None
        }
    }
}

/// Applies one Liang-Barsky constraint `den * t <= num` to the parameter
/// range. Returns `false` when the range becomes empty.
fn clip_line_auxiliary(den: f64, num: f64, t: &mut [f64; 2]) -> bool {
    if den == 0.0 {
        return num >= 0.0;
    }
    let r = num / den;
    if den > 0.0 {
        if r < t[0] {
            return false;
        }
        if r < t[1] {
            t[1] = r;
        }
    } else {
        if r > t[1] {
            return false;
        }
        if r > t[0] {
            t[0] = r;
        }
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn unit_box() -> Envelope2D {
        Envelope2D::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn merge_and_intersect_rules() {
        let mut e = Envelope2D::empty();
        e.merge(&Envelope2D::empty());
        assert!(e.is_empty());
        e.merge(&Envelope2D::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(e, Envelope2D::new(0.0, 0.0, 1.0, 1.0));
        e.merge_point(&Point2::new(3.0, -1.0));
        assert_eq!(e, Envelope2D::new(0.0, -1.0, 3.0, 1.0));

        let mut a = Envelope2D::new(0.0, 0.0, 2.0, 2.0);
        assert!(a.intersect(&Envelope2D::new(1.0, 1.0, 5.0, 5.0)));
        assert_eq!(a, Envelope2D::new(1.0, 1.0, 2.0, 2.0));
        assert!(!a.intersect(&Envelope2D::new(3.0, 3.0, 5.0, 5.0)));
        assert!(a.is_empty());
    }

    #[test]
    fn empty_envelope_never_intersects() {
        let e = Envelope2D::empty();
        assert!(!e.is_intersecting(&unit_box()));
        assert!(!unit_box().is_intersecting(&e));
        assert!(!e.is_intersecting(&e));
    }

    #[test]
    fn corners_run_clockwise() {
        let e = Envelope2D::new(1.0, 2.0, 3.0, 5.0);
        assert_eq!(e.corner(0).unwrap(), Point2::new(1.0, 2.0));
        assert_eq!(e.corner(1).unwrap(), Point2::new(1.0, 5.0));
        assert_eq!(e.corner(2).unwrap(), Point2::new(3.0, 5.0));
        assert_eq!(e.corner(3).unwrap(), Point2::new(3.0, 2.0));
        assert!(e.corner(4).is_err());
    }

    #[test]
    fn sqr_distances() {
        let e = unit_box();
        assert_relative_eq!(e.sqr_distance_to_point(&Point2::new(13.0, 14.0)), 25.0);
        assert_relative_eq!(e.sqr_distance_to_point(&Point2::new(5.0, 5.0)), 0.0);
        assert_relative_eq!(e.sqr_distance(&Envelope2D::new(12.0, 0.0, 13.0, 1.0)), 4.0);
    }

    #[test]
    fn clip_codes_inside_outside_crossing() {
        let e = unit_box();

        let (mut a, mut b) = (Point2::new(1.0, 1.0), Point2::new(9.0, 9.0));
        assert_eq!(e.clip_line(&mut a, &mut b).code(), 4);

        let (mut a, mut b) = (Point2::new(-5.0, 20.0), Point2::new(-1.0, 30.0));
        assert_eq!(e.clip_line(&mut a, &mut b).code(), 0);

        let (mut a, mut b) = (Point2::new(-5.0, 5.0), Point2::new(5.0, 5.0));
        assert_eq!(e.clip_line(&mut a, &mut b).code(), 1);
        assert_eq!(a, Point2::new(0.0, 5.0));

        let (mut a, mut b) = (Point2::new(5.0, 5.0), Point2::new(5.0, 15.0));
        assert_eq!(e.clip_line(&mut a, &mut b).code(), 2);
        assert_eq!(b, Point2::new(5.0, 10.0));

        let (mut a, mut b) = (Point2::new(-5.0, -5.0), Point2::new(15.0, 15.0));
        assert_eq!(e.clip_line(&mut a, &mut b).code(), 3);
        assert_eq!(a, Point2::new(0.0, 0.0));
        assert_eq!(b, Point2::new(10.0, 10.0));
    }

    #[test]
    fn clip_diagonal_miss_near_corner() {
        let e = unit_box();
        let (mut a, mut b) = (Point2::new(8.0, 12.0), Point2::new(12.0, 8.0));
        assert!(e.clip_line(&mut a, &mut b).is_visible());
        let (mut a, mut b) = (Point2::new(9.0, 12.0), Point2::new(12.0, 10.5));
        assert_eq!(e.clip_line(&mut a, &mut b), LineClip::Outside);
    }

    #[test]
    fn liang_barsky_agrees_on_segments() {
        let e = unit_box();
        let (mut a, mut b) = (Point2::new(-5.0, 5.0), Point2::new(5.0, 5.0));
        let res = e.clip_line_extended(&mut a, &mut b, LineExtension::SEGMENT);
        assert_eq!(res.clip.code(), 1);
        assert_relative_eq!(res.segment_params[0], 0.5);
        assert_relative_eq!(res.segment_params[1], 1.0);
        assert_eq!(a, Point2::new(0.0, 5.0));
        assert_eq!(res.boundary_distances[0], Some(5.0));
        assert_eq!(res.boundary_distances[1], None);
    }

    #[test]
    fn extended_line_clips_both_sides() {
        let e = unit_box();
        let (mut a, mut b) = (Point2::new(2.0, 5.0), Point2::new(3.0, 5.0));
        let res = e.clip_line_extended(&mut a, &mut b, LineExtension::LINE);
        assert_eq!(res.clip.code(), 3);
        assert_eq!(a, Point2::new(0.0, 5.0));
        assert_eq!(b, Point2::new(10.0, 5.0));
        assert_relative_eq!(res.segment_params[0], -2.0);
        assert_relative_eq!(res.segment_params[1], 8.0);
        assert_eq!(res.boundary_distances, [Some(5.0), Some(25.0)]);
    }

    #[test]
    fn ray_extends_only_past_end() {
        let e = unit_box();
        let (mut a, mut b) = (Point2::new(5.0, 2.0), Point2::new(5.0, 3.0));
        let res = e.clip_line_extended(&mut a, &mut b, LineExtension::RAY);
        assert_eq!(res.clip.code(), 2);
        assert_eq!(a, Point2::new(5.0, 2.0));
        assert_eq!(b, Point2::new(5.0, 10.0));

        let (mut a, mut b) = (Point2::new(20.0, 2.0), Point2::new(21.0, 2.0));
        let res = e.clip_line_extended(&mut a, &mut b, LineExtension::RAY);
        assert_eq!(res.clip, LineClip::Outside);
    }

    #[test]
    fn boundary_distance_walks_clockwise() {
        let e = Envelope2D::new(0.0, 0.0, 4.0, 2.0);
        assert_eq!(e.boundary_distance(&Point2::new(0.0, 0.0)), Some(0.0));
        assert_eq!(e.boundary_distance(&Point2::new(0.0, 1.0)), Some(1.0));
        assert_eq!(e.boundary_distance(&Point2::new(1.0, 2.0)), Some(3.0));
        assert_eq!(e.boundary_distance(&Point2::new(4.0, 1.0)), Some(7.0));
        assert_eq!(e.boundary_distance(&Point2::new(3.0, 0.0)), Some(9.0));
        assert_eq!(e.boundary_distance(&Point2::new(2.0, 1.0)), None);
    }

    #[test]
    fn snap_moves_interior_point_to_nearest_side() {
        let e = unit_box();
        assert_eq!(e.snap_to_boundary(&Point2::new(1.0, 5.0)), Point2::new(0.0, 5.0));
        assert_eq!(e.snap_to_boundary(&Point2::new(5.0, 9.0)), Point2::new(5.0, 10.0));
        assert_eq!(e.snap_to_boundary(&Point2::new(15.0, 5.0)), Point2::new(10.0, 5.0));
    }
}
