use super::{cross, Point2, Vector2};

/// Intersection of two segments in parametric form.
#[derive(Debug, Clone, Copy)]
pub struct SegmentHit {
    /// Intersection point, interpolated on the first segment.
    pub point: Point2,
    /// Parameter on the first segment, in `[0, 1]`.
    pub t: f64,
    /// Parameter on the second segment, in `[0, 1]`.
    pub u: f64,
    /// `cross(a1 - a0, b1 - b0)`; its sign tells which way `b` crosses `a`.
    pub denominator: f64,
}

/// Parametric line-line intersection.
///
/// Given lines `p1 + t * d1` and `p2 + u * d2`, returns `(t, u)` unless the
/// directions are exactly parallel.
#[must_use]
pub fn line_line_intersect_2d(
    p1: &Point2,
    d1: &Vector2,
    p2: &Point2,
    d2: &Vector2,
) -> Option<(f64, f64)> {
    let den = cross(d1, d2);
    if den == 0.0 || !den.is_finite() {
        return None;
    }
    let w = p2 - p1;
    Some((cross(&w, d2) / den, cross(&w, d1) / den))
}

/// Bounded segment-segment intersection.
///
/// Both parameters must fall in the closed range `[0, 1]`; exactly parallel
/// segments never intersect here.
#[must_use]
pub fn segment_segment_intersect_2d(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
) -> Option<SegmentHit> {
    let da = a1 - a0;
    let db = b1 - b0;
    let (t, u) = line_line_intersect_2d(a0, &da, b0, &db)?;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some(SegmentHit {
        point: point_at(a0, &da, t),
        t,
        u,
        denominator: cross(&da, &db),
    })
}

/// Linear interpolation: `origin + dir * t`.
#[must_use]
pub fn point_at(origin: &Point2, dir: &Vector2, t: f64) -> Point2 {
    origin + dir * t
}
