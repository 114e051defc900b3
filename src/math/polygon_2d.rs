use std::cmp::Ordering;

use super::predicates::orientation;
use super::Point2;

/// Signed area of a closed ring (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise. The closing edge
/// is implied.
#[must_use]
pub fn signed_area_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let origin = points[0];
    let mut sum = 0.0;
    for i in 1..n - 1 {
        let a = points[i] - origin;
        let b = points[i + 1] - origin;
        sum += a.x * b.y - a.y * b.x;
    }
    sum * 0.5
}

/// Length of a polyline, including the closing edge when `closed`.
#[must_use]
pub fn path_length_2d(points: &[Point2], closed: bool) -> f64 {
    let mut length: f64 = points.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
    if closed && points.len() > 2 {
        length += (points[0] - points[points.len() - 1]).norm();
    }
    length
}

/// Even-odd ray-casting test for a point against a closed ring.
///
/// Points exactly on the boundary may land on either side.
#[must_use]
pub fn point_in_ring_2d(pt: &Point2, ring: &[Point2]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        if (a.y > pt.y) != (b.y > pt.y) {
            let x = a.x + (pt.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if pt.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Returns `true` when `pt` lies on an edge of the closed ring, or is too
/// close to one for the orientation predicate to decide.
#[must_use]
pub fn point_on_ring_boundary_2d(pt: &Point2, ring: &[Point2]) -> bool {
    let n = ring.len();
    (0..n).any(|i| {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        orientation(&a, &b, pt) == Ordering::Equal
            && pt.x >= a.x.min(b.x)
            && pt.x <= a.x.max(b.x)
            && pt.y >= a.y.min(b.y)
            && pt.y <= a.y.max(b.y)
    })
}

/// Rotates a closed ring so it starts at its lexicographically smallest
/// vertex. Gives deterministic output for comparisons in tests.
#[must_use]
pub fn rotate_to_canonical_start(points: &[Point2]) -> Vec<Point2> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let mut best = 0;
    for (i, pt) in points.iter().enumerate().skip(1) {
        let b = &points[best];
        if pt.x < b.x || (pt.x <= b.x && pt.y < b.y) {
            best = i;
        }
    }
    let mut rotated = Vec::with_capacity(points.len());
    rotated.extend_from_slice(&points[best..]);
    rotated.extend_from_slice(&points[..best]);
    rotated
}
