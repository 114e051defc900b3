//! Sign predicates with per-comparison round-off bounds.
//!
//! Each predicate evaluates a sum of two products and treats the result as
//! zero when it lies within `4 * eps * (|p| + |q|)` of zero, where `p` and `q`
//! are the two products. No global tolerance is involved.

use std::cmp::Ordering;

use super::{Point2, Vector2};

/// Round-off bound for the sum of the two products `p` and `q`.
#[must_use]
pub fn sum_error_bound(p: f64, q: f64) -> f64 {
    4.0 * f64::EPSILON * (p.abs() + q.abs())
}

fn bounded_sign(p: f64, q: f64) -> Ordering {
    let value = p + q;
    let bound = sum_error_bound(p, q);
    if value > bound {
        Ordering::Greater
    } else if value < -bound {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

/// Sign of `a · b`, reported as `Equal` inside the round-off bound.
#[must_use]
pub fn dot_sign(a: &Vector2, b: &Vector2) -> Ordering {
    bounded_sign(a.x * b.x, a.y * b.y)
}

/// Sign of `a × b`, reported as `Equal` inside the round-off bound.
#[must_use]
pub fn cross_sign(a: &Vector2, b: &Vector2) -> Ordering {
    bounded_sign(a.x * b.y, -(a.y * b.x))
}

/// Orientation of `c` relative to the directed line `a -> b`.
///
/// `Greater` means `c` lies to the left, `Less` to the right.
#[must_use]
pub fn orientation(a: &Point2, b: &Point2, c: &Point2) -> Ordering {
    cross_sign(&(b - a), &(c - a))
}

/// Returns `true` when `b` points against `a` beyond round-off.
#[must_use]
pub fn is_reversed(a: &Vector2, b: &Vector2) -> bool {
    dot_sign(a, b) == Ordering::Less
}

/// Exact coordinate equality, used where coincidence must not be fuzzy.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn same_xy(a: &Point2, b: &Point2) -> bool {
    a.x == b.x && a.y == b.y
}

/// Lexicographic (x, y) comparison. NaN coordinates compare equal.
#[must_use]
pub fn compare_xy(a: &Point2, b: &Point2) -> Ordering {
    a.x.partial_cmp(&b.x)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
}
