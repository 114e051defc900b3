/// A closed interval `[vmin, vmax]` on the real line.
///
/// The interval is empty when either bound is NaN. Every comparison against
/// NaN is false, so predicates on an empty interval fall out naturally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope1D {
    pub vmin: f64,
    pub vmax: f64,
}

impl Default for Envelope1D {
    fn default() -> Self {
        Self::empty()
    }
}

impl Envelope1D {
    /// Creates an interval from two bounds in any order.
    #[must_use]
    pub fn new(a: f64, b: f64) -> Self {
        if b < a {
            Self { vmin: b, vmax: a }
        } else {
            Self { vmin: a, vmax: b }
        }
    }

    /// Creates the empty interval.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            vmin: f64::NAN,
            vmax: f64::NAN,
        }
    }

    /// Returns `true` if the interval holds no value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vmin.is_nan() || self.vmax.is_nan()
    }

    pub fn set_empty(&mut self) {
        *self = Self::empty();
    }

    /// Grows the interval to cover `v`.
    pub fn merge(&mut self, v: f64) {
        if self.is_empty() {
            self.vmin = v;
            self.vmax = v;
        } else if v < self.vmin {
            self.vmin = v;
        } else if v > self.vmax {
            self.vmax = v;
        }
    }

    /// Grows the interval to cover `other`. Merging an empty interval is a
    /// no-op.
    pub fn merge_envelope(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        self.vmin = self.vmin.min(other.vmin);
        self.vmax = self.vmax.max(other.vmax);
    }

    /// Shrinks to the overlap with `other`; leaves `self` empty and returns
    /// `false` when they are disjoint.
    pub fn intersect(&mut self, other: &Self) -> bool {
        if !self.is_intersecting(other) {
            self.set_empty();
            return false;
        }
        self.vmin = self.vmin.max(other.vmin);
        self.vmax = self.vmax.min(other.vmax);
        true
    }

    /// Closed-interval overlap test; empty intervals never intersect.
    #[must_use]
    pub fn is_intersecting(&self, other: &Self) -> bool {
        self.vmin <= other.vmax && other.vmin <= self.vmax
    }

    #[must_use]
    pub fn contains(&self, v: f64) -> bool {
        self.vmin <= v && v <= self.vmax
    }

    /// Moves both bounds outwards by `d`. A negative `d` that crosses the
    /// bounds over leaves the interval empty.
    pub fn inflate(&mut self, d: f64) {
        if self.is_empty() {
            return;
        }
        self.vmin -= d;
        self.vmax += d;
        if self.vmin > self.vmax {
            self.set_empty();
        }
    }

    /// Returns a copy inflated by `d`.
    #[must_use]
    pub fn inflated(&self, d: f64) -> Self {
        let mut copy = *self;
        copy.inflate(d);
        copy
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.vmax - self.vmin
        }
    }

    #[must_use]
    pub fn center(&self) -> f64 {
        0.5 * (self.vmin + self.vmax)
    }

    /// Clamps `v` into the interval.
    #[must_use]
    pub fn clamp(&self, v: f64) -> f64 {
        if v < self.vmin {
            self.vmin
        } else if v > self.vmax {
            self.vmax
        } else {
            v
        }
    }

    /// Gap between two intervals, zero when they overlap.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        if self.is_empty() || other.is_empty() {
            return f64::NAN;
        }
        (other.vmin - self.vmax).max(self.vmin - other.vmax).max(0.0)
    }
}
