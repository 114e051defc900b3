use std::ops::BitOr;

use crate::math::Point2;

/// Markers carried by offset points while a loop is built and untangled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PointFlags(u8);

impl PointFlags {
    pub(crate) const NONE: Self = Self(0);
    /// The segment leaving this point runs against its source edge.
    pub(crate) const BAD_SEG: Self = Self(1);
    /// Source vertex at either end of an open path.
    pub(crate) const IS_END: Self = Self(2);
    /// Point on the synthetic return half of an open path.
    pub(crate) const CLOSING_SEG: Self = Self(4);

    pub(crate) fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub(crate) fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub(crate) fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub(crate) fn is_bad(self) -> bool {
        self.contains(Self::BAD_SEG)
    }

    pub(crate) fn is_end(self) -> bool {
        self.contains(Self::IS_END)
    }

    pub(crate) fn is_closing(self) -> bool {
        self.contains(Self::CLOSING_SEG)
    }
}

impl BitOr for PointFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A point of an offset loop with circular `next`/`prev` links into the
/// loop's `Vec`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GraphicPoint {
    pub xy: Point2,
    pub m: f64,
    pub flags: PointFlags,
    pub next: usize,
    pub prev: usize,
}

impl GraphicPoint {
    pub(crate) fn new(xy: Point2, m: f64, flags: PointFlags) -> Self {
        Self {
            xy,
            m,
            flags,
            next: 0,
            prev: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_predicates() {
        let mut f = PointFlags::NONE;
        assert!(!f.is_bad() && !f.is_end() && !f.is_closing());
        f.insert(PointFlags::BAD_SEG);
        assert!(f.is_bad());
        let g = f | PointFlags::CLOSING_SEG;
        assert!(g.is_closing() && g.is_bad() && !g.is_end());
        assert_eq!(g.intersection(PointFlags::CLOSING_SEG), PointFlags::CLOSING_SEG);
    }
}
