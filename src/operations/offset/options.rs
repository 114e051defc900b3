use crate::error::{OperationError, Result};

/// Miter limit used when the caller has no preference.
pub const DEFAULT_MITER_LIMIT: f64 = 10.0;

/// How offset segments are connected around a convex vertex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinType {
    /// Straight cut between the two offset segment ends.
    Bevel,
    /// Circular arc around the vertex.
    #[default]
    Round,
    /// Offset segments extended to their intersection, limited by the
    /// miter limit.
    Miter,
    /// Offset segments extended by the distance and cut square.
    Square,
}

/// Validated parameters of a constant-distance offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetOptions {
    distance: f64,
    join: JoinType,
    miter_limit: f64,
    tolerance: f64,
}

impl OffsetOptions {
    /// Creates offset options.
    ///
    /// `miter_limit` caps the miter length as a multiple of `|distance|`.
    /// `tolerance` is the largest allowed gap between a round join and its
    /// chords.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` if the distance is not finite,
    /// the miter limit is below 1 or the tolerance is not positive.
    pub fn new(distance: f64, join: JoinType, miter_limit: f64, tolerance: f64) -> Result<Self> {
        if !distance.is_finite() {
            return Err(OperationError::InvalidInput(format!(
                "offset distance must be finite, got {distance}"
            ))
            .into());
        }
        if miter_limit.is_nan() || miter_limit < 1.0 {
            return Err(OperationError::InvalidInput(format!(
                "miter limit must be at least 1, got {miter_limit}"
            ))
            .into());
        }
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(OperationError::InvalidInput(format!(
                "tolerance must be positive, got {tolerance}"
            ))
            .into());
        }
        Ok(Self {
            distance,
            join,
            miter_limit,
            tolerance,
        })
    }

    #[must_use]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    #[must_use]
    pub fn join(&self) -> JoinType {
        self.join
    }

    #[must_use]
    pub fn miter_limit(&self) -> f64 {
        self.miter_limit
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_parameters() {
        assert!(OffsetOptions::new(f64::NAN, JoinType::Round, 4.0, 0.01).is_err());
        assert!(OffsetOptions::new(f64::INFINITY, JoinType::Round, 4.0, 0.01).is_err());
        assert!(OffsetOptions::new(1.0, JoinType::Miter, 0.5, 0.01).is_err());
        assert!(OffsetOptions::new(1.0, JoinType::Miter, f64::NAN, 0.01).is_err());
        assert!(OffsetOptions::new(1.0, JoinType::Round, 4.0, 0.0).is_err());
        assert!(OffsetOptions::new(-1.0, JoinType::Bevel, DEFAULT_MITER_LIMIT, 1e-3).is_ok());
    }
}
