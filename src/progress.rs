use crate::error::{OperationError, Result};

/// Cooperative cancellation hook for long-running operations.
///
/// Operations poll the tracker at natural loop boundaries (per path, per
/// vertex bunch). Returning `false` asks the operation to stop; it then
/// returns [`OperationError::Cancelled`].
pub trait ProgressTracker {
    /// Reports that `step` of roughly `total` units are done.
    fn progress(&mut self, step: usize, total: usize) -> bool;
}

/// Polls an optional tracker, mapping a stop request to an error.
pub(crate) fn poll(
    tracker: &mut Option<&mut dyn ProgressTracker>,
    step: usize,
    total: usize,
) -> Result<()> {
    if let Some(t) = tracker {
        if !t.progress(step, total) {
            return Err(OperationError::Cancelled.into());
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ProgressTracker;

    /// Stops after a fixed number of polls.
    pub struct StopAfter {
        pub remaining: usize,
        pub polls: usize,
    }

    impl StopAfter {
        pub fn new(remaining: usize) -> Self {
            Self {
                remaining,
                polls: 0,
            }
        }
    }

    impl ProgressTracker for StopAfter {
        fn progress(&mut self, _step: usize, _total: usize) -> bool {
            self.polls += 1;
            if self.remaining == 0 {
                return false;
            }
            self.remaining -= 1;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StopAfter;
    use super::*;
    use crate::error::GeoplanarError;

    #[test]
    fn poll_without_tracker_always_continues() {
        let mut tracker: Option<&mut dyn ProgressTracker> = None;
        assert!(poll(&mut tracker, 0, 10).is_ok());
    }

    #[test]
    fn poll_maps_stop_to_cancelled() {
        let mut stop = StopAfter::new(1);
        let mut tracker: Option<&mut dyn ProgressTracker> = Some(&mut stop);
        assert!(poll(&mut tracker, 0, 2).is_ok());
        let err = poll(&mut tracker, 1, 2);
        assert!(matches!(
            err,
            Err(GeoplanarError::Operation(OperationError::Cancelled))
        ));
    }
}
