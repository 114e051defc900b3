pub mod error;
pub mod geometry;
pub mod index;
pub mod math;
pub mod operations;
pub mod progress;

pub use error::{GeoplanarError, Result};
pub use geometry::{EditShape, Envelope1D, Envelope2D, Geometry, Line, MultiPath};
pub use progress::ProgressTracker;
