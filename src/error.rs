use thiserror::Error;

/// Top-level error type for the geoplanar kernel.
#[derive(Debug, Error)]
pub enum GeoplanarError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// Errors related to geometry values and their accessors.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("{what} index {index} is out of bounds (len {len})")]
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("unsupported geometry type for {operation}: {kind}")]
    UnsupportedType {
        operation: &'static str,
        kind: &'static str,
    },

    #[error("entity not found: {0}")]
    EntityNotFound(&'static str),
}

/// Errors raised by the interval tree.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("interval {index} is out of bounds (len {len})")]
    IntervalOutOfBounds { index: usize, len: usize },

    #[error("interval {0} is already inserted")]
    AlreadyInserted(usize),

    #[error("interval {0} is not inserted")]
    NotInserted(usize),

    #[error("interval {0} is empty")]
    EmptyInterval(usize),

    #[error("interval tree is in the wrong phase: {0}")]
    WrongPhase(&'static str),
}

/// Errors related to kernel operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid call sequence: {0}")]
    InvalidState(&'static str),

    #[error("operation cancelled by the progress tracker")]
    Cancelled,

    #[error("operation failed: {0}")]
    Failed(String),
}

/// Convenience type alias for results using [`GeoplanarError`].
pub type Result<T> = std::result::Result<T, GeoplanarError>;
