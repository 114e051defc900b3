mod bad_segments;
mod construct_offset;
mod graphic_point;
mod joins;
mod options;

pub use construct_offset::ConstructOffset;
pub use options::{JoinType, OffsetOptions, DEFAULT_MITER_LIMIT};
