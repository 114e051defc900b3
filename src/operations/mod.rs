pub mod intersect;
pub mod offset;
pub mod simplify;

pub use intersect::Envelope2DIntersector;
pub use offset::{ConstructOffset, JoinType, OffsetOptions};
pub use simplify::{Simplificator, WindingReducer};
