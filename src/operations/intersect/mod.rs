mod envelope_intersector;

pub use envelope_intersector::{Envelope2DIntersector, Pairs};
