mod bucket_sort;
pub mod interval_tree;
pub mod treap;

pub(crate) use bucket_sort::bucket_sort;
pub use interval_tree::{IntervalCursor, IntervalQuery, IntervalTree};
pub use treap::{Treap, TreapId, TreapNodeId};
