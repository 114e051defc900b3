mod bunch;
mod orientation;
mod simplificator;

pub use simplificator::{Simplificator, WindingReducer};

use crate::geometry::{EditShape, VertexId};

fn succ(shape: &EditShape, v: VertexId) -> VertexId {
    shape.next(v).unwrap_or(v)
}

fn pred(shape: &EditShape, v: VertexId) -> VertexId {
    shape.prev(v).unwrap_or(v)
}

/// Vertices of the ring through `start`, in link order.
///
/// # Panics
///
/// Panics if the links do not close into a ring.
fn ring_of(shape: &EditShape, start: VertexId) -> Vec<VertexId> {
    let cap = shape.vertex_capacity();
    let mut out = vec![start];
    let mut v = succ(shape, start);
    while v != start {
        assert!(out.len() <= cap, "vertex links do not close into a ring");
        out.push(v);
        v = succ(shape, v);
    }
    out
}

/// Whether `b` lies on the ring through `a`.
fn ring_contains(shape: &EditShape, a: VertexId, b: VertexId) -> bool {
    let cap = shape.vertex_capacity();
    let mut v = succ(shape, a);
    let mut steps = 0;
    while v != a {
        if v == b {
            return true;
        }
        steps += 1;
        assert!(steps <= cap, "vertex links do not close into a ring");
        v = succ(shape, v);
    }
    false
}
