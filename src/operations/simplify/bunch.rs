//! Resolution of one bunch: the vertices sharing a single XY location.
//!
//! Every member contributes an outgoing edge `(v, v.next)` and an incoming
//! edge `(v, v.prev)`. After sorting these edges by angle around the shared
//! point, exact overlaps are spliced away, crossing passes are re-paired
//! into a non-crossing matching and, on request, two passes of one ring are
//! split into separate rings.

use std::cmp::Ordering;

use slotmap::SecondaryMap;

use super::simplificator::remove_spikes;
use super::{pred, ring_contains, succ};
use crate::geometry::{EditShape, GeometryId, VertexId};
use crate::math::predicates::same_xy;
use crate::math::{cross, Vector2};

#[derive(Debug, Clone, Copy)]
struct BunchEdge {
    vertex: VertexId,
    far: VertexId,
    outgoing: bool,
    dir: Vector2,
}

/// Scratch state reused across bunches of one pass.
#[derive(Default)]
pub(crate) struct BunchProcessor {
    edges: Vec<BunchEdge>,
    /// Angular position of each member's incoming and outgoing edge.
    positions: SecondaryMap<VertexId, [usize; 2]>,
}

const IN: usize = 0;
const OUT: usize = 1;

impl BunchProcessor {
    /// Resolves the bunch until it is quiet. Returns `true` if any link
    /// changed.
    pub(crate) fn process(
        &mut self,
        shape: &mut EditShape,
        geometry: GeometryId,
        members: &mut Vec<VertexId>,
        fix_self_tangency: bool,
    ) -> bool {
        let mut changed = false;
        loop {
            members.retain(|&v| shape.is_alive(v));
            if members.len() < 2 {
                return changed;
            }
            self.sort_edges(shape, members);

            if let Some((e1, e2)) = self.find_overlap(shape) {
                resolve_overlap(shape, e1, e2);
                remove_spikes(shape, geometry);
                changed = true;
                continue;
            }
            if self.has_crossing(members) {
                self.rematch(shape);
                changed = true;
                continue;
            }
            if fix_self_tangency && self.split_tangency(shape, members) {
                changed = true;
                continue;
            }
            return changed;
        }
    }

    fn sort_edges(&mut self, shape: &EditShape, members: &[VertexId]) {
        let center = shape.xy(members[0]);
        self.edges.clear();
        for &v in members {
            for (far, outgoing) in [(succ(shape, v), true), (pred(shape, v), false)] {
                self.edges.push(BunchEdge {
                    vertex: v,
                    far,
                    outgoing,
                    dir: shape.xy(far) - center,
                });
            }
        }
        self.edges.sort_by(|a, b| compare_angle(&a.dir, &b.dir));

        self.positions.clear();
        for (i, e) in self.edges.iter().enumerate() {
            let slot = if e.outgoing { OUT } else { IN };
            if let Some(pos) = self.positions.get_mut(e.vertex) {
                pos[slot] = i;
            } else {
                let mut pos = [0; 2];
                pos[slot] = i;
                self.positions.insert(e.vertex, pos);
            }
        }
    }

    /// Two angularly adjacent edges of different members ending at the same
    /// point.
    fn find_overlap(&self, shape: &EditShape) -> Option<(BunchEdge, BunchEdge)> {
        let m = self.edges.len();
        (0..m).find_map(|i| {
            let e1 = self.edges[i];
            let e2 = self.edges[(i + 1) % m];
            (e1.vertex != e2.vertex && same_xy(&shape.xy(e1.far), &shape.xy(e2.far)))
                .then_some((e1, e2))
        })
    }

    fn has_crossing(&self, members: &[VertexId]) -> bool {
        for (i, &a) in members.iter().enumerate() {
            let pa = self.positions[a];
            for &b in &members[i + 1..] {
                let pb = self.positions[b];
                if interleaves((pa[IN], pa[OUT]), (pb[IN], pb[OUT])) {
                    return true;
                }
            }
        }
        false
    }

    /// Re-pairs incoming and outgoing edges like matched parentheses, which
    /// yields passes that touch without crossing.
    fn rematch(&self, shape: &mut EditShape) {
        let m = self.edges.len();
        let mut depth = 0i64;
        let mut lowest = 0i64;
        let mut start = 0;
        for (i, e) in self.edges.iter().enumerate() {
            depth += if e.outgoing { -1 } else { 1 };
            if depth < lowest {
                lowest = depth;
                start = i + 1;
            }
        }

        let mut open: Vec<BunchEdge> = Vec::with_capacity(m / 2);
        for k in 0..m {
            let e = self.edges[(start + k) % m];
            if !e.outgoing {
                open.push(e);
            } else if let Some(incoming) = open.pop() {
                shape.set_next(incoming.vertex, e.far);
            }
        }
    }

    /// Splits the first pair of passes of one ring whose successor swap
    /// does not introduce a crossing.
    fn split_tangency(&self, shape: &mut EditShape, members: &[VertexId]) -> bool {
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                if shape.vertex_path(a) != shape.vertex_path(b) || !ring_contains(shape, a, b) {
                    continue;
                }
                let (pa, pb) = (self.positions[a], self.positions[b]);
                if interleaves((pa[IN], pb[OUT]), (pb[IN], pa[OUT])) {
                    continue;
                }
                let (an, bn) = (succ(shape, a), succ(shape, b));
                shape.set_next(a, bn);
                shape.set_next(b, an);
                shape.set_vertex_path(b, None);
                return true;
            }
        }
        false
    }
}

/// Whether exactly one end of `q` lies strictly inside the arc spanned by
/// `p`.
fn interleaves(p: (usize, usize), q: (usize, usize)) -> bool {
    let (lo, hi) = if p.0 < p.1 { p } else { (p.1, p.0) };
    let inside = |x: usize| lo < x && x < hi;
    inside(q.0) != inside(q.1)
}

/// Counter-clockwise order starting at the positive x axis; equal
/// directions order by length.
fn compare_angle(a: &Vector2, b: &Vector2) -> Ordering {
    half_plane(a)
        .cmp(&half_plane(b))
        .then_with(|| 0.0.partial_cmp(&cross(a, b)).unwrap_or(Ordering::Equal))
        .then_with(|| {
            a.norm_squared()
                .partial_cmp(&b.norm_squared())
                .unwrap_or(Ordering::Equal)
        })
}

fn half_plane(v: &Vector2) -> u8 {
    u8::from(!(v.y > 0.0 || (v.y == 0.0 && v.x > 0.0)))
}

/// Splices out a doubled edge. `e1` and `e2` belong to different members
/// and end at the same point.
fn resolve_overlap(shape: &mut EditShape, e1: BunchEdge, e2: BunchEdge) {
    let (a, fa) = (e1.vertex, e1.far);
    let (b, fb) = (e2.vertex, e2.far);
    match (e1.outgoing, e2.outgoing) {
        (true, false) => {
            // a -> fa and fb -> b run the same segment in opposite directions.
            let w = succ(shape, b);
            let y = succ(shape, fa);
            shape.set_next(a, w);
            shape.set_next(fb, y);
            shape.remove_vertex_raw(b);
            shape.remove_vertex_raw(fa);
        }
        (false, true) => resolve_overlap(shape, e2, e1),
        (true, true) => {
            let u = pred(shape, b);
            let y = succ(shape, fa);
            let w = succ(shape, fb);
            if ring_contains(shape, a, b) {
                shape.reverse_chain(y, u);
                shape.set_next(a, u);
                shape.set_next(y, fa);
                shape.set_next(fa, w);
                shape.remove_vertex_raw(b);
                shape.remove_vertex_raw(fb);
            } else {
                shape.reverse_chain(w, u);
                shape.set_next(a, u);
                shape.set_next(w, fb);
                shape.set_next(fb, y);
                shape.remove_vertex_raw(fa);
                shape.remove_vertex_raw(b);
            }
        }
        (false, false) => {
            let u = succ(shape, b);
            let y = pred(shape, fa);
            let w = pred(shape, fb);
            if ring_contains(shape, a, b) {
                shape.reverse_chain(u, y);
                shape.set_next(fb, y);
                shape.set_next(u, a);
                shape.remove_vertex_raw(b);
                shape.remove_vertex_raw(fa);
            } else {
                shape.reverse_chain(u, w);
                shape.set_next(fa, w);
                shape.set_next(u, a);
                shape.remove_vertex_raw(b);
                shape.remove_vertex_raw(fb);
            }
        }
    }
}
