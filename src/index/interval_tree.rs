//! Augmented interval tree over a fixed set of registered intervals.
//!
//! The primary structure is the implicit balanced tree of median
//! discriminants over the sorted unique endpoint values. Only nodes that
//! own intervals, or that join two such subtrees, are materialized. Each
//! materialized (tertiary) node owns a secondary list of the endpoints of
//! the intervals stored there, sorted by value.

use std::cmp::Ordering;

use slotmap::{SecondaryMap, SlotMap};

use crate::error::{IndexError, Result};
use crate::geometry::Envelope1D;

use super::treap::{Treap, TreapId, TreapNodeId};

const TREAP_SEED: u64 = 0x1d7e_7a15_5eed;

slotmap::new_key_type! {
    struct TertiaryId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Endpoint list of a tertiary node.
#[derive(Debug, Clone, Copy)]
enum Secondary {
    /// Contiguous range of `static_ends`.
    Slice { start: usize, len: usize },
    Treap(TreapId),
}

/// Position of one endpoint inside its secondary list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndHandle {
    Slot(usize),
    Node(TreapNodeId),
}

#[derive(Debug, Clone)]
struct TertiaryNode {
    discriminant: usize,
    secondary: Option<Secondary>,
    left: Option<TertiaryId>,
    right: Option<TertiaryId>,
    parent: Option<TertiaryId>,
}

impl TertiaryNode {
    fn new(discriminant: usize) -> Self {
        Self {
            discriminant,
            secondary: None,
            left: None,
            right: None,
            parent: None,
        }
    }

    fn child(&self, side: Side) -> Option<TertiaryId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    fn child_mut(&mut self, side: Side) -> &mut Option<TertiaryId> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// Where an inserted interval lives.
#[derive(Debug, Clone, Copy)]
struct IntervalNode {
    tertiary: TertiaryId,
    left_end: EndHandle,
    right_end: EndHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildMode {
    Static,
    Dynamic,
}

/// Endpoint code: `(interval_index << 1) | is_right_endpoint`.
fn end_value(intervals: &[Envelope1D], code: usize) -> f64 {
    let iv = intervals[code >> 1];
    if code & 1 == 0 {
        iv.vmin
    } else {
        iv.vmax
    }
}

/// Orders endpoints by value, then left before right, then by index.
fn compare_ends(intervals: &[Envelope1D], a: usize, b: usize) -> Ordering {
    end_value(intervals, a)
        .partial_cmp(&end_value(intervals, b))
        .unwrap_or(Ordering::Equal)
        .then((a & 1).cmp(&(b & 1)))
        .then((a >> 1).cmp(&(b >> 1)))
}

/// Interval tree answering "which intervals overlap this query" in
/// `O(log n + k)`.
///
/// Intervals are registered between construction start and
/// [`end_construction`](Self::end_construction). A static tree then holds
/// all of them; a dynamic tree starts empty and accepts
/// [`insert`](Self::insert) and [`remove`](Self::remove) of registered
/// intervals by index.
#[derive(Debug, Clone)]
pub struct IntervalTree {
    mode: BuildMode,
    constructing: bool,
    intervals: Vec<Envelope1D>,
    discriminants: Vec<f64>,
    nodes: SlotMap<TertiaryId, TertiaryNode>,
    root: Option<TertiaryId>,
    entries: Vec<Option<IntervalNode>>,
    static_ends: Vec<usize>,
    treaps: Treap<usize>,
    size: usize,
}

impl IntervalTree {
    fn with_mode(mode: BuildMode) -> Self {
        Self {
            mode,
            constructing: true,
            intervals: Vec::new(),
            discriminants: Vec::new(),
            nodes: SlotMap::with_key(),
            root: None,
            entries: Vec::new(),
            static_ends: Vec::new(),
            treaps: Treap::new(TREAP_SEED),
            size: 0,
        }
    }

    /// A tree that holds every registered interval once construction ends.
    #[must_use]
    pub fn new_static() -> Self {
        Self::with_mode(BuildMode::Static)
    }

    /// A tree whose registered intervals are inserted and removed one by one.
    #[must_use]
    pub fn new_dynamic() -> Self {
        Self::with_mode(BuildMode::Dynamic)
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.mode == BuildMode::Dynamic
    }

    /// Drops every interval and reopens construction, keeping allocations.
    pub fn start_construction(&mut self) {
        self.constructing = true;
        self.intervals.clear();
        self.discriminants.clear();
        self.nodes.clear();
        self.root = None;
        self.entries.clear();
        self.static_ends.clear();
        self.treaps.clear();
        self.size = 0;
    }

    /// Registers an interval and returns its index.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::WrongPhase` after construction ended and
    /// `IndexError::EmptyInterval` for an empty interval.
    pub fn add_interval(&mut self, interval: Envelope1D) -> Result<usize> {
        if !self.constructing {
            return Err(IndexError::WrongPhase("add_interval after end_construction").into());
        }
        let index = self.intervals.len();
        if interval.is_empty() {
            return Err(IndexError::EmptyInterval(index).into());
        }
        self.intervals.push(interval);
        Ok(index)
    }

    /// Freezes the registered set and builds the primary structure.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::WrongPhase` when construction already ended.
    pub fn end_construction(&mut self) -> Result<()> {
        if !self.constructing {
            return Err(IndexError::WrongPhase("end_construction called twice").into());
        }
        self.constructing = false;

        let mut values: Vec<f64> = self
            .intervals
            .iter()
            .flat_map(|iv| [iv.vmin, iv.vmax])
            .collect();
        values.sort_by(f64::total_cmp);
        values.dedup();
        self.discriminants = values;
        self.entries = vec![None; self.intervals.len()];

        if self.mode == BuildMode::Static {
            self.build_static();
        }
        tracing::trace!(
            intervals = self.intervals.len(),
            discriminants = self.discriminants.len(),
            nodes = self.nodes.len(),
            "interval tree constructed"
        );
        Ok(())
    }

    fn check_mutable(&self, index: usize) -> Result<()> {
        if self.mode == BuildMode::Static {
            return Err(IndexError::WrongPhase("static trees cannot be modified").into());
        }
        if self.constructing {
            return Err(IndexError::WrongPhase("modification before end_construction").into());
        }
        if index >= self.intervals.len() {
            return Err(IndexError::IntervalOutOfBounds {
                index,
                len: self.intervals.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Inserts a registered interval.
    ///
    /// # Errors
    ///
    /// Returns `IndexError` for a static tree, an unknown index or an
    /// interval that is already present.
    pub fn insert(&mut self, index: usize) -> Result<()> {
        self.check_mutable(index)?;
        if self.entries[index].is_some() {
            return Err(IndexError::AlreadyInserted(index).into());
        }
        self.insert_unchecked(index);
        Ok(())
    }

    /// Removes an inserted interval.
    ///
    /// # Errors
    ///
    /// Returns `IndexError` for a static tree, an unknown index or an
    /// interval that is not present.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        self.check_mutable(index)?;
        if self.entries[index].is_none() {
            return Err(IndexError::NotInserted(index).into());
        }
        self.remove_unchecked(index);
        Ok(())
    }

    /// Returns `true` if the interval is currently in the tree.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(Option::is_some)
    }

    /// Number of intervals currently in the tree.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of registered intervals.
    #[must_use]
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    #[must_use]
    pub fn interval(&self, index: usize) -> Option<Envelope1D> {
        self.intervals.get(index).copied()
    }

    /// Iterates over the indices of inserted intervals overlapping `query`
    /// inflated by `tolerance`.
    #[must_use]
    pub fn query(&self, query: Envelope1D, tolerance: f64) -> IntervalQuery<'_> {
        let mut cursor = IntervalCursor::new();
        cursor.reset(query, tolerance);
        IntervalQuery { tree: self, cursor }
    }

    #[cfg(test)]
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Inserts without phase or duplicate checks.
    pub(crate) fn insert_unchecked(&mut self, index: usize) {
        let node = self.find_or_create_node(self.intervals[index]);
        let treap = if let Some(Secondary::Treap(t)) = self.nodes[node].secondary {
            t
        } else {
            let t = self.treaps.create_treap();
            self.nodes[node].secondary = Some(Secondary::Treap(t));
            t
        };
        let intervals = &self.intervals;
        let cmp = |a: &usize, b: &usize| compare_ends(intervals, *a, *b);
        let left = self.treaps.insert(treap, index << 1, cmp);
        let right = self.treaps.insert(treap, (index << 1) | 1, cmp);
        self.entries[index] = Some(IntervalNode {
            tertiary: node,
            left_end: EndHandle::Node(left),
            right_end: EndHandle::Node(right),
        });
        self.size += 1;
    }

    /// Removes without phase checks; absent intervals are ignored.
    pub(crate) fn remove_unchecked(&mut self, index: usize) {
        let Some(entry) = self.entries[index].take() else {
            return;
        };
        for handle in [entry.left_end, entry.right_end] {
            if let EndHandle::Node(n) = handle {
                self.treaps.remove(n);
            }
        }
        self.size -= 1;
        let node = entry.tertiary;
        if let Some(Secondary::Treap(t)) = self.nodes[node].secondary {
            if self.treaps.is_empty(t) {
                self.treaps.delete_treap(t);
                self.nodes[node].secondary = None;
            }
        }
        self.collapse_from(node);
    }

    /// Splices out nodes that no longer own intervals and have at most one
    /// child. Removing one interval frees at most the node itself and one
    /// joining ancestor.
    fn collapse_from(&mut self, start: TertiaryId) {
        let mut current = Some(start);
        let mut collapsed = 0;
        while let Some(t) = current {
            let n = &self.nodes[t];
            if n.secondary.is_some() || (n.left.is_some() && n.right.is_some()) {
                break;
            }
            let parent = n.parent;
            let child = n.left.or(n.right);
            match parent {
                None => self.root = child,
                Some(p) => {
                    let pn = &mut self.nodes[p];
                    if pn.left == Some(t) {
                        pn.left = child;
                    } else {
                        pn.right = child;
                    }
                }
            }
            if let Some(c) = child {
                self.nodes[c].parent = parent;
            }
            self.nodes.remove(t);
            collapsed += 1;
            assert!(
                collapsed <= 2,
                "interval tree repair collapsed more than two nodes"
            );
            current = parent;
        }
    }

    fn build_static(&mut self) {
        let mut members: SecondaryMap<TertiaryId, Vec<usize>> = SecondaryMap::new();
        for index in 0..self.intervals.len() {
            let node = self.find_or_create_node(self.intervals[index]);
            if let Some(list) = members.get_mut(node) {
                list.push(index);
            } else {
                members.insert(node, vec![index]);
            }
        }

        self.static_ends.clear();
        self.static_ends.reserve(2 * self.intervals.len());
        let intervals = &self.intervals;
        for (node, list) in members {
            let start = self.static_ends.len();
            let mut ends: Vec<usize> = list.iter().flat_map(|&i| [i << 1, (i << 1) | 1]).collect();
            ends.sort_by(|a, b| compare_ends(intervals, *a, *b));
            for (k, &code) in ends.iter().enumerate() {
                let handle = EndHandle::Slot(start + k);
                let entry = self.entries[code >> 1].get_or_insert(IntervalNode {
                    tertiary: node,
                    left_end: handle,
                    right_end: handle,
                });
                if code & 1 == 0 {
                    entry.left_end = handle;
                } else {
                    entry.right_end = handle;
                }
            }
            let len = ends.len();
            self.static_ends.extend(ends);
            self.nodes[node].secondary = Some(Secondary::Slice { start, len });
        }
        self.size = self.intervals.len();
    }

    /// Finds the tertiary node that owns `interval`, materializing it and
    /// any joining node the compressed tree is missing.
    ///
    /// Walks the implicit median tree over the discriminants. `candidate` is
    /// the materialized node that heads the implicit subtree being walked.
    fn find_or_create_node(&mut self, interval: Envelope1D) -> TertiaryId {
        let mut lo = 0;
        let mut hi = self.discriminants.len() - 1;
        let mut attach: Option<(TertiaryId, Side)> = None;
        let mut candidate = self.root;
        loop {
            let d = lo + (hi - lo) / 2;
            let value = self.discriminants[d];
            let side = if interval.vmax < value {
                Some(Side::Left)
            } else if interval.vmin > value {
                Some(Side::Right)
            } else {
                None
            };

            if let Some(c) = candidate {
                if self.nodes[c].discriminant == d {
                    let Some(s) = side else {
                        return c;
                    };
                    attach = Some((c, s));
                    candidate = self.nodes[c].child(s);
                    (lo, hi) = narrow(lo, hi, d, s);
                    continue;
                }
            }

            match side {
                None => {
                    let node = self.nodes.insert(TertiaryNode::new(d));
                    if let Some(c) = candidate {
                        let c_side = self.side_of(c, d);
                        self.link(Some((node, c_side)), c);
                    }
                    self.link(attach, node);
                    return node;
                }
                Some(s) => {
                    if let Some(c) = candidate {
                        let c_side = self.side_of(c, d);
                        if c_side != s {
                            // The walk leaves the candidate's subtree here.
                            let node = self.nodes.insert(TertiaryNode::new(d));
                            self.link(Some((node, c_side)), c);
                            self.link(attach, node);
                            attach = Some((node, s));
                            candidate = None;
                        }
                    }
                    (lo, hi) = narrow(lo, hi, d, s);
                }
            }
        }
    }

    fn side_of(&self, node: TertiaryId, discriminant: usize) -> Side {
        if self.nodes[node].discriminant < discriminant {
            Side::Left
        } else {
            Side::Right
        }
    }

    fn link(&mut self, parent: Option<(TertiaryId, Side)>, child: TertiaryId) {
        match parent {
            None => {
                self.root = Some(child);
                self.nodes[child].parent = None;
            }
            Some((p, side)) => {
                *self.nodes[p].child_mut(side) = Some(child);
                self.nodes[child].parent = Some(p);
            }
        }
    }

    // Secondary access for cursors. Stale IDs yield `None`.

    fn discriminant_value(&self, node: TertiaryId) -> Option<f64> {
        let n = self.nodes.get(node)?;
        self.discriminants.get(n.discriminant).copied()
    }

    fn children(&self, node: TertiaryId) -> (Option<TertiaryId>, Option<TertiaryId>) {
        self.nodes
            .get(node)
            .map_or((None, None), |n| (n.left, n.right))
    }

    fn first_end(&self, node: TertiaryId) -> Option<EndHandle> {
        match self.nodes.get(node)?.secondary? {
            Secondary::Slice { start, len } => (len > 0).then_some(EndHandle::Slot(start)),
            Secondary::Treap(t) => self.treaps.first(t).map(EndHandle::Node),
        }
    }

    fn last_end(&self, node: TertiaryId) -> Option<EndHandle> {
        match self.nodes.get(node)?.secondary? {
            Secondary::Slice { start, len } => (len > 0).then(|| EndHandle::Slot(start + len - 1)),
            Secondary::Treap(t) => self.treaps.last(t).map(EndHandle::Node),
        }
    }

    fn next_end(&self, node: TertiaryId, handle: EndHandle) -> Option<EndHandle> {
        match handle {
            EndHandle::Slot(i) => match self.nodes.get(node)?.secondary? {
                Secondary::Slice { start, len } => {
                    (i + 1 < start + len).then_some(EndHandle::Slot(i + 1))
                }
                Secondary::Treap(_) => None,
            },
            EndHandle::Node(n) => self.treaps.next(n).map(EndHandle::Node),
        }
    }

    fn prev_end(&self, node: TertiaryId, handle: EndHandle) -> Option<EndHandle> {
        match handle {
            EndHandle::Slot(i) => match self.nodes.get(node)?.secondary? {
                Secondary::Slice { start, .. } => (i > start).then(|| EndHandle::Slot(i - 1)),
                Secondary::Treap(_) => None,
            },
            EndHandle::Node(n) => self.treaps.prev(n).map(EndHandle::Node),
        }
    }

    fn end_code(&self, handle: EndHandle) -> Option<usize> {
        match handle {
            EndHandle::Slot(i) => self.static_ends.get(i).copied(),
            EndHandle::Node(n) => self.treaps.element(n),
        }
    }
}

fn narrow(lo: usize, hi: usize, d: usize, side: Side) -> (usize, usize) {
    match side {
        Side::Left => (lo, d - 1),
        Side::Right => (d + 1, hi),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Initialize,
    Pop,
    /// On the search path above the split node.
    PT,
    /// At the split node, whose discriminant lies inside the query.
    PIn,
    /// On the left branch below the split node.
    PL,
    /// On the right branch below the split node.
    PR,
    /// Inside a subtree that lies wholly within the query.
    Subtree,
    /// Scanning left endpoints upwards.
    Left,
    /// Scanning right endpoints downwards.
    Right,
    /// Reporting every interval of a node.
    All,
    Done,
}

/// Resumable overlap query over an [`IntervalTree`].
///
/// The cursor is plain data and borrows the tree only for the duration of
/// each [`next`](Self::next) call. Modifying the tree while a query is in
/// flight gives unspecified (but memory-safe) results.
#[derive(Debug, Clone)]
pub struct IntervalCursor {
    query: Envelope1D,
    state: CursorState,
    node: Option<TertiaryId>,
    end: Option<EndHandle>,
    stack: Vec<(TertiaryId, CursorState)>,
}

impl Default for IntervalCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalCursor {
    /// An idle cursor; call [`reset`](Self::reset) before iterating.
    #[must_use]
    pub fn new() -> Self {
        Self {
            query: Envelope1D::empty(),
            state: CursorState::Done,
            node: None,
            end: None,
            stack: Vec::new(),
        }
    }

    /// Restarts the cursor on a new query, reusing its stack.
    pub fn reset(&mut self, query: Envelope1D, tolerance: f64) {
        self.query = query.inflated(tolerance);
        self.state = CursorState::Initialize;
        self.node = None;
        self.end = None;
        self.stack.clear();
    }

    /// The next overlapping interval index, or `None` when exhausted.
    pub fn next(&mut self, tree: &IntervalTree) -> Option<usize> {
        loop {
            match self.state {
                CursorState::Done => return None,
                CursorState::Initialize => {
                    self.stack.clear();
                    if !self.query.is_empty() {
                        if let Some(root) = tree.root {
                            self.stack.push((root, CursorState::PT));
                        }
                    }
                    self.state = CursorState::Pop;
                }
                CursorState::Pop => match self.stack.pop() {
                    Some((node, state)) => {
                        self.node = Some(node);
                        self.state = state;
                    }
                    None => self.state = CursorState::Done,
                },
                CursorState::PT
                | CursorState::PIn
                | CursorState::PL
                | CursorState::PR
                | CursorState::Subtree => self.descend(tree),
                CursorState::Left => {
                    let Some(code) = self.advance(tree, true) else {
                        continue;
                    };
                    let index = code >> 1;
                    if code & 1 == 1 || tree.intervals[index].vmin > self.query.vmax {
                        self.state = CursorState::Pop;
                        continue;
                    }
                    return Some(index);
                }
                CursorState::Right => {
                    let Some(code) = self.advance(tree, false) else {
                        continue;
                    };
                    let index = code >> 1;
                    if code & 1 == 0 || tree.intervals[index].vmax < self.query.vmin {
                        self.state = CursorState::Pop;
                        continue;
                    }
                    return Some(index);
                }
                CursorState::All => {
                    let Some(code) = self.advance(tree, true) else {
                        continue;
                    };
                    if code & 1 == 1 {
                        // Left endpoints all precede right endpoints.
                        self.state = CursorState::Pop;
                        continue;
                    }
                    return Some(code >> 1);
                }
            }
        }
    }

    /// Steps the endpoint scan, returning the code under the old position.
    /// Falls back to `Pop` when the scan is exhausted.
    fn advance(&mut self, tree: &IntervalTree, forward: bool) -> Option<usize> {
        let (Some(node), Some(handle)) = (self.node, self.end) else {
            self.state = CursorState::Pop;
            return None;
        };
        self.end = if forward {
            tree.next_end(node, handle)
        } else {
            tree.prev_end(node, handle)
        };
        let code = tree.end_code(handle);
        if code.is_none() {
            self.state = CursorState::Pop;
        }
        code
    }

    fn push(&mut self, node: Option<TertiaryId>, state: CursorState) {
        if let Some(n) = node {
            self.stack.push((n, state));
        }
    }

    fn begin_scan(&mut self, tree: &IntervalTree, node: TertiaryId, scan: CursorState) {
        self.end = match scan {
            CursorState::Right => tree.last_end(node),
            _ => tree.first_end(node),
        };
        self.state = scan;
    }

    /// Classifies the current node against the query, schedules its
    /// children and starts scanning its endpoints.
    fn descend(&mut self, tree: &IntervalTree) {
        let Some(node) = self.node else {
            self.state = CursorState::Pop;
            return;
        };
        let Some(value) = tree.discriminant_value(node) else {
            self.state = CursorState::Pop;
            return;
        };
        let (left, right) = tree.children(node);
        let q = self.query;
        let scan = match self.state {
            CursorState::PT => {
                if q.vmax < value {
                    self.push(left, CursorState::PT);
                    CursorState::Left
                } else if q.vmin > value {
                    self.push(right, CursorState::PT);
                    CursorState::Right
                } else {
                    self.state = CursorState::PIn;
                    return;
                }
            }
            CursorState::PIn => {
                self.push(right, CursorState::PR);
                self.push(left, CursorState::PL);
                CursorState::All
            }
            CursorState::PL => {
                if value >= q.vmin {
                    self.push(right, CursorState::Subtree);
                    self.push(left, CursorState::PL);
                    CursorState::All
                } else {
                    self.push(right, CursorState::PL);
                    CursorState::Right
                }
            }
            CursorState::PR => {
                if value <= q.vmax {
                    self.push(left, CursorState::Subtree);
                    self.push(right, CursorState::PR);
                    CursorState::All
                } else {
                    self.push(left, CursorState::PR);
                    CursorState::Left
                }
            }
            _ => {
                self.push(right, CursorState::Subtree);
                self.push(left, CursorState::Subtree);
                CursorState::All
            }
        };
        self.begin_scan(tree, node, scan);
    }
}

/// Borrowing iterator over an [`IntervalTree`] query.
#[derive(Debug)]
pub struct IntervalQuery<'a> {
    tree: &'a IntervalTree,
    cursor: IntervalCursor,
}

impl Iterator for IntervalQuery<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        self.cursor.next(self.tree)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::GeoplanarError;

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v
    }

    fn brute(intervals: &[Envelope1D], live: &[bool], q: Envelope1D) -> Vec<usize> {
        (0..intervals.len())
            .filter(|&i| live[i] && intervals[i].is_intersecting(&q))
            .collect()
    }

    fn build(intervals: &[Envelope1D], dynamic: bool) -> IntervalTree {
        let mut tree = if dynamic {
            IntervalTree::new_dynamic()
        } else {
            IntervalTree::new_static()
        };
        for iv in intervals {
            tree.add_interval(*iv).unwrap();
        }
        tree.end_construction().unwrap();
        tree
    }

    fn interval_strategy() -> impl Strategy<Value = Envelope1D> {
        (-20i32..20, 0i32..8).prop_map(|(a, w)| Envelope1D::new(f64::from(a), f64::from(a + w)))
    }

    #[test]
    fn static_tree_answers_overlaps() {
        let intervals = [
            Envelope1D::new(0.0, 2.0),
            Envelope1D::new(1.0, 5.0),
            Envelope1D::new(6.0, 7.0),
            Envelope1D::new(-3.0, -1.0),
        ];
        let tree = build(&intervals, false);
        assert_eq!(tree.size(), 4);
        assert_eq!(sorted(tree.query(Envelope1D::new(1.5, 1.6), 0.0).collect()), vec![0, 1]);
        assert_eq!(sorted(tree.query(Envelope1D::new(5.0, 6.0), 0.0).collect()), vec![1, 2]);
        assert!(tree.query(Envelope1D::new(-0.9, -0.1), 0.0).next().is_none());
        assert_eq!(
            sorted(tree.query(Envelope1D::new(-0.9, -0.1), 0.1).collect()),
            vec![0, 3]
        );
        assert!(tree.query(Envelope1D::empty(), 1.0).next().is_none());
    }

    #[test]
    fn dynamic_tree_forgets_removed_intervals() {
        let intervals = [
            Envelope1D::new(0.0, 10.0),
            Envelope1D::new(2.0, 3.0),
            Envelope1D::new(4.0, 8.0),
        ];
        let mut tree = build(&intervals, true);
        assert_eq!(tree.size(), 0);
        for i in 0..3 {
            tree.insert(i).unwrap();
        }
        let q = Envelope1D::new(2.5, 5.0);
        assert_eq!(sorted(tree.query(q, 0.0).collect()), vec![0, 1, 2]);
        tree.remove(1).unwrap();
        assert_eq!(sorted(tree.query(q, 0.0).collect()), vec![0, 2]);
        assert!(!tree.contains(1));
        tree.remove(0).unwrap();
        tree.remove(2).unwrap();
        assert_eq!(tree.size(), 0);
        assert_eq!(tree.node_count(), 0);
        assert!(tree.query(q, 0.0).next().is_none());
    }

    #[test]
    fn usage_errors_are_reported() {
        let mut tree = IntervalTree::new_dynamic();
        assert!(matches!(
            tree.add_interval(Envelope1D::empty()),
            Err(GeoplanarError::Index(IndexError::EmptyInterval(0)))
        ));
        tree.add_interval(Envelope1D::new(0.0, 1.0)).unwrap();
        assert!(tree.insert(0).is_err());
        tree.end_construction().unwrap();
        assert!(tree.add_interval(Envelope1D::new(0.0, 1.0)).is_err());
        assert!(tree.end_construction().is_err());
        assert!(matches!(
            tree.remove(0),
            Err(GeoplanarError::Index(IndexError::NotInserted(0)))
        ));
        tree.insert(0).unwrap();
        assert!(matches!(
            tree.insert(0),
            Err(GeoplanarError::Index(IndexError::AlreadyInserted(0)))
        ));
        assert!(matches!(
            tree.insert(5),
            Err(GeoplanarError::Index(IndexError::IntervalOutOfBounds { index: 5, len: 1 }))
        ));

        let mut fixed = build(&[Envelope1D::new(0.0, 1.0)], false);
        assert!(fixed.remove(0).is_err());
    }

    #[test]
    fn cursor_reset_reuses_state() {
        let tree = build(
            &[Envelope1D::new(0.0, 1.0), Envelope1D::new(3.0, 4.0)],
            false,
        );
        let mut cursor = IntervalCursor::new();
        assert!(cursor.next(&tree).is_none());
        cursor.reset(Envelope1D::new(0.5, 0.5), 0.0);
        assert_eq!(cursor.next(&tree), Some(0));
        assert_eq!(cursor.next(&tree), None);
        cursor.reset(Envelope1D::new(2.0, 2.5), 0.5);
        assert_eq!(cursor.next(&tree), Some(1));
        assert_eq!(cursor.next(&tree), None);
    }

    #[test]
    fn degenerate_point_intervals() {
        let tree = build(
            &[
                Envelope1D::new(1.0, 1.0),
                Envelope1D::new(1.0, 1.0),
                Envelope1D::new(0.0, 1.0),
            ],
            false,
        );
        assert_eq!(sorted(tree.query(Envelope1D::new(1.0, 1.0), 0.0).collect()), vec![0, 1, 2]);
        assert_eq!(sorted(tree.query(Envelope1D::new(0.0, 0.0), 0.0).collect()), vec![2]);
    }

    proptest! {
        #[test]
        fn static_matches_linear_scan(
            intervals in proptest::collection::vec(interval_strategy(), 1..60),
            queries in proptest::collection::vec(interval_strategy(), 1..20),
        ) {
            let tree = build(&intervals, false);
            let live = vec![true; intervals.len()];
            for q in queries {
                prop_assert_eq!(sorted(tree.query(q, 0.0).collect()), brute(&intervals, &live, q));
            }
        }

        #[test]
        fn dynamic_matches_linear_scan(
            intervals in proptest::collection::vec(interval_strategy(), 1..60),
            ops in proptest::collection::vec((any::<prop::sample::Index>(), interval_strategy()), 1..120),
        ) {
            let mut tree = build(&intervals, true);
            let mut live = vec![false; intervals.len()];
            for (pick, q) in ops {
                let i = pick.index(intervals.len());
                if live[i] {
                    tree.remove(i).unwrap();
                } else {
                    tree.insert(i).unwrap();
                }
                live[i] = !live[i];
                prop_assert_eq!(sorted(tree.query(q, 0.0).collect()), brute(&intervals, &live, q));
                prop_assert_eq!(tree.size(), live.iter().filter(|&&b| b).count());
            }
        }
    }
}
