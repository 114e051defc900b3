//! Randomized balanced search trees sharing one node arena.
//!
//! Each [`TreapId`] names an independent ordered multiset. Nodes carry
//! parent links so a [`TreapNodeId`] handle can be stepped forwards and
//! backwards and removed in expected logarithmic time.

use std::cmp::Ordering;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Identifies one treap inside a [`Treap`] arena.
    pub struct TreapId;
    /// Identifies a node; stays valid until the node is removed.
    pub struct TreapNodeId;
}

#[derive(Debug, Clone)]
struct TreapNode<T> {
    element: T,
    priority: u32,
    left: Option<TreapNodeId>,
    right: Option<TreapNodeId>,
    parent: Option<TreapNodeId>,
    treap: TreapId,
}

#[derive(Debug, Clone, Default)]
struct TreapHeader {
    root: Option<TreapNodeId>,
    first: Option<TreapNodeId>,
    last: Option<TreapNodeId>,
    size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Arena of treaps over `Copy` elements.
///
/// The ordering is supplied on every insert, so elements can be keys into
/// data the arena does not own. Equal elements keep insertion order.
#[derive(Debug, Clone)]
pub struct Treap<T> {
    nodes: SlotMap<TreapNodeId, TreapNode<T>>,
    treaps: SlotMap<TreapId, TreapHeader>,
    rng: SmallRng,
}

impl<T: Copy> Treap<T> {
    /// Creates an empty arena whose priorities come from a seeded generator.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            treaps: SlotMap::with_key(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn create_treap(&mut self) -> TreapId {
        self.treaps.insert(TreapHeader::default())
    }

    /// Drops a treap and every node in it.
    pub fn delete_treap(&mut self, treap: TreapId) {
        let Some(header) = self.treaps.remove(treap) else {
            return;
        };
        let mut stack: Vec<TreapNodeId> = header.root.into_iter().collect();
        while let Some(n) = stack.pop() {
            if let Some(node) = self.nodes.remove(n) {
                stack.extend(node.left);
                stack.extend(node.right);
            }
        }
    }

    /// Removes every treap and node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.treaps.clear();
    }

    #[must_use]
    pub fn size(&self, treap: TreapId) -> usize {
        self.treaps.get(treap).map_or(0, |h| h.size)
    }

    #[must_use]
    pub fn is_empty(&self, treap: TreapId) -> bool {
        self.size(treap) == 0
    }

    #[must_use]
    pub fn first(&self, treap: TreapId) -> Option<TreapNodeId> {
        self.treaps.get(treap).and_then(|h| h.first)
    }

    #[must_use]
    pub fn last(&self, treap: TreapId) -> Option<TreapNodeId> {
        self.treaps.get(treap).and_then(|h| h.last)
    }

    /// Element stored at `node`, `None` once the node is removed.
    #[must_use]
    pub fn element(&self, node: TreapNodeId) -> Option<T> {
        self.nodes.get(node).map(|n| n.element)
    }

    /// Treap that owns `node`.
    #[must_use]
    pub fn owner(&self, node: TreapNodeId) -> Option<TreapId> {
        self.nodes.get(node).map(|n| n.treap)
    }

    /// In-order successor.
    #[must_use]
    pub fn next(&self, node: TreapNodeId) -> Option<TreapNodeId> {
        let n = self.nodes.get(node)?;
        if let Some(r) = n.right {
            return Some(self.leftmost(r));
        }
        let mut child = node;
        let mut parent = n.parent;
        while let Some(p) = parent {
            if self.nodes[p].left == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.nodes[p].parent;
        }
        None
    }

    /// In-order predecessor.
    #[must_use]
    pub fn prev(&self, node: TreapNodeId) -> Option<TreapNodeId> {
        let n = self.nodes.get(node)?;
        if let Some(l) = n.left {
            return Some(self.rightmost(l));
        }
        let mut child = node;
        let mut parent = n.parent;
        while let Some(p) = parent {
            if self.nodes[p].right == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.nodes[p].parent;
        }
        None
    }

    /// Elements of a treap in order.
    pub fn iter(&self, treap: TreapId) -> impl Iterator<Item = T> + '_ {
        std::iter::successors(self.first(treap), move |&n| self.next(n))
            .filter_map(move |n| self.element(n))
    }

    fn leftmost(&self, mut node: TreapNodeId) -> TreapNodeId {
        while let Some(l) = self.nodes[node].left {
            node = l;
        }
        node
    }

    fn rightmost(&self, mut node: TreapNodeId) -> TreapNodeId {
        while let Some(r) = self.nodes[node].right {
            node = r;
        }
        node
    }

    /// Inserts `element`, ordered by `cmp`, and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if `treap` was deleted.
    pub fn insert<F>(&mut self, treap: TreapId, element: T, cmp: F) -> TreapNodeId
    where
        F: Fn(&T, &T) -> Ordering,
    {
        let priority = self.rng.gen::<u32>();
        let node = self.nodes.insert(TreapNode {
            element,
            priority,
            left: None,
            right: None,
            parent: None,
            treap,
        });

        let header = &self.treaps[treap];
        let mut parent = None;
        let mut cursor = header.root;
        while let Some(c) = cursor {
            parent = Some(c);
            cursor = if cmp(&element, &self.nodes[c].element) == Ordering::Less {
                self.nodes[c].left
            } else {
                self.nodes[c].right
            };
        }
        match parent {
            None => self.treaps[treap].root = Some(node),
            Some(p) => {
                self.nodes[node].parent = Some(p);
                if cmp(&element, &self.nodes[p].element) == Ordering::Less {
                    self.nodes[p].left = Some(node);
                } else {
                    self.nodes[p].right = Some(node);
                }
            }
        }

        while let Some(p) = self.nodes[node].parent {
            if self.nodes[p].priority >= priority {
                break;
            }
            if self.nodes[p].left == Some(node) {
                self.rotate(p, Side::Right);
            } else {
                self.rotate(p, Side::Left);
            }
        }

        let header = &mut self.treaps[treap];
        header.size += 1;
        let first = header.first;
        let last = header.last;
        let before_first = first.map_or(true, |f| {
            cmp(&element, &self.nodes[f].element) == Ordering::Less
        });
        let after_last = last.map_or(true, |l| {
            cmp(&element, &self.nodes[l].element) != Ordering::Less
        });
        let header = &mut self.treaps[treap];
        if before_first {
            header.first = Some(node);
        }
        if after_last {
            header.last = Some(node);
        }
        node
    }

    /// Removes a node. Removing an already removed handle is a no-op.
    pub fn remove(&mut self, node: TreapNodeId) {
        let Some(treap) = self.owner(node) else {
            return;
        };
        let header = &self.treaps[treap];
        let new_first = if header.first == Some(node) {
            Some(self.next(node))
        } else {
            None
        };
        let new_last = if header.last == Some(node) {
            Some(self.prev(node))
        } else {
            None
        };

        // Rotate the node down until it is a leaf.
        loop {
            let n = &self.nodes[node];
            let side = match (n.left, n.right) {
                (None, None) => break,
                (Some(_), None) => Side::Right,
                (None, Some(_)) => Side::Left,
                (Some(l), Some(r)) => {
                    if self.nodes[l].priority > self.nodes[r].priority {
                        Side::Right
                    } else {
                        Side::Left
                    }
                }
            };
            self.rotate(node, side);
        }

        match self.nodes[node].parent {
            None => self.treaps[treap].root = None,
            Some(p) => {
                let pn = &mut self.nodes[p];
                if pn.left == Some(node) {
                    pn.left = None;
                } else {
                    pn.right = None;
                }
            }
        }
        self.nodes.remove(node);

        let header = &mut self.treaps[treap];
        header.size -= 1;
        if let Some(f) = new_first {
            header.first = f;
        }
        if let Some(l) = new_last {
            header.last = l;
        }
    }

    /// Rotates around `x`. A right rotation lifts the left child; a left
    /// rotation lifts the right child.
    fn rotate(&mut self, x: TreapNodeId, side: Side) {
        let y = match side {
            Side::Left => self.nodes[x].right,
            Side::Right => self.nodes[x].left,
        };
        let Some(y) = y else {
            return;
        };
        let inner = match side {
            Side::Left => self.nodes[y].left,
            Side::Right => self.nodes[y].right,
        };
        match side {
            Side::Left => self.nodes[x].right = inner,
            Side::Right => self.nodes[x].left = inner,
        }
        if let Some(i) = inner {
            self.nodes[i].parent = Some(x);
        }
        let parent = self.nodes[x].parent;
        self.nodes[y].parent = parent;
        match parent {
            None => {
                let treap = self.nodes[x].treap;
                self.treaps[treap].root = Some(y);
            }
            Some(p) => {
                if self.nodes[p].left == Some(x) {
                    self.nodes[p].left = Some(y);
                } else {
                    self.nodes[p].right = Some(y);
                }
            }
        }
        match side {
            Side::Left => self.nodes[y].left = Some(x),
            Side::Right => self.nodes[y].right = Some(x),
        }
        self.nodes[x].parent = Some(y);
    }
}
