use slotmap::{SecondaryMap, SlotMap};

use crate::error::{GeometryError, Result};
use crate::math::polygon_2d::signed_area_2d;
use crate::math::Point2;

use super::multi_path::{FillRule, MultiPath, PathKind};

slotmap::new_key_type! {
    /// Identifies a geometry held by an [`EditShape`].
    pub struct GeometryId;
    /// Identifies a path (ring or polyline part) of an [`EditShape`].
    pub struct PathId;
    /// Identifies a vertex of an [`EditShape`].
    pub struct VertexId;
}

/// A vertex in a doubly linked path.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub xy: Point2,
    /// Measure, NaN when absent.
    pub m: f64,
    pub(crate) next: Option<VertexId>,
    pub(crate) prev: Option<VertexId>,
    pub(crate) path: Option<PathId>,
    pub(crate) geometry: GeometryId,
}

/// A path record pointing at one vertex of its chain.
#[derive(Debug, Clone)]
pub struct PathData {
    pub(crate) first: Option<VertexId>,
    pub closed: bool,
    pub(crate) geometry: GeometryId,
}

/// Per-geometry attributes and path order.
#[derive(Debug, Clone)]
pub struct GeometryData {
    pub kind: PathKind,
    pub fill_rule: FillRule,
    pub has_m: bool,
    pub(crate) paths: Vec<PathId>,
}

/// Mutable vertex-chain representation of multipaths.
///
/// Vertices, paths and geometries live in generational arenas and refer to
/// each other by ID, so algorithms can splice links freely and repair the
/// path index afterwards.
#[derive(Debug, Default)]
pub struct EditShape {
    geometries: SlotMap<GeometryId, GeometryData>,
    paths: SlotMap<PathId, PathData>,
    vertices: SlotMap<VertexId, VertexData>,
}

impl EditShape {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies a multipath into the shape and returns its geometry ID.
    pub fn add_geometry(&mut self, mp: &MultiPath) -> GeometryId {
        let geometry = self.geometries.insert(GeometryData {
            kind: mp.kind(),
            fill_rule: mp.fill_rule(),
            has_m: mp.has_m(),
            paths: Vec::new(),
        });
        let mut offset = 0;
        for (points, closed) in mp.paths() {
            let path = self.paths.insert(PathData {
                first: None,
                closed,
                geometry,
            });
            let mut first = None;
            let mut last: Option<VertexId> = None;
            for (i, xy) in points.iter().enumerate() {
                let m = mp.m(offset + i).unwrap_or(f64::NAN);
                let v = self.vertices.insert(VertexData {
                    xy: *xy,
                    m,
                    next: None,
                    prev: None,
                    path: Some(path),
                    geometry,
                });
                if let Some(l) = last {
                    self.set_next(l, v);
                } else {
                    first = Some(v);
                }
                last = Some(v);
            }
            if let (true, Some(f), Some(l)) = (closed, first, last) {
                self.set_next(l, f);
            }
            offset += points.len();
            self.paths[path].first = first;
            self.geometries[geometry].paths.push(path);
        }
        geometry
    }

    /// Geometry record.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::EntityNotFound` for an unknown ID.
    pub fn geometry(&self, id: GeometryId) -> Result<&GeometryData> {
        self.geometries
            .get(id)
            .ok_or_else(|| GeometryError::EntityNotFound("geometry").into())
    }

    /// Mutable geometry record.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::EntityNotFound` for an unknown ID.
    pub fn geometry_mut(&mut self, id: GeometryId) -> Result<&mut GeometryData> {
        self.geometries
            .get_mut(id)
            .ok_or_else(|| GeometryError::EntityNotFound("geometry").into())
    }

    /// Vertex record.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::EntityNotFound` for an unknown or removed ID.
    pub fn vertex(&self, id: VertexId) -> Result<&VertexData> {
        self.vertices
            .get(id)
            .ok_or_else(|| GeometryError::EntityNotFound("vertex").into())
    }

    /// Path record.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::EntityNotFound` for an unknown or removed ID.
    pub fn path(&self, id: PathId) -> Result<&PathData> {
        self.paths
            .get(id)
            .ok_or_else(|| GeometryError::EntityNotFound("path").into())
    }

    /// Paths of a geometry, in order.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::EntityNotFound` for an unknown ID.
    pub fn paths_of(&self, geometry: GeometryId) -> Result<&[PathId]> {
        Ok(&self.geometry(geometry)?.paths)
    }

    /// Number of live vertices owned by `geometry`.
    #[must_use]
    pub fn vertex_count(&self, geometry: GeometryId) -> usize {
        self.vertices
            .values()
            .filter(|v| v.geometry == geometry)
            .count()
    }

    /// Vertices of a path in link order, starting at its first vertex.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::EntityNotFound` for an unknown path.
    pub fn path_vertices(&self, path: PathId) -> Result<Vec<VertexId>> {
        let first = self.path(path)?.first;
        Ok(self.chain_from(first))
    }

    /// Vertices of every path of `geometry`, path after path.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::EntityNotFound` for an unknown ID.
    pub fn geometry_vertices(&self, geometry: GeometryId) -> Result<Vec<VertexId>> {
        let mut out = Vec::new();
        for &p in self.paths_of(geometry)? {
            out.extend(self.chain_from(self.paths[p].first));
        }
        Ok(out)
    }

    /// Signed area of a closed path.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::EntityNotFound` for an unknown path.
    pub fn ring_area(&self, path: PathId) -> Result<f64> {
        let pts: Vec<Point2> = self
            .path_vertices(path)?
            .into_iter()
            .map(|v| self.vertices[v].xy)
            .collect();
        Ok(signed_area_2d(&pts))
    }

    /// Converts a geometry back into a multipath.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::EntityNotFound` for an unknown ID.
    pub fn to_multipath(&self, geometry: GeometryId) -> Result<MultiPath> {
        let data = self.geometry(geometry)?;
        let mut mp = MultiPath::new(data.kind);
        mp.set_fill_rule(data.fill_rule);
        for &p in &data.paths {
            let chain = self.chain_from(self.paths[p].first);
            let points: Vec<Point2> = chain.iter().map(|&v| self.vertices[v].xy).collect();
            if data.has_m {
                let ms: Vec<f64> = chain.iter().map(|&v| self.vertices[v].m).collect();
                mp.add_path_m(&points, &ms, self.paths[p].closed)?;
            } else {
                mp.add_path(&points, self.paths[p].closed);
            }
        }
        Ok(mp)
    }

    /// Walks `next` links from `first` until the chain ends or returns to
    /// its start. The walk is capped by the arena size so a corrupted chain
    /// cannot loop forever.
    fn chain_from(&self, first: Option<VertexId>) -> Vec<VertexId> {
        let mut out = Vec::new();
        let Some(start) = first else {
            return out;
        };
        let mut current = Some(start);
        while let Some(v) = current {
            if out.len() > self.vertices.len() {
                break;
            }
            let Some(data) = self.vertices.get(v) else {
                break;
            };
            out.push(v);
            current = data.next.filter(|&n| n != start);
        }
        out
    }

    // Raw link manipulation used by the simplificator. These index the arena
    // directly: callers hold live IDs only.

    pub(crate) fn xy(&self, v: VertexId) -> Point2 {
        self.vertices[v].xy
    }

    pub(crate) fn next(&self, v: VertexId) -> Option<VertexId> {
        self.vertices[v].next
    }

    pub(crate) fn prev(&self, v: VertexId) -> Option<VertexId> {
        self.vertices[v].prev
    }

    /// Number of live vertices across all geometries; bounds any ring walk.
    pub(crate) fn vertex_capacity(&self) -> usize {
        self.vertices.len()
    }

    pub(crate) fn is_alive(&self, v: VertexId) -> bool {
        self.vertices.contains_key(v)
    }

    pub(crate) fn vertex_path(&self, v: VertexId) -> Option<PathId> {
        self.vertices[v].path
    }

    pub(crate) fn set_vertex_path(&mut self, v: VertexId, path: Option<PathId>) {
        self.vertices[v].path = path;
    }

    pub(crate) fn path_first(&self, p: PathId) -> Option<VertexId> {
        self.paths.get(p).and_then(|d| d.first)
    }

    /// Links `v -> n` in both directions.
    pub(crate) fn set_next(&mut self, v: VertexId, n: VertexId) {
        self.vertices[v].next = Some(n);
        self.vertices[n].prev = Some(v);
    }

    /// Drops a vertex from the arena without touching its neighbours.
    pub(crate) fn remove_vertex_raw(&mut self, v: VertexId) {
        self.vertices.remove(v);
    }

    /// Unlinks a vertex from its ring, joining its neighbours, and drops it.
    pub(crate) fn remove_vertex(&mut self, v: VertexId) {
        let (prev, next) = (self.prev(v), self.next(v));
        match (prev, next) {
            (Some(p), Some(n)) if p != v => self.set_next(p, n),
            _ => {}
        }
        self.vertices.remove(v);
    }

    /// Reverses the direction of the chain `from -> ... -> to` (following
    /// `next`) by swapping the links of every node on it.
    pub(crate) fn reverse_chain(&mut self, from: VertexId, to: VertexId) {
        let mut current = from;
        let cap = self.vertices.len();
        for _ in 0..=cap {
            let data = &mut self.vertices[current];
            let old_next = data.next;
            std::mem::swap(&mut data.next, &mut data.prev);
            if current == to {
                return;
            }
            match old_next {
                Some(n) => current = n,
                None => return,
            }
        }
        panic!("reverse_chain did not reach its end vertex");
    }

    /// Creates a path record starting at `first` and appends it to the
    /// geometry's path order.
    pub(crate) fn create_path(&mut self, geometry: GeometryId, first: VertexId) -> PathId {
        let path = self.paths.insert(PathData {
            first: Some(first),
            closed: true,
            geometry,
        });
        self.geometries[geometry].paths.push(path);
        path
    }

    /// Replaces the geometry's path order; paths left out are removed.
    pub(crate) fn set_paths(&mut self, geometry: GeometryId, order: Vec<PathId>) {
        let keep: SecondaryMap<PathId, ()> = order.iter().map(|&p| (p, ())).collect();
        let old = std::mem::replace(&mut self.geometries[geometry].paths, order);
        for p in old {
            if !keep.contains_key(p) {
                self.paths.remove(p);
            }
        }
    }

    /// Removes a path and all its vertices.
    pub(crate) fn remove_path(&mut self, geometry: GeometryId, path: PathId) {
        for v in self.chain_from(self.path_first(path)) {
            self.vertices.remove(v);
        }
        self.paths.remove(path);
        self.geometries[geometry].paths.retain(|&p| p != path);
    }

    /// Reverses the orientation of a closed path.
    pub(crate) fn reverse_path(&mut self, path: PathId) {
        for v in self.chain_from(self.path_first(path)) {
            let data = &mut self.vertices[v];
            std::mem::swap(&mut data.next, &mut data.prev);
        }
    }

    /// Live vertices owned by `geometry`, in arena order.
    pub(crate) fn live_vertices(&self, geometry: GeometryId) -> Vec<VertexId> {
        self.vertices
            .iter()
            .filter(|(_, d)| d.geometry == geometry)
            .map(|(id, _)| id)
            .collect()
    }
}
