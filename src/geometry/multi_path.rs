use std::ops::Range;

use crate::error::{GeometryError, OperationError, Result};
use crate::math::polygon_2d::{path_length_2d, signed_area_2d};
use crate::math::Point2;

use super::envelope_2d::Envelope2D;
use super::line::Line;

/// Whether a multipath is a set of open/closed polylines or polygon rings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Polyline,
    Polygon,
}

/// Rule deciding which points a set of rings encloses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FillRule {
    /// A point is inside when a ray from it crosses the rings an odd number
    /// of times.
    #[default]
    OddEven,
    /// A point is inside when the rings wind around it a non-zero number of
    /// times.
    Winding,
}

/// Polylines or polygons stored as one flat vertex array plus path start
/// indices.
///
/// Polygon paths are always closed; the closing edge from the last vertex
/// back to the first is implied and never stored. Polyline paths carry their
/// own closed flag.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPath {
    kind: PathKind,
    points: Vec<Point2>,
    ms: Option<Vec<f64>>,
    path_starts: Vec<usize>,
    closed: Vec<bool>,
    fill_rule: FillRule,
}

impl MultiPath {
    #[must_use]
    pub fn new(kind: PathKind) -> Self {
        Self {
            kind,
            points: Vec::new(),
            ms: None,
            path_starts: Vec::new(),
            closed: Vec::new(),
            fill_rule: FillRule::OddEven,
        }
    }

    #[must_use]
    pub fn new_polyline() -> Self {
        Self::new(PathKind::Polyline)
    }

    #[must_use]
    pub fn new_polygon() -> Self {
        Self::new(PathKind::Polygon)
    }

    /// Builds a multipath with one path per slice. Polyline paths are open.
    #[must_use]
    pub fn from_paths(kind: PathKind, paths: &[Vec<Point2>]) -> Self {
        let mut mp = Self::new(kind);
        for path in paths {
            mp.add_path(path, kind == PathKind::Polygon);
        }
        mp
    }

    /// Enables M values; existing vertices get NaN.
    #[must_use]
    pub fn with_m(mut self) -> Self {
        if self.ms.is_none() {
            self.ms = Some(vec![f64::NAN; self.points.len()]);
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> PathKind {
        self.kind
    }

    #[must_use]
    pub fn is_polygon(&self) -> bool {
        self.kind == PathKind::Polygon
    }

    #[must_use]
    pub fn has_m(&self) -> bool {
        self.ms.is_some()
    }

    #[must_use]
    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    pub fn set_fill_rule(&mut self, rule: FillRule) {
        self.fill_rule = rule;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn path_count(&self) -> usize {
        self.path_starts.len()
    }

    /// All vertices, path after path.
    #[must_use]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Starts a new path at `pt`.
    pub fn start_path(&mut self, pt: Point2) {
        self.path_starts.push(self.points.len());
        self.closed.push(self.kind == PathKind::Polygon);
        self.push_vertex(pt, f64::NAN);
    }

    /// Starts a new path at `pt` with measure `m`. Enables M values.
    pub fn start_path_m(&mut self, pt: Point2, m: f64) {
        self.ensure_m();
        self.path_starts.push(self.points.len());
        self.closed.push(self.kind == PathKind::Polygon);
        self.push_vertex(pt, m);
    }

    /// Appends `pt` to the current path.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidState` if no path has been started.
    pub fn line_to(&mut self, pt: Point2) -> Result<()> {
        self.line_to_m(pt, f64::NAN)
    }

    /// Appends `pt` with measure `m` to the current path.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidState` if no path has been started.
    pub fn line_to_m(&mut self, pt: Point2, m: f64) -> Result<()> {
        if self.path_starts.is_empty() {
            return Err(OperationError::InvalidState("line_to before start_path").into());
        }
        if !m.is_nan() {
            self.ensure_m();
        }
        self.push_vertex(pt, m);
        Ok(())
    }

    /// Marks the current polyline path as closed. Polygon paths are always
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidState` if no path has been started.
    pub fn close_path(&mut self) -> Result<()> {
        let last = self
            .closed
            .last_mut()
            .ok_or(OperationError::InvalidState("close_path before start_path"))?;
        *last = true;
        Ok(())
    }

    /// Appends a whole path. Empty slices are ignored.
    pub fn add_path(&mut self, points: &[Point2], closed: bool) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.start_path(*first);
        for p in rest {
            self.push_vertex(*p, f64::NAN);
        }
        if let Some(last) = self.closed.last_mut() {
            *last = closed || self.kind == PathKind::Polygon;
        }
    }

    /// Appends a path with per-vertex measures.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` when the slices differ in
    /// length.
    pub fn add_path_m(&mut self, points: &[Point2], ms: &[f64], closed: bool) -> Result<()> {
        if points.len() != ms.len() {
            return Err(OperationError::InvalidInput(format!(
                "{} points but {} measures",
                points.len(),
                ms.len()
            ))
            .into());
        }
        if points.is_empty() {
            return Ok(());
        }
        self.ensure_m();
        self.path_starts.push(self.points.len());
        self.closed.push(closed || self.kind == PathKind::Polygon);
        for (p, m) in points.iter().zip(ms) {
            self.push_vertex(*p, *m);
        }
        Ok(())
    }

    fn ensure_m(&mut self) {
        if self.ms.is_none() {
            self.ms = Some(vec![f64::NAN; self.points.len()]);
        }
    }

    fn push_vertex(&mut self, pt: Point2, m: f64) {
        self.points.push(pt);
        if let Some(ms) = &mut self.ms {
            ms.push(m);
        }
    }

    fn check_path(&self, path: usize) -> Result<()> {
        if path >= self.path_starts.len() {
            return Err(GeometryError::IndexOutOfBounds {
                what: "path",
                index: path,
                len: self.path_starts.len(),
            }
            .into());
        }
        Ok(())
    }

    fn range_unchecked(&self, path: usize) -> Range<usize> {
        let start = self.path_starts[path];
        let end = self
            .path_starts
            .get(path + 1)
            .copied()
            .unwrap_or(self.points.len());
        start..end
    }

    /// First vertex index of `path`.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::IndexOutOfBounds` for an unknown path.
    pub fn path_start(&self, path: usize) -> Result<usize> {
        self.check_path(path)?;
        Ok(self.path_starts[path])
    }

    /// One past the last vertex index of `path`.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::IndexOutOfBounds` for an unknown path.
    pub fn path_end(&self, path: usize) -> Result<usize> {
        self.check_path(path)?;
        Ok(self.range_unchecked(path).end)
    }

    /// Vertex index range of `path`.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::IndexOutOfBounds` for an unknown path.
    pub fn path_range(&self, path: usize) -> Result<Range<usize>> {
        self.check_path(path)?;
        Ok(self.range_unchecked(path))
    }

    /// Vertices of `path`.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::IndexOutOfBounds` for an unknown path.
    pub fn path_points(&self, path: usize) -> Result<&[Point2]> {
        self.check_path(path)?;
        Ok(&self.points[self.range_unchecked(path)])
    }

    /// Measures of `path`, if the multipath carries M values.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::IndexOutOfBounds` for an unknown path.
    pub fn path_ms(&self, path: usize) -> Result<Option<&[f64]>> {
        self.check_path(path)?;
        let range = self.range_unchecked(path);
        Ok(self.ms.as_ref().map(|ms| &ms[range]))
    }

    /// Whether `path` is closed.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::IndexOutOfBounds` for an unknown path.
    pub fn is_closed_path(&self, path: usize) -> Result<bool> {
        self.check_path(path)?;
        Ok(self.closed[path])
    }

    /// Iterates over `(points, closed)` for every path.
    pub fn paths(&self) -> impl Iterator<Item = (&[Point2], bool)> + '_ {
        (0..self.path_count()).map(|i| (&self.points[self.range_unchecked(i)], self.closed[i]))
    }

    /// Vertex by flat index.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::IndexOutOfBounds` for an unknown vertex.
    pub fn xy(&self, index: usize) -> Result<Point2> {
        self.points.get(index).copied().ok_or_else(|| {
            GeometryError::IndexOutOfBounds {
                what: "vertex",
                index,
                len: self.points.len(),
            }
            .into()
        })
    }

    /// Measure of a vertex, `None` without M values.
    #[must_use]
    pub fn m(&self, index: usize) -> Option<f64> {
        self.ms.as_ref().and_then(|ms| ms.get(index).copied())
    }

    #[must_use]
    pub fn envelope(&self) -> Envelope2D {
        Envelope2D::from_points(&self.points)
    }

    /// Every segment, including implied closing segments.
    pub fn segments(&self) -> impl Iterator<Item = Line> + '_ {
        self.paths().flat_map(|(pts, closed)| {
            let n = pts.len();
            let count = if closed && n > 1 { n } else { n.saturating_sub(1) };
            (0..count).map(move |i| Line::new(pts[i], pts[(i + 1) % n]))
        })
    }

    /// Sum of signed ring areas; zero for polylines.
    #[must_use]
    pub fn area(&self) -> f64 {
        if self.kind != PathKind::Polygon {
            return 0.0;
        }
        self.paths().map(|(pts, _)| signed_area_2d(pts)).sum()
    }

    /// Signed area of one ring; zero for polyline paths.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::IndexOutOfBounds` for an unknown path.
    pub fn ring_area(&self, path: usize) -> Result<f64> {
        let pts = self.path_points(path)?;
        if self.kind != PathKind::Polygon {
            return Ok(0.0);
        }
        Ok(signed_area_2d(pts))
    }

    /// Total length of all paths.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.paths().map(|(pts, closed)| path_length_2d(pts, closed)).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn square(x: f64, y: f64, s: f64) -> Vec<Point2> {
        vec![
            Point2::new(x, y),
            Point2::new(x, y + s),
            Point2::new(x + s, y + s),
            Point2::new(x + s, y),
        ]
    }

    #[test]
    fn builder_tracks_path_ranges() {
        let mut mp = MultiPath::new_polyline();
        mp.start_path(Point2::new(0.0, 0.0));
        mp.line_to(Point2::new(1.0, 0.0)).unwrap();
        mp.line_to(Point2::new(1.0, 1.0)).unwrap();
        mp.start_path(Point2::new(5.0, 5.0));
        mp.line_to(Point2::new(6.0, 5.0)).unwrap();
        mp.close_path().unwrap();

        assert_eq!(mp.path_count(), 2);
        assert_eq!(mp.path_range(0).unwrap(), 0..3);
        assert_eq!(mp.path_range(1).unwrap(), 3..5);
        assert!(!mp.is_closed_path(0).unwrap());
        assert!(mp.is_closed_path(1).unwrap());
        assert!(mp.path_start(2).is_err());
        assert_eq!(mp.segments().count(), 4);
    }

    #[test]
    fn line_to_without_path_is_usage_error() {
        let mut mp = MultiPath::new_polygon();
        assert!(mp.line_to(Point2::new(0.0, 0.0)).is_err());
        assert!(mp.close_path().is_err());
    }

    #[test]
    fn polygon_area_and_envelope() {
        let outer = square(0.0, 0.0, 10.0);
        let hole = {
            let mut h = square(2.0, 2.0, 2.0);
            h.reverse();
            h
        };
        let mp = MultiPath::from_paths(PathKind::Polygon, &[outer, hole]);
        assert_relative_eq!(mp.ring_area(0).unwrap(), -100.0);
        assert_relative_eq!(mp.ring_area(1).unwrap(), 4.0);
        assert_relative_eq!(mp.area(), -96.0);
        assert_eq!(mp.envelope(), Envelope2D::new(0.0, 0.0, 10.0, 10.0));
        assert_relative_eq!(mp.length(), 48.0);
    }

    #[test]
    fn measures_follow_vertices() {
        let mut mp = MultiPath::new_polyline();
        mp.start_path(Point2::new(0.0, 0.0));
        mp.line_to_m(Point2::new(1.0, 0.0), 7.0).unwrap();
        assert!(mp.has_m());
        assert!(mp.m(0).unwrap().is_nan());
        assert_relative_eq!(mp.m(1).unwrap(), 7.0);
        assert!(mp
            .add_path_m(&[Point2::new(0.0, 0.0)], &[1.0, 2.0], false)
            .is_err());
    }
}
