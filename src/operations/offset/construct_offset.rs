use tracing::debug;

use super::bad_segments::{collect_loop, remove_bad_segments};
use super::graphic_point::{GraphicPoint, PointFlags};
use super::joins::JoinEmitter;
use super::options::{JoinType, OffsetOptions};
use crate::error::{GeometryError, Result};
use crate::geometry::{Envelope2D, Geometry, MultiPath};
use crate::math::polygon_2d::signed_area_2d;
use crate::math::predicates::{is_reversed, same_xy};
use crate::math::Point2;
use crate::progress::{poll, ProgressTracker};

/// Constant-distance offset of a planar geometry.
///
/// # Sign Convention
///
/// - Polygons: positive distance grows the region, negative shrinks it.
///   Holes move the opposite way to their outer ring.
/// - Polylines and lines: positive distance moves to the left of the
///   walking direction.
/// - Envelopes: positive distance grows; a non-miter join produces a
///   polygon with the join applied at the corners.
///
/// Points are rejected. A zero distance or an empty input returns the input
/// unchanged.
pub struct ConstructOffset<'a> {
    geometry: &'a Geometry,
    options: OffsetOptions,
    progress: Option<&'a mut dyn ProgressTracker>,
}

impl<'a> ConstructOffset<'a> {
    #[must_use]
    pub fn new(geometry: &'a Geometry, options: OffsetOptions) -> Self {
        Self {
            geometry,
            options,
            progress: None,
        }
    }

    /// Attaches a tracker polled once per path.
    #[must_use]
    pub fn with_progress(mut self, tracker: &'a mut dyn ProgressTracker) -> Self {
        self.progress = Some(tracker);
        self
    }

    /// Executes the offset.
    ///
    /// Rings that collapse or turn inside out are dropped, so the result
    /// may be empty.
    ///
    /// # Errors
    ///
    /// - `GeometryError::UnsupportedType` for a point
    /// - `OperationError::Cancelled` if the progress tracker asks to stop
    pub fn execute(&mut self) -> Result<Geometry> {
        let geometry = self.geometry;
        let distance = self.options.distance();
        if distance == 0.0 || geometry.is_empty() {
            return Ok(geometry.clone());
        }
        match geometry {
            Geometry::Point(_) => Err(GeometryError::UnsupportedType {
                operation: "offset",
                kind: geometry.kind_name(),
            }
            .into()),
            Geometry::Line(line) => Ok(Geometry::Line(line.offset(distance))),
            Geometry::Envelope(env) => self.offset_envelope(env),
            Geometry::MultiPath(mp) => self.offset_multi_path(mp).map(Geometry::MultiPath),
        }
    }

    fn offset_envelope(&mut self, env: &Envelope2D) -> Result<Geometry> {
        let distance = self.options.distance();
        let flat = env.width() == 0.0 || env.height() == 0.0;
        if distance < 0.0 || self.options.join() == JoinType::Miter || flat {
            return Ok(Geometry::Envelope(env.inflated(distance)));
        }
        let mut polygon = MultiPath::new_polygon();
        polygon.add_path(&env.corners(), true);
        self.offset_multi_path(&polygon).map(Geometry::MultiPath)
    }

    fn offset_multi_path(&mut self, mp: &MultiPath) -> Result<MultiPath> {
        let distance = self.options.distance();
        let left = if mp.is_polygon() {
            // Clockwise outer rings grow to their left.
            let orientation = (0..mp.path_count())
                .filter_map(|p| mp.ring_area(p).ok())
                .find(|a| *a != 0.0)
                .unwrap_or(-1.0);
            if orientation < 0.0 {
                distance
            } else {
                -distance
            }
        } else {
            distance
        };

        let mut builder = LoopBuilder::new(JoinEmitter {
            distance: left,
            join: self.options.join(),
            miter_limit: self.options.miter_limit(),
            tolerance: self.options.tolerance(),
        });
        let mut out = MultiPath::new(mp.kind());
        out.set_fill_rule(mp.fill_rule());
        let total = mp.path_count();
        for path in 0..total {
            poll(&mut self.progress, path, total)?;
            let closed = mp.is_closed_path(path)?;
            let (pts, ms) = clean_path(mp.path_points(path)?, mp.path_ms(path)?, closed);
            if closed {
                if pts.len() < 3 {
                    debug!(path, "skipping degenerate ring");
                    continue;
                }
                match builder.offset_ring(&pts, &ms) {
                    Some(ring) => push_path(&mut out, &ring, mp.has_m(), true)?,
                    None => debug!(path, "offset ring collapsed"),
                }
            } else {
                if pts.len() < 2 {
                    debug!(path, "skipping degenerate path");
                    continue;
                }
                for part in builder.offset_open(&pts, &ms) {
                    push_path(&mut out, &part, mp.has_m(), false)?;
                }
            }
        }
        Ok(out)
    }
}

/// Removes consecutive duplicates, and the closing duplicate of a ring.
fn clean_path(points: &[Point2], ms: Option<&[f64]>, closed: bool) -> (Vec<Point2>, Vec<f64>) {
    let mut pts: Vec<Point2> = Vec::with_capacity(points.len());
    let mut out_ms = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        if pts.last().is_some_and(|last| same_xy(last, p)) {
            continue;
        }
        pts.push(*p);
        out_ms.push(ms.map_or(f64::NAN, |m| m[i]));
    }
    if closed {
        while pts.len() > 1 && pts.first().zip(pts.last()).is_some_and(|(a, b)| same_xy(a, b)) {
            pts.pop();
            out_ms.pop();
        }
    }
    (pts, out_ms)
}

fn push_path(out: &mut MultiPath, path: &[GraphicPoint], has_m: bool, closed: bool) -> Result<()> {
    let pts: Vec<Point2> = path.iter().map(|g| g.xy).collect();
    if has_m {
        let ms: Vec<f64> = path.iter().map(|g| g.m).collect();
        out.add_path_m(&pts, &ms, closed)
    } else {
        out.add_path(&pts, closed);
        Ok(())
    }
}

/// Builds raw offset loops and cleans them. Buffers are reused across
/// paths.
struct LoopBuilder {
    emitter: JoinEmitter,
    points: Vec<GraphicPoint>,
    joins: Vec<(Point2, PointFlags)>,
}

impl LoopBuilder {
    fn new(emitter: JoinEmitter) -> Self {
        Self {
            emitter,
            points: Vec::new(),
            joins: Vec::new(),
        }
    }

    fn offset_ring(&mut self, ring: &[Point2], ms: &[f64]) -> Option<Vec<GraphicPoint>> {
        let flags = vec![PointFlags::NONE; ring.len()];
        let result = self.offset_loop(ring, ms, &flags, None)?;
        let source_area = signed_area_2d(ring);
        let pts: Vec<Point2> = result.iter().map(|g| g.xy).collect();
        if pts.len() < 3 || signed_area_2d(&pts) * source_area <= 0.0 {
            return None;
        }
        Some(result)
    }

    /// Offsets an open path by walking it out and back as one loop, then
    /// keeps the runs of points that do not belong to the return half.
    fn offset_open(&mut self, path: &[Point2], ms: &[f64]) -> Vec<Vec<GraphicPoint>> {
        let n = path.len();
        let mut q = path.to_vec();
        q.extend(path[1..n - 1].iter().rev());
        let mut qm = ms.to_vec();
        qm.extend(ms[1..n - 1].iter().rev());
        let mut flags = vec![PointFlags::NONE; q.len()];
        flags[0].insert(PointFlags::IS_END);
        flags[n - 1].insert(PointFlags::IS_END);
        for f in &mut flags[n..] {
            f.insert(PointFlags::CLOSING_SEG);
        }

        let Some(result) = self.offset_loop(&q, &qm, &flags, Some(n)) else {
            debug!("open path offset collapsed");
            return Vec::new();
        };
        let Some(start) = result.iter().position(|g| g.flags.is_closing()) else {
            return vec![result];
        };

        let mut parts = Vec::new();
        let mut run: Vec<GraphicPoint> = Vec::new();
        for k in 0..result.len() {
            let g = result[(start + k) % result.len()];
            if g.flags.is_closing() {
                if run.len() >= 2 {
                    parts.push(std::mem::take(&mut run));
                }
                run.clear();
            } else {
                run.push(g);
            }
        }
        if run.len() >= 2 {
            parts.push(run);
        }
        parts
    }

    /// Emits the raw loop around `q` and untangles it. `open_len` is the
    /// number of source vertices when `q` is an open path walked out and
    /// back.
    fn offset_loop(
        &mut self,
        q: &[Point2],
        qm: &[f64],
        vertex_flags: &[PointFlags],
        open_len: Option<usize>,
    ) -> Option<Vec<GraphicPoint>> {
        let m = q.len();
        self.points.clear();
        for i in 0..m {
            let p0 = q[(i + m - 1) % m];
            let p = q[i];
            let p1 = q[(i + 1) % m];
            let a = (p - p0).normalize();
            let b = (p1 - p).normalize();
            let vf = vertex_flags[i];
            self.emitter.emit(p, a, b, vf.is_end(), &mut self.joins);

            let last = self.joins.len() - 1;
            for (k, &(pt, mut flags)) in self.joins.iter().enumerate() {
                flags.insert(vf.intersection(PointFlags::CLOSING_SEG));
                if let Some(n) = open_len.filter(|_| vf.is_end()) {
                    // Cap points facing the return half belong to it.
                    if (i == 0 && k != last) || (i == n - 1 && k != 0) {
                        flags.insert(PointFlags::CLOSING_SEG);
                    }
                }
                let source = (k == 0).then_some((p0, p));
                add_point(&mut self.points, pt, qm[i], flags, source);
            }
        }

        let first = *self.points.first()?;
        add_point(
            &mut self.points,
            first.xy,
            first.m,
            first.flags,
            Some((q[m - 1], q[0])),
        );
        if self.points.len() > 1
            && self
                .points
                .last()
                .is_some_and(|last| same_xy(&last.xy, &first.xy))
        {
            self.points.pop();
        }

        let n = self.points.len();
        for (i, g) in self.points.iter_mut().enumerate() {
            g.next = (i + 1) % n;
            g.prev = (i + n - 1) % n;
        }
        let head = remove_bad_segments(&mut self.points, self.emitter.distance)?;
        Some(collect_loop(&self.points, head))
    }
}

/// Appends an offset point. When `source` is given and the new segment runs
/// against the source edge `source.0 -> source.1`, the previous point is
/// marked bad and the loop detours through the source vertex.
fn add_point(
    points: &mut Vec<GraphicPoint>,
    xy: Point2,
    m: f64,
    flags: PointFlags,
    source: Option<(Point2, Point2)>,
) {
    let Some(last) = points.last_mut() else {
        points.push(GraphicPoint::new(xy, m, flags));
        return;
    };
    if same_xy(&last.xy, &xy) {
        return;
    }
    if let Some((s0, s1)) = source {
        if is_reversed(&(xy - last.xy), &(s1 - s0)) {
            last.flags.insert(PointFlags::BAD_SEG);
            points.push(GraphicPoint::new(s1, m, flags | PointFlags::BAD_SEG));
        }
    }
    points.push(GraphicPoint::new(xy, m, flags));
}
