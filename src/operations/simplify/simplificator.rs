use slotmap::SecondaryMap;
use tracing::{debug, trace};

use super::bunch::BunchProcessor;
use super::orientation::fix_orientation;
use super::{pred, ring_of, succ};
use crate::error::{GeometryError, OperationError, Result};
use crate::geometry::{EditShape, FillRule, GeometryId, PathKind, VertexId};
use crate::math::predicates::{compare_xy, same_xy};
use crate::progress::{poll, ProgressTracker};

/// Upper bound on cleanup and bunch passes before the chain is considered
/// corrupt.
const MAX_PASSES: usize = 100;

/// Reduces a winding-rule polygon to an equivalent odd-even one, snapping
/// near-coincident vertices and cracking crossing segments on the way.
pub trait WindingReducer {
    /// Rewrites `geometry` in place. Returns `true` if anything changed.
    ///
    /// # Errors
    ///
    /// Implementations report their own failures.
    fn reduce(&mut self, shape: &mut EditShape, geometry: GeometryId) -> Result<bool>;
}

/// Turns a cracked and clustered polygon into a simple one under the
/// odd-even fill rule.
///
/// Coincidence is exact equality of coordinates; near-coincident vertices
/// must be snapped beforehand.
#[derive(Default)]
pub struct Simplificator<'a> {
    winding: Option<&'a mut dyn WindingReducer>,
    progress: Option<&'a mut dyn ProgressTracker>,
    bunches: BunchProcessor,
}

impl<'a> Simplificator<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the collaborator used for winding-rule input.
    #[must_use]
    pub fn with_winding_reducer(mut self, reducer: &'a mut dyn WindingReducer) -> Self {
        self.winding = Some(reducer);
        self
    }

    /// Attaches a tracker polled once per pass and once per bunch.
    #[must_use]
    pub fn with_progress(mut self, tracker: &'a mut dyn ProgressTracker) -> Self {
        self.progress = Some(tracker);
        self
    }

    /// Simplifies `geometry` in place and reports whether anything changed.
    ///
    /// With `known_simple` the vertex-level repair is skipped and only ring
    /// orientation is fixed. With `fix_self_tangency` a ring touching itself
    /// at a vertex is split there into separate rings.
    ///
    /// # Errors
    ///
    /// - `GeometryError::UnsupportedType` for a polyline
    /// - `OperationError::InvalidInput` for winding fill without a reducer
    /// - `OperationError::Cancelled` if the progress tracker asks to stop
    ///
    /// # Panics
    ///
    /// Panics if the repair does not settle within a fixed number of
    /// passes, which means the vertex links are corrupt.
    pub fn execute(
        &mut self,
        shape: &mut EditShape,
        geometry: GeometryId,
        known_simple: bool,
        fix_self_tangency: bool,
    ) -> Result<bool> {
        let data = shape.geometry(geometry)?;
        let (kind, fill_rule) = (data.kind, data.fill_rule);
        if kind != PathKind::Polygon {
            return Err(GeometryError::UnsupportedType {
                operation: "simplify",
                kind: "polyline",
            }
            .into());
        }

        let mut changed = false;
        if fill_rule == FillRule::Winding {
            let Some(reducer) = self.winding.as_deref_mut() else {
                return Err(OperationError::InvalidInput(
                    "winding fill rule requires a winding reducer".to_owned(),
                )
                .into());
            };
            changed |= reducer.reduce(shape, geometry)?;
            shape.geometry_mut(geometry)?.fill_rule = FillRule::OddEven;
        }

        if !known_simple {
            changed |= self.resolve_vertices(shape, geometry, fix_self_tangency)?;
        }
        changed |= fix_orientation(shape, geometry)?;
        debug!(changed, "simplify finished");
        Ok(changed)
    }

    fn resolve_vertices(
        &mut self,
        shape: &mut EditShape,
        geometry: GeometryId,
        fix_self_tangency: bool,
    ) -> Result<bool> {
        let mut changed = false;
        for pass in 0..MAX_PASSES {
            poll(&mut self.progress, pass, MAX_PASSES)?;
            let cleaned = remove_spikes(shape, geometry);
            if cleaned {
                fix_orphan_vertices(shape, geometry)?;
            }
            let spliced = self.process_bunches(shape, geometry, fix_self_tangency)?;
            if spliced {
                fix_orphan_vertices(shape, geometry)?;
                remove_spikes(shape, geometry);
                fix_orphan_vertices(shape, geometry)?;
            }
            trace!(pass, cleaned, spliced, "simplify pass");
            if !cleaned && !spliced {
                return Ok(changed);
            }
            changed = true;
        }
        panic!("simplify did not settle after {MAX_PASSES} passes");
    }

    /// Sorts all vertices by (x, y, path order) and resolves every run of
    /// coincident vertices.
    fn process_bunches(
        &mut self,
        shape: &mut EditShape,
        geometry: GeometryId,
        fix_self_tangency: bool,
    ) -> Result<bool> {
        let mut order: SecondaryMap<VertexId, usize> = SecondaryMap::new();
        let mut sorted = shape.geometry_vertices(geometry)?;
        for (i, &v) in sorted.iter().enumerate() {
            order.insert(v, i);
        }
        sorted.sort_by(|&a, &b| {
            compare_xy(&shape.xy(a), &shape.xy(b)).then_with(|| order[a].cmp(&order[b]))
        });

        let mut changed = false;
        let mut start = 0;
        let mut members = Vec::new();
        while start < sorted.len() {
            // Splices earlier in the pass may have removed vertices of later
            // bunches; the order is only rebuilt on the next pass.
            if !shape.is_alive(sorted[start]) {
                start += 1;
                continue;
            }
            let center = shape.xy(sorted[start]);
            members.clear();
            members.push(sorted[start]);
            let mut end = start + 1;
            while end < sorted.len() {
                let v = sorted[end];
                if shape.is_alive(v) {
                    if !same_xy(&shape.xy(v), &center) {
                        break;
                    }
                    members.push(v);
                }
                end += 1;
            }
            if members.len() > 1 {
                poll(&mut self.progress, start, sorted.len())?;
                changed |=
                    self.bunches
                        .process(shape, geometry, &mut members, fix_self_tangency);
            }
            start = end;
        }
        Ok(changed)
    }
}

/// Removes self-looped vertices, consecutive duplicates, two-vertex rings
/// and spikes until none remain. Returns `true` if anything was removed.
pub(crate) fn remove_spikes(shape: &mut EditShape, geometry: GeometryId) -> bool {
    let mut changed = false;
    loop {
        let mut again = false;
        for v in shape.live_vertices(geometry) {
            if !shape.is_alive(v) {
                continue;
            }
            let next = succ(shape, v);
            if next == v {
                shape.remove_vertex_raw(v);
            } else if same_xy(&shape.xy(v), &shape.xy(next)) {
                shape.remove_vertex(next);
            } else if succ(shape, next) == v {
                shape.remove_vertex_raw(next);
                shape.remove_vertex_raw(v);
            } else if same_xy(&shape.xy(pred(shape, v)), &shape.xy(next)) {
                shape.remove_vertex(v);
                shape.remove_vertex(next);
            } else {
                continue;
            }
            again = true;
        }
        if !again {
            return changed;
        }
        changed = true;
    }
}

/// Rebuilds the path index after splicing. A path survives if its first
/// vertex is alive, still belongs to it and sits on a ring no earlier path
/// claimed; every vertex left unclaimed starts a new path.
fn fix_orphan_vertices(shape: &mut EditShape, geometry: GeometryId) -> Result<()> {
    let mut claimed: SecondaryMap<VertexId, ()> = SecondaryMap::new();
    let mut kept = Vec::new();
    for path in shape.paths_of(geometry)?.to_vec() {
        let Some(first) = shape.path_first(path) else {
            continue;
        };
        if !shape.is_alive(first)
            || shape.vertex_path(first) != Some(path)
            || claimed.contains_key(first)
        {
            continue;
        }
        let ring = ring_of(shape, first);
        if ring.iter().any(|&v| claimed.contains_key(v)) {
            continue;
        }
        for v in ring {
            claimed.insert(v, ());
            shape.set_vertex_path(v, Some(path));
        }
        kept.push(path);
    }
    shape.set_paths(geometry, kept);

    for v in shape.live_vertices(geometry) {
        if claimed.contains_key(v) {
            continue;
        }
        let path = shape.create_path(geometry, v);
        for w in ring_of(shape, v) {
            claimed.insert(w, ());
            shape.set_vertex_path(w, Some(path));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::GeoplanarError;
    use crate::geometry::MultiPath;
    use crate::math::Point2;
    use crate::progress::testing::StopAfter;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn polygon(rings: &[&[(f64, f64)]]) -> MultiPath {
        let paths: Vec<Vec<Point2>> = rings
            .iter()
            .map(|r| r.iter().map(|&(x, y)| Point2::new(x, y)).collect())
            .collect();
        MultiPath::from_paths(PathKind::Polygon, &paths)
    }

    struct Outcome {
        changed: bool,
        changed_again: bool,
        result: MultiPath,
    }

    impl Outcome {
        fn areas(&self) -> Vec<f64> {
            (0..self.result.path_count())
                .map(|p| self.result.ring_area(p).unwrap())
                .collect()
        }
    }

    fn simplify(rings: &[&[(f64, f64)]], fix_self_tangency: bool) -> Outcome {
        init_tracing();
        let mut shape = EditShape::new();
        let g = shape.add_geometry(&polygon(rings));
        let mut simplificator = Simplificator::new();
        let changed = simplificator
            .execute(&mut shape, g, false, fix_self_tangency)
            .unwrap();
        let changed_again = simplificator
            .execute(&mut shape, g, false, fix_self_tangency)
            .unwrap();
        Outcome {
            changed,
            changed_again,
            result: shape.to_multipath(g).unwrap(),
        }
    }

    #[test]
    fn bowtie_splits_into_two_clockwise_triangles() {
        let out = simplify(
            &[&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (2.0, 0.0), (1.0, 1.0), (0.0, 2.0)]],
            true,
        );
        assert!(out.changed);
        assert!(!out.changed_again);
        assert_eq!(out.areas(), vec![-1.0, -1.0]);
        assert_eq!(out.result.vertex_count(), 6);
    }

    #[test]
    fn clockwise_square_is_left_alone() {
        let out = simplify(&[&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)]], true);
        assert!(!out.changed);
        assert_eq!(out.areas(), vec![-16.0]);
    }

    #[test]
    fn counter_clockwise_square_is_reversed() {
        let out = simplify(&[&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]], true);
        assert!(out.changed);
        assert!(!out.changed_again);
        assert_eq!(out.areas(), vec![-16.0]);
    }

    #[test]
    fn rings_sharing_an_edge_merge() {
        let left: &[(f64, f64)] = &[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)];
        let opposite: &[(f64, f64)] = &[(1.0, 0.0), (1.0, 1.0), (2.0, 1.0), (2.0, 0.0)];
        let same: &[(f64, f64)] = &[(1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0)];
        for right in [opposite, same] {
            let out = simplify(&[left, right], true);
            assert!(out.changed);
            assert!(!out.changed_again);
            assert_eq!(out.areas(), vec![-2.0]);
            assert_eq!(out.result.vertex_count(), 6);
        }
    }

    #[test]
    fn ring_overlapping_itself_along_an_edge_merges() {
        let out = simplify(
            &[&[
                (0.0, 0.0),
                (0.0, 2.0),
                (2.0, 2.0),
                (2.0, 0.0),
                (4.0, 0.0),
                (4.0, 2.0),
                (2.0, 2.0),
                (2.0, 0.0),
            ]],
            true,
        );
        assert!(!out.changed_again);
        assert_eq!(out.areas(), vec![-8.0]);
        assert_eq!(out.result.vertex_count(), 6);
    }

    #[test]
    fn four_squares_around_one_vertex_merge() {
        let out = simplify(
            &[
                &[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)],
                &[(1.0, 0.0), (1.0, 1.0), (2.0, 1.0), (2.0, 0.0)],
                &[(0.0, 1.0), (0.0, 2.0), (1.0, 2.0), (1.0, 1.0)],
                &[(1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 1.0)],
            ],
            true,
        );
        assert!(out.changed);
        assert!(!out.changed_again);
        assert_eq!(out.areas(), vec![-4.0]);
    }

    #[test]
    fn three_squares_sharing_a_corner_merge() {
        let out = simplify(
            &[
                &[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)],
                &[(1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 1.0)],
                &[(1.0, 0.0), (1.0, 1.0), (2.0, 1.0), (2.0, 0.0)],
            ],
            true,
        );
        assert!(out.changed);
        assert!(!out.changed_again);
        assert_eq!(out.areas(), vec![-3.0]);
    }

    #[test]
    fn spikes_and_duplicates_are_removed() {
        let spike: &[(f64, f64)] = &[
            (0.0, 0.0),
            (0.0, 4.0),
            (4.0, 4.0),
            (6.0, 6.0),
            (4.0, 4.0),
            (4.0, 0.0),
        ];
        let dups: &[(f64, f64)] = &[
            (0.0, 0.0),
            (0.0, 0.0),
            (0.0, 4.0),
            (4.0, 4.0),
            (4.0, 4.0),
            (4.0, 0.0),
        ];
        for ring in [spike, dups] {
            let out = simplify(&[ring], true);
            assert!(out.changed);
            assert!(!out.changed_again);
            assert_eq!(out.areas(), vec![-16.0]);
            assert_eq!(out.result.vertex_count(), 4);
        }
    }

    #[test]
    fn nested_rings_alternate_orientation() {
        let out = simplify(
            &[
                &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
                &[(2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0)],
                &[(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)],
            ],
            true,
        );
        assert!(out.changed);
        assert!(!out.changed_again);
        assert_eq!(out.areas(), vec![-100.0, 36.0, -4.0]);
    }

    #[test]
    fn hole_touching_its_container_along_an_edge_is_nested() {
        let mut shape = EditShape::new();
        let g = shape.add_geometry(&polygon(&[
            &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            &[(10.0, 2.0), (10.0, 8.0), (6.0, 8.0), (6.0, 2.0)],
        ]));
        assert!(Simplificator::new().execute(&mut shape, g, true, false).unwrap());
        let result = shape.to_multipath(g).unwrap();
        assert_relative_eq!(result.ring_area(0).unwrap(), -100.0);
        assert_relative_eq!(result.ring_area(1).unwrap(), 24.0);
    }

    #[test]
    fn self_tangency_splits_only_on_request() {
        let figure_eight: &[(f64, f64)] = &[
            (0.0, 0.0),
            (0.0, 2.0),
            (2.0, 2.0),
            (2.0, 0.0),
            (4.0, 0.0),
            (4.0, -2.0),
            (2.0, -2.0),
            (2.0, 0.0),
        ];
        let split = simplify(&[figure_eight], true);
        assert!(split.changed);
        assert!(!split.changed_again);
        assert_eq!(split.areas(), vec![-4.0, -4.0]);

        let kept = simplify(&[figure_eight], false);
        assert!(!kept.changed);
        assert_eq!(kept.areas(), vec![-8.0]);
    }

    #[test]
    fn degenerate_rings_are_dropped() {
        let out = simplify(
            &[
                &[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)],
                &[(5.0, 5.0), (6.0, 6.0), (7.0, 7.0)],
            ],
            true,
        );
        assert!(out.changed);
        assert_eq!(out.areas(), vec![-16.0]);
    }

    #[test]
    fn known_simple_only_fixes_orientation() {
        let mut shape = EditShape::new();
        let g = shape.add_geometry(&polygon(&[&[
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 4.0),
            (4.0, 4.0),
            (0.0, 4.0),
        ]]));
        assert!(Simplificator::new().execute(&mut shape, g, true, false).unwrap());
        let result = shape.to_multipath(g).unwrap();
        assert_eq!(result.vertex_count(), 5);
        assert_relative_eq!(result.area(), -16.0);
    }

    struct CountingReducer {
        calls: usize,
    }

    impl WindingReducer for CountingReducer {
        fn reduce(&mut self, _shape: &mut EditShape, _geometry: GeometryId) -> Result<bool> {
            self.calls += 1;
            Ok(false)
        }
    }

    #[test]
    fn winding_fill_needs_a_reducer() {
        let mut mp = polygon(&[&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)]]);
        mp.set_fill_rule(FillRule::Winding);
        let mut shape = EditShape::new();
        let g = shape.add_geometry(&mp);

        let err = Simplificator::new().execute(&mut shape, g, false, false);
        assert!(matches!(
            err,
            Err(GeoplanarError::Operation(OperationError::InvalidInput(_)))
        ));

        let mut reducer = CountingReducer { calls: 0 };
        let changed = Simplificator::new()
            .with_winding_reducer(&mut reducer)
            .execute(&mut shape, g, false, false)
            .unwrap();
        assert!(!changed);
        assert_eq!(reducer.calls, 1);
        assert_eq!(shape.geometry(g).unwrap().fill_rule, FillRule::OddEven);
    }

    #[test]
    fn polylines_are_rejected() {
        let mp = MultiPath::from_paths(
            PathKind::Polyline,
            &[vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]],
        );
        let mut shape = EditShape::new();
        let g = shape.add_geometry(&mp);
        let err = Simplificator::new().execute(&mut shape, g, false, false);
        assert!(matches!(
            err,
            Err(GeoplanarError::Geometry(GeometryError::UnsupportedType { .. }))
        ));
    }

    #[test]
    fn progress_tracker_can_cancel() {
        let mut shape = EditShape::new();
        let g = shape.add_geometry(&polygon(&[&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)]]));
        let mut stop = StopAfter::new(0);
        let result = Simplificator::new()
            .with_progress(&mut stop)
            .execute(&mut shape, g, false, false);
        assert!(matches!(
            result,
            Err(GeoplanarError::Operation(OperationError::Cancelled))
        ));
    }
}
