use super::ring_of;
use crate::error::Result;
use crate::geometry::{EditShape, Envelope2D, GeometryId, PathId};
use crate::math::polygon_2d::{point_in_ring_2d, point_on_ring_boundary_2d, signed_area_2d};
use crate::math::Point2;
use crate::operations::intersect::Envelope2DIntersector;

struct Ring {
    path: PathId,
    points: Vec<Point2>,
    area: f64,
}

impl Ring {
    /// Whether this ring lies inside `other`, decided by the first vertex or
    /// edge midpoint that is off the other ring's boundary.
    fn is_inside(&self, other: &Ring) -> bool {
        let n = self.points.len();
        let midpoints = (0..n).map(|i| {
            Point2::from((self.points[i].coords + self.points[(i + 1) % n].coords) * 0.5)
        });
        self.points
            .iter()
            .copied()
            .chain(midpoints)
            .find(|p| !point_on_ring_boundary_2d(p, &other.points))
            .is_some_and(|p| point_in_ring_2d(&p, &other.points))
    }
}

/// Drops degenerate rings and orients the rest by nesting depth: rings
/// inside an even number of other rings are outer rings and run clockwise,
/// the others are holes and run counter-clockwise.
///
/// Candidate containers are the rings whose envelopes intersect.
pub(crate) fn fix_orientation(shape: &mut EditShape, geometry: GeometryId) -> Result<bool> {
    let mut changed = false;
    let mut rings = Vec::new();
    for path in shape.paths_of(geometry)?.to_vec() {
        let points: Vec<Point2> = match shape.path_first(path) {
            Some(first) => ring_of(shape, first).into_iter().map(|v| shape.xy(v)).collect(),
            None => Vec::new(),
        };
        let area = signed_area_2d(&points);
        if points.len() < 3 || area == 0.0 {
            shape.remove_path(geometry, path);
            changed = true;
            continue;
        }
        rings.push(Ring { path, points, area });
    }

    let mut depth = vec![0usize; rings.len()];
    if rings.len() > 1 {
        let mut intersector = Envelope2DIntersector::new();
        intersector.start_construction()?;
        for (i, ring) in rings.iter().enumerate() {
            intersector.add_envelope(i, Envelope2D::from_points(&ring.points))?;
        }
        intersector.end_construction()?;
        for (i, j) in intersector.pairs() {
            if rings[i].is_inside(&rings[j]) {
                depth[i] += 1;
            }
            if rings[j].is_inside(&rings[i]) {
                depth[j] += 1;
            }
        }
    }

    for (ring, d) in rings.iter().zip(depth) {
        let clockwise = ring.area < 0.0;
        if clockwise != (d % 2 == 0) {
            shape.reverse_path(ring.path);
            changed = true;
        }
    }
    Ok(changed)
}
