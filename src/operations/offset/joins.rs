use std::f64::consts::PI;

use super::graphic_point::PointFlags;
use super::options::JoinType;
use crate::math::{cross, left_normal, Point2, Vector2};

/// Smallest angular step of a round join (one degree).
const MIN_ROUND_STEP: f64 = PI / 180.0;

/// Miter denominators below this put the miter point at infinity.
const MITER_EPS: f64 = 1e-12;

/// Emits the offset points around one source vertex.
///
/// `distance` is a left offset: positive values move to the left of the
/// walking direction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct JoinEmitter {
    pub distance: f64,
    pub join: JoinType,
    pub miter_limit: f64,
    pub tolerance: f64,
}

impl JoinEmitter {
    /// Replaces `out` with the offset points for vertex `p`, reached along
    /// unit direction `a` and left along unit direction `b`.
    ///
    /// Inner turns emit a `BAD_SEG` detour through the vertex itself that is
    /// resolved later. End vertices always get a round cap.
    pub(crate) fn emit(
        &self,
        p: Point2,
        a: Vector2,
        b: Vector2,
        is_end: bool,
        out: &mut Vec<(Point2, PointFlags)>,
    ) {
        out.clear();
        let d = self.distance;
        let na = left_normal(&a);
        let nb = left_normal(&b);
        let turn = cross(&a, &b);
        let dot = a.dot(&b);
        let pa = p + na * d;
        let pb = p + nb * d;

        if !is_end && turn * d > 0.0 {
            out.push((pa, PointFlags::BAD_SEG));
            out.push((p, PointFlags::BAD_SEG));
            out.push((pb, PointFlags::NONE));
            return;
        }
        if !is_end && turn == 0.0 && dot > 0.0 {
            out.push((pa, PointFlags::NONE));
            return;
        }

        let join = if is_end { JoinType::Round } else { self.join };
        match join {
            JoinType::Bevel => {
                out.push((pa, PointFlags::NONE));
                out.push((pb, PointFlags::NONE));
            }
            JoinType::Round => self.round(p, na, pa, pb, turn, dot, out),
            JoinType::Miter => {
                self.miter(p, a, b, pa, pb, self.miter_limit * d.abs(), out);
            }
            JoinType::Square if dot >= 0.0 => self.miter(p, a, b, pa, pb, f64::INFINITY, out),
            JoinType::Square => {
                out.push((pa + a * d.abs(), PointFlags::NONE));
                out.push((pb - b * d.abs(), PointFlags::NONE));
            }
        }
    }

    #[allow(
        clippy::too_many_arguments,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn round(
        &self,
        p: Point2,
        na: Vector2,
        pa: Point2,
        pb: Point2,
        turn: f64,
        dot: f64,
        out: &mut Vec<(Point2, PointFlags)>,
    ) {
        let d = self.distance;
        let ad = d.abs();
        let angle = if turn == 0.0 && dot < 0.0 {
            PI
        } else {
            turn.abs().atan2(dot)
        };
        let half_tol = 0.5 * self.tolerance;
        let chord_step = if half_tol >= ad {
            PI
        } else {
            2.0 * (1.0 - half_tol / ad).acos()
        };
        let step = chord_step.max(MIN_ROUND_STEP);
        let steps = ((angle / step - 1e-12).ceil() as usize).max(1);
        let sign = if d > 0.0 { -1.0 } else { 1.0 };
        let sweep = sign * angle / steps as f64;
        let (s, c) = sweep.sin_cos();

        out.push((pa, PointFlags::NONE));
        let mut v = na * d;
        for _ in 1..steps {
            v = Vector2::new(v.x * c - v.y * s, v.x * s + v.y * c);
            out.push((p + v, PointFlags::NONE));
        }
        out.push((pb, PointFlags::NONE));
    }

    #[allow(clippy::too_many_arguments)]
    fn miter(
        &self,
        p: Point2,
        a: Vector2,
        b: Vector2,
        pa: Point2,
        pb: Point2,
        limit: f64,
        out: &mut Vec<(Point2, PointFlags)>,
    ) {
        let d = self.distance;
        let na = left_normal(&a);
        let nb = left_normal(&b);
        let den = 1.0 + na.dot(&nb);
        if den > MITER_EPS {
            let m = (na + nb) * (d / den);
            if m.norm() <= limit {
                out.push((p + m, PointFlags::NONE));
                return;
            }
        }

        // Cut the miter at distance `miter_limit * |d|` along the bisector.
        let s = na + nb;
        let len = s.norm();
        let w = if len < MITER_EPS { a } else { s * (d.signum() / len) };
        let reach = self.miter_limit * d.abs();
        let s1 = (reach - d * na.dot(&w)) / a.dot(&w);
        let s2 = (reach - d * nb.dot(&w)) / b.dot(&w);
        out.push((pa + a * s1, PointFlags::NONE));
        out.push((pb + b * s2, PointFlags::NONE));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn emitter(distance: f64, join: JoinType) -> JoinEmitter {
        JoinEmitter {
            distance,
            join,
            miter_limit: 2.0,
            tolerance: 0.01,
        }
    }

    fn emit(e: &JoinEmitter, a: Vector2, b: Vector2, is_end: bool) -> Vec<(Point2, PointFlags)> {
        let mut out = Vec::new();
        e.emit(Point2::origin(), a, b, is_end, &mut out);
        out
    }

    #[test]
    fn right_angle_joins() {
        // Walking +x then +y turns left; a right offset sits on the outside.
        let a = Vector2::x();
        let b = Vector2::y();

        let miter = emit(&emitter(-1.0, JoinType::Miter), a, b, false);
        assert_eq!(miter.len(), 1);
        assert_relative_eq!(miter[0].0, Point2::new(1.0, -1.0), epsilon = 1e-12);

        let bevel = emit(&emitter(-1.0, JoinType::Bevel), a, b, false);
        assert_eq!(bevel.len(), 2);
        assert_relative_eq!(bevel[0].0, Point2::new(0.0, -1.0), epsilon = 1e-12);
        assert_relative_eq!(bevel[1].0, Point2::new(1.0, 0.0), epsilon = 1e-12);

        let round = emit(&emitter(-1.0, JoinType::Round), a, b, false);
        assert!(round.len() > 3);
        for (pt, _) in &round {
            assert_relative_eq!(pt.coords.norm(), 1.0, epsilon = 1e-12);
            assert!(pt.x >= -1e-12 && pt.y <= 1e-12);
        }
    }

    #[test]
    fn inner_turn_detours_through_vertex() {
        let out = emit(&emitter(1.0, JoinType::Round), Vector2::x(), Vector2::y(), false);
        assert_eq!(out.len(), 3);
        assert!(out[0].1.is_bad() && out[1].1.is_bad() && !out[2].1.is_bad());
        assert_relative_eq!(out[1].0, Point2::origin());
    }

    #[test]
    fn straight_vertex_emits_single_point() {
        let out = emit(&emitter(1.0, JoinType::Miter), Vector2::x(), Vector2::x(), false);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].0, Point2::new(0.0, 1.0));
    }

    #[test]
    fn sharp_miter_is_cut_at_limit() {
        let a = Vector2::x();
        let b = Vector2::new(-1.0, 0.1).normalize();
        let out = emit(&emitter(-1.0, JoinType::Miter), a, b, false);
        assert_eq!(out.len(), 2);
        let bisector = -(left_normal(&a) + left_normal(&b)).normalize();
        for (pt, _) in &out {
            assert_relative_eq!(pt.coords.dot(&bisector), 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn end_cap_is_round_and_goes_forward() {
        let out = emit(&emitter(1.0, JoinType::Bevel), Vector2::x(), -Vector2::x(), true);
        assert!(out.len() > 3);
        assert_relative_eq!(out[0].0, Point2::new(0.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(out.last().unwrap().0, Point2::new(0.0, -1.0), epsilon = 1e-12);
        assert!(out.iter().all(|(pt, _)| pt.x >= -1e-12));
    }

    #[test]
    fn square_reversal_extends_by_distance() {
        let out = emit(&emitter(1.0, JoinType::Square), Vector2::x(), -Vector2::x(), false);
        assert_eq!(out.len(), 2);
        assert_relative_eq!(out[0].0, Point2::new(1.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(out[1].0, Point2::new(1.0, -1.0), epsilon = 1e-12);
    }
}
