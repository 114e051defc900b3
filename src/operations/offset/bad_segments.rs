use super::graphic_point::{GraphicPoint, PointFlags};
use crate::math::intersect_2d::segment_segment_intersect_2d;

/// Untangles a circularly linked offset loop by splicing out every
/// `BAD_SEG` detour at the nearest crossing of the surrounding segments.
///
/// `distance` is the left offset the loop was built with; only crossings
/// turning the same way as the offset are accepted. Returns a live point of
/// the cleaned loop, or `None` if the loop collapses below three points or
/// a bad segment has no usable crossing.
pub(crate) fn remove_bad_segments(points: &mut Vec<GraphicPoint>, distance: f64) -> Option<usize> {
    let mut count = points.len();
    if count < 3 {
        return None;
    }
    let mut alive = vec![true; count];
    let mut back = Vec::with_capacity(count);
    let mut fwd = Vec::with_capacity(count);
    let mut head = 0;
    let mut cur = head;
    let mut clean_run = 0;

    while clean_run < count {
        if !points[cur].flags.is_bad() {
            clean_run += 1;
            cur = points[cur].next;
            continue;
        }
        let (anchor, removed) =
            splice_near(points, &mut alive, cur, count, distance, &mut back, &mut fwd)?;
        count -= removed;
        if count < 3 {
            return None;
        }
        if !alive[head] {
            head = anchor;
        }
        cur = anchor;
        clean_run = 0;
    }
    Some(head)
}

/// Collects the loop starting at `head` in link order.
pub(crate) fn collect_loop(points: &[GraphicPoint], head: usize) -> Vec<GraphicPoint> {
    let mut out = Vec::new();
    let mut cur = head;
    loop {
        out.push(points[cur]);
        cur = points[cur].next;
        if cur == head || out.len() > points.len() {
            break;
        }
    }
    out
}

/// Searches outward from `bad` for the closest pair of segments, one behind
/// and one ahead, that cross. On success the points between them are
/// replaced by the crossing point. Returns the point before the crossing
/// and the net number of points removed.
fn splice_near(
    points: &mut Vec<GraphicPoint>,
    alive: &mut Vec<bool>,
    bad: usize,
    count: usize,
    distance: f64,
    back: &mut Vec<usize>,
    fwd: &mut Vec<usize>,
) -> Option<(usize, usize)> {
    back.clear();
    fwd.clear();
    back.push(bad);
    fwd.push(bad);
    for k in 1..count {
        back.push(points[back[k - 1]].prev);
        fwd.push(points[fwd[k - 1]].next);
    }

    for r in 1..count {
        let pairs = (1..=r).map(|k| (r, k)).chain((1..r).map(|k| (k, r)));
        for (dm, dp) in pairs {
            if dm + dp > count - 1 {
                continue;
            }
            let im = back[dm];
            let ip = fwd[dp];
            let im_next = points[im].next;
            let ip_next = points[ip].next;
            if im_next == ip || ip_next == im {
                continue;
            }
            let Some(hit) = segment_segment_intersect_2d(
                &points[im].xy,
                &points[im_next].xy,
                &points[ip].xy,
                &points[ip_next].xy,
            ) else {
                continue;
            };
            if hit.denominator * distance <= 0.0 {
                continue;
            }

            let mut flags = PointFlags::NONE;
            if points[im].flags.is_closing() && points[ip_next].flags.is_closing() {
                flags.insert(PointFlags::CLOSING_SEG);
            }
            if points[ip].flags.is_bad() {
                flags.insert(PointFlags::BAD_SEG);
            }
            let m = points[im].m + hit.t * (points[im_next].m - points[im].m);

            let mut removed = 0;
            let mut c = im_next;
            while c != ip_next {
                alive[c] = false;
                removed += 1;
                c = points[c].next;
            }

            let x = points.len();
            let mut crossing = GraphicPoint::new(hit.point, m, flags);
            crossing.prev = im;
            crossing.next = ip_next;
            points.push(crossing);
            alive.push(true);
            points[im].next = x;
            points[ip_next].prev = x;
            return Some((im, removed - 1));
        }
    }
    None
}
