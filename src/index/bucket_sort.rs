use std::cmp::Ordering;

/// Inputs shorter than this are sorted by comparison only.
const MIN_BUCKET_SORT_LEN: usize = 64;

/// Sorts `items` by a numeric key, refining with `cmp`.
///
/// Items are scattered into evenly spaced buckets over the key range and each
/// bucket is then sorted with `cmp`. `cmp` must agree with the key order:
/// items with a smaller key must compare `Less`. Short inputs, non-finite key
/// ranges and single-valued ranges fall back to a plain comparison sort.
pub(crate) fn bucket_sort<T, K, C>(items: &mut [T], key: K, cmp: C)
where
    T: Copy,
    K: Fn(&T) -> f64,
    C: Fn(&T, &T) -> Ordering,
{
    let n = items.len();
    if n < MIN_BUCKET_SORT_LEN {
        items.sort_by(&cmp);
        return;
    }
    let (lo, hi) = items.iter().map(&key).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), k| {
        (lo.min(k), hi.max(k))
    });
    if !lo.is_finite() || !hi.is_finite() || hi <= lo {
        items.sort_by(&cmp);
        return;
    }

    let buckets = n;
    #[allow(clippy::cast_precision_loss)]
    let scale = (buckets - 1) as f64 / (hi - lo);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bucket_of = |item: &T| -> usize {
        let b = ((key(item) - lo) * scale) as usize;
        b.min(buckets - 1)
    };

    let mut starts = vec![0usize; buckets + 1];
    for item in items.iter() {
        starts[bucket_of(item) + 1] += 1;
    }
    for i in 0..buckets {
        starts[i + 1] += starts[i];
    }
    let mut fill = starts.clone();
    let mut scattered: Vec<Option<T>> = vec![None; n];
    for item in items.iter() {
        let b = bucket_of(item);
        scattered[fill[b]] = Some(*item);
        fill[b] += 1;
    }
    for (slot, item) in items.iter_mut().zip(scattered.into_iter().flatten()) {
        *slot = item;
    }
    for w in starts.windows(2) {
        if w[1] - w[0] > 1 {
            items[w[0]..w[1]].sort_by(&cmp);
        }
    }
}
