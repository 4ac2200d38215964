//! Representative sub-sampling via greedy farthest-point selection.
//!
//! The exact assignment step is O(M³), so the primary set is first reduced
//! to M well-separated representatives. Farthest-point sampling covers the
//! cloud's extent far better than a uniform draw of the same size: it always
//! picks the remaining point with the largest minimum distance to everything
//! already selected.
//!
//! O(N·M) time, O(N) memory for the running minimum-distance array. The
//! per-point distance updates are data-parallel and run under rayon.

use ndarray::ArrayView2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

#[inline]
fn dist2(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Select `m` distinct, mutually far-apart indices into `points`.
///
/// The start point is drawn from a seeded RNG; everything after that is a
/// deterministic greedy argmax with ties broken by lowest index. If
/// `m >= points.nrows()`, all indices are returned in order (no sampling).
pub fn farthest_point_sample(points: &ArrayView2<f64>, m: usize, seed: u64) -> Vec<usize> {
    let n = points.nrows();
    if m >= n {
        return (0..n).collect();
    }

    let coords: Vec<[f64; 2]> = (0..n).map(|i| [points[[i, 0]], points[[i, 1]]]).collect();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let first = rng.gen_range(0..n);

    let mut selected = Vec::with_capacity(m);
    selected.push(first);

    // min_d2[i] = squared distance from point i to its nearest selected point.
    // Selected points are marked -inf so they can never win the argmax, even
    // when every remaining candidate is a duplicate at distance zero.
    let mut min_d2 = vec![f64::INFINITY; n];
    min_d2[first] = f64::NEG_INFINITY;

    let mut latest = first;
    while selected.len() < m {
        let anchor = coords[latest];
        min_d2
            .par_iter_mut()
            .zip(coords.par_iter())
            .for_each(|(d, &p)| {
                if *d != f64::NEG_INFINITY {
                    let cand = dist2(p, anchor);
                    if cand < *d {
                        *d = cand;
                    }
                }
            });

        // Argmax over (distance, -index): largest min-distance wins, lowest
        // index wins ties. The reduction is associative, so the parallel
        // result is deterministic.
        let (next, _) = min_d2
            .par_iter()
            .enumerate()
            .map(|(i, &d)| (i, d))
            .reduce(
                || (usize::MAX, f64::NEG_INFINITY),
                |a, b| {
                    if b.1 > a.1 || (b.1 == a.1 && b.0 < a.0) {
                        b
                    } else {
                        a
                    }
                },
            );

        min_d2[next] = f64::NEG_INFINITY;
        selected.push(next);
        latest = next;
    }

    selected
}
