//! Density and coherence diagnostics.
//!
//! Both measurements are advisory: they tell the caller whether the
//! flattening did anything useful (density) and how much local structure it
//! cost (coherence). Neither is a gate, and neither is allowed to fail a run
//! that produced valid coordinates; the pipeline records them as `Option`
//! and moves on.

use kiddo::{KdTree, SquaredEuclidean};
use ndarray::ArrayView2;
use rayon::prelude::*;

/// Grid occupancy statistics for one point set.
///
/// Cell-count statistics (`max`/`mean`/`median`/`std`) are over *non-empty*
/// cells only; `empty_fraction` and `top_decile_share` are over the whole
/// grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityStats {
    /// Fraction of grid cells containing no points.
    pub empty_fraction: f64,
    /// Largest per-cell count.
    pub max_count: usize,
    /// Mean count across non-empty cells.
    pub mean_count: f64,
    /// Median count across non-empty cells.
    pub median_count: f64,
    /// Standard deviation of counts across non-empty cells.
    pub std_count: f64,
    /// Fraction of all points sitting in the densest 10% of cells.
    pub top_decile_share: f64,
}

/// Bin a point set into a `grid`×`grid` occupancy histogram and summarize it.
///
/// Coordinates are expected in [0, 1]; values outside are clamped into the
/// edge cells. Returns `None` for an empty point set or a zero grid.
pub fn density_profile(points: &ArrayView2<f64>, grid: usize) -> Option<DensityStats> {
    let n = points.nrows();
    if n == 0 || grid == 0 {
        return None;
    }

    let mut counts = vec![0usize; grid * grid];
    for i in 0..n {
        let cx = ((points[[i, 0]] * grid as f64) as usize).min(grid - 1);
        let cy = ((points[[i, 1]] * grid as f64) as usize).min(grid - 1);
        counts[cy * grid + cx] += 1;
    }

    let total_cells = counts.len();
    let mut occupied: Vec<usize> = counts.iter().copied().filter(|&c| c > 0).collect();
    let empty = total_cells - occupied.len();

    occupied.sort_unstable();
    let k = occupied.len();
    let max_count = *occupied.last().unwrap_or(&0);
    let mean = occupied.iter().sum::<usize>() as f64 / k as f64;
    let median = if k % 2 == 1 {
        occupied[k / 2] as f64
    } else {
        (occupied[k / 2 - 1] + occupied[k / 2]) as f64 / 2.0
    };
    let variance = occupied
        .iter()
        .map(|&c| {
            let d = c as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / k as f64;

    // Share of all points landing in the densest 10% of cells (of the whole
    // grid, not just occupied cells).
    let decile_cells = (total_cells / 10).max(1);
    let mut all = counts;
    all.sort_unstable_by(|a, b| b.cmp(a));
    let decile_points: usize = all.iter().take(decile_cells).sum();

    Some(DensityStats {
        empty_fraction: empty as f64 / total_cells as f64,
        max_count,
        mean_count: mean,
        median_count: median,
        std_count: variance.sqrt(),
        top_decile_share: decile_points as f64 / n as f64,
    })
}

/// Mean k-nearest-neighbor overlap between the original and flattened
/// coordinates of the same point set.
///
/// Samples up to `sample` points with a uniform stride, finds each sample's
/// k-NN set in both spaces (independent k-d trees), and averages the
/// Jaccard-style overlap `|intersection| / k`. Near 1.0 the flattening
/// barely moved local structure; near 0.0 it destroyed it.
///
/// Returns `None` when there are not enough points for a meaningful k-NN
/// set, rather than reporting a degenerate score.
pub fn coherence(
    original: &ArrayView2<f64>,
    flattened: &ArrayView2<f64>,
    k: usize,
    sample: usize,
) -> Option<f64> {
    let n = original.nrows();
    if n != flattened.nrows() || k == 0 || sample == 0 || n < k + 2 {
        return None;
    }

    let mut before: KdTree<f64, 2> = KdTree::new();
    let mut after: KdTree<f64, 2> = KdTree::new();
    for i in 0..n {
        before.add(&[original[[i, 0]], original[[i, 1]]], i as u64);
        after.add(&[flattened[[i, 0]], flattened[[i, 1]]], i as u64);
    }

    let sample = sample.min(n);
    let stride = (n / sample).max(1);
    let picks: Vec<usize> = (0..n).step_by(stride).take(sample).collect();

    let total: f64 = picks
        .par_iter()
        .map(|&i| {
            // k + 1 neighbors so the point itself can be dropped.
            let q_before = [original[[i, 0]], original[[i, 1]]];
            let q_after = [flattened[[i, 0]], flattened[[i, 1]]];
            let nn_before = before.nearest_n::<SquaredEuclidean>(&q_before, k + 1);
            let nn_after = after.nearest_n::<SquaredEuclidean>(&q_after, k + 1);

            let set_before: Vec<u64> = nn_before
                .iter()
                .map(|n| n.item)
                .filter(|&j| j != i as u64)
                .take(k)
                .collect();
            let overlap = nn_after
                .iter()
                .map(|n| n.item)
                .filter(|&j| j != i as u64)
                .take(k)
                .filter(|j| set_before.contains(j))
                .count();
            overlap as f64 / k as f64
        })
        .sum();

    Some(total / picks.len() as f64)
}
