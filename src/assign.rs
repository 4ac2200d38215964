//! Exact minimum-cost bipartite assignment.
//!
//! Matches the M sampled representatives to the M quasi-uniform targets,
//! minimizing total Euclidean movement. This is the one stage that must be
//! exact rather than approximate: the displacement field interpolates
//! between these matched pairs, so a sloppy matching smears the whole map.
//!
//! The solver is the classic Hungarian algorithm in its shortest-augmenting-
//! path form with dual potentials: O(M³) time, O(M²) memory for the cost
//! matrix. Cubic cost is what bounds the practical choice of M, so the
//! matrix is built once, solved, and dropped immediately by the caller.
//!
//! # References
//!
//! - Kuhn (1955). "The Hungarian method for the assignment problem"
//! - Jonker & Volgenant (1987). "A shortest augmenting path algorithm for
//!   dense and sparse linear assignment problems"

use crate::{Error, Result};
use ndarray::Array2;
use rayon::prelude::*;

/// Euclidean cost matrix between two 2D point lists.
///
/// `C[i, j] = ||sources[i] − targets[j]||₂`. Rows are built in parallel;
/// each row only reads the shared inputs.
pub fn cost_matrix(sources: &[[f64; 2]], targets: &[[f64; 2]]) -> Array2<f64> {
    let m = sources.len();
    let n = targets.len();

    let data: Vec<f64> = sources
        .par_iter()
        .flat_map_iter(|s| {
            targets.iter().map(move |t| {
                let dx = s[0] - t[0];
                let dy = s[1] - t[1];
                (dx * dx + dy * dy).sqrt()
            })
        })
        .collect();

    Array2::from_shape_vec((m, n), data).expect("row-major m*n distances")
}

/// Solve the square assignment problem exactly.
///
/// Returns `(perm, total_cost)` where row `i` is matched to column
/// `perm[i]` and `total_cost` is the minimal sum of matched entries.
///
/// # Errors
///
/// - [`Error::CostNotSquare`] if the matrix is not square.
/// - [`Error::NonFiniteCost`] if any entry is NaN or infinite. With
///   validated finite inputs this is unreachable, but the solver fails
///   loudly rather than quietly returning a default permutation.
pub fn solve(cost: &Array2<f64>) -> Result<(Vec<usize>, f64)> {
    let n = cost.nrows();
    if cost.ncols() != n {
        return Err(Error::CostNotSquare(cost.nrows(), cost.ncols()));
    }
    if n == 0 {
        return Ok((Vec::new(), 0.0));
    }
    for ((i, j), &c) in cost.indexed_iter() {
        if !c.is_finite() {
            return Err(Error::NonFiniteCost(i, j));
        }
    }

    // Hungarian algorithm, shortest-augmenting-path formulation.
    // One augmenting pass per row; Dijkstra-style growth of the alternating
    // tree over columns, with dual potentials u (rows) and v (columns).
    // Index 0 is a sentinel; rows/columns are 1-based internally.
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; n + 1];
    // p[j] = row currently matched to column j (0 = unmatched).
    let mut p = vec![0_usize; n + 1];
    // way[j] = previous column on the alternating path reaching j.
    let mut way = vec![0_usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0_usize;
        let mut minv = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0_usize;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let cur = cost[[i0 - 1, j - 1]] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        // Flip matched/unmatched edges back along the augmenting path.
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut perm = vec![0_usize; n];
    for j in 1..=n {
        perm[p[j] - 1] = j - 1;
    }

    let total: f64 = perm.iter().enumerate().map(|(i, &j)| cost[[i, j]]).sum();
    Ok((perm, total))
}
