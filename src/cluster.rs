//! Clustered assignment strategy: exact transport without sub-sampling.
//!
//! The default pipeline solves one M×M assignment over a farthest-point
//! sub-sample. This module trades that single O(M³) solve for many small
//! ones: partition the primary points into K clusters, hand each cluster a
//! bundle of quasi-uniform targets sized to its exact population, and run
//! one exact Hungarian solve per cluster. Every primary point then carries
//! its own displacement vector, which makes exact (non-subsampled)
//! assignment reachable at N in the hundreds of thousands.
//!
//! The result is exposed through the same [`DisplacementField`] contract as
//! the subsampled path, so downstream interpolation and mixing are
//! unchanged.

use crate::assign;
use crate::field::DisplacementField;
use crate::halton::halton_targets;
use crate::{Error, Result};
use ndarray::ArrayView2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const KMEANS_ITERS: usize = 25;

#[inline]
fn dist2(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Lloyd's k-means with seeded initialization.
///
/// Returns `(centroids, labels)`. Initial centroids are k distinct points
/// drawn with a seeded RNG; ties in the assignment step go to the lowest
/// centroid index, and a cluster that empties out keeps its previous
/// centroid, so the whole procedure is deterministic given the seed.
fn kmeans(points: &[[f64; 2]], k: usize, seed: u64) -> (Vec<[f64; 2]>, Vec<usize>) {
    let n = points.len();
    debug_assert!(k >= 1 && k <= n);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let init = rand::seq::index::sample(&mut rng, n, k);
    let mut centroids: Vec<[f64; 2]> = init.iter().map(|i| points[i]).collect();
    let mut labels = vec![0usize; n];

    for _ in 0..KMEANS_ITERS {
        let mut moved = false;
        for (i, p) in points.iter().enumerate() {
            let mut best = 0usize;
            let mut best_d = dist2(*p, centroids[0]);
            for (c, centroid) in centroids.iter().enumerate().skip(1) {
                let d = dist2(*p, *centroid);
                if d < best_d {
                    best_d = d;
                    best = c;
                }
            }
            if labels[i] != best {
                labels[i] = best;
                moved = true;
            }
        }

        let mut sums = vec![[0.0_f64; 2]; k];
        let mut counts = vec![0usize; k];
        for (i, p) in points.iter().enumerate() {
            sums[labels[i]][0] += p[0];
            sums[labels[i]][1] += p[1];
            counts[labels[i]] += 1;
        }
        for c in 0..k {
            if counts[c] > 0 {
                centroids[c] = [sums[c][0] / counts[c] as f64, sums[c][1] / counts[c] as f64];
            }
        }

        if !moved {
            break;
        }
    }

    (centroids, labels)
}

/// Distribute `n` global Halton targets across clusters, respecting each
/// cluster's exact population as a hard capacity.
///
/// Targets are visited in index order; each goes to the nearest centroid
/// that still has capacity. Greedy rather than optimal, but deterministic,
/// and the per-cluster Hungarian solve cleans up the pairing afterwards.
fn allocate_targets(
    targets: &[[f64; 2]],
    centroids: &[[f64; 2]],
    capacities: &[usize],
) -> Vec<Vec<usize>> {
    let k = centroids.len();
    let mut remaining = capacities.to_vec();
    let mut bundles: Vec<Vec<usize>> = vec![Vec::new(); k];

    for (t, target) in targets.iter().enumerate() {
        let mut best = usize::MAX;
        let mut best_d = f64::INFINITY;
        for c in 0..k {
            if remaining[c] == 0 {
                continue;
            }
            let d = dist2(*target, centroids[c]);
            if d < best_d {
                best_d = d;
                best = c;
            }
        }
        debug_assert!(best != usize::MAX, "capacities must sum to target count");
        remaining[best] -= 1;
        bundles[best].push(t);
    }

    bundles
}

/// Build a full-resolution displacement field via per-cluster exact solves.
///
/// Partitions the points into at most `clusters` k-means clusters, sizes a
/// bundle of quasi-uniform targets to each cluster's population, solves one
/// exact assignment per cluster, and unions the per-point displacement
/// vectors into a [`DisplacementField`].
///
/// Returns the field and the total assignment cost across all clusters.
pub fn build_clustered_field(
    points: &ArrayView2<f64>,
    clusters: usize,
    margin: f64,
    bases: (u64, u64),
    seed: u64,
) -> Result<(DisplacementField, f64)> {
    if clusters == 0 {
        return Err(Error::InvalidClusterCount);
    }
    let n = points.nrows();
    let k = clusters.min(n);

    let coords: Vec<[f64; 2]> = (0..n).map(|i| [points[[i, 0]], points[[i, 1]]]).collect();
    let (centroids, labels) = kmeans(&coords, k, seed);

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, &label) in labels.iter().enumerate() {
        members[label].push(i);
    }
    let capacities: Vec<usize> = members.iter().map(Vec::len).collect();

    let targets = halton_targets(n, margin, bases);
    let bundles = allocate_targets(&targets, &centroids, &capacities);

    let mut sources = Vec::with_capacity(n);
    let mut displacements = Vec::with_capacity(n);
    let mut total_cost = 0.0;

    for c in 0..k {
        if members[c].is_empty() {
            continue;
        }
        let cluster_sources: Vec<[f64; 2]> = members[c].iter().map(|&i| coords[i]).collect();
        let cluster_targets: Vec<[f64; 2]> = bundles[c].iter().map(|&t| targets[t]).collect();
        debug_assert_eq!(cluster_sources.len(), cluster_targets.len());

        let cost = assign::cost_matrix(&cluster_sources, &cluster_targets);
        let (perm, cost_sum) = assign::solve(&cost)?;
        drop(cost);
        total_cost += cost_sum;

        log::debug!(
            "cluster {}: {} points, assignment cost {:.4}",
            c,
            cluster_sources.len(),
            cost_sum
        );

        for (local, &j) in perm.iter().enumerate() {
            let s = cluster_sources[local];
            let t = cluster_targets[j];
            sources.push(s);
            displacements.push([t[0] - s[0], t[1] - s[1]]);
        }
    }

    Ok((DisplacementField::build(sources, displacements), total_cost))
}
