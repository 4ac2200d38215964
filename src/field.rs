//! Displacement field: sparse motion vectors plus a spatial index.
//!
//! The assignment stage only moves the M representatives. Every other point
//! (the rest of the primary set, and all secondary sets) gets its motion by
//! interpolating the field: query the k nearest field sources, weight each
//! stored displacement by inverse distance, and blend.
//!
//! The field is immutable once built, so interpolation over whole point sets
//! is embarrassingly parallel; each query only reads the k-d tree.

use kiddo::{KdTree, SquaredEuclidean};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

/// Guards the inverse-distance weight against division by zero when the
/// query coincides with a field source.
const IDW_EPSILON: f64 = 1e-12;

/// A set of (source → displacement) control vectors with a k-d tree over the
/// source coordinates.
pub struct DisplacementField {
    sources: Vec<[f64; 2]>,
    displacements: Vec<[f64; 2]>,
    tree: KdTree<f64, 2>,
}

impl DisplacementField {
    /// Build the field from matched pairs.
    ///
    /// `displacements[i]` is the motion vector stored at `sources[i]`
    /// (typically `target − source` from the assignment stage).
    pub fn build(sources: Vec<[f64; 2]>, displacements: Vec<[f64; 2]>) -> Self {
        debug_assert_eq!(sources.len(), displacements.len());
        let mut tree: KdTree<f64, 2> = KdTree::new();
        for (i, p) in sources.iter().enumerate() {
            tree.add(p, i as u64);
        }
        Self {
            sources,
            displacements,
            tree,
        }
    }

    /// Number of control vectors in the field.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// True if the field holds no control vectors.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Interpolate a displacement at an arbitrary query point.
    ///
    /// Finds the `k` nearest field sources and returns the inverse-distance
    /// weighted blend of their displacements (weights normalized to sum to
    /// one). A query sitting exactly on a source effectively returns that
    /// source's displacement. `k` is clamped to the field size.
    pub fn interpolate(&self, query: [f64; 2], k: usize) -> [f64; 2] {
        let k = k.min(self.len());
        if k == 0 {
            return [0.0, 0.0];
        }

        let neighbors = self.tree.nearest_n::<SquaredEuclidean>(&query, k);

        let mut weight_sum = 0.0;
        let mut out = [0.0, 0.0];
        for n in &neighbors {
            let w = 1.0 / (n.distance.sqrt() + IDW_EPSILON);
            let d = self.displacements[n.item as usize];
            out[0] += w * d[0];
            out[1] += w * d[1];
            weight_sum += w;
        }
        out[0] /= weight_sum;
        out[1] /= weight_sum;
        out
    }

    /// Interpolate displacements for every row of a point set, in parallel.
    ///
    /// Output has the same shape and row order as the input.
    pub fn interpolate_set(&self, points: &ArrayView2<f64>, k: usize) -> Array2<f64> {
        let n = points.nrows();
        let data: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                let d = self.interpolate([points[[i, 0]], points[[i, 1]]], k);
                d.into_iter()
            })
            .collect();
        Array2::from_shape_vec((n, 2), data).expect("two values per query point")
    }
}
