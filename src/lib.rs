//! # uncrowd
//!
//! Density-flattening for skewed 2D point fields via approximate optimal
//! transport.
//!
//! ## The Problem
//!
//! Dimensionality reduction routinely dumps the overwhelming majority of a
//! large point cloud into a small fraction of the plane, leaving most of the
//! area empty. A map rendered from such a projection is unusable: labels
//! collide in the dense blob and the rest of the canvas is wasted.
//!
//! `uncrowd` computes a smooth deformation of the point field that pulls it
//! toward spatial uniformity while preserving local neighborhoods as much as
//! possible.
//!
//! ## Pipeline
//!
//! | Stage | Module | Complexity |
//! |-------|--------|------------|
//! | Farthest-point sub-sampling | [`sample`] | O(N·M) |
//! | Halton target generation | [`halton`] | O(M) |
//! | Exact bipartite assignment | [`assign`] | O(M³) |
//! | Field interpolation (IDW, k-NN) | [`field`] | O(N log M) |
//! | Mixing + joint renormalization | [`flatten`] | O(N) |
//! | Density / coherence diagnostics | [`diagnostics`] | O(N log N) |
//!
//! The cubic assignment stage is why the primary set is sub-sampled: M is
//! chosen as the largest value the latency budget allows, not a fraction of
//! N. [`Strategy::Clustered`] swaps the single subsampled solve for many
//! small per-cluster exact solves (see [`cluster`]), which makes
//! non-subsampled assignment reachable at N in the hundreds of thousands.
//!
//! ## Quick Start
//!
//! ```rust
//! use ndarray::Array2;
//! use uncrowd::{flatten, FlattenConfig};
//!
//! // A skewed cloud: five out of six points crammed into one corner.
//! let mut primary = Array2::zeros((300, 2));
//! for i in 0..300 {
//!     let t = i as f64 / 300.0;
//!     if i < 250 {
//!         primary[[i, 0]] = 0.05 * t;
//!         primary[[i, 1]] = 0.05 * (1.0 - t);
//!     } else {
//!         primary[[i, 0]] = t;
//!         primary[[i, 1]] = (7.0 * t) % 1.0;
//!     }
//! }
//!
//! let config = FlattenConfig {
//!     sample_size: 60,
//!     ..FlattenConfig::default()
//! };
//! let result = flatten(&primary, &[], &config).unwrap();
//!
//! assert_eq!(result.primary.nrows(), 300);
//! assert!(result.primary.iter().all(|&v| (0.0..=1.0).contains(&v)));
//! ```
//!
//! ## What Can Go Wrong
//!
//! 1. **μ too aggressive**: local structure is destroyed. Watch the
//!    coherence score in [`RunDiagnostics`] and back μ off.
//! 2. **M too small**: the field is too sparse to resolve the density
//!    gradient; the empty-cell fraction barely moves.
//! 3. **Degenerate input**: fewer than two primary points, or all points
//!    coincident, fails the run up front rather than emitting NaNs.
//! 4. **Secondary drift**: secondary sets are interpolated against the same
//!    field and renormalized in the same frame; flattening them separately
//!    would break their alignment with the primary set.
//!
//! ## References
//!
//! - Peyré & Cuturi (2019). "Computational Optimal Transport"
//! - Eldar et al. (1997). "The farthest point strategy for progressive image
//!   sampling"
//! - Halton (1960). "On the efficiency of certain quasi-random sequences"

use ndarray::Array2;
use thiserror::Error;

pub mod assign;
pub mod cluster;
pub mod diagnostics;
pub mod field;
pub mod halton;
pub mod sample;

pub use diagnostics::DensityStats;
pub use field::DisplacementField;

/// Flattening error variants.
#[derive(Debug, Error)]
pub enum Error {
    /// Mixing factor outside [0, 1].
    #[error("mixing factor must lie in [0, 1], got {0}")]
    InvalidMix(f64),

    /// Interpolation neighbor count of zero.
    #[error("interpolation neighbor count must be at least 1")]
    InvalidNeighbors,

    /// Output margin outside [0, 0.5).
    #[error("output margin must lie in [0, 0.5), got {0}")]
    InvalidMargin(f64),

    /// Sub-sample size of zero.
    #[error("sub-sample size must be at least 1")]
    InvalidSampleSize,

    /// Cluster count of zero for the clustered strategy.
    #[error("cluster count must be at least 1")]
    InvalidClusterCount,

    /// A point set whose rows are not 2D coordinates.
    #[error("point sets must have exactly two columns, got {0}")]
    BadPointShape(usize),

    /// Input on which flattening cannot proceed meaningfully.
    #[error("{0}")]
    DegenerateInput(&'static str),

    /// Assignment called with a non-square cost matrix.
    #[error("assignment cost matrix must be square, got {0}x{1}")]
    CostNotSquare(usize, usize),

    /// A NaN or infinite entry in the assignment cost matrix.
    #[error("non-finite assignment cost at ({0}, {1})")]
    NonFiniteCost(usize, usize),

    /// All flattened coordinates collapsed onto a line or a point.
    #[error("flattened bounding box has zero extent")]
    ZeroExtent,
}

/// Result type for flattening operations.
pub type Result<T> = std::result::Result<T, Error>;

/// How the displacement field is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One exact assignment over a farthest-point sub-sample of size
    /// `sample_size`. The default.
    Subsampled,
    /// Partition the primary set into k-means clusters and run one exact
    /// assignment per cluster, giving every primary point its own
    /// displacement vector. Slower to orchestrate, but exact at large N.
    Clustered {
        /// Number of k-means clusters (clamped to the point count).
        clusters: usize,
    },
}

/// Configuration for one flattening run.
///
/// The tunables the original pipeline hard-coded (Halton bases, margin,
/// neighbor count, diagnostic grid) are all exposed here; validate new
/// defaults empirically via the coherence score rather than assuming these
/// are optimal for a new dataset.
#[derive(Debug, Clone)]
pub struct FlattenConfig {
    /// Mixing factor μ ∈ [0, 1]: 0 reproduces the input (up to the shared
    /// renormalization), 1 applies the full displacement.
    pub mix: f64,
    /// Sub-sample size M for [`Strategy::Subsampled`]. Values ≥ N mean "no
    /// sampling". Assignment cost grows as M³.
    pub sample_size: usize,
    /// Neighbor count k for inverse-distance interpolation.
    pub neighbors: usize,
    /// Margin kept free around the output, in [0, 0.5).
    pub margin: f64,
    /// Seed for the farthest-point start index and k-means initialization.
    /// Targets and interpolation do not depend on it.
    pub seed: u64,
    /// Coprime bases for the two Halton coordinate sequences.
    pub halton_bases: (u64, u64),
    /// Grid resolution G for the G×G density diagnostics.
    pub density_grid: usize,
    /// Number of points sampled by the coherence diagnostic.
    pub coherence_sample: usize,
    /// Displacement field construction strategy.
    pub strategy: Strategy,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            mix: 0.8,
            sample_size: 2_000,
            neighbors: 8,
            margin: 0.02,
            seed: 42,
            halton_bases: (2, 3),
            density_grid: 50,
            coherence_sample: 256,
            strategy: Strategy::Subsampled,
        }
    }
}

/// Per-run measurements, produced once and never mutated.
///
/// The density and coherence fields are best-effort: when they cannot be
/// computed they are `None`, and their absence never fails a run that
/// produced valid coordinates.
#[derive(Debug, Clone)]
pub struct RunDiagnostics {
    /// Total cost of the exact assignment(s).
    pub assignment_cost: f64,
    /// Mean interpolated displacement magnitude over the primary set,
    /// before mixing.
    pub mean_displacement: f64,
    /// Largest interpolated displacement magnitude over the primary set,
    /// before mixing.
    pub max_displacement: f64,
    /// Primary-set density statistics before flattening.
    pub density_before: Option<DensityStats>,
    /// Primary-set density statistics after flattening.
    pub density_after: Option<DensityStats>,
    /// Mean k-NN overlap between original and flattened primary
    /// coordinates. Near 1.0: nothing moved; near 0.0: structure destroyed.
    pub coherence: Option<f64>,
}

/// Output of one flattening run.
pub struct FlattenResult {
    /// Flattened primary set: same length and row order as the input.
    pub primary: Array2<f64>,
    /// Flattened secondary sets, in input order, each with its input's
    /// length and row order.
    pub secondary: Vec<Array2<f64>>,
    /// Measurements for this run.
    pub diagnostics: RunDiagnostics,
}

/// Flatten a primary point set (and any secondary sets) toward spatial
/// uniformity.
///
/// The primary set drives everything: sub-sampling, target generation and
/// the exact assignment produce a [`DisplacementField`], which is then
/// interpolated at every point of every set. Secondary sets never
/// participate in sampling or assignment; interpolating them against the
/// primary field is what keeps them in the same semantic frame.
///
/// All-or-nothing: any error fails the whole invocation, and no partially
/// flattened output is returned. Diagnostics are best-effort and cannot
/// fail the run.
///
/// # Errors
///
/// Configuration violations ([`Error::InvalidMix`] and friends), degenerate
/// input ([`Error::DegenerateInput`], [`Error::BadPointShape`]), and
/// numerical failure ([`Error::NonFiniteCost`], [`Error::ZeroExtent`]).
pub fn flatten(
    primary: &Array2<f64>,
    secondary: &[Array2<f64>],
    config: &FlattenConfig,
) -> Result<FlattenResult> {
    validate(primary, secondary, config)?;

    let density_before = diagnostics::density_profile(&primary.view(), config.density_grid);

    let (field, assignment_cost) = match config.strategy {
        Strategy::Subsampled => build_subsampled_field(primary, config)?,
        Strategy::Clustered { clusters } => cluster::build_clustered_field(
            &primary.view(),
            clusters,
            config.margin,
            config.halton_bases,
            config.seed,
        )?,
    };
    log::debug!(
        "displacement field ready: {} vectors, assignment cost {:.4}",
        field.len(),
        assignment_cost
    );

    let primary_disp = field.interpolate_set(&primary.view(), config.neighbors);
    let (mean_displacement, max_displacement) = displacement_stats(&primary_disp);

    let mut sets: Vec<Array2<f64>> = Vec::with_capacity(1 + secondary.len());
    sets.push(apply_mix(primary, &primary_disp, config.mix));
    for set in secondary {
        let disp = field.interpolate_set(&set.view(), config.neighbors);
        sets.push(apply_mix(set, &disp, config.mix));
    }

    renormalize_joint(&mut sets, config.margin)?;

    let flattened_primary = sets.remove(0);
    let density_after = diagnostics::density_profile(&flattened_primary.view(), config.density_grid);
    let coherence = diagnostics::coherence(
        &primary.view(),
        &flattened_primary.view(),
        config.neighbors,
        config.coherence_sample,
    );

    Ok(FlattenResult {
        primary: flattened_primary,
        secondary: sets,
        diagnostics: RunDiagnostics {
            assignment_cost,
            mean_displacement,
            max_displacement,
            density_before,
            density_after,
            coherence,
        },
    })
}

/// Build the field for the default subsampled strategy: farthest-point
/// sample, Halton targets, one exact assignment.
fn build_subsampled_field(
    primary: &Array2<f64>,
    config: &FlattenConfig,
) -> Result<(DisplacementField, f64)> {
    let indices = sample::farthest_point_sample(&primary.view(), config.sample_size, config.seed);
    let sources: Vec<[f64; 2]> = indices
        .iter()
        .map(|&i| [primary[[i, 0]], primary[[i, 1]]])
        .collect();
    let targets = halton::halton_targets(sources.len(), config.margin, config.halton_bases);

    let (perm, total) = {
        // The cost matrix is the dominant transient allocation (O(M²));
        // scoped so it is freed before interpolation starts.
        let cost = assign::cost_matrix(&sources, &targets);
        assign::solve(&cost)?
    };

    let displacements: Vec<[f64; 2]> = sources
        .iter()
        .zip(perm.iter())
        .map(|(s, &j)| [targets[j][0] - s[0], targets[j][1] - s[1]])
        .collect();

    Ok((DisplacementField::build(sources, displacements), total))
}

fn validate(
    primary: &Array2<f64>,
    secondary: &[Array2<f64>],
    config: &FlattenConfig,
) -> Result<()> {
    if !(0.0..=1.0).contains(&config.mix) || !config.mix.is_finite() {
        return Err(Error::InvalidMix(config.mix));
    }
    if config.neighbors == 0 {
        return Err(Error::InvalidNeighbors);
    }
    if !(0.0..0.5).contains(&config.margin) || !config.margin.is_finite() {
        return Err(Error::InvalidMargin(config.margin));
    }
    match config.strategy {
        Strategy::Subsampled if config.sample_size == 0 => return Err(Error::InvalidSampleSize),
        Strategy::Clustered { clusters: 0 } => return Err(Error::InvalidClusterCount),
        _ => {}
    }

    for set in std::iter::once(primary).chain(secondary.iter()) {
        if set.ncols() != 2 {
            return Err(Error::BadPointShape(set.ncols()));
        }
        if set.iter().any(|v| !v.is_finite()) {
            return Err(Error::DegenerateInput(
                "point sets must contain only finite coordinates",
            ));
        }
    }

    if primary.nrows() < 2 {
        return Err(Error::DegenerateInput(
            "primary point set needs at least 2 points",
        ));
    }

    // Zero-extent bounding box: every primary point coincides.
    let first = [primary[[0, 0]], primary[[0, 1]]];
    let all_coincide =
        (0..primary.nrows()).all(|i| primary[[i, 0]] == first[0] && primary[[i, 1]] == first[1]);
    if all_coincide {
        return Err(Error::DegenerateInput("all primary points coincide"));
    }

    Ok(())
}

/// `final = original + μ · displacement`, rowwise.
fn apply_mix(original: &Array2<f64>, displacement: &Array2<f64>, mix: f64) -> Array2<f64> {
    original + &displacement.mapv(|d| mix * d)
}

/// Rescale all sets into [margin, 1−margin] using their joint bounding box,
/// then clamp residual floating-point overshoot to [0, 1].
///
/// The box is shared across every set so primary and secondary coordinates
/// stay in the same frame after flattening.
fn renormalize_joint(sets: &mut [Array2<f64>], margin: f64) -> Result<()> {
    let mut min = [f64::INFINITY; 2];
    let mut max = [f64::NEG_INFINITY; 2];
    for set in sets.iter() {
        for i in 0..set.nrows() {
            for axis in 0..2 {
                let v = set[[i, axis]];
                min[axis] = min[axis].min(v);
                max[axis] = max[axis].max(v);
            }
        }
    }

    let extent = [max[0] - min[0], max[1] - min[1]];
    if extent[0] <= 0.0 || extent[1] <= 0.0 {
        return Err(Error::ZeroExtent);
    }

    let span = 1.0 - 2.0 * margin;
    for set in sets.iter_mut() {
        for ((_, axis), v) in set.indexed_iter_mut() {
            let unit = (*v - min[axis]) / extent[axis];
            *v = (margin + span * unit).clamp(0.0, 1.0);
        }
    }
    Ok(())
}

/// Mean and max per-row displacement magnitude.
fn displacement_stats(displacement: &Array2<f64>) -> (f64, f64) {
    let n = displacement.nrows();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mut sum = 0.0;
    let mut max = 0.0_f64;
    for i in 0..n {
        let mag = (displacement[[i, 0]].powi(2) + displacement[[i, 1]].powi(2)).sqrt();
        sum += mag;
        max = max.max(mag);
    }
    (sum / n as f64, max)
}
