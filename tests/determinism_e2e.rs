//! Reproducibility guarantees: identical inputs and seed give identical
//! output, targets ignore the seed entirely, and different seeds still obey
//! the output contract.

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uncrowd::halton::halton_targets;
use uncrowd::{flatten, FlattenConfig, Strategy};

fn cloud(n: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pts = Array2::zeros((n, 2));
    for i in 0..n {
        // Mildly clustered: square the x coordinate to skew leftward.
        let x: f64 = rng.gen_range(0.0..1.0);
        pts[[i, 0]] = x * x;
        pts[[i, 1]] = rng.gen_range(0.0..1.0);
    }
    pts
}

#[test]
fn identical_runs_are_bit_identical() {
    let primary = cloud(400, 3);
    let secondary = vec![cloud(30, 4)];
    let config = FlattenConfig {
        sample_size: 80,
        ..FlattenConfig::default()
    };

    let a = flatten(&primary, &secondary, &config).unwrap();
    let b = flatten(&primary, &secondary, &config).unwrap();

    assert_eq!(a.primary, b.primary);
    assert_eq!(a.secondary, b.secondary);
    assert_eq!(
        a.diagnostics.assignment_cost,
        b.diagnostics.assignment_cost
    );
}

#[test]
fn clustered_runs_are_bit_identical() {
    let primary = cloud(300, 5);
    let config = FlattenConfig {
        strategy: Strategy::Clustered { clusters: 12 },
        ..FlattenConfig::default()
    };

    let a = flatten(&primary, &[], &config).unwrap();
    let b = flatten(&primary, &[], &config).unwrap();
    assert_eq!(a.primary, b.primary);
}

#[test]
fn targets_do_not_depend_on_seed() {
    // The seed feeds sampling only; targets are index-driven.
    let t1 = halton_targets(300, 0.02, (2, 3));
    let t2 = halton_targets(300, 0.02, (2, 3));
    assert_eq!(t1, t2);

    // Whole-pipeline check: two different seeds produce different sampling
    // but both runs stay valid and preserve lengths.
    let primary = cloud(400, 6);
    let base = FlattenConfig {
        sample_size: 60,
        ..FlattenConfig::default()
    };
    for seed in [1u64, 99] {
        let result = flatten(
            &primary,
            &[],
            &FlattenConfig {
                seed,
                ..base.clone()
            },
        )
        .unwrap();
        assert_eq!(result.primary.nrows(), 400);
        assert!(result.primary.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}

#[test]
fn mix_zero_preserves_relative_positions() {
    let primary = cloud(200, 8);
    let config = FlattenConfig {
        mix: 0.0,
        sample_size: 40,
        ..FlattenConfig::default()
    };
    let result = flatten(&primary, &[], &config).unwrap();

    // μ=0 output is an affine map of the input: recover the per-axis scale
    // and offset from two rows and check every other row against it.
    let scale_x = (result.primary[[1, 0]] - result.primary[[0, 0]])
        / (primary[[1, 0]] - primary[[0, 0]]);
    let offset_x = result.primary[[0, 0]] - scale_x * primary[[0, 0]];

    for i in 0..primary.nrows() {
        let expected = scale_x * primary[[i, 0]] + offset_x;
        assert!(
            (result.primary[[i, 0]] - expected).abs() < 1e-9,
            "row {}: {} vs {}",
            i,
            result.primary[[i, 0]],
            expected
        );
    }
}
