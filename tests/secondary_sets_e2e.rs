//! Secondary point sets ride the primary displacement field: they are
//! interpolated and renormalized in the primary's frame, never sampled or
//! assigned themselves.

use ndarray::{array, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uncrowd::{flatten, FlattenConfig};

fn clumped_primary(n: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pts = Array2::zeros((n, 2));
    for i in 0..n {
        if i % 5 == 0 {
            pts[[i, 0]] = rng.gen_range(0.0..1.0);
            pts[[i, 1]] = rng.gen_range(0.0..1.0);
        } else {
            pts[[i, 0]] = rng.gen_range(0.4..0.6);
            pts[[i, 1]] = rng.gen_range(0.4..0.6);
        }
    }
    pts
}

#[test]
fn near_coincident_secondary_points_move_together() {
    let primary = clumped_primary(500, 1);

    // Two secondary points a hair apart must receive nearly equal
    // displacements: they share the same k nearest field sources.
    let eps = 1e-9;
    let secondary = array![[0.31, 0.52], [0.31 + eps, 0.52]];

    let config = FlattenConfig {
        sample_size: 100,
        mix: 1.0,
        ..FlattenConfig::default()
    };
    let result = flatten(&primary, &[secondary], &config).unwrap();

    let out = &result.secondary[0];
    let dx = (out[[0, 0]] - out[[1, 0]]).abs();
    let dy = (out[[0, 1]] - out[[1, 1]]).abs();
    assert!(dx < 1e-6 && dy < 1e-6, "split pair: dx={}, dy={}", dx, dy);
}

#[test]
fn secondary_sets_share_the_primary_frame() {
    let primary = clumped_primary(400, 2);
    // A secondary point sitting exactly on a primary point must land
    // exactly where that primary point lands: same field, same k, same
    // joint renormalization.
    let i = 17;
    let mut secondary = Array2::zeros((2, 2));
    secondary[[0, 0]] = primary[[i, 0]];
    secondary[[0, 1]] = primary[[i, 1]];
    secondary[[1, 0]] = primary[[i + 1, 0]];
    secondary[[1, 1]] = primary[[i + 1, 1]];

    let config = FlattenConfig {
        sample_size: 80,
        ..FlattenConfig::default()
    };
    let result = flatten(&primary, &[secondary], &config).unwrap();

    for (row, p) in [(0, i), (1, i + 1)] {
        let dx = (result.secondary[0][[row, 0]] - result.primary[[p, 0]]).abs();
        let dy = (result.secondary[0][[row, 1]] - result.primary[[p, 1]]).abs();
        assert!(
            dx < 1e-12 && dy < 1e-12,
            "secondary row {} diverged from primary row {}: dx={}, dy={}",
            row,
            p,
            dx,
            dy
        );
    }
}

#[test]
fn multiple_secondary_sets_keep_length_and_order() {
    let primary = clumped_primary(300, 3);
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let sizes = [5usize, 40, 12];
    let secondary: Vec<Array2<f64>> = sizes
        .iter()
        .map(|&n| {
            let mut s = Array2::zeros((n, 2));
            for i in 0..n {
                s[[i, 0]] = rng.gen_range(0.0..1.0);
                s[[i, 1]] = rng.gen_range(0.0..1.0);
            }
            s
        })
        .collect();

    let config = FlattenConfig {
        sample_size: 60,
        ..FlattenConfig::default()
    };
    let result = flatten(&primary, &secondary, &config).unwrap();

    assert_eq!(result.secondary.len(), 3);
    for (set, &n) in result.secondary.iter().zip(sizes.iter()) {
        assert_eq!(set.nrows(), n);
        assert!(set.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
