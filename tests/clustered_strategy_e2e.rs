//! The clustered strategy must honor the same external contract as the
//! default subsampled path while assigning every primary point exactly.

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uncrowd::{flatten, FlattenConfig, Strategy};

fn corner_heavy(n: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pts = Array2::zeros((n, 2));
    for i in 0..n {
        if i < n * 9 / 10 {
            pts[[i, 0]] = rng.gen_range(0.0..0.15);
            pts[[i, 1]] = rng.gen_range(0.0..0.15);
        } else {
            pts[[i, 0]] = rng.gen_range(0.0..1.0);
            pts[[i, 1]] = rng.gen_range(0.0..1.0);
        }
    }
    pts
}

#[test]
fn clustered_flattening_improves_density() {
    let primary = corner_heavy(600, 11);
    let config = FlattenConfig {
        mix: 0.9,
        density_grid: 20,
        strategy: Strategy::Clustered { clusters: 24 },
        ..FlattenConfig::default()
    };

    let result = flatten(&primary, &[], &config).unwrap();

    let before = result.diagnostics.density_before.expect("before stats");
    let after = result.diagnostics.density_after.expect("after stats");
    assert!(
        after.empty_fraction < before.empty_fraction,
        "clustered strategy must flatten: {} vs {}",
        after.empty_fraction,
        before.empty_fraction
    );

    assert_eq!(result.primary.nrows(), 600);
    assert!(result.primary.iter().all(|&v| (0.0..=1.0).contains(&v)));
    assert!(result.diagnostics.assignment_cost.is_finite());
    assert!(result.diagnostics.assignment_cost > 0.0);
}

#[test]
fn clustered_and_subsampled_obey_the_same_contract() {
    let primary = corner_heavy(400, 12);
    let secondary = {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut s = Array2::zeros((25, 2));
        for i in 0..25 {
            s[[i, 0]] = rng.gen_range(0.0..1.0);
            s[[i, 1]] = rng.gen_range(0.0..1.0);
        }
        s
    };

    for strategy in [
        Strategy::Subsampled,
        Strategy::Clustered { clusters: 16 },
    ] {
        let config = FlattenConfig {
            sample_size: 80,
            strategy,
            ..FlattenConfig::default()
        };
        let result = flatten(&primary, &[secondary.clone()], &config).unwrap();
        assert_eq!(result.primary.nrows(), 400, "{:?}", strategy);
        assert_eq!(result.secondary[0].nrows(), 25, "{:?}", strategy);
        assert!(
            result
                .primary
                .iter()
                .chain(result.secondary[0].iter())
                .all(|&v| (0.0..=1.0).contains(&v)),
            "{:?}",
            strategy
        );
    }
}

#[test]
fn more_clusters_do_not_break_small_inputs() {
    // Cluster count far above the point count clamps cleanly.
    let primary = corner_heavy(40, 14);
    let config = FlattenConfig {
        strategy: Strategy::Clustered { clusters: 500 },
        ..FlattenConfig::default()
    };
    let result = flatten(&primary, &[], &config).unwrap();
    assert_eq!(result.primary.nrows(), 40);
}
