//! Quasi-uniform target generation via the Halton sequence.
//!
//! Targets for the assignment step must cover the unit square evenly:
//! uniform random draws clump, regular grids leave visible lattice artifacts
//! in the flattened map. The Halton sequence (a pair of radical-inverse
//! sequences with coprime bases) avoids both, and is purely index-driven:
//! the same `(m, margin, bases)` always yields the same targets, with no
//! dependence on any seed.
//!
//! # References
//!
//! - Halton (1960). "On the efficiency of certain quasi-random sequences of
//!   points in evaluating multi-dimensional integrals"
//! - Niederreiter (1992). "Random Number Generation and Quasi-Monte Carlo
//!   Methods"

/// Radical inverse of `i` in base `base`: the digits of `i` mirrored around
/// the radix point.
///
/// `radical_inverse(1, 2) = 0.5`, `radical_inverse(2, 2) = 0.25`,
/// `radical_inverse(3, 2) = 0.75`, and so on. Always in [0, 1).
#[inline]
pub fn radical_inverse(mut i: u64, base: u64) -> f64 {
    debug_assert!(base >= 2);
    let inv = 1.0 / base as f64;
    let mut f = inv;
    let mut r = 0.0;
    while i > 0 {
        r += f * (i % base) as f64;
        i /= base;
        f *= inv;
    }
    r
}

/// Generate `m` Halton points in [margin, 1−margin]².
///
/// The two coordinates use `bases.0` and `bases.1`, which must be coprime
/// for the sequence to be well distributed (the classic choice is 2 and 3).
/// Index 0 is skipped so the first target is not the corner (0, 0).
///
/// Deterministic: same `(m, margin, bases)` ⇒ same targets, independent of
/// any seed used elsewhere in the pipeline.
pub fn halton_targets(m: usize, margin: f64, bases: (u64, u64)) -> Vec<[f64; 2]> {
    let span = 1.0 - 2.0 * margin;
    (1..=m as u64)
        .map(|i| {
            let x = radical_inverse(i, bases.0);
            let y = radical_inverse(i, bases.1);
            [margin + span * x, margin + span * y]
        })
        .collect()
}
