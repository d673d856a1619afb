//! The J3 waveform-separability statistic.
//!
//! Given two labeled sets of spike snapshots, J3 is the ratio of
//! between-class to within-class scatter after both sets are projected
//! into one joint principal-component space. Low J3 means the clouds
//! overlap, likely the same neuron; high J3 means they separate.

mod pca;
mod resample;

use nalgebra::DMatrix;

use crate::error::{HeldUnitError, HeldUnitResult};
use crate::types::WaveformSet;

/// Within-class scatter: summed squared distance of every point to its own
/// class centroid.
fn within_scatter(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    [a, b]
        .iter()
        .map(|x| {
            let mean = x.row_mean();
            x.row_iter()
                .map(|row| (row - &mean).norm_squared())
                .sum::<f64>()
        })
        .sum()
}

/// Between-class scatter: class sizes times squared centroid distances to
/// the grand centroid.
fn between_scatter(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    let (na, nb) = (a.nrows() as f64, b.nrows() as f64);
    let ma = a.row_mean();
    let mb = b.row_mean();
    let grand = (&ma * na + &mb * nb) / (na + nb);
    na * (&ma - &grand).norm_squared() + nb * (&mb - &grand).norm_squared()
}

/// J3 between two waveform sets in a shared `k`-dimensional embedding.
///
/// Reconciles sampling rates and snapshot lengths first (higher rate
/// downsampled, longer snapshot trimmed from its leading edge), fits one
/// PCA on the union, projects each set, and returns the scatter ratio.
///
/// Symmetric in its arguments. Pure: no side effects, no I/O.
///
/// # Errors
/// `DimensionMismatch` if the sets cannot be brought to a common snapshot
/// length greater than zero; `DegenerateInput` if either set has fewer
/// than `k + 1` spikes or the within-class scatter vanishes.
pub fn j3_between(a: &WaveformSet, b: &WaveformSet, k: usize) -> HeldUnitResult<f64> {
    for (name, set) in [("first", a), ("second", b)] {
        if set.n_spikes() < k + 1 {
            return Err(HeldUnitError::degenerate(format!(
                "{name} set has {} spikes, principal-component fit needs at least {}",
                set.n_spikes(),
                k + 1
            )));
        }
    }

    let (a, b) = resample::reconcile(a, b)?;
    let basis = pca::fit_joint(a.rows(), b.rows(), k)?;
    let pa = basis.project(a.rows());
    let pb = basis.project(b.rows());

    let j1 = within_scatter(&pa, &pb);
    if j1 <= 0.0 {
        return Err(HeldUnitError::degenerate(
            "within-class scatter is zero, J3 undefined",
        ));
    }
    Ok(between_scatter(&pa, &pb) / j1)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-noise, good enough to spread a point cloud.
    fn jitter(seed: u64, i: usize, j: usize) -> f64 {
        let mut h = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add((i as u64) << 32 | j as u64);
        h ^= h >> 33;
        h = h.wrapping_mul(0xff51afd7ed558ccd);
        h ^= h >> 33;
        (h % 10_000) as f64 / 10_000.0 - 0.5
    }

    fn noisy_spikes(amplitude: f64, n: usize, len: usize, seed: u64) -> WaveformSet {
        let rows = (0..n)
            .map(|i| {
                (0..len)
                    .map(|j| {
                        let t = j as f64 / len as f64;
                        amplitude * (t * std::f64::consts::TAU).sin() + 0.05 * jitter(seed, i, j)
                    })
                    .collect()
            })
            .collect();
        WaveformSet::new(rows, 30000.0).unwrap()
    }

    #[test]
    fn test_j3_is_symmetric() {
        let a = noisy_spikes(1.0, 30, 40, 1);
        let b = noisy_spikes(1.3, 25, 40, 2);
        let ab = j3_between(&a, &b, 3).unwrap();
        let ba = j3_between(&b, &a, 3).unwrap();
        assert!((ab - ba).abs() < 1e-9, "J3 not symmetric: {ab} vs {ba}");
    }

    #[test]
    fn test_separated_sets_score_higher_than_overlapping() {
        let a = noisy_spikes(1.0, 30, 40, 1);
        let near = noisy_spikes(1.0, 30, 40, 7);
        let far = noisy_spikes(5.0, 30, 40, 8);
        let j_near = j3_between(&a, &near, 3).unwrap();
        let j_far = j3_between(&a, &far, 3).unwrap();
        assert!(j_far > j_near * 10.0, "near={j_near} far={j_far}");
    }

    #[test]
    fn test_identical_sets_score_zero() {
        let a = noisy_spikes(1.0, 30, 40, 3);
        let j = j3_between(&a, &a.clone(), 3).unwrap();
        assert!(j.abs() < 1e-9);
    }

    #[test]
    fn test_unequal_lengths_are_reconciled() {
        let a = noisy_spikes(1.0, 30, 45, 1);
        let b = noisy_spikes(1.0, 30, 40, 2);
        assert!(j3_between(&a, &b, 3).is_ok());
    }

    #[test]
    fn test_too_few_spikes_is_degenerate() {
        let a = noisy_spikes(1.0, 3, 40, 1);
        let b = noisy_spikes(1.0, 30, 40, 2);
        let err = j3_between(&a, &b, 3).unwrap_err();
        assert!(err.is_comparison_local());
    }

    #[test]
    fn test_zero_scatter_is_degenerate() {
        let rows = vec![vec![1.0; 40]; 10];
        let flat = WaveformSet::new(rows, 30000.0).unwrap();
        let err = j3_between(&flat, &flat.clone(), 3).unwrap_err();
        assert!(err.is_comparison_local());
    }
}
