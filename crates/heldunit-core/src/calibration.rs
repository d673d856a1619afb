//! Intra-unit calibration: what does "separable from itself" look like?
//!
//! Same-neuron recordings should have inter-session J3 in the same range
//! as a unit's intrinsic J3, the separability between early and late
//! spikes of a single session, driven only by sampling noise and slow
//! drift. The population threshold is a high percentile of those
//! intrinsic scores, computed per experimental group because baseline
//! noise differs by cohort.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{HeldUnitError, HeldUnitResult};
use crate::separability::j3_between;
use crate::types::{IntraScore, WaveformSet};

/// A unit's intrinsic J3: separability of its first third of spikes from
/// its last third.
///
/// Needs at least `3 * (k + 1)` spikes so each third supports the
/// principal-component fit.
pub fn intra_unit_j3(waves: &WaveformSet, k: usize) -> HeldUnitResult<f64> {
    let n = waves.n_spikes();
    let first = waves.slice_rows(0, n / 3);
    let last = waves.slice_rows(2 * n / 3, n);
    j3_between(&first, &last, k)
}

/// Percentile with linear interpolation between order statistics, matching
/// the conventional definition over `[0, 100]`.
pub fn percentile(values: &[f64], p: f64) -> HeldUnitResult<f64> {
    if values.is_empty() {
        return Err(HeldUnitError::degenerate(
            "percentile of an empty score set",
        ));
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Ok(sorted[lo]);
    }
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

/// Per-group separability thresholds: the `percent`-th percentile of each
/// group's intra-unit scores.
pub fn group_thresholds(
    scores: &[IntraScore],
    percent: f64,
) -> HeldUnitResult<BTreeMap<String, f64>> {
    let mut by_group: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for score in scores {
        by_group.entry(&score.group).or_default().push(score.j3);
    }

    let mut thresholds = BTreeMap::new();
    for (group, values) in by_group {
        let threshold = percentile(&values, percent)?;
        debug!(group, threshold, n_units = values.len(), "calibrated threshold");
        thresholds.insert(group.to_string(), threshold);
    }
    Ok(thresholds)
}
