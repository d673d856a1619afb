//! Waveform snapshot containers.

use serde::{Deserialize, Serialize};

use crate::error::{HeldUnitError, HeldUnitResult};

/// Which stored waveform variant the source should return.
///
/// Sorted waveforms have been through the sorter's filtering/alignment;
/// raw waveforms are cut straight from the recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WaveformKind {
    #[default]
    Sorted,
    Raw,
}

/// A set of spike waveform snapshots for one unit.
///
/// Rows are spike instances, columns are time samples in sampled voltage.
/// All rows have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformSet {
    waves: Vec<Vec<f64>>,
    sampling_rate_hz: f64,
}

impl WaveformSet {
    /// Build a waveform set, validating that the matrix is rectangular and
    /// the sampling rate is positive.
    pub fn new(waves: Vec<Vec<f64>>, sampling_rate_hz: f64) -> HeldUnitResult<Self> {
        if sampling_rate_hz <= 0.0 {
            return Err(HeldUnitError::degenerate(format!(
                "sampling rate must be positive, got {sampling_rate_hz}"
            )));
        }
        if let Some(first) = waves.first() {
            let n = first.len();
            if waves.iter().any(|row| row.len() != n) {
                return Err(HeldUnitError::degenerate(
                    "waveform rows have unequal sample counts",
                ));
            }
        }
        Ok(Self {
            waves,
            sampling_rate_hz,
        })
    }

    /// Number of spike instances.
    pub fn n_spikes(&self) -> usize {
        self.waves.len()
    }

    /// Number of time samples per snapshot.
    pub fn n_samples(&self) -> usize {
        self.waves.first().map_or(0, Vec::len)
    }

    pub fn sampling_rate_hz(&self) -> f64 {
        self.sampling_rate_hz
    }

    /// Snapshot rows.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.waves
    }

    /// A new set containing rows `[start, end)` of this one.
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        Self {
            waves: self.waves[start..end].to_vec(),
            sampling_rate_hz: self.sampling_rate_hz,
        }
    }

    /// A new set with the first `cut` samples of every row removed.
    ///
    /// Alignment trims the leading edge: the peak sits at a fixed offset
    /// from the snapshot end, so the tail must be preserved.
    pub fn trim_leading(&self, cut: usize) -> Self {
        Self {
            waves: self.waves.iter().map(|row| row[cut..].to_vec()).collect(),
            sampling_rate_hz: self.sampling_rate_hz,
        }
    }

    pub(crate) fn from_rows_unchecked(waves: Vec<Vec<f64>>, sampling_rate_hz: f64) -> Self {
        Self {
            waves,
            sampling_rate_hz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_ragged_rows() {
        let result = WaveformSet::new(vec![vec![0.0, 1.0], vec![0.0]], 30000.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_rate() {
        let result = WaveformSet::new(vec![vec![0.0, 1.0]], 0.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_trim_leading_keeps_tail() {
        let set = WaveformSet::new(vec![vec![1.0, 2.0, 3.0, 4.0]], 1000.0).unwrap();
        let trimmed = set.trim_leading(2);
        assert_eq!(trimmed.rows(), &[vec![3.0, 4.0]]);
        assert_eq!(trimmed.n_samples(), 2);
    }

    #[test]
    fn test_slice_rows() {
        let set = WaveformSet::new(
            vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]],
            1000.0,
        )
        .unwrap();
        let first = set.slice_rows(0, 2);
        assert_eq!(first.n_spikes(), 2);
        assert_eq!(first.rows()[1], vec![1.0]);
    }
}
