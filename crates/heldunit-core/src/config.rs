//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::types::WaveformKind;

/// Configuration for a held-unit run.
///
/// Passed explicitly into the matcher and resolver; there is no shared
/// project context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeldUnitConfig {
    /// Percentile of the intra-unit J3 distribution used as the
    /// separability threshold, computed per experimental group.
    /// Range: (0, 100]. Default: 95.0
    pub percent_criterion: f64,

    /// Dimensionality of the shared principal-component embedding the J3
    /// statistic is computed in. Default: 3
    pub n_components: usize,

    /// Whether comparisons use sorted or raw waveform snapshots.
    /// Default: sorted
    pub waveform_kind: WaveformKind,

    /// Upper bound on concurrent waveform fetches during prefetch.
    /// Default: 8
    pub max_concurrent_fetches: usize,
}

impl Default for HeldUnitConfig {
    fn default() -> Self {
        Self {
            percent_criterion: 95.0,
            n_components: 3,
            waveform_kind: WaveformKind::Sorted,
            max_concurrent_fetches: 8,
        }
    }
}

impl HeldUnitConfig {
    /// Config with a stricter (99th percentile) threshold criterion.
    ///
    /// A stricter criterion never lowers the threshold, so it never marks
    /// more pairs held.
    pub fn strict() -> Self {
        Self {
            percent_criterion: 99.0,
            ..Self::default()
        }
    }

    /// Set the percentile criterion.
    pub fn with_percent_criterion(mut self, percent: f64) -> Self {
        self.percent_criterion = percent;
        self
    }

    /// Compare raw instead of sorted waveforms.
    pub fn with_raw_waveforms(mut self) -> Self {
        self.waveform_kind = WaveformKind::Raw;
        self
    }

    /// Set the prefetch concurrency bound.
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }

    /// Validate configuration values are in valid ranges.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.percent_criterion > 0.0 && self.percent_criterion <= 100.0) {
            return Err("percent_criterion must be in (0, 100]");
        }
        if self.n_components == 0 {
            return Err("n_components must be at least 1");
        }
        if self.max_concurrent_fetches == 0 {
            return Err("max_concurrent_fetches must be at least 1");
        }
        Ok(())
    }
}
