//! WaveformSource trait.

use async_trait::async_trait;

use crate::error::HeldUnitResult;
use crate::types::{WaveformKind, WaveformSet};

/// Supplier of spike waveform snapshots.
///
/// The core never touches on-disk dataset containers itself; whatever owns
/// the recordings implements this and the pipeline consumes it read-only.
#[async_trait]
pub trait WaveformSource: Send + Sync {
    /// Fetch the waveform snapshot matrix and sampling rate for one unit.
    ///
    /// Rows are spike instances, columns are time samples.
    async fn waveforms(
        &self,
        session_id: &str,
        unit_label: &str,
        kind: WaveformKind,
    ) -> HeldUnitResult<WaveformSet>;
}
