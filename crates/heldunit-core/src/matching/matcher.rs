//! Candidate-pair construction.
//!
//! Units are only ever compared on the same electrode of the same animal,
//! and only across *adjacent* sessions (the next session ordinal that has
//! single units on that electrode). Longer-range identity comes from
//! chaining held pairs, never from direct long-range comparison.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::HeldUnitConfig;
use crate::error::HeldUnitResult;
use crate::separability::j3_between;
use crate::traits::WaveformSource;
use crate::types::{CandidatePair, SkippedComparison, Unit, UnitKey, WaveformSet};

/// One independent unit of matching work: all sessions of one animal on
/// one electrode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeKey {
    pub animal_id: String,
    pub electrode: u32,
}

impl std::fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/e{}", self.animal_id, self.electrode)
    }
}

/// Candidate table for one scope, plus the comparisons that had to be
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub pairs: Vec<CandidatePair>,
    pub skipped: Vec<SkippedComparison>,
}

/// Builds the scored candidate table the resolver consumes.
pub struct PairwiseMatcher {
    source: Arc<dyn WaveformSource>,
    config: HeldUnitConfig,
}

impl PairwiseMatcher {
    pub fn new(source: Arc<dyn WaveformSource>, config: HeldUnitConfig) -> Self {
        Self { source, config }
    }

    /// Partition units into matching scopes. Multi-unit clusters are
    /// excluded here and never compared.
    pub fn scopes(units: &[Unit]) -> BTreeMap<ScopeKey, Vec<Unit>> {
        let mut scopes: BTreeMap<ScopeKey, Vec<Unit>> = BTreeMap::new();
        for unit in units.iter().filter(|u| u.single_unit) {
            scopes
                .entry(ScopeKey {
                    animal_id: unit.animal_id.clone(),
                    electrode: unit.electrode,
                })
                .or_default()
                .push(unit.clone());
        }
        scopes
    }

    /// Score every adjacent-session candidate pair in one scope.
    ///
    /// Waveforms are prefetched concurrently (bounded by the config), the
    /// table itself is built in deterministic session/label order, so
    /// fetch completion order cannot affect results. A fetch failure
    /// fails the scope; a comparison-local failure only drops that pair
    /// into `skipped`.
    pub async fn pairs_for_scope(
        &self,
        scope: &ScopeKey,
        units: &[Unit],
    ) -> HeldUnitResult<MatchOutcome> {
        let mut by_ordinal: BTreeMap<u32, Vec<&Unit>> = BTreeMap::new();
        for unit in units.iter().filter(|u| u.single_unit) {
            by_ordinal.entry(unit.session_ordinal).or_default().push(unit);
        }
        for session_units in by_ordinal.values_mut() {
            session_units.sort_by(|a, b| a.unit_label.cmp(&b.unit_label));
        }

        let ordinals: Vec<u32> = by_ordinal.keys().copied().collect();
        let mut comparisons: Vec<(&Unit, &Unit)> = Vec::new();
        for window in ordinals.windows(2) {
            for &u1 in &by_ordinal[&window[0]] {
                for &u2 in &by_ordinal[&window[1]] {
                    comparisons.push((u1, u2));
                }
            }
        }
        if comparisons.is_empty() {
            debug!(%scope, "no adjacent-session candidates");
            return Ok(MatchOutcome::default());
        }

        let waves = self.prefetch(&comparisons).await?;

        let mut outcome = MatchOutcome::default();
        for (u1, u2) in comparisons {
            let (k1, k2) = (u1.key(), u2.key());
            match j3_between(&waves[&k1], &waves[&k2], self.config.n_components) {
                Ok(score) => {
                    debug!(%scope, unit1 = %k1, unit2 = %k2, score, "scored candidate pair");
                    outcome.pairs.push(CandidatePair::new(
                        u1.animal_id.clone(),
                        u1.group.clone(),
                        u1.electrode,
                        k1,
                        u1.session_ordinal,
                        k2,
                        u2.session_ordinal,
                        score,
                    ));
                }
                Err(err) if err.is_comparison_local() => {
                    warn!(%scope, unit1 = %k1, unit2 = %k2, %err, "comparison dropped");
                    outcome.skipped.push(SkippedComparison {
                        animal_id: scope.animal_id.clone(),
                        electrode: scope.electrode,
                        unit1: k1,
                        unit2: k2,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(outcome)
    }

    /// Fetch every distinct unit's waveforms, concurrently but bounded.
    async fn prefetch(
        &self,
        comparisons: &[(&Unit, &Unit)],
    ) -> HeldUnitResult<HashMap<UnitKey, WaveformSet>> {
        let mut keys: Vec<UnitKey> = comparisons
            .iter()
            .flat_map(|(u1, u2)| [u1.key(), u2.key()])
            .collect();
        keys.sort();
        keys.dedup();

        let kind = self.config.waveform_kind;
        let fetches = keys.into_iter().map(|key| {
            let source = Arc::clone(&self.source);
            async move {
                let result = source
                    .waveforms(&key.session_id, &key.unit_label, kind)
                    .await;
                (key, result)
            }
        });

        let fetched: Vec<(UnitKey, HeldUnitResult<WaveformSet>)> = stream::iter(fetches)
            .buffer_unordered(self.config.max_concurrent_fetches)
            .collect()
            .await;

        let mut waves = HashMap::with_capacity(fetched.len());
        for (key, result) in fetched {
            waves.insert(key, result?);
        }
        Ok(waves)
    }
}
