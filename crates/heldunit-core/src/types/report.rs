//! Run results: the held-unit labeling plus everything needed to audit it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::candidate::CandidatePair;
use super::chain::HeldUnitChain;
use super::unit::{Unit, UnitKey};

/// One waveform comparison dropped from the candidate table because of a
/// local numerical precondition failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedComparison {
    pub animal_id: String,
    pub electrode: u32,
    pub unit1: UnitKey,
    pub unit2: UnitKey,
    pub reason: String,
}

/// An (animal, electrode) scope that could not produce a labeling.
///
/// `electrode` is `None` when the whole animal failed before electrode
/// scopes existed (enumeration failure, missing group threshold).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeFailure {
    pub animal_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub electrode: Option<u32>,
    pub reason: String,
}

/// One unit's intrinsic (split-half) separability score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntraScore {
    pub key: UnitKey,
    pub group: String,
    pub j3: f64,
}

/// The output of a full held-unit run.
///
/// A partial result: scopes listed in `failures` contributed no labels, but
/// the rest of the dataset is fully labeled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeldUnitReport {
    /// Every enumerated unit, with `held_unit_id` filled in where assigned.
    pub units: Vec<Unit>,
    /// Per-group separability threshold actually applied.
    pub thresholds: BTreeMap<String, f64>,
    /// Intrinsic J3 of every single unit that produced one.
    pub intra_scores: Vec<IntraScore>,
    /// The complete candidate table with final resolution flags.
    pub pairs: Vec<CandidatePair>,
    /// Held chains, one per cross-session identity.
    pub chains: Vec<HeldUnitChain>,
    /// Comparisons excluded from the table.
    pub skipped: Vec<SkippedComparison>,
    /// Scopes that failed to resolve.
    pub failures: Vec<ScopeFailure>,
}

impl HeldUnitReport {
    /// Number of units that ended up part of a held chain.
    pub fn held_unit_count(&self) -> usize {
        self.units.iter().filter(|u| u.held_unit_id.is_some()).count()
    }

    /// Whether every scope resolved cleanly.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
