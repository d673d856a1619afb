//! Unit identity and metadata types.

use serde::{Deserialize, Serialize};

/// Globally unique identity of a neuron tracked across sessions.
///
/// Handed out by a single monotonically increasing allocator shared by the
/// whole run, so identities from different experimental groups never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeldUnitId(pub u64);

impl std::fmt::Display for HeldUnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "H{}", self.0)
    }
}

/// Identity of one sorted unit within one recording session.
///
/// Unique within a session; a neuron recorded in two sessions has two
/// distinct keys linked only through a [`HeldUnitId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitKey {
    pub session_id: String,
    pub unit_label: String,
}

impl UnitKey {
    pub fn new(session_id: impl Into<String>, unit_label: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            unit_label: unit_label.into(),
        }
    }
}

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.session_id, self.unit_label)
    }
}

/// Spike snapshot window around the detection peak, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotWindow {
    /// Time captured before the spike peak.
    pub pre_ms: f64,
    /// Time captured after the spike peak.
    pub post_ms: f64,
}

/// One sorted neuron in one recording session.
///
/// Immutable once enumerated, except for `held_unit_id`, which the resolver
/// writes back when the unit ends up part of a held chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    /// Animal the recording came from.
    pub animal_id: String,
    /// Recording session identifier.
    pub session_id: String,
    /// Chronological index of the session within the animal's study.
    pub session_ordinal: u32,
    /// Sorter-assigned label, unique within the session.
    pub unit_label: String,
    /// Electrode the unit was recorded on.
    pub electrode: u32,
    /// Brain area from the electrode mapping, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    /// Experimental group / cohort label. Thresholds are calibrated per group.
    pub group: String,
    /// Whether the cluster is judged a single neuron (vs multi-unit noise).
    pub single_unit: bool,
    /// Spike snapshot window used at clustering time, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotWindow>,
    /// Cross-session identity, filled in by the resolver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub held_unit_id: Option<HeldUnitId>,
}

impl Unit {
    /// Create a single unit with the required identity fields.
    pub fn new(
        animal_id: impl Into<String>,
        session_id: impl Into<String>,
        session_ordinal: u32,
        unit_label: impl Into<String>,
        electrode: u32,
    ) -> Self {
        Self {
            animal_id: animal_id.into(),
            session_id: session_id.into(),
            session_ordinal,
            unit_label: unit_label.into(),
            electrode,
            area: None,
            group: "default".to_string(),
            single_unit: true,
            snapshot: None,
            held_unit_id: None,
        }
    }

    /// Set the experimental group label.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Set the brain-area label.
    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    /// Set the spike snapshot window.
    pub fn with_snapshot(mut self, pre_ms: f64, post_ms: f64) -> Self {
        self.snapshot = Some(SnapshotWindow { pre_ms, post_ms });
        self
    }

    /// Mark the cluster as multi-unit. Multi-unit clusters are excluded from
    /// matching entirely.
    pub fn as_multi_unit(mut self) -> Self {
        self.single_unit = false;
        self
    }

    /// The unit's session-scoped identity.
    pub fn key(&self) -> UnitKey {
        UnitKey::new(self.session_id.clone(), self.unit_label.clone())
    }
}
