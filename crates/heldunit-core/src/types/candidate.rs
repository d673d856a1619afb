//! Scored candidate comparisons between units in adjacent sessions.

use serde::{Deserialize, Serialize};

use super::unit::{HeldUnitId, UnitKey};

/// One scored comparison between a unit in session *i* and a unit in the
/// next session on the same electrode.
///
/// Created by the matcher, mutated only by the resolver, never deleted:
/// the full table is kept for auditability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePair {
    pub animal_id: String,
    pub group: String,
    pub electrode: u32,
    /// The earlier-session member.
    pub unit1: UnitKey,
    pub ordinal1: u32,
    /// The later-session member.
    pub unit2: UnitKey,
    pub ordinal2: u32,
    /// Inter-session J3. Lower means less separable, i.e. more likely the
    /// same neuron.
    pub score: f64,
    /// Whether the resolver has decided this pair.
    pub resolved: bool,
    /// Whether the pair was decided to be the same neuron.
    pub held: bool,
    /// Cross-session identity, assigned once held pairs are chained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub held_unit_id: Option<HeldUnitId>,
}

impl CandidatePair {
    pub fn new(
        animal_id: impl Into<String>,
        group: impl Into<String>,
        electrode: u32,
        unit1: UnitKey,
        ordinal1: u32,
        unit2: UnitKey,
        ordinal2: u32,
        score: f64,
    ) -> Self {
        Self {
            animal_id: animal_id.into(),
            group: group.into(),
            electrode,
            unit1,
            ordinal1,
            unit2,
            ordinal2,
            score,
            resolved: false,
            held: false,
            held_unit_id: None,
        }
    }

    /// The adjacent-session boundary this pair belongs to.
    pub fn boundary(&self) -> (&str, &str) {
        (&self.unit1.session_id, &self.unit2.session_id)
    }

    /// Whether the pair references the given unit on either side.
    pub fn touches(&self, key: &UnitKey) -> bool {
        self.unit1 == *key || self.unit2 == *key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> CandidatePair {
        CandidatePair::new(
            "RN5",
            "learn",
            4,
            UnitKey::new("d1", "u0"),
            0,
            UnitKey::new("d2", "u1"),
            1,
            0.3,
        )
    }

    #[test]
    fn test_new_pair_is_unresolved() {
        let p = pair();
        assert!(!p.resolved);
        assert!(!p.held);
        assert!(p.held_unit_id.is_none());
    }

    #[test]
    fn test_boundary_and_touches() {
        let p = pair();
        assert_eq!(p.boundary(), ("d1", "d2"));
        assert!(p.touches(&UnitKey::new("d1", "u0")));
        assert!(p.touches(&UnitKey::new("d2", "u1")));
        assert!(!p.touches(&UnitKey::new("d2", "u0")));
    }
}
