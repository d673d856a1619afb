//! Held-unit chains: the transitive result of resolution.

use serde::{Deserialize, Serialize};

use super::unit::{HeldUnitId, UnitKey};

/// One member of a held chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainMember {
    pub key: UnitKey,
    pub session_ordinal: u32,
}

/// The set of units, one per session, inferred to be the same neuron.
///
/// Members are ordered by session ordinal and consecutive members are
/// connected by exactly one held pair: the chain graph is a simple path,
/// never a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeldUnitChain {
    pub id: HeldUnitId,
    pub members: Vec<ChainMember>,
}

impl HeldUnitChain {
    /// Number of sessions the neuron was tracked through.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// First and last session ordinals spanned by the chain.
    pub fn span(&self) -> Option<(u32, u32)> {
        match (self.members.first(), self.members.last()) {
            (Some(a), Some(b)) => Some((a.session_ordinal, b.session_ordinal)),
            _ => None,
        }
    }

    /// Whether the chain contains the given unit.
    pub fn contains(&self, key: &UnitKey) -> bool {
        self.members.iter().any(|m| m.key == *key)
    }
}
