//! UnitCatalog trait.

use async_trait::async_trait;

use crate::error::HeldUnitResult;
use crate::types::{HeldUnitId, Unit, UnitKey};

/// Per-animal unit bookkeeping.
///
/// Enumerates the units the pipeline keys off of and receives the final
/// held-unit labels back; `write_held_label` is the core's only externally
/// visible side effect.
#[async_trait]
pub trait UnitCatalog: Send + Sync {
    /// All animal identifiers known to the catalog.
    async fn animal_ids(&self) -> HeldUnitResult<Vec<String>>;

    /// Every sorted unit for one animal, ordered by session ordinal then
    /// electrode.
    async fn units_for_animal(&self, animal_id: &str) -> HeldUnitResult<Vec<Unit>>;

    /// Record a unit's cross-session identity. Called once per unit that
    /// ends up part of a held chain.
    async fn write_held_label(&self, key: &UnitKey, id: HeldUnitId) -> HeldUnitResult<()>;
}
