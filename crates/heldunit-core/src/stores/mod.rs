//! In-memory collaborator implementations.
//!
//! Reference implementations of [`WaveformSource`] and [`UnitCatalog`] for
//! tests and for callers whose data already lives in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{HeldUnitError, HeldUnitResult};
use crate::traits::{UnitCatalog, WaveformSource};
use crate::types::{HeldUnitId, Unit, UnitKey, WaveformKind, WaveformSet};

/// Waveform source backed by a map.
#[derive(Default)]
pub struct InMemoryWaveformSource {
    waves: RwLock<HashMap<(String, String, WaveformKind), WaveformSet>>,
}

impl InMemoryWaveformSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register waveforms for one unit.
    pub async fn insert(
        &self,
        session_id: impl Into<String>,
        unit_label: impl Into<String>,
        kind: WaveformKind,
        waves: WaveformSet,
    ) {
        self.waves
            .write()
            .await
            .insert((session_id.into(), unit_label.into(), kind), waves);
    }
}

#[async_trait]
impl WaveformSource for InMemoryWaveformSource {
    async fn waveforms(
        &self,
        session_id: &str,
        unit_label: &str,
        kind: WaveformKind,
    ) -> HeldUnitResult<WaveformSet> {
        self.waves
            .read()
            .await
            .get(&(session_id.to_string(), unit_label.to_string(), kind))
            .cloned()
            .ok_or_else(|| {
                HeldUnitError::waveform_source(format!(
                    "no waveforms for {session_id}::{unit_label}"
                ))
            })
    }
}

/// Unit catalog backed by a vector, collecting written labels in a map.
#[derive(Default)]
pub struct InMemoryCatalog {
    units: RwLock<Vec<Unit>>,
    labels: RwLock<HashMap<UnitKey, HeldUnitId>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_unit(&self, unit: Unit) {
        self.units.write().await.push(unit);
    }

    pub async fn add_units(&self, units: impl IntoIterator<Item = Unit>) {
        self.units.write().await.extend(units);
    }

    /// Snapshot of every label written back so far.
    pub async fn held_labels(&self) -> HashMap<UnitKey, HeldUnitId> {
        self.labels.read().await.clone()
    }
}

#[async_trait]
impl UnitCatalog for InMemoryCatalog {
    async fn animal_ids(&self) -> HeldUnitResult<Vec<String>> {
        let mut animals: Vec<String> = self
            .units
            .read()
            .await
            .iter()
            .map(|u| u.animal_id.clone())
            .collect();
        animals.sort();
        animals.dedup();
        Ok(animals)
    }

    async fn units_for_animal(&self, animal_id: &str) -> HeldUnitResult<Vec<Unit>> {
        let mut units: Vec<Unit> = self
            .units
            .read()
            .await
            .iter()
            .filter(|u| u.animal_id == animal_id)
            .cloned()
            .collect();
        units.sort_by(|a, b| {
            (a.session_ordinal, a.electrode, &a.unit_label).cmp(&(
                b.session_ordinal,
                b.electrode,
                &b.unit_label,
            ))
        });
        Ok(units)
    }

    async fn write_held_label(&self, key: &UnitKey, id: HeldUnitId) -> HeldUnitResult<()> {
        let mut labels = self.labels.write().await;
        if let Some(existing) = labels.get(key) {
            if *existing != id {
                return Err(HeldUnitError::catalog(format!(
                    "unit {key} already labeled {existing}, refusing {id}"
                )));
            }
        }
        labels.insert(key.clone(), id);
        Ok(())
    }
}
