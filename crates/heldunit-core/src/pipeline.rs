//! End-to-end held-unit pipeline.
//!
//! Enumerate units, calibrate per-group thresholds from intra-unit J3,
//! build and resolve the candidate table per (animal, electrode) scope,
//! chain held pairs into identities, and write the labels back to the
//! catalog. One bad scope fails that scope, a `MultipleMatches` defect or
//! a failed label write aborts its animal, and the batch only errors as a
//! whole when no animal could be processed at all.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::calibration;
use crate::config::HeldUnitConfig;
use crate::error::{HeldUnitError, HeldUnitResult};
use crate::matching::{
    build_chains, IdentityAllocator, IdentityResolver, MatchOutcome, PairwiseMatcher, ScopeKey,
};
use crate::traits::{UnitCatalog, WaveformSource};
use crate::types::{HeldUnitChain, HeldUnitReport, IntraScore, ScopeFailure, Unit, UnitKey};

/// The orchestrator. Collaborators come in as trait objects; all policy
/// comes from the config.
pub struct HeldUnitPipeline {
    catalog: Arc<dyn UnitCatalog>,
    source: Arc<dyn WaveformSource>,
    config: HeldUnitConfig,
}

impl HeldUnitPipeline {
    pub fn new(
        catalog: Arc<dyn UnitCatalog>,
        source: Arc<dyn WaveformSource>,
        config: HeldUnitConfig,
    ) -> HeldUnitResult<Self> {
        config
            .validate()
            .map_err(|e| HeldUnitError::Configuration(e.to_string()))?;
        Ok(Self {
            catalog,
            source,
            config,
        })
    }

    /// Run over every animal the catalog knows.
    pub async fn run(&self) -> HeldUnitResult<HeldUnitReport> {
        let animals = self.catalog.animal_ids().await?;
        self.run_for(&animals).await
    }

    /// Run over the given animals, returning a partial report when some
    /// scopes fail.
    pub async fn run_for(&self, animals: &[String]) -> HeldUnitResult<HeldUnitReport> {
        let mut report = HeldUnitReport::default();
        let mut fatal_animals: HashSet<String> = HashSet::new();

        let mut units: Vec<Unit> = Vec::new();
        for animal in animals {
            match self.catalog.units_for_animal(animal).await {
                Ok(mut enumerated) => units.append(&mut enumerated),
                Err(err) => {
                    warn!(%animal, %err, "unit enumeration failed");
                    fatal_animals.insert(animal.clone());
                    report.failures.push(ScopeFailure {
                        animal_id: animal.clone(),
                        electrode: None,
                        reason: err.to_string(),
                    });
                }
            }
        }
        info!(
            n_animals = animals.len(),
            n_units = units.len(),
            "enumerated units"
        );

        report.intra_scores = self.intra_scores(&units).await;
        report.thresholds =
            calibration::group_thresholds(&report.intra_scores, self.config.percent_criterion)?;
        info!(n_groups = report.thresholds.len(), "calibrated thresholds");

        let matcher = PairwiseMatcher::new(Arc::clone(&self.source), self.config.clone());
        let mut allocator = IdentityAllocator::new();
        let scopes = PairwiseMatcher::scopes(&units);

        let unit_index: HashMap<UnitKey, usize> = units
            .iter()
            .enumerate()
            .map(|(i, u)| (u.key(), i))
            .collect();

        // Scopes grouped per animal so a MultipleMatches defect can abort
        // the whole animal without committing its labels.
        let mut by_animal: Vec<(String, Vec<(&ScopeKey, &Vec<Unit>)>)> = Vec::new();
        for (key, scope_units) in &scopes {
            match by_animal.last_mut() {
                Some((animal, entries)) if *animal == key.animal_id => {
                    entries.push((key, scope_units))
                }
                _ => by_animal.push((key.animal_id.clone(), vec![(key, scope_units)])),
            }
        }

        for (animal, animal_scopes) in by_animal {
            if fatal_animals.contains(&animal) {
                continue;
            }
            let mut pending: Vec<(MatchOutcome, Vec<HeldUnitChain>)> = Vec::new();
            let mut fatal = false;

            for (key, scope_units) in animal_scopes {
                let group = &scope_units[0].group;
                let Some(&threshold) = report.thresholds.get(group) else {
                    warn!(%key, %group, "no calibrated threshold for group");
                    report.failures.push(ScopeFailure {
                        animal_id: key.animal_id.clone(),
                        electrode: Some(key.electrode),
                        reason: format!("no calibrated threshold for group '{group}'"),
                    });
                    continue;
                };

                match self
                    .resolve_scope(&matcher, key, scope_units, threshold, &mut allocator)
                    .await
                {
                    Ok(result) => pending.push(result),
                    Err(err) => {
                        warn!(%key, %err, "scope failed");
                        if matches!(err, HeldUnitError::MultipleMatches { .. }) {
                            fatal = true;
                        }
                        report.failures.push(ScopeFailure {
                            animal_id: key.animal_id.clone(),
                            electrode: Some(key.electrode),
                            reason: err.to_string(),
                        });
                        if fatal {
                            break;
                        }
                    }
                }
            }

            if fatal {
                fatal_animals.insert(animal.clone());
                // Keep the animal's tables for audit, but none of its
                // labels: a chain-propagation defect taints all of them.
                for (outcome, _) in pending {
                    report.pairs.extend(outcome.pairs);
                    report.skipped.extend(outcome.skipped);
                }
                continue;
            }

            let mut commit_failed = false;
            for (outcome, chains) in pending {
                report.pairs.extend(outcome.pairs);
                report.skipped.extend(outcome.skipped);
                if commit_failed {
                    continue;
                }
                match self.commit_chains(&chains, &unit_index, &mut units).await {
                    Ok(()) => report.chains.extend(chains),
                    Err(err) => {
                        warn!(%animal, %err, "held label write failed, skipping the animal's remaining labels");
                        commit_failed = true;
                        fatal_animals.insert(animal.clone());
                        report.failures.push(ScopeFailure {
                            animal_id: animal.clone(),
                            electrode: None,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }

        let processed = animals
            .iter()
            .filter(|a| !fatal_animals.contains(*a))
            .count();
        if processed == 0 && !animals.is_empty() {
            return Err(HeldUnitError::NoAnimalsProcessed {
                attempted: animals.len(),
            });
        }

        report.units = units;
        info!(
            held_units = report.held_unit_count(),
            chains = report.chains.len(),
            failures = report.failures.len(),
            "held-unit run complete"
        );
        Ok(report)
    }

    /// Intrinsic J3 for every single unit, prefetched concurrently. Units
    /// whose computation fails are excluded from calibration.
    async fn intra_scores(&self, units: &[Unit]) -> Vec<IntraScore> {
        let kind = self.config.waveform_kind;
        let k = self.config.n_components;

        let fetches = units.iter().filter(|u| u.single_unit).map(|unit| {
            let source = Arc::clone(&self.source);
            let key = unit.key();
            let group = unit.group.clone();
            async move {
                let result = source
                    .waveforms(&key.session_id, &key.unit_label, kind)
                    .await;
                (key, group, result)
            }
        });
        let fetched: Vec<_> = stream::iter(fetches)
            .buffer_unordered(self.config.max_concurrent_fetches)
            .collect()
            .await;

        let mut scores = Vec::new();
        for (key, group, result) in fetched {
            match result.and_then(|waves| calibration::intra_unit_j3(&waves, k)) {
                Ok(j3) => scores.push(IntraScore { key, group, j3 }),
                Err(err) => {
                    warn!(unit = %key, %err, "intra-unit J3 unavailable, excluded from calibration")
                }
            }
        }
        scores.sort_by(|a, b| (&a.group, &a.key).cmp(&(&b.group, &b.key)));
        scores
    }

    /// Write one animal's chain labels back to the catalog. A write
    /// failure stops at the first bad label so the caller can fail the
    /// animal instead of the run.
    async fn commit_chains(
        &self,
        chains: &[HeldUnitChain],
        unit_index: &HashMap<UnitKey, usize>,
        units: &mut [Unit],
    ) -> HeldUnitResult<()> {
        for chain in chains {
            for member in &chain.members {
                self.catalog.write_held_label(&member.key, chain.id).await?;
                if let Some(&i) = unit_index.get(&member.key) {
                    units[i].held_unit_id = Some(chain.id);
                }
            }
        }
        Ok(())
    }

    async fn resolve_scope(
        &self,
        matcher: &PairwiseMatcher,
        key: &ScopeKey,
        units: &[Unit],
        threshold: f64,
        allocator: &mut IdentityAllocator,
    ) -> HeldUnitResult<(MatchOutcome, Vec<HeldUnitChain>)> {
        let mut outcome = matcher.pairs_for_scope(key, units).await?;
        let resolver = IdentityResolver::new(threshold);
        resolver.resolve(&mut outcome.pairs)?;
        resolver.assign_identities(&mut outcome.pairs, allocator)?;
        let chains = build_chains(&outcome.pairs)?;
        info!(%key, pairs = outcome.pairs.len(), chains = chains.len(), "scope resolved");
        Ok((outcome, chains))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{InMemoryCatalog, InMemoryWaveformSource};
    use async_trait::async_trait;

    struct BrokenCatalog;

    #[async_trait]
    impl UnitCatalog for BrokenCatalog {
        async fn animal_ids(&self) -> HeldUnitResult<Vec<String>> {
            Ok(vec!["RN5".to_string()])
        }
        async fn units_for_animal(&self, _animal_id: &str) -> HeldUnitResult<Vec<Unit>> {
            Err(HeldUnitError::catalog("store offline"))
        }
        async fn write_held_label(&self, _key: &UnitKey, _id: crate::types::HeldUnitId) -> HeldUnitResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let source = Arc::new(InMemoryWaveformSource::new());
        let config = HeldUnitConfig::default().with_percent_criterion(150.0);
        assert!(HeldUnitPipeline::new(catalog, source, config).is_err());
    }

    #[tokio::test]
    async fn test_empty_catalog_is_an_empty_report() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let source = Arc::new(InMemoryWaveformSource::new());
        let pipeline =
            HeldUnitPipeline::new(catalog, source, HeldUnitConfig::default()).unwrap();
        let report = pipeline.run().await.unwrap();
        assert!(report.units.is_empty());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_all_animals_failing_is_an_error() {
        let source = Arc::new(InMemoryWaveformSource::new());
        let pipeline =
            HeldUnitPipeline::new(Arc::new(BrokenCatalog), source, HeldUnitConfig::default())
                .unwrap();
        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, HeldUnitError::NoAnimalsProcessed { attempted: 1 }));
    }
}
