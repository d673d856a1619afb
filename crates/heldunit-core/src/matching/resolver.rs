//! Mutual-nearest-neighbor resolution of the candidate table.
//!
//! An explicit fixed point: each pass over a scope either decides at least
//! one pair or the scope is declared ambiguous. A pair is decided held only
//! when both sides agree it is the other's best remaining candidate; every
//! competing pair touching either member is then decided not-held, so a
//! unit can be held by at most one partner in the adjacent session.

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::error::{HeldUnitError, HeldUnitResult};
use crate::types::{CandidatePair, HeldUnitId, UnitKey};

/// Hands out cross-session identities: one monotonically increasing
/// counter for the whole run, shared across experimental groups.
#[derive(Debug, Default)]
pub struct IdentityAllocator {
    next: u64,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> HeldUnitId {
        let id = HeldUnitId(self.next);
        self.next += 1;
        id
    }
}

/// Resolves one scope's candidate pairs against a calibrated threshold.
pub struct IdentityResolver {
    threshold: f64,
}

impl IdentityResolver {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Drive every pair to a resolved state.
    ///
    /// Pairs at or above the threshold are separable (clearly different
    /// neurons) and are decided immediately. The rest are decided pass by
    /// pass on mutual-best agreement. Already-resolved tables pass through
    /// untouched, so re-running is a no-op.
    ///
    /// # Errors
    /// `AmbiguousMatch` if a full pass decides nothing while undecided
    /// pairs remain (for example a pair whose score is NaN).
    pub fn resolve(&self, pairs: &mut [CandidatePair]) -> HeldUnitResult<()> {
        for pair in pairs.iter_mut() {
            if !pair.resolved && pair.score >= self.threshold {
                pair.resolved = true;
            }
        }

        loop {
            let unresolved = pairs.iter().filter(|p| !p.resolved).count();
            if unresolved == 0 {
                return Ok(());
            }
            let decided = self.pass(pairs);
            if decided == 0 {
                let Some(stuck) = pairs.iter().find(|p| !p.resolved) else {
                    return Ok(());
                };
                return Err(HeldUnitError::AmbiguousMatch {
                    animal_id: stuck.animal_id.clone(),
                    electrode: stuck.electrode,
                    unresolved,
                });
            }
            debug!(decided, "resolution pass complete");
        }
    }

    /// One full pass over every session boundary. Returns how many pairs
    /// were decided held.
    fn pass(&self, pairs: &mut [CandidatePair]) -> usize {
        let mut boundaries: Vec<(String, String)> = pairs
            .iter()
            .filter(|p| !p.resolved)
            .map(|p| {
                let (s1, s2) = p.boundary();
                (s1.to_string(), s2.to_string())
            })
            .collect();
        boundaries.sort();
        boundaries.dedup();

        let mut decided = 0;
        for boundary in &boundaries {
            decided += self.pass_boundary(pairs, boundary);
        }
        decided
    }

    fn pass_boundary(&self, pairs: &mut [CandidatePair], boundary: &(String, String)) -> usize {
        let decidable = |p: &CandidatePair| {
            !p.resolved
                && p.score < self.threshold
                && p.unit1.session_id == boundary.0
                && p.unit2.session_id == boundary.1
        };

        let mut lead_units: Vec<UnitKey> = pairs
            .iter()
            .filter(|p| decidable(p))
            .map(|p| p.unit1.clone())
            .collect();
        lead_units.sort();
        lead_units.dedup();

        let mut decided = 0;
        for u1 in lead_units {
            // Flags change as earlier units resolve, so re-query each time.
            let best = pairs
                .iter()
                .enumerate()
                .filter(|(_, p)| decidable(p) && p.unit1 == u1)
                .min_by_key(|(_, p)| OrderedFloat(p.score));
            let Some((idx, _)) = best else { continue };

            let u2 = pairs[idx].unit2.clone();
            let mutual = pairs
                .iter()
                .enumerate()
                .filter(|(_, p)| decidable(p) && p.unit2 == u2)
                .min_by_key(|(_, p)| OrderedFloat(p.score))
                .is_some_and(|(back, _)| back == idx);
            if !mutual {
                // A competing pair may resolve first and free this one up
                // on a later pass.
                continue;
            }

            for pair in pairs.iter_mut() {
                if !pair.resolved
                    && pair.unit1.session_id == boundary.0
                    && pair.unit2.session_id == boundary.1
                    && (pair.unit1 == u1 || pair.unit2 == u2)
                {
                    pair.resolved = true;
                    pair.held = false;
                }
            }
            pairs[idx].held = true;
            debug!(unit1 = %pairs[idx].unit1, unit2 = %pairs[idx].unit2, score = pairs[idx].score, "held pair decided");
            decided += 1;
        }
        decided
    }

    /// Chain held pairs into cross-session identities.
    ///
    /// Held pairs are walked in session order; a pair whose earlier member
    /// is the later member of exactly one previously held pair inherits
    /// that pair's identity, otherwise a fresh identity is allocated.
    ///
    /// # Errors
    /// `MultipleMatches` if some unit is the later member of more than one
    /// held pair, meaning the matcher fed the resolver inconsistent output.
    pub fn assign_identities(
        &self,
        pairs: &mut [CandidatePair],
        allocator: &mut IdentityAllocator,
    ) -> HeldUnitResult<()> {
        let mut held: Vec<usize> = (0..pairs.len()).filter(|&i| pairs[i].held).collect();
        held.sort_by(|&a, &b| {
            (pairs[a].ordinal1, &pairs[a].unit1, &pairs[a].unit2)
                .cmp(&(pairs[b].ordinal1, &pairs[b].unit1, &pairs[b].unit2))
        });

        for &i in &held {
            let predecessors: Vec<usize> = (0..pairs.len())
                .filter(|&j| j != i && pairs[j].held && pairs[j].unit2 == pairs[i].unit1)
                .collect();

            let id = match predecessors.as_slice() {
                [] => allocator.allocate(),
                [j] => match pairs[*j].held_unit_id {
                    Some(id) => id,
                    None => {
                        let id = allocator.allocate();
                        pairs[*j].held_unit_id = Some(id);
                        id
                    }
                },
                many => {
                    return Err(HeldUnitError::multiple_matches(format!(
                        "unit {} is the later member of {} held pairs",
                        pairs[i].unit1,
                        many.len()
                    )))
                }
            };
            pairs[i].held_unit_id = Some(id);
        }
        Ok(())
    }
}
