//! Candidate matching and identity resolution.

mod chain;
mod matcher;
mod resolver;

pub use chain::build_chains;
pub use matcher::{MatchOutcome, PairwiseMatcher, ScopeKey};
pub use resolver::{IdentityAllocator, IdentityResolver};
