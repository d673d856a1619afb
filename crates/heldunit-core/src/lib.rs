//! heldunit-core - waveform separability and cross-session unit matching.
//!
//! Spike-sorted units have no persistent identity across recording
//! sessions. This crate infers one: the J3 statistic scores how separable
//! two units' waveform shapes are in a joint principal-component space,
//! intra-unit scores calibrate a per-group threshold for "same neuron",
//! and a mutual-nearest-neighbor resolver turns the scored candidate table
//! into held-unit chains spanning an animal's whole study.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use heldunit_core::{HeldUnitConfig, HeldUnitPipeline};
//!
//! let pipeline = HeldUnitPipeline::new(catalog, source, HeldUnitConfig::default())?;
//! let report = pipeline.run().await?;
//!
//! for chain in &report.chains {
//!     println!("{} tracked across {} sessions", chain.id, chain.len());
//! }
//! ```

pub mod calibration;
pub mod config;
pub mod error;
pub mod matching;
pub mod pipeline;
pub mod separability;
pub mod stores;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::HeldUnitConfig;
pub use error::{HeldUnitError, HeldUnitResult};
pub use matching::{IdentityAllocator, IdentityResolver, MatchOutcome, PairwiseMatcher, ScopeKey};
pub use pipeline::HeldUnitPipeline;
pub use separability::j3_between;
pub use traits::{UnitCatalog, WaveformSource};
pub use types::{
    CandidatePair, ChainMember, HeldUnitChain, HeldUnitId, HeldUnitReport, IntraScore,
    ScopeFailure, SkippedComparison, SnapshotWindow, Unit, UnitKey, WaveformKind, WaveformSet,
};
