//! Core value types.

mod candidate;
mod chain;
mod report;
mod unit;
mod waveform;

pub use candidate::CandidatePair;
pub use chain::{ChainMember, HeldUnitChain};
pub use report::{HeldUnitReport, IntraScore, ScopeFailure, SkippedComparison};
pub use unit::{HeldUnitId, SnapshotWindow, Unit, UnitKey};
pub use waveform::{WaveformKind, WaveformSet};
