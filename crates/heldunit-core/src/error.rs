//! Error types for held-unit operations.
//!
//! Comparison-level failures (`DimensionMismatch`, `DegenerateInput`) are
//! local numerical precondition failures: the offending pair is excluded
//! from the candidate table and the run continues. Resolution-level
//! failures (`AmbiguousMatch`, `MultipleMatches`) abort the (animal,
//! electrode) scope they occurred in, never the whole batch.

use thiserror::Error;

/// Result type alias for held-unit operations.
pub type HeldUnitResult<T> = Result<T, HeldUnitError>;

/// Main error type for all held-unit operations.
#[derive(Error, Debug)]
pub enum HeldUnitError {
    /// Waveform snapshot lengths could not be reconciled to a common
    /// length greater than zero.
    #[error("dimension mismatch: snapshots of {len_a} and {len_b} samples cannot be aligned")]
    DimensionMismatch { len_a: usize, len_b: usize },

    /// Too few spikes for the principal-component fit, or zero
    /// within-class scatter.
    #[error("degenerate input: {message}")]
    DegenerateInput { message: String },

    /// The resolution loop made a full pass over a scope without deciding
    /// any pair while undecided pairs remain.
    #[error(
        "ambiguous match: no mutual-best pair decidable for animal '{animal_id}' \
         electrode {electrode} ({unresolved} pairs unresolved)"
    )]
    AmbiguousMatch {
        animal_id: String,
        electrode: u32,
        unresolved: usize,
    },

    /// Chain propagation found a unit that is the successor of more than
    /// one held pair. Indicates defective matcher output; fatal for the
    /// animal being processed.
    #[error("multiple matches: {message}")]
    MultipleMatches { message: String },

    /// The waveform source failed to supply waveforms.
    #[error("waveform source error: {message}")]
    WaveformSource {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The unit catalog failed to enumerate units or accept a label.
    #[error("catalog error: {message}")]
    Catalog {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Every animal in the batch failed; there is no partial result to
    /// return.
    #[error("no animal produced a result ({attempted} attempted)")]
    NoAnimalsProcessed { attempted: usize },
}

impl HeldUnitError {
    /// Create a degenerate-input error.
    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateInput {
            message: message.into(),
        }
    }

    /// Create a waveform source error.
    pub fn waveform_source(message: impl Into<String>) -> Self {
        Self::WaveformSource {
            message: message.into(),
            source: None,
        }
    }

    /// Create a catalog error.
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
            source: None,
        }
    }

    /// Create a multiple-matches error.
    pub fn multiple_matches(message: impl Into<String>) -> Self {
        Self::MultipleMatches {
            message: message.into(),
        }
    }

    /// Whether this error invalidates only the single comparison that
    /// produced it (as opposed to a whole scope or the run).
    pub fn is_comparison_local(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. } | Self::DegenerateInput { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_local_classification() {
        let err = HeldUnitError::DimensionMismatch { len_a: 45, len_b: 0 };
        assert!(err.is_comparison_local());

        let err = HeldUnitError::degenerate("3 spikes, need 4");
        assert!(err.is_comparison_local());

        let err = HeldUnitError::AmbiguousMatch {
            animal_id: "RN5".to_string(),
            electrode: 12,
            unresolved: 3,
        };
        assert!(!err.is_comparison_local());
    }

    #[test]
    fn test_error_display_names_scope() {
        let err = HeldUnitError::AmbiguousMatch {
            animal_id: "RN5".to_string(),
            electrode: 12,
            unresolved: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("RN5"));
        assert!(msg.contains("12"));
    }
}
