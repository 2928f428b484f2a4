//! Fault localization errors
//!
//! Error types for spectra construction, statistics and ranking.

use thiserror::Error;

/// Errors that can occur while building or querying spectra
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectraError {
    #[error("Trace '{0}' is already contained in spectra")]
    DuplicateTrace(String),

    #[error("Trace not found: {0}")]
    UnknownTrace(String),

    #[error("Trace '{0}' is not a failing trace")]
    NotAFailingTrace(String),

    #[error("Unknown formula: {0}")]
    UnknownFormula(String),

    #[error("Unsupported computation strategy: {0}")]
    UnsupportedStrategy(String),

    #[error("Unknown normalization strategy: {0}")]
    UnknownNormalization(String),

    #[error("Unknown tie-break policy: {0}")]
    UnknownTieBreak(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias for spectra operations.
pub type Result<T> = std::result::Result<T, SpectraError>;
