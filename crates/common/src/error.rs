//! Error types for the verification core

use thiserror::Error;

/// Result type alias using the core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building verification inputs.
///
/// Gate verifiers themselves never fail: a broken contract is a `Verdict`
/// with `passed == false`, not an error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid pattern '{label}': {source}")]
    Pattern {
        label: String,
        #[source]
        source: regex::Error,
    },

    #[error("Rule table '{0}' is empty")]
    EmptyRuleTable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
