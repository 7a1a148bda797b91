//! Errors
//!
//! Custom error types used throughout the `balanced_chi2` crate.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building populations, samples and tests.
///
/// `InvalidDistribution` and `UndefinedConditional` reject a whole update.
/// `EmptyBalancedSample` and `DegenerateTable` only make one balanced branch
/// "not applicable".
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum BalanceError {
    /// Joint proportions are negative, non-finite, or do not sum to one.
    #[error("Invalid joint distribution: {0}")]
    InvalidDistribution(String),
    /// The conditioning event has probability zero.
    #[error("Conditional probability given {0} is undefined, its marginal probability is 0.")]
    UndefinedConditional(String),
    /// One level of the balancing variable has no members.
    #[error("Balanced sample on variable {0} is empty, one of its levels has probability 0.")]
    EmptyBalancedSample(String),
    /// An expected cell of the scaled contingency table is zero.
    #[error("Contingency table is degenerate, expected counts {0} contain a zero cell.")]
    DegenerateTable(String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Unable to write configuration to file.
    #[error("Unable to write configuration to file: {0}")]
    UnableToWrite(String),
    /// Unable to read configuration from file.
    #[error("Unable to read configuration from a file {0}")]
    UnableToRead(String),
}

impl BalanceError {
    /// Whether the error only invalidates one balanced branch rather than the whole update.
    pub fn is_branch_local(&self) -> bool {
        matches!(
            self,
            BalanceError::EmptyBalancedSample(_) | BalanceError::DegenerateTable(_)
        )
    }
}
