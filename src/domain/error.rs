//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the tree's structural rules.
/// These are independent of producers, files and configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found in tree: {0}")]
    UnknownNode(String),

    #[error(
        "proposal does not fit child slots: expected {expected_explicit} explicit + \
         {expected_commonsense} commonsense, got {got_explicit} + {got_commonsense}"
    )]
    SlotMismatch {
        expected_explicit: usize,
        expected_commonsense: usize,
        got_explicit: usize,
        got_commonsense: usize,
    },

    #[error("invalid tree: {0}")]
    InvalidTree(String),
}
