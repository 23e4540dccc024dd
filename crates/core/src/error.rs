use thiserror::Error;

use crate::Amount;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewardsError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Root document not found: {0}")]
    RootNotFound(String),

    #[error("Wrong network: connected to chain {actual}, expected chain {expected}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("Invalid proof for {address} under root {root}")]
    InvalidProof { address: String, root: String },

    #[error("Non-monotonic allocation for {address}: {later} at root {later_root} is below {earlier} at root {earlier_root}")]
    NonMonotonic {
        address: String,
        earlier_root: String,
        earlier: Amount,
        later_root: String,
        later: Amount,
    },

    #[error("Nothing to claim")]
    NothingToClaim,

    #[error("Claim already in progress")]
    AlreadyInProgress,

    #[error("Already claimed {amount} under root {root}")]
    AlreadyClaimed { root: String, amount: Amount },

    #[error("Stale snapshot: taken at generation {snapshot}, coordinator is at generation {current}")]
    StaleSnapshot { snapshot: u64, current: u64 },

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RewardsError {
    /// Whether the caller may retry after a fresh reconciliation.
    ///
    /// Network mismatches and integrity failures need user or operator
    /// action and are never retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DataUnavailable(_)
                | Self::RootNotFound(_)
                | Self::TransactionFailed(_)
                | Self::StaleSnapshot { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RewardsError>;
