use issuance_types::{Address, Amount};
use thiserror::Error;

/// Errors returned by supply-mutating operations.
///
/// Every rejected operation leaves the ledger untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupplyError {
    #[error("invalid amount: mint and burn amounts must be strictly positive")]
    InvalidAmount,

    #[error("unauthorized supply mutation requested by `{caller}`")]
    Unauthorized { caller: String },

    #[error("supply cap exceeded: resulting supply {resulting} would exceed cap {cap}")]
    SupplyCapExceeded { resulting: Amount, cap: Amount },

    #[error("insufficient supply to burn: requested={requested}, available={available}")]
    InsufficientSupply { requested: Amount, available: Amount },

    #[error(transparent)]
    State(#[from] StateError),
}

/// Failures reported by the external balance capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("state engine rejected balance credit of {amount} to {address}: {reason}")]
    Rejected {
        address: Address,
        amount: Amount,
        reason: String,
    },
}

/// Invalid monetary policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("invalid monetary policy parameter: {0}")]
    InvalidParameter(&'static str),
}

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("failed to parse genesis allocation: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The audit chain no longer matches its recorded digests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditChainError {
    #[error("audit entry {index} does not link to its predecessor")]
    BrokenLink { index: usize },

    #[error("audit entry {index} digest does not match its contents")]
    DigestMismatch { index: usize },
}
