//! Error types for StarChain

use crate::blockchain::ChainIssue;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Chain integrity check failed with {} issue(s)", .0.len())]
    ChainCorrupted(Vec<ChainIssue>),

    #[error("Sealed block at height {height} failed self-validation")]
    BlockInvalid { height: u64 },

    #[error("Malformed challenge message: {0}")]
    MalformedMessage(String),

    #[error("Challenge expired: {elapsed}s elapsed, window is {window}s")]
    ChallengeExpired { elapsed: i64, window: i64 },

    #[error("Ownership verification failed")]
    OwnershipVerificationFailed,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ledger has not been initialized")]
    Uninitialized,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

/// Failures inside the signature primitives. These never cross the ledger
/// boundary: verification folds them into a rejected signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Invalid signature encoding: {0}")]
    InvalidEncoding(String),

    #[error("Signature must be exactly {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid recovery header byte {0}")]
    InvalidHeader(u8),

    #[error("Public key recovery failed: {0}")]
    Recovery(String),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, LedgerError>;
