//! StarChain - a private hash-linked ledger notarizing star ownership claims
//!
//! # Architecture
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, chain validation and the ownership
//!   challenge protocol
//!
//! ## Cryptography
//! - [`crypto`] - Wallet addresses and recoverable message signatures
//!   (secp256k1)
//!
//! ## Integration
//! - [`api`] - REST API over the ledger
//!
//! ## Configuration & Utilities
//! - [`clock`] - Time sources
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod clock;
pub mod config;
pub mod error;

pub use blockchain::{Block, BlockBody, ChainIssue, Ledger, StarClaim};
pub use error::{LedgerError, Result};
