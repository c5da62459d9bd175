// Thin re-export module: implementation is in `blockchain/core.rs` so block,
// chain, validation and ownership concerns stay in separate files.

pub mod core;
pub use self::core::*;
