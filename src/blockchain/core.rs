// core.rs splits ledger responsibilities into submodules: block sealing,
// chain management, integrity validation and the ownership challenge.
pub mod block;
pub mod chain;
pub mod ownership;
pub mod validation;

pub use block::*;
pub use chain::*;
pub use ownership::*;
pub use validation::*;
