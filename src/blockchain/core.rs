// core.rs splits the ledger engine into submodules: the block and ledger
// proper, the pending queue, and whole-chain validation.
pub mod chain;
pub mod pending;
pub mod validation;

pub use chain::*;
pub use pending::*;
pub use validation::*;
