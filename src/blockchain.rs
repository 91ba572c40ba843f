// Thin re-export module: implementation is in `blockchain/core.rs` so the
// block format, queueing and validation rules stay in separate files.

pub mod core;
pub use core::*;
