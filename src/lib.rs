//! GenAuth - an append-only, proof-of-work ledger of authorship claims
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Ledger Engine
//! - [`blockchain`] - Blocks, canonical hashing, the pending queue, admission and validation
//! - [`miner`] - Proof-of-work search
//!
//! ## State Management
//! - [`persistence`] - Whole-chain JSON snapshots
//!
//! ## Integration
//! - `api` - HTTP surface (feature `api`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - Helpers shared by the binaries

#![forbid(unsafe_code)]

// ============================================================================
// Ledger Engine
// ============================================================================
pub mod blockchain;
pub mod miner;

// ============================================================================
// State Management
// ============================================================================
pub mod persistence;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;
