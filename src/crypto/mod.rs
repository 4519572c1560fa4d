//! Cryptographic utilities for GrackerKYC
//!
//! Provides:
//! - Canonical JSON (RFC 8785) for deterministic payload encoding
//! - Domain-separated SHA-256 block hashing for the ledger
//! - Deterministic subject identifiers derived from claimed emails

mod hash;

pub use hash::*;
