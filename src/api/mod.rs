//! API layer for GrackerKYC
//!
//! REST endpoints for verification, ledger inspection and audit queries.

mod error;
mod rest;
mod types;

pub use error::*;
pub use rest::*;
pub use types::*;
