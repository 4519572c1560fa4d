//! Infrastructure layer for GrackerKYC
//!
//! Contains:
//! - Error types
//! - The hash-chained ledger
//! - Audit store trait and implementations (in-memory, SQLite)
//! - The verification service
//! - Graceful shutdown (request draining)

mod error;
mod graceful_shutdown;
mod ledger;
mod memory;
pub mod sqlite;
mod traits;
mod verification;

pub use error::*;
pub use graceful_shutdown::{
    shutdown_signal, RequestGuard, RequestTracker, ShutdownCoordinator, ShutdownSignal,
};
pub use ledger::{verify_chain, ChainVerification, IntegrityViolation, Ledger, LedgerWriter};
pub use memory::InMemoryAuditStore;
pub use sqlite::SqliteAuditStore;
pub use traits::*;
pub use verification::*;
