//! SQLite implementation of the audit store
//!
//! Stores verification records and, optionally, the ledger block log in one
//! database so a record and its block commit in a single transaction.

mod audit_store;

pub use audit_store::*;
