//! Domain models for GrackerKYC
//!
//! Typed structures for verification requests, extracted fields, decisions,
//! ledger blocks and audit records. Serialization happens only at the store
//! and wire boundaries.

mod block;
mod decision;
mod document;
mod record;
mod types;

pub use block::*;
pub use decision::*;
pub use document::*;
pub use record::*;
pub use types::*;
