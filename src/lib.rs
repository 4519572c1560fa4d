//! GrackerKYC Library
//!
//! Identity verification service: claimed identities are checked against
//! free-text documents, every decision is committed to a hash-chained
//! ledger, and an append-only audit record is kept alongside it.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (requests, decisions, blocks, records)
//! - [`analysis`] - Field extraction and risk evaluation
//! - [`crypto`] - Canonical JSON and ledger hashing
//! - [`infra`] - Ledger, audit stores (memory, SQLite) and the verification service
//! - [`metrics`] - Counters, gauges and latency histograms
//! - [`telemetry`] - Structured logging setup
//! - [`api`] - REST API routes
//! - [`server`] - HTTP server bootstrap

pub mod analysis;
pub mod api;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod metrics;
pub mod migrations;
pub mod server;
pub mod telemetry;

// Re-export commonly used types
pub use domain::{
    AnalysisReport, Block, BlockPayload, Confidence, Decision, Issue, RiskLevel,
    VerificationRecord, VerificationRequest, VerificationStatus,
};

pub use infra::{
    AuditStore, KycError, Ledger, Result, VerificationOutcome, VerificationService,
};
