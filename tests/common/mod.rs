//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use gracker_kyc::domain::VerificationRequest;
use gracker_kyc::infra::{AuditStore, InMemoryAuditStore, SqliteAuditStore, VerificationService};
use gracker_kyc::metrics::MetricsRegistry;

/// Document with every labelled field present
pub const FULL_DOCUMENT: &str =
    "Name: John Doe\nDOB: 1990-01-01\nNumber: X123\nExpiry: 2030-01-01";

/// Same document without the expiry line
pub const NO_EXPIRY_DOCUMENT: &str = "Name: John Doe\nDOB: 1990-01-01\nNumber: X123";

/// Same document without date of birth and expiry
pub const NO_DATES_DOCUMENT: &str = "Name: John Doe\nNumber: X123";

/// Build a request with a passport document type
pub fn request(name: &str, email: &str, document_text: &str) -> VerificationRequest {
    VerificationRequest::new(name, email, document_text, "passport")
}

/// Request that the pipeline approves
pub fn approved_request() -> VerificationRequest {
    request("John Doe", "john@example.com", FULL_DOCUMENT)
}

/// Request numbered `i`, for bulk tests
pub fn numbered_request(i: usize) -> VerificationRequest {
    request(
        "John Doe",
        &format!("user{i}@example.com"),
        FULL_DOCUMENT,
    )
}

/// Service backed by the in-memory store
pub async fn memory_service() -> VerificationService {
    let store: Arc<dyn AuditStore> = Arc::new(InMemoryAuditStore::new());
    VerificationService::open(store, Arc::new(MetricsRegistry::new()))
        .await
        .unwrap()
}

/// Migrated SQLite store at `url`
pub async fn sqlite_store(url: &str, persist_ledger: bool) -> SqliteAuditStore {
    let store = SqliteAuditStore::connect(url, 4, persist_ledger)
        .await
        .unwrap();
    store.initialize().await.unwrap();
    store
}

/// Service backed by a SQLite store at `url` with a durable ledger
pub async fn sqlite_service(url: &str) -> VerificationService {
    let store: Arc<dyn AuditStore> = Arc::new(sqlite_store(url, true).await);
    VerificationService::open(store, Arc::new(MetricsRegistry::new()))
        .await
        .unwrap()
}

/// `sqlite://` URL for a file inside `dir`
pub fn sqlite_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}", dir.path().join("kyc.db").display())
}
