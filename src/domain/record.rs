//! Audit records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{rfc3339_micros, AnalysisReport, Confidence, Issue, RiskLevel, VerificationStatus};

/// Persisted copy of one verification outcome.
///
/// Created once per verification and never updated. `ledger_hash` refers to
/// the block that committed the same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub subject_id: String,
    pub name: String,
    pub email: String,
    pub doc_type: String,
    /// Full analysis as returned to the caller
    pub doc_data: AnalysisReport,
    pub ledger_hash: String,
    #[serde(with = "rfc3339_micros")]
    pub timestamp: DateTime<Utc>,
    pub status: VerificationStatus,
    pub confidence: Confidence,
    pub risk_level: RiskLevel,
    pub issues: Vec<Issue>,
    pub suggestions: Vec<String>,
}

impl VerificationRecord {
    /// Verification identifier shown to callers (ledger hash prefix)
    pub fn verification_id(&self) -> &str {
        verification_id(&self.ledger_hash)
    }
}

/// Number of ledger-hash characters used as a verification identifier
pub const VERIFICATION_ID_LEN: usize = 16;

/// Fixed-length prefix of a ledger hash
pub fn verification_id(ledger_hash: &str) -> &str {
    let end = ledger_hash
        .char_indices()
        .nth(VERIFICATION_ID_LEN)
        .map(|(i, _)| i)
        .unwrap_or(ledger_hash.len());
    &ledger_hash[..end]
}
