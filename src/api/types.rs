//! Shared request and response types for REST API handlers.

use serde::{Deserialize, Serialize};

use crate::domain::{Block, VerificationRecord};
use crate::infra::{VerificationOutcome, DEFAULT_RECENT_LIMIT};

/// `POST /api/v1/verify` success body
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: VerificationOutcome,
}

impl From<VerificationOutcome> for VerifyResponse {
    fn from(outcome: VerificationOutcome) -> Self {
        Self {
            success: true,
            outcome,
        }
    }
}

/// `GET /api/v1/ledger` body
#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub blocks: Vec<Block>,
    pub length: usize,
}

/// Query parameters for `GET /api/v1/verifications`
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: u32,
}

fn default_recent_limit() -> u32 {
    DEFAULT_RECENT_LIMIT
}

/// `GET /api/v1/verifications` body
#[derive(Debug, Serialize)]
pub struct RecentResponse {
    pub records: Vec<VerificationRecord>,
}
