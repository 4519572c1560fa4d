//! Ledger blocks and their payloads
//!
//! A block's hash binds its index, timestamp, canonical payload and the
//! previous block's hash. Genesis is index 0 with previous hash `"0"`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{format_timestamp, rfc3339_micros, Confidence, Issue, RiskLevel, VerificationStatus};
use crate::crypto::{canonicalize_json, compute_block_hash, BlockHashParams};

/// Previous-hash sentinel carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Message stored in the genesis payload
pub const GENESIS_MESSAGE: &str = "Genesis Block";

/// Identity and decision snapshot committed for one verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationPayload {
    pub subject_id: String,
    pub name: String,
    pub email: String,
    pub doc_type: String,
    pub status: VerificationStatus,
    pub confidence: Confidence,
    pub risk_level: RiskLevel,
    pub issues: Vec<Issue>,
    #[serde(with = "rfc3339_micros")]
    pub requested_at: DateTime<Utc>,
}

/// Data committed by a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockPayload {
    Genesis { message: String },
    Verification(VerificationPayload),
}

impl BlockPayload {
    pub fn genesis() -> Self {
        BlockPayload::Genesis {
            message: GENESIS_MESSAGE.to_string(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self, BlockPayload::Genesis { .. })
    }
}

/// One ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    #[serde(with = "rfc3339_micros")]
    pub timestamp: DateTime<Utc>,
    pub payload: BlockPayload,
    pub previous_hash: String,
    pub hash: String,
}

impl Block {
    /// Build a block and compute its hash
    pub fn seal(
        index: u64,
        timestamp: DateTime<Utc>,
        payload: BlockPayload,
        previous_hash: impl Into<String>,
    ) -> Result<Self, serde_json::Error> {
        let previous_hash = previous_hash.into();
        let hash = hash_fields(index, &timestamp, &payload, &previous_hash)?;
        Ok(Self {
            index,
            timestamp,
            payload,
            previous_hash,
            hash,
        })
    }

    /// Genesis block for a fresh chain
    pub fn genesis(timestamp: DateTime<Utc>) -> Result<Self, serde_json::Error> {
        Self::seal(0, timestamp, BlockPayload::genesis(), GENESIS_PREVIOUS_HASH)
    }

    /// Block following `self`
    pub fn successor(
        &self,
        timestamp: DateTime<Utc>,
        payload: BlockPayload,
    ) -> Result<Self, serde_json::Error> {
        Self::seal(self.index + 1, timestamp, payload, self.hash.clone())
    }

    /// Recompute the hash from the stored fields
    pub fn compute_hash(&self) -> Result<String, serde_json::Error> {
        hash_fields(self.index, &self.timestamp, &self.payload, &self.previous_hash)
    }

    /// Whether the stored hash matches the stored fields
    pub fn has_valid_hash(&self) -> bool {
        self.compute_hash()
            .map(|h| h == self.hash)
            .unwrap_or(false)
    }
}

fn hash_fields(
    index: u64,
    timestamp: &DateTime<Utc>,
    payload: &BlockPayload,
    previous_hash: &str,
) -> Result<String, serde_json::Error> {
    let canonical_payload = canonicalize_json(payload)?;
    let timestamp = format_timestamp(timestamp);
    Ok(compute_block_hash(&BlockHashParams {
        index,
        timestamp: &timestamp,
        canonical_payload: &canonical_payload,
        previous_hash,
    }))
}
