//! In-memory audit store
//!
//! Keeps records for the process lifetime only. The ledger is not persisted,
//! so a restart begins a fresh chain.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::VerificationRecord;

use super::{AuditStore, Result};

/// Vec-backed [`AuditStore`]; insertion order is kept for tie-breaking
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    records: RwLock<Vec<VerificationRecord>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn save(&self, record: &VerificationRecord) -> Result<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<VerificationRecord>> {
        let records = self.records.read().await;
        let mut newest_first: Vec<&VerificationRecord> = records.iter().rev().collect();
        // Stable sort keeps reverse insertion order among equal timestamps
        newest_first.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(newest_first
            .into_iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.read().await.len() as u64)
    }
}
