//! Trait definitions for GrackerKYC storage services

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{Block, VerificationRecord};

use super::Result;

/// Append-only store of verification records.
///
/// Invariant: records are never updated or deleted.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist one record
    async fn save(&self, record: &VerificationRecord) -> Result<()>;

    /// Persist a record together with the ledger block that committed it.
    ///
    /// Stores with a durable block log write both atomically; the default
    /// ignores the block and keeps the ledger in memory only.
    async fn save_with_block(&self, record: &VerificationRecord, block: &Block) -> Result<()> {
        let _ = block;
        self.save(record).await
    }

    /// Persist a block that has no audit record (genesis)
    async fn save_block(&self, block: &Block) -> Result<()> {
        let _ = block;
        Ok(())
    }

    /// At most `limit` records, newest first; equal timestamps are ordered by
    /// most recent insertion first
    async fn recent(&self, limit: u32) -> Result<Vec<VerificationRecord>>;

    /// Total number of stored records
    async fn count(&self) -> Result<u64>;

    /// Persisted ledger blocks in index order (empty when not durable)
    async fn load_blocks(&self) -> Result<Vec<Block>> {
        Ok(Vec::new())
    }

    /// Flush and release resources
    async fn close(&self) {}
}
