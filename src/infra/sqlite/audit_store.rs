//! SQLite audit store
//!
//! Structured columns (`doc_data`, `issues`, `suggestions`) hold JSON text and
//! are decoded on read. Timestamps are fixed-width RFC 3339 strings so text
//! ordering matches chronological ordering.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Sqlite, Transaction};
use tracing::{debug, info, instrument};

use crate::domain::{
    format_timestamp, parse_timestamp, Block, BlockPayload, Confidence, RiskLevel,
    VerificationRecord, VerificationStatus,
};
use crate::infra::{AuditStore, KycError, Result};

/// Pool settings for `url`.
///
/// An in-memory database lives only as long as its connection, so it gets
/// exactly one connection that is never reaped.
fn pool_options(url: &str, max_connections: u32) -> SqlitePoolOptions {
    if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    }
}

/// SQLite-backed [`AuditStore`]
pub struct SqliteAuditStore {
    pool: SqlitePool,
    persist_ledger: bool,
}

impl SqliteAuditStore {
    /// Create a store over an existing pool
    pub fn new(pool: SqlitePool, persist_ledger: bool) -> Self {
        Self {
            pool,
            persist_ledger,
        }
    }

    /// Open (creating if missing) the database at `url`.
    pub async fn connect(url: &str, max_connections: u32, persist_ledger: bool) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| KycError::Configuration(format!("invalid database url {url:?}: {e}")))?
            .create_if_missing(true);

        let pool_options = pool_options(url, max_connections);
        let max_connections = pool_options.get_max_connections();
        let pool = pool_options.connect_with(options).await?;

        info!(max_connections, persist_ledger, "connected to SQLite audit store");
        Ok(Self::new(pool, persist_ledger))
    }

    /// Apply embedded migrations
    pub async fn initialize(&self) -> Result<()> {
        crate::migrations::run_sqlite(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn persists_ledger(&self) -> bool {
        self.persist_ledger
    }

    async fn insert_record(
        tx: &mut Transaction<'_, Sqlite>,
        record: &VerificationRecord,
    ) -> Result<i64> {
        let doc_data = serde_json::to_string(&record.doc_data)?;
        let issues = serde_json::to_string(&record.issues)?;
        let suggestions = serde_json::to_string(&record.suggestions)?;

        let result = sqlx::query(
            r#"
            INSERT INTO kyc_verifications (
                subject_id, name, email, doc_type, doc_data,
                ledger_hash, timestamp, status, confidence, risk_level,
                issues, suggestions
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.subject_id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.doc_type)
        .bind(&doc_data)
        .bind(&record.ledger_hash)
        .bind(format_timestamp(&record.timestamp))
        .bind(record.status.as_str())
        .bind(record.confidence.as_u8() as i64)
        .bind(record.risk_level.as_str())
        .bind(&issues)
        .bind(&suggestions)
        .execute(&mut **tx)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn insert_block(tx: &mut Transaction<'_, Sqlite>, block: &Block) -> Result<()> {
        let payload = serde_json::to_string(&block.payload)?;

        sqlx::query(
            r#"
            INSERT INTO ledger_blocks (block_index, timestamp, payload, previous_hash, hash)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(block.index as i64)
        .bind(format_timestamp(&block.timestamp))
        .bind(&payload)
        .bind(&block.previous_hash)
        .bind(&block.hash)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    #[instrument(skip(self, record), fields(ledger_hash = %record.ledger_hash))]
    async fn save(&self, record: &VerificationRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let id = Self::insert_record(&mut tx, record).await?;
        tx.commit().await?;
        debug!(id, "audit record saved");
        Ok(())
    }

    #[instrument(skip(self, record, block), fields(index = block.index))]
    async fn save_with_block(&self, record: &VerificationRecord, block: &Block) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if self.persist_ledger {
            Self::insert_block(&mut tx, block).await?;
        }
        let id = Self::insert_record(&mut tx, record).await?;
        tx.commit().await?;
        debug!(id, "audit record and block saved");
        Ok(())
    }

    async fn save_block(&self, block: &Block) -> Result<()> {
        if !self.persist_ledger {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        Self::insert_block(&mut tx, block).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<VerificationRecord>> {
        let rows = sqlx::query_as::<_, VerificationRow>(
            r#"
            SELECT subject_id, name, email, doc_type, doc_data,
                   ledger_hash, timestamp, status, confidence, risk_level,
                   issues, suggestions
            FROM kyc_verifications
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(VerificationRecord::try_from).collect()
    }

    async fn count(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kyc_verifications")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }

    async fn load_blocks(&self) -> Result<Vec<Block>> {
        if !self.persist_ledger {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, BlockRow>(
            r#"
            SELECT block_index, timestamp, payload, previous_hash, hash
            FROM ledger_blocks
            ORDER BY block_index ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Block::try_from).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("SQLite audit store closed");
    }
}

/// Raw row from the kyc_verifications table
#[derive(Debug, FromRow)]
struct VerificationRow {
    subject_id: String,
    name: String,
    email: String,
    doc_type: String,
    doc_data: String,
    ledger_hash: String,
    timestamp: String,
    status: String,
    confidence: i64,
    risk_level: String,
    issues: String,
    suggestions: String,
}

impl TryFrom<VerificationRow> for VerificationRecord {
    type Error = KycError;

    fn try_from(row: VerificationRow) -> Result<Self> {
        let doc_data = serde_json::from_str(&row.doc_data)
            .map_err(|e| KycError::Persistence(format!("Invalid doc_data JSON: {}", e)))?;

        let issues = serde_json::from_str(&row.issues)
            .map_err(|e| KycError::Persistence(format!("Invalid issues JSON: {}", e)))?;

        let suggestions = serde_json::from_str(&row.suggestions)
            .map_err(|e| KycError::Persistence(format!("Invalid suggestions JSON: {}", e)))?;

        let timestamp = parse_timestamp(&row.timestamp)
            .ok_or_else(|| KycError::Persistence(format!("Invalid timestamp: {}", row.timestamp)))?;

        let status = VerificationStatus::parse(&row.status)
            .ok_or_else(|| KycError::Persistence(format!("Invalid status: {}", row.status)))?;

        let confidence = u8::try_from(row.confidence)
            .ok()
            .and_then(Confidence::from_u8)
            .ok_or_else(|| {
                KycError::Persistence(format!("Invalid confidence: {}", row.confidence))
            })?;

        let risk_level = RiskLevel::parse(&row.risk_level)
            .ok_or_else(|| KycError::Persistence(format!("Invalid risk_level: {}", row.risk_level)))?;

        Ok(VerificationRecord {
            subject_id: row.subject_id,
            name: row.name,
            email: row.email,
            doc_type: row.doc_type,
            doc_data,
            ledger_hash: row.ledger_hash,
            timestamp,
            status,
            confidence,
            risk_level,
            issues,
            suggestions,
        })
    }
}

/// Raw row from the ledger_blocks table
#[derive(Debug, FromRow)]
struct BlockRow {
    block_index: i64,
    timestamp: String,
    payload: String,
    previous_hash: String,
    hash: String,
}

impl TryFrom<BlockRow> for Block {
    type Error = KycError;

    fn try_from(row: BlockRow) -> Result<Self> {
        let index = u64::try_from(row.block_index)
            .map_err(|_| KycError::Persistence(format!("Invalid block_index: {}", row.block_index)))?;

        let timestamp = parse_timestamp(&row.timestamp)
            .ok_or_else(|| KycError::Persistence(format!("Invalid block timestamp: {}", row.timestamp)))?;

        let payload: BlockPayload = serde_json::from_str(&row.payload)
            .map_err(|e| KycError::Persistence(format!("Invalid block payload JSON: {}", e)))?;

        Ok(Block {
            index,
            timestamp,
            payload,
            previous_hash: row.previous_hash,
            hash: row.hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, PatternExtractor, RiskEngine};
    use crate::crypto::derive_subject_id;
    use crate::domain::{now_micros, VerificationPayload};
    use crate::infra::Ledger;
    use chrono::Duration;

    async fn create_test_store(persist_ledger: bool) -> SqliteAuditStore {
        let store = SqliteAuditStore::connect("sqlite::memory:", 4, persist_ledger)
            .await
            .unwrap();
        store.initialize().await.unwrap();
        store
    }

    #[test]
    fn test_memory_pool_keeps_its_connection() {
        let options = pool_options("sqlite::memory:", 8);
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert!(options.get_idle_timeout().is_none());
        assert!(options.get_max_lifetime().is_none());

        let options = pool_options("sqlite://kyc.db", 8);
        assert_eq!(options.get_max_connections(), 8);
        assert_eq!(pool_options("sqlite://kyc.db", 0).get_max_connections(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_pool_is_pinned() {
        let store = create_test_store(false).await;
        let options = store.pool().options();
        assert_eq!(options.get_min_connections(), 1);
        assert!(options.get_idle_timeout().is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    fn record(email: &str, ledger_hash: &str) -> VerificationRecord {
        let analysis = analyze(
            &PatternExtractor::new(),
            &RiskEngine::new(),
            "Name: John Doe\nNumber: X123",
            "John Doe",
        );
        VerificationRecord {
            subject_id: derive_subject_id(email),
            name: "John Doe".to_string(),
            email: email.to_string(),
            doc_type: "passport".to_string(),
            suggestions: analysis.report.recommendations.suggestions.clone(),
            doc_data: analysis.report,
            ledger_hash: ledger_hash.to_string(),
            timestamp: now_micros(),
            status: analysis.decision.status,
            confidence: analysis.decision.confidence,
            risk_level: analysis.decision.risk_level,
            issues: analysis.decision.issues,
        }
    }

    fn block_payload(email: &str) -> BlockPayload {
        BlockPayload::Verification(VerificationPayload {
            subject_id: derive_subject_id(email),
            name: "John Doe".to_string(),
            email: email.to_string(),
            doc_type: "passport".to_string(),
            status: VerificationStatus::UnderReview,
            confidence: Confidence::Medium,
            risk_level: RiskLevel::Medium,
            issues: vec![],
            requested_at: now_micros(),
        })
    }

    #[tokio::test]
    async fn test_save_and_recent_round_trip() {
        let store = create_test_store(false).await;
        let saved = record("john@example.com", &"a".repeat(64));
        store.save(&saved).await.unwrap();

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent, vec![saved]);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recent_orders_newest_first_with_insertion_tiebreak() {
        let store = create_test_store(false).await;
        let base = now_micros();

        let mut older = record("a@example.com", "hash-a");
        older.timestamp = base - Duration::seconds(10);
        let mut tied_first = record("b@example.com", "hash-b");
        tied_first.timestamp = base;
        let mut tied_second = record("c@example.com", "hash-c");
        tied_second.timestamp = base;

        store.save(&older).await.unwrap();
        store.save(&tied_first).await.unwrap();
        store.save(&tied_second).await.unwrap();

        let hashes: Vec<String> = store
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.ledger_hash)
            .collect();
        assert_eq!(hashes, vec!["hash-c", "hash-b", "hash-a"]);

        assert_eq!(store.recent(1).await.unwrap()[0].ledger_hash, "hash-c");
        assert!(store.recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_cannot_be_updated_or_deleted() {
        let store = create_test_store(false).await;
        store.save(&record("john@example.com", "hash-1")).await.unwrap();

        let update = sqlx::query("UPDATE kyc_verifications SET status = 'APPROVED'")
            .execute(store.pool())
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM kyc_verifications")
            .execute(store.pool())
            .await;
        assert!(delete.is_err());

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_block_log_round_trip() {
        let store = create_test_store(true).await;
        let ledger = Ledger::new().unwrap();
        let genesis = ledger.head().await.unwrap();
        store.save_block(&genesis).await.unwrap();

        let block = ledger.append(block_payload("john@example.com")).await.unwrap();
        store
            .save_with_block(&record("john@example.com", &block.hash), &block)
            .await
            .unwrap();

        let loaded = store.load_blocks().await.unwrap();
        assert_eq!(loaded, ledger.snapshot().await);
        assert!(loaded.iter().all(Block::has_valid_hash));
    }

    #[tokio::test]
    async fn test_failed_record_insert_does_not_persist_block() {
        let store = create_test_store(true).await;
        let ledger = Ledger::new().unwrap();
        store.save_block(&ledger.head().await.unwrap()).await.unwrap();

        let first = ledger.append(block_payload("a@example.com")).await.unwrap();
        store
            .save_with_block(&record("a@example.com", "dup-hash"), &first)
            .await
            .unwrap();

        // Same ledger_hash violates the unique constraint after the block row is written
        let second = ledger.append(block_payload("b@example.com")).await.unwrap();
        let err = store
            .save_with_block(&record("b@example.com", "dup-hash"), &second)
            .await
            .unwrap_err();
        assert!(matches!(err, KycError::Database(_)));

        assert_eq!(store.load_blocks().await.unwrap().len(), 2);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_block_log_disabled() {
        let store = create_test_store(false).await;
        let genesis = Block::genesis(now_micros()).unwrap();
        store.save_block(&genesis).await.unwrap();
        assert!(store.load_blocks().await.unwrap().is_empty());
    }
}
