//! Verification pipeline
//!
//! [`VerificationService`] owns the ledger and the audit store. A request is
//! validated, analysed without locks, then committed: block append and store
//! write happen inside one ledger critical section, and the block is rolled
//! back if the store write fails.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::analysis::{analyze, Analysis, Extractor, PatternExtractor, RiskEngine};
use crate::crypto::derive_subject_id;
use crate::domain::{
    now_micros, rfc3339_micros, verification_id, AnalysisReport, Block, BlockPayload, Confidence,
    RiskLevel, VerificationPayload, VerificationRecord, VerificationRequest, VerificationStatus,
};
use crate::metrics::{metric_names, timed, MetricsRegistry};

use super::{AuditStore, ChainVerification, KycError, Ledger, RequestTracker, Result};

/// Maximum accepted length of `name` and `email`, in bytes
pub const MAX_IDENTITY_FIELD_LEN: usize = 256;

/// Maximum accepted document size, in bytes
pub const MAX_DOCUMENT_LEN: usize = 64 * 1024;

/// Default and maximum page sizes for recent-record queries
pub const DEFAULT_RECENT_LIMIT: u32 = 50;
pub const MAX_RECENT_LIMIT: u32 = 500;

/// Successful verification result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    pub verification_id: String,
    pub status: VerificationStatus,
    pub confidence: Confidence,
    pub risk_level: RiskLevel,
    pub ledger_hash: String,
    #[serde(with = "rfc3339_micros")]
    pub timestamp: DateTime<Utc>,
    pub analysis: AnalysisReport,
    pub ledger_index: u64,
}

/// Reject requests missing a required input before any state is touched
pub fn validate_request(request: &VerificationRequest) -> Result<()> {
    for (field, value, max) in [
        ("name", &request.name, MAX_IDENTITY_FIELD_LEN),
        ("email", &request.email, MAX_IDENTITY_FIELD_LEN),
        ("document_text", &request.document_text, MAX_DOCUMENT_LEN),
    ] {
        if value.trim().is_empty() {
            return Err(KycError::validation(field, "is required"));
        }
        if value.len() > max {
            return Err(KycError::validation(
                field,
                format!("exceeds {max} bytes"),
            ));
        }
    }
    if request.document_type.len() > MAX_IDENTITY_FIELD_LEN {
        return Err(KycError::validation(
            "document_type",
            format!("exceeds {MAX_IDENTITY_FIELD_LEN} bytes"),
        ));
    }
    Ok(())
}

struct ServiceInner {
    extractor: Arc<dyn Extractor>,
    engine: RiskEngine,
    ledger: Ledger,
    store: Arc<dyn AuditStore>,
    metrics: Arc<MetricsRegistry>,
    tracker: Arc<RequestTracker>,
}

/// The verification service; cheap to clone
#[derive(Clone)]
pub struct VerificationService {
    inner: Arc<ServiceInner>,
}

impl VerificationService {
    /// Open the service with the pattern extractor
    pub async fn open(store: Arc<dyn AuditStore>, metrics: Arc<MetricsRegistry>) -> Result<Self> {
        Self::open_with_extractor(store, Arc::new(PatternExtractor::new()), metrics).await
    }

    /// Open the service, restoring the ledger from the store's block log.
    ///
    /// A store without a block log starts a fresh chain. A fresh chain's
    /// genesis block is written to the log when the store keeps one.
    pub async fn open_with_extractor(
        store: Arc<dyn AuditStore>,
        extractor: Arc<dyn Extractor>,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Self> {
        let blocks = store.load_blocks().await?;
        let ledger = if blocks.is_empty() {
            let ledger = Ledger::new()?;
            if let Some(genesis) = ledger.head().await {
                store.save_block(&genesis).await?;
            }
            info!("started fresh ledger");
            ledger
        } else {
            Ledger::from_blocks(blocks)?
        };

        metrics
            .set_gauge(metric_names::LEDGER_LENGTH, ledger.len().await as u64)
            .await;

        Ok(Self {
            inner: Arc::new(ServiceInner {
                extractor,
                engine: RiskEngine::new(),
                ledger,
                store,
                metrics,
                tracker: Arc::new(RequestTracker::new()),
            }),
        })
    }

    /// Validate, analyse and commit one verification.
    ///
    /// The commit step runs on its own task so that a dropped caller cannot
    /// interrupt it between the store write and the ledger commit.
    #[instrument(skip(self, request), fields(doc_type = %request.document_type))]
    pub async fn verify(&self, request: VerificationRequest) -> Result<VerificationOutcome> {
        timed(
            &self.inner.metrics,
            metric_names::VERIFY_LATENCY,
            self.run(request),
        )
        .await
    }

    async fn run(&self, request: VerificationRequest) -> Result<VerificationOutcome> {
        let metrics = &self.inner.metrics;

        if let Err(e) = validate_request(&request) {
            metrics.inc_counter(metric_names::VALIDATION_ERRORS).await;
            warn!(error = %e, "rejected verification request");
            return Err(e);
        }

        let analysis = analyze(
            self.inner.extractor.as_ref(),
            &self.inner.engine,
            &request.document_text,
            &request.name,
        );

        let inner = Arc::clone(&self.inner);
        let guard = inner.tracker.request_start();
        let result = tokio::spawn(async move {
            let _guard = guard;
            inner.commit(request, analysis).await
        })
        .await
        .map_err(|e| KycError::Internal(format!("commit task failed: {e}")))?;

        match &result {
            Ok(outcome) => metrics.record_decision(outcome.status).await,
            Err(KycError::LedgerIntegrity { .. }) => {
                metrics.inc_counter(metric_names::INTEGRITY_ERRORS).await;
            }
            Err(_) => {
                metrics.inc_counter(metric_names::PERSISTENCE_ERRORS).await;
            }
        }
        result
    }

    /// Frozen copy of the ledger
    pub async fn ledger(&self) -> Vec<Block> {
        self.inner.ledger.snapshot().await
    }

    pub async fn ledger_len(&self) -> usize {
        self.inner.ledger.len().await
    }

    /// Re-check the whole chain; a violation disables further verifications
    pub async fn verify_ledger(&self) -> ChainVerification {
        let report = self.inner.ledger.verify().await;
        if !report.valid {
            self.inner
                .metrics
                .inc_counter(metric_names::INTEGRITY_ERRORS)
                .await;
        }
        report
    }

    /// At most `limit` audit records, newest first; `limit` is capped
    pub async fn recent(&self, limit: u32) -> Result<Vec<VerificationRecord>> {
        self.inner
            .store
            .recent(limit.min(MAX_RECENT_LIMIT))
            .await
    }

    /// Ready when the store answers and the ledger accepts appends
    pub async fn is_ready(&self) -> bool {
        if self.inner.ledger.is_poisoned().await {
            return false;
        }
        self.inner.store.count().await.is_ok()
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.inner.metrics
    }

    /// Wait up to `drain` for in-flight commits, then close the store
    pub async fn close(&self, drain: Duration) {
        let drained = self.inner.tracker.wait_for_drain(drain).await;
        self.inner.store.close().await;
        info!(
            drained,
            served = self.inner.tracker.total_count(),
            "verification service closed"
        );
    }
}

impl ServiceInner {
    async fn commit(
        &self,
        request: VerificationRequest,
        analysis: Analysis,
    ) -> Result<VerificationOutcome> {
        let Analysis {
            decision, report, ..
        } = analysis;
        let subject_id = derive_subject_id(&request.email);

        let payload = BlockPayload::Verification(VerificationPayload {
            subject_id: subject_id.clone(),
            name: request.name.clone(),
            email: request.email.clone(),
            doc_type: request.document_type.clone(),
            status: decision.status,
            confidence: decision.confidence,
            risk_level: decision.risk_level,
            issues: decision.issues.clone(),
            requested_at: now_micros(),
        });

        let mut writer = self.ledger.writer().await?;
        let block = writer.append(payload)?;

        let record = VerificationRecord {
            subject_id,
            name: request.name,
            email: request.email,
            doc_type: request.document_type,
            suggestions: report.recommendations.suggestions.clone(),
            doc_data: report.clone(),
            ledger_hash: block.hash.clone(),
            timestamp: block.timestamp,
            status: decision.status,
            confidence: decision.confidence,
            risk_level: decision.risk_level,
            issues: decision.issues,
        };

        if let Err(e) = self.store.save_with_block(&record, &block).await {
            writer.rollback();
            warn!(index = block.index, error = %e, "audit write failed; ledger block rolled back");
            return Err(match e {
                KycError::Database(e) => KycError::Persistence(e.to_string()),
                other => other,
            });
        }
        self.metrics
            .set_gauge(metric_names::LEDGER_LENGTH, block.index + 1)
            .await;
        writer.commit();

        info!(
            verification_id = verification_id(&block.hash),
            index = block.index,
            status = %record.status,
            "verification committed"
        );

        Ok(VerificationOutcome {
            verification_id: verification_id(&block.hash).to_string(),
            status: record.status,
            confidence: record.confidence,
            risk_level: record.risk_level,
            ledger_hash: block.hash,
            timestamp: block.timestamp,
            analysis: report,
            ledger_index: block.index,
        })
    }
}
