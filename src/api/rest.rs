//! REST API endpoints for GrackerKYC.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::instrument;

use super::{ApiError, LedgerResponse, RecentQuery, RecentResponse, VerifyResponse};
use crate::domain::VerificationRequest;
use crate::infra::ChainVerification;
use crate::server::AppState;

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/verify", post(verify))
        .route("/v1/ledger", get(get_ledger))
        .route("/v1/ledger/verify", get(verify_ledger))
        .route("/v1/verifications", get(get_recent))
}

/// POST /api/v1/verify
#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    body: Result<Json<VerificationRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(request) = body?;
    let outcome = state.service.verify(request).await?;
    Ok(Json(outcome.into()))
}

/// GET /api/v1/ledger
pub async fn get_ledger(State(state): State<AppState>) -> Json<LedgerResponse> {
    let blocks = state.service.ledger().await;
    let length = blocks.len();
    Json(LedgerResponse { blocks, length })
}

/// GET /api/v1/ledger/verify
pub async fn verify_ledger(State(state): State<AppState>) -> Json<ChainVerification> {
    Json(state.service.verify_ledger().await)
}

/// GET /api/v1/verifications
pub async fn get_recent(
    State(state): State<AppState>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> Result<Json<RecentResponse>, ApiError> {
    let Query(query) = query?;
    let records = state.service.recent(query.limit).await?;
    Ok(Json(RecentResponse { records }))
}
