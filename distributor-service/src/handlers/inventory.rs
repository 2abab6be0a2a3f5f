use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{BatchResponse, IntakeBatchRequest, StockQuery};
use crate::middleware::AuthUser;
use crate::models::StockEntry;
use crate::startup::AppState;

/// Record a stock receipt and fold it into the ledger.
pub async fn record_intake(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<IntakeBatchRequest>,
) -> Result<(StatusCode, Json<BatchResponse>), AppError> {
    tracing::info!(
        recorded_by = %caller.username,
        brand = %payload.brand,
        line_count = payload.bottles.len(),
        "Recording inventory intake"
    );

    let batch = state.inventory.record_batch(payload).await?;
    Ok((StatusCode::CREATED, Json(batch.into())))
}

/// Replace a batch's lines. Ledger quantities already folded in stay as
/// they are.
pub async fn update_batch(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(batch_id): Path<Uuid>,
    Json(payload): Json<IntakeBatchRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    let batch = state.inventory.update_batch(batch_id, payload).await?;
    Ok(Json(batch.into()))
}

pub async fn list_batches(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Json<Vec<BatchResponse>>, AppError> {
    let batches = state.inventory.list_batches().await?;
    Ok(Json(batches.into_iter().map(Into::into).collect()))
}

/// Current ledger snapshot, optionally filtered by brand.
pub async fn query_stock(
    State(state): State<AppState>,
    _caller: AuthUser,
    Query(query): Query<StockQuery>,
) -> Result<Json<Vec<StockEntry>>, AppError> {
    let entries = state.ledger.query(query.brand.as_deref()).await?;
    Ok(Json(entries))
}
