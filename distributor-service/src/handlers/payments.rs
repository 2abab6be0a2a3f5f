use axum::{
    extract::{Path, Query, State},
    Json,
};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{ChequeStatusRequest, ListPaymentsQuery, PaymentListResponse, PaymentResponse};
use crate::middleware::AuthUser;
use crate::models::Payment;
use crate::startup::AppState;

/// Paginated payment history, optionally filtered by customer and status.
pub async fn list_payments(
    State(state): State<AppState>,
    _caller: AuthUser,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<PaymentListResponse>, AppError> {
    let mut filter = doc! {};
    if let Some(customer_id) = query.customer_id {
        filter.insert("customer_id", customer_id.to_string());
    }
    if let Some(status) = query.status {
        filter.insert(
            "status",
            mongodb::bson::to_bson(&status)
                .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?,
        );
    }

    let total_count = state
        .db
        .payments()
        .count_documents(filter.clone(), None)
        .await? as i64;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .skip(query.offset.unwrap_or(0))
        .limit(limit)
        .build();

    let cursor = state.db.payments().find(filter, options).await?;
    let payments: Vec<Payment> = cursor.try_collect().await?;

    Ok(Json(PaymentListResponse {
        payments: payments.into_iter().map(Into::into).collect(),
        total_count,
    }))
}

/// Settle an outstanding credit payment in full.
pub async fn settle_payment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, AppError> {
    tracing::info!(settled_by = %caller.username, payment_id = %payment_id, "Settling payment");
    let payment = state.billing.settle_payment(payment_id).await?;
    Ok(Json(payment.into()))
}

/// Mark a cheque Cleared or Bounced.
pub async fn update_cheque_status(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<ChequeStatusRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    tracing::info!(
        updated_by = %caller.username,
        payment_id = %payment_id,
        status = ?payload.status,
        "Updating cheque status"
    );
    let payment = state
        .billing
        .update_cheque_status(payment_id, payload.status)
        .await?;
    Ok(Json(payment.into()))
}
