use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{IssueBillRequest, IssuedBillResponse, PaymentResponse};
use crate::middleware::AuthUser;
use crate::startup::AppState;

/// Issue a bill. Returns the created Payment rows, or a structured error
/// naming the failing field or line; nothing is written on failure.
pub async fn issue_bill(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<IssueBillRequest>,
) -> Result<(StatusCode, Json<IssuedBillResponse>), AppError> {
    tracing::info!(
        issued_by = %caller.username,
        brand = %payload.brand,
        line_count = payload.bottles.len(),
        "Issuing bill"
    );

    let response = state.billing.issue_bill(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Reconstruct an invoice from its Payment rows.
pub async fn get_invoice(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let payments = state.billing.get_invoice(invoice_id).await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}
