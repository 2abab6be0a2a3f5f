//! Read-only reporting over the payment ledger.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{ChequeListQuery, CreditSummaryRow, PaymentResponse};
use crate::middleware::AuthUser;
use crate::models::{Customer, Payment};
use crate::startup::AppState;

/// Billed vs paid vs outstanding per customer, aggregated from Payment
/// rows. `total_due` only counts Pending rows, matching the balance
/// definition.
pub async fn credit_summary(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Json<Vec<CreditSummaryRow>>, AppError> {
    let pipeline = vec![
        doc! { "$group": {
            "_id": "$customer_id",
            "total_billed": { "$sum": "$amount" },
            "total_paid": { "$sum": "$paid_amount" },
            "total_due": { "$sum": {
                "$cond": [ { "$eq": ["$status", "Pending"] }, "$due_amount", 0.0 ]
            } },
        } },
        doc! { "$sort": { "total_due": -1 } },
    ];

    let cursor = state.db.payments().aggregate(pipeline, None).await?;
    let groups: Vec<Document> = cursor.try_collect().await?;

    // Resolve customer names in one query rather than a $lookup; ids are
    // stored as uuid strings.
    let ids: Vec<String> = groups
        .iter()
        .filter_map(|g| g.get_str("_id").ok().map(str::to_string))
        .collect();
    let cursor = state
        .db
        .customers()
        .find(doc! { "_id": { "$in": &ids } }, None)
        .await?;
    let customers: Vec<Customer> = cursor.try_collect().await?;
    let names: HashMap<String, String> = customers
        .into_iter()
        .map(|c| (c.id.to_string(), c.name))
        .collect();

    let rows = groups
        .into_iter()
        .map(|g| {
            let customer_id = g
                .get_str("_id")
                .ok()
                .and_then(|s| Uuid::parse_str(s).ok());
            let customer_name = g
                .get_str("_id")
                .ok()
                .and_then(|s| names.get(s).cloned());
            CreditSummaryRow {
                customer_id,
                customer_name,
                total_billed: g.get_f64("total_billed").unwrap_or(0.0),
                total_paid: g.get_f64("total_paid").unwrap_or(0.0),
                total_due: g.get_f64("total_due").unwrap_or(0.0),
            }
        })
        .collect();

    Ok(Json(rows))
}

/// Cheque payments, optionally filtered by cheque status.
pub async fn list_cheques(
    State(state): State<AppState>,
    _caller: AuthUser,
    Query(query): Query<ChequeListQuery>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let mut filter = doc! { "payment_method": "Cheque" };
    if let Some(status) = query.status {
        filter.insert(
            "cheque.status",
            mongodb::bson::to_bson(&status)
                .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?,
        );
    }

    let options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();
    let cursor = state.db.payments().find(filter, options).await?;
    let payments: Vec<Payment> = cursor.try_collect().await?;

    Ok(Json(payments.into_iter().map(Into::into).collect()))
}
