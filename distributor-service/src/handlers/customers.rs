//! Customer directory CRUD.
//!
//! `balance` is never writable through this surface; only the billing
//! service's recomputation touches it.

use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, DateTime};
use mongodb::options::FindOptions;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateCustomerRequest, CustomerListQuery, CustomerResponse, UpdateCustomerRequest};
use crate::middleware::AuthUser;
use crate::models::{Customer, CustomerType};
use crate::services::is_duplicate_key_error;
use crate::startup::AppState;

pub async fn create_customer(
    State(state): State<AppState>,
    _caller: AuthUser,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), AppError> {
    payload.validate()?;

    let now = DateTime::now();
    let customer = Customer {
        id: Uuid::new_v4(),
        name: payload.name,
        phone: payload.phone,
        customer_type: payload.customer_type.unwrap_or(CustomerType::Registered),
        price_rates: payload.price_rates,
        balance: 0.0,
        created_at: now,
        updated_at: now,
    };

    state
        .db
        .customers()
        .insert_one(&customer, None)
        .await
        .map_err(|e| {
            if is_duplicate_key_error(&e) {
                AppError::Conflict(anyhow!("customer '{}' already exists", customer.name))
            } else {
                AppError::from(e)
            }
        })?;

    tracing::info!(customer_id = %customer.id, name = %customer.name, "Customer created");
    Ok((StatusCode::CREATED, Json(customer.into())))
}

pub async fn list_customers(
    State(state): State<AppState>,
    _caller: AuthUser,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    let filter = match query.search.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => {
            doc! { "name": { "$regex": regex_escape(term), "$options": "i" } }
        }
        _ => doc! {},
    };

    let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let cursor = state.db.customers().find(filter, options).await?;
    let customers: Vec<Customer> = cursor.try_collect().await?;

    Ok(Json(customers.into_iter().map(Into::into).collect()))
}

pub async fn get_customer(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<CustomerResponse>, AppError> {
    let customer = state
        .db
        .customers()
        .find_one(doc! { "_id": customer_id.to_string() }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("customer {} not found", customer_id)))?;
    Ok(Json(customer.into()))
}

pub async fn update_customer(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> Result<Json<CustomerResponse>, AppError> {
    payload.validate()?;

    let mut set = doc! { "updated_at": DateTime::now() };
    if let Some(name) = payload.name {
        set.insert("name", name);
    }
    if let Some(phone) = payload.phone {
        set.insert("phone", phone);
    }
    if let Some(rates) = payload.price_rates {
        let rates = to_bson(&rates).map_err(|e| AppError::InternalError(anyhow!(e)))?;
        set.insert("price_rates", rates);
    }

    let result = state
        .db
        .customers()
        .update_one(
            doc! { "_id": customer_id.to_string() },
            doc! { "$set": set },
            None,
        )
        .await
        .map_err(|e| {
            if is_duplicate_key_error(&e) {
                AppError::Conflict(anyhow!("another customer already has that name"))
            } else {
                AppError::from(e)
            }
        })?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound(anyhow!(
            "customer {} not found",
            customer_id
        )));
    }

    let customer = state
        .db
        .customers()
        .find_one(doc! { "_id": customer_id.to_string() }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("customer {} not found", customer_id)))?;
    Ok(Json(customer.into()))
}

/// Delete a customer. Payment rows keep their customer_id reference;
/// referential integrity is not enforced here.
pub async fn delete_customer(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(customer_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = state
        .db
        .customers()
        .delete_one(doc! { "_id": customer_id.to_string() }, None)
        .await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound(anyhow!(
            "customer {} not found",
            customer_id
        )));
    }

    tracing::info!(customer_id = %customer_id, deleted_by = %caller.username, "Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Escape regex metacharacters so a search term is matched literally.
fn regex_escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
