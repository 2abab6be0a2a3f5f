//! Stock Ledger repository: per-(brand, item) availability, sales and
//! revenue counters.
//!
//! Injected into billing and intake rather than held as process-global
//! state; all mutation goes through the two operations below.

use anyhow::anyhow;
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime};
use mongodb::options::{FindOptions, UpdateOptions};
use mongodb::{ClientSession, Collection};
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;

use crate::models::StockEntry;

/// Metadata applied when an intake creates a ledger entry for a pair that
/// has never been stocked before.
#[derive(Debug, Clone)]
pub struct IntakeMetadata {
    pub item_name: String,
    pub cost_per_unit: f64,
    pub selling_price: f64,
    pub supplier_name: String,
}

impl Default for IntakeMetadata {
    fn default() -> Self {
        Self {
            item_name: String::new(),
            cost_per_unit: 100.0,
            selling_price: 150.0,
            supplier_name: "Default Supplier".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct StockLedger {
    entries: Collection<StockEntry>,
}

impl StockLedger {
    pub fn new(entries: Collection<StockEntry>) -> Self {
        Self { entries }
    }

    /// Fold an intake line into the ledger: increment `available_quantity`
    /// by `quantity_delta`, creating the entry with the supplied metadata
    /// when the (brand, item_code) pair is new. Not idempotent; every
    /// intake event is additive.
    #[instrument(skip(self, session, metadata), fields(brand = %brand, item_code = %item_code))]
    pub async fn upsert_intake(
        &self,
        session: &mut ClientSession,
        brand: &str,
        item_code: &str,
        quantity_delta: i64,
        metadata: &IntakeMetadata,
    ) -> Result<(), AppError> {
        let now = DateTime::now();
        self.entries
            .update_one_with_session(
                doc! { "brand": brand, "item_code": item_code },
                doc! {
                    "$inc": { "available_quantity": quantity_delta },
                    "$set": { "updated_at": now },
                    "$setOnInsert": {
                        "_id": Uuid::new_v4().to_string(),
                        "item_name": &metadata.item_name,
                        "sold_quantity": 0_i64,
                        "total_revenue": 0.0,
                        "profit_earned": 0.0,
                        "cost_per_unit": metadata.cost_per_unit,
                        "selling_price": metadata.selling_price,
                        "supplier_name": &metadata.supplier_name,
                        "created_at": now,
                    },
                },
                UpdateOptions::builder().upsert(true).build(),
                session,
            )
            .await?;
        Ok(())
    }

    /// Deduct sold stock within the caller's transaction.
    ///
    /// The availability precondition and the decrement are a single
    /// filtered update, so two concurrent billings of the same item cannot
    /// overdraw: the loser's filter no longer matches and the whole billing
    /// transaction aborts.
    #[instrument(skip(self, session), fields(brand = %brand, item_code = %item_code, quantity))]
    pub async fn reserve_and_deduct(
        &self,
        session: &mut ClientSession,
        brand: &str,
        item_code: &str,
        quantity: i64,
    ) -> Result<(), AppError> {
        let entry = self
            .entries
            .find_one_with_session(
                doc! { "brand": brand, "item_code": item_code },
                None,
                session,
            )
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow!(
                    "no stock entry for item '{}' of brand '{}'",
                    item_code,
                    brand
                ))
            })?;

        let revenue = quantity as f64 * entry.selling_price;
        let profit = quantity as f64 * (entry.selling_price - entry.cost_per_unit);

        let result = self
            .entries
            .update_one_with_session(
                doc! {
                    "brand": brand,
                    "item_code": item_code,
                    "available_quantity": { "$gte": quantity },
                },
                doc! {
                    "$inc": {
                        "available_quantity": -quantity,
                        "sold_quantity": quantity,
                        "total_revenue": revenue,
                        "profit_earned": profit,
                    },
                    "$set": { "updated_at": DateTime::now() },
                },
                None,
                session,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::InsufficientStock(format!(
                "item '{}' of brand '{}': requested {}, available {}",
                item_code, brand, quantity, entry.available_quantity
            )));
        }

        Ok(())
    }

    /// Existence lookup used by billing validation, outside any session.
    pub async fn find_entry(
        &self,
        brand: &str,
        item_code: &str,
    ) -> Result<Option<StockEntry>, AppError> {
        let entry = self
            .entries
            .find_one(doc! { "brand": brand, "item_code": item_code }, None)
            .await?;
        Ok(entry)
    }

    /// Current snapshot, optionally filtered by brand. No side effects.
    pub async fn query(&self, brand: Option<&str>) -> Result<Vec<StockEntry>, AppError> {
        let filter = match brand {
            Some(b) => doc! { "brand": b },
            None => doc! {},
        };
        let options = FindOptions::builder()
            .sort(doc! { "brand": 1, "item_code": 1 })
            .build();
        let cursor = self.entries.find(filter, options).await?;
        let entries: Vec<StockEntry> = cursor.try_collect().await?;
        Ok(entries)
    }
}
