//! Inventory intake: batch receipts folded into the Stock Ledger.

use anyhow::anyhow;
use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, DateTime};
use mongodb::options::FindOptions;
use mongodb::{Client, Collection};
use service_core::error::AppError;
use std::collections::HashSet;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{IntakeBatchRequest, IntakeLineRequest};
use crate::models::{BottleLine, InventoryBatch};

use super::{Database, IntakeMetadata, StockLedger};

#[derive(Clone)]
pub struct InventoryService {
    client: Client,
    batches: Collection<InventoryBatch>,
    ledger: StockLedger,
}

impl InventoryService {
    pub fn new(db: &Database, ledger: StockLedger) -> Self {
        Self {
            client: db.client().clone(),
            batches: db.inventory_batches().clone(),
            ledger,
        }
    }

    /// Record a receipt: persist the batch, then fold every line into the
    /// ledger, all inside one transaction. Resubmitting the same batch
    /// double-counts; intake is additive.
    #[instrument(skip(self, req), fields(brand = %req.brand, line_count = req.bottles.len()))]
    pub async fn record_batch(&self, req: IntakeBatchRequest) -> Result<InventoryBatch, AppError> {
        req.validate()?;
        validate_lines(&req.bottles)?;

        let now = DateTime::now();
        let batch = InventoryBatch {
            id: Uuid::new_v4(),
            date: req.date,
            brand: req.brand.clone(),
            bottles: normalize_lines(&req.bottles),
            created_at: now,
            updated_at: now,
        };

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = async {
            self.batches
                .insert_one_with_session(&batch, None, &mut session)
                .await?;

            for bottle in &batch.bottles {
                let metadata = IntakeMetadata {
                    item_name: bottle.item_name.clone(),
                    cost_per_unit: bottle.cost_per_unit,
                    selling_price: bottle.selling_price,
                    supplier_name: bottle.supplier_name.clone(),
                };
                self.ledger
                    .upsert_intake(
                        &mut session,
                        &batch.brand,
                        &bottle.item_code,
                        bottle.quantity,
                        &metadata,
                    )
                    .await?;
            }
            Ok::<_, AppError>(())
        }
        .await;

        match result {
            Ok(()) => {
                session.commit_transaction().await?;
                tracing::info!(batch_id = %batch.id, "Inventory batch recorded");
                Ok(batch)
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!(error = %abort_err, "Failed to abort intake transaction");
                }
                Err(err)
            }
        }
    }

    /// Replace an existing batch's lines. Lines are re-normalized, but
    /// ledger quantities already folded in are left untouched (acknowledged
    /// asymmetry with record_batch).
    #[instrument(skip(self, req), fields(batch_id = %batch_id))]
    pub async fn update_batch(
        &self,
        batch_id: Uuid,
        req: IntakeBatchRequest,
    ) -> Result<InventoryBatch, AppError> {
        req.validate()?;
        validate_lines(&req.bottles)?;

        let bottles = normalize_lines(&req.bottles);
        let now = DateTime::now();
        let bottles_bson =
            to_bson(&bottles).map_err(|e| AppError::InternalError(anyhow!(e)))?;
        let date_bson = to_bson(&req.date).map_err(|e| AppError::InternalError(anyhow!(e)))?;

        let result = self
            .batches
            .update_one(
                doc! { "_id": batch_id.to_string() },
                doc! { "$set": {
                    "date": date_bson,
                    "brand": &req.brand,
                    "bottles": bottles_bson,
                    "updated_at": now,
                } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(anyhow!("batch {} not found", batch_id)));
        }

        let batch = self
            .batches
            .find_one(doc! { "_id": batch_id.to_string() }, None)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("batch {} not found", batch_id)))?;
        Ok(batch)
    }

    pub async fn list_batches(&self) -> Result<Vec<InventoryBatch>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "date": -1, "created_at": -1 })
            .build();
        let cursor = self.batches.find(doc! {}, options).await?;
        let batches: Vec<InventoryBatch> = cursor.try_collect().await?;
        Ok(batches)
    }
}

/// Line-level intake validation: non-empty item codes, positive quantities,
/// no duplicate item code within one batch.
pub fn validate_lines(lines: &[IntakeLineRequest]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for (i, line) in lines.iter().enumerate() {
        let code = line.item_code.trim();
        if code.is_empty() {
            return Err(AppError::BadRequest(anyhow!(
                "intake line {}: item_code is required",
                i + 1
            )));
        }
        if line.quantity < 1 {
            return Err(AppError::BadRequest(anyhow!(
                "intake line {} ('{}'): quantity must be at least 1",
                i + 1,
                code
            )));
        }
        if !seen.insert(code.to_string()) {
            return Err(AppError::Conflict(anyhow!(
                "duplicate item code '{}' in batch",
                code
            )));
        }
    }
    Ok(())
}

/// Apply ledger defaults to missing metadata.
pub fn normalize_lines(lines: &[IntakeLineRequest]) -> Vec<BottleLine> {
    let defaults = IntakeMetadata::default();
    lines
        .iter()
        .map(|line| BottleLine {
            item_code: line.item_code.trim().to_string(),
            item_name: line.item_name.clone().unwrap_or_default(),
            quantity: line.quantity,
            cost_per_unit: line.cost_per_unit.unwrap_or(defaults.cost_per_unit),
            selling_price: line.selling_price.unwrap_or(defaults.selling_price),
            supplier_name: line
                .supplier_name
                .clone()
                .unwrap_or_else(|| defaults.supplier_name.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intake_line(item_code: &str, quantity: i64) -> IntakeLineRequest {
        IntakeLineRequest {
            item_code: item_code.to_string(),
            item_name: None,
            quantity,
            cost_per_unit: None,
            selling_price: None,
            supplier_name: None,
        }
    }

    #[test]
    fn rejects_duplicate_item_codes() {
        let lines = vec![intake_line("500ml", 10), intake_line("500ml", 5)];
        assert!(matches!(
            validate_lines(&lines),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn rejects_empty_item_code_and_bad_quantity() {
        assert!(matches!(
            validate_lines(&[intake_line("  ", 10)]),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_lines(&[intake_line("1L", 0)]),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn normalization_applies_ledger_defaults() {
        let lines = vec![intake_line(" 500ml ", 10)];
        let normalized = normalize_lines(&lines);

        assert_eq!(normalized[0].item_code, "500ml");
        assert_eq!(normalized[0].item_name, "");
        assert_eq!(normalized[0].cost_per_unit, 100.0);
        assert_eq!(normalized[0].selling_price, 150.0);
        assert_eq!(normalized[0].supplier_name, "Default Supplier");
    }

    #[test]
    fn normalization_keeps_supplied_metadata() {
        let mut line = intake_line("19L", 3);
        line.item_name = Some("19L Dispenser Bottle".to_string());
        line.cost_per_unit = Some(80.0);
        line.selling_price = Some(120.0);
        line.supplier_name = Some("Aqua Supplies".to_string());

        let normalized = normalize_lines(&[line]);
        assert_eq!(normalized[0].item_name, "19L Dispenser Bottle");
        assert_eq!(normalized[0].cost_per_unit, 80.0);
        assert_eq!(normalized[0].selling_price, 120.0);
        assert_eq!(normalized[0].supplier_name, "Aqua Supplies");
    }
}
