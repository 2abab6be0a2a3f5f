use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{BottleLine, InventoryBatch};

/// One intake line. Metadata is optional; missing fields are normalized to
/// ledger defaults when the batch is persisted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntakeLineRequest {
    pub item_code: String,
    pub item_name: Option<String>,
    pub quantity: i64,
    pub cost_per_unit: Option<f64>,
    pub selling_price: Option<f64>,
    pub supplier_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IntakeBatchRequest {
    pub date: NaiveDate,
    #[validate(length(min = 1, message = "brand is required"))]
    pub brand: String,
    #[validate(length(min = 1, message = "bottle list must not be empty"))]
    pub bottles: Vec<IntakeLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub brand: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub id: Uuid,
    pub date: NaiveDate,
    pub brand: String,
    pub bottles: Vec<BottleLine>,
}

impl From<InventoryBatch> for BatchResponse {
    fn from(b: InventoryBatch) -> Self {
        Self {
            id: b.id,
            date: b.date,
            brand: b.brand,
            bottles: b.bottles,
        }
    }
}
