use chrono::NaiveDate;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of a stock receipt.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BottleLine {
    pub item_code: String,
    pub item_name: String,
    pub quantity: i64,
    pub cost_per_unit: f64,
    pub selling_price: f64,
    pub supplier_name: String,
}

/// A bulk stock receipt. Immutable once created except through explicit
/// edit; editing replaces the lines but does not retro-adjust ledger
/// quantities already folded in.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InventoryBatch {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub date: NaiveDate,
    pub brand: String,
    pub bottles: Vec<BottleLine>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
