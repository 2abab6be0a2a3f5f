use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current stock position for one (brand, item_code) pair.
///
/// Created on first intake, incremented by intake, decremented by billing.
/// Never deleted. `available_quantity` must never go negative; billing
/// enforces this with a conditional decrement.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StockEntry {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub brand: String,
    pub item_code: String,
    pub item_name: String,
    pub available_quantity: i64,
    pub sold_quantity: i64,
    pub total_revenue: f64,
    pub profit_earned: f64,
    pub cost_per_unit: f64,
    pub selling_price: f64,
    pub supplier_name: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
