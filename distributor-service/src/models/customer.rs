use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum CustomerType {
    Registered,
    Guest,
    Other,
}

/// Customer-specific price override for one bottle type.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PriceRate {
    pub bottle_type: String,
    pub price: f64,
}

/// A customer, registered explicitly or auto-created as a Guest during
/// billing. `balance` is a cached aggregate over Pending payments; it is
/// only ever written by the balance recomputation, never incremented.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub customer_type: CustomerType,
    #[serde(default)]
    pub price_rates: Vec<PriceRate>,
    pub balance: f64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
