use chrono::NaiveDate;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CustomerType;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Cheque,
    Credit,
    Card,
    Online,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ChequeStatus {
    Pending,
    Cleared,
    Bounced,
}

/// Cheque fields, populated only when the payment method is Cheque.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChequeDetails {
    pub cheque_no: String,
    pub cheque_date: NaiveDate,
    pub bank_name: String,
    pub status: ChequeStatus,
}

/// Snapshot of guest identity taken at billing time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GuestInfo {
    pub name: String,
    pub phone: String,
}

/// One billed bottle line. An invoice is not stored as its own document;
/// the rows created by one billing transaction share an `invoice_id` and
/// are grouped at read time.
///
/// Rows are created only by the billing transaction and mutated only by
/// status transitions (credit settlement, cheque clearing).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer_type: CustomerType,
    pub guest_info: Option<GuestInfo>,
    pub brand: String,
    pub item_code: String,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    /// quantity * unit_price
    pub amount: f64,
    pub paid_amount: f64,
    pub due_amount: f64,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub cheque: Option<ChequeDetails>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
