use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{ChequeStatus, Payment, PaymentMethod};

/// One bottle line of a billing request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BottleLineRequest {
    pub item_code: String,
    pub item_name: Option<String>,
    pub quantity: i64,
    pub price: f64,
}

/// Cheque fields; all required when the payment method is Cheque, including
/// the initial status.
#[derive(Debug, Clone, Deserialize)]
pub struct ChequeRequest {
    pub cheque_no: Option<String>,
    pub cheque_date: Option<NaiveDate>,
    pub bank_name: Option<String>,
    pub status: Option<ChequeStatus>,
}

/// Billing transaction input; one request per invoice.
///
/// Step-by-step validation happens in the billing service so failures name
/// the offending field or line; the derive only covers coarse shape.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IssueBillRequest {
    /// "registered" or "guest".
    pub customer_type: String,
    pub customer_id: Option<Uuid>,
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    #[validate(length(min = 1, message = "brand is required"))]
    pub brand: String,
    #[validate(length(min = 1, message = "at least one bottle line is required"))]
    pub bottles: Vec<BottleLineRequest>,
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
    /// Amount paid up-front; meaningful for Credit billing.
    pub paid_amount: Option<f64>,
    pub cheque: Option<ChequeRequest>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub brand: String,
    pub item_code: String,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub amount: f64,
    pub paid_amount: f64,
    pub due_amount: f64,
    pub payment_method: PaymentMethod,
    pub status: crate::models::PaymentStatus,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            invoice_id: p.invoice_id,
            customer_id: p.customer_id,
            brand: p.brand,
            item_code: p.item_code,
            item_name: p.item_name,
            quantity: p.quantity,
            unit_price: p.unit_price,
            amount: p.amount,
            paid_amount: p.paid_amount,
            due_amount: p.due_amount,
            payment_method: p.payment_method,
            status: p.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IssuedBillResponse {
    pub invoice_id: Uuid,
    pub customer_id: Uuid,
    pub customer_balance: f64,
    pub payments: Vec<PaymentResponse>,
}
