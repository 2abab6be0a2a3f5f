use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChequeStatus, PaymentStatus};

use super::PaymentResponse;

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub customer_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
    pub limit: Option<i64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentResponse>,
    pub total_count: i64,
}

/// Target state for a cheque; only Cleared and Bounced are reachable
/// through the transition endpoint.
#[derive(Debug, Deserialize)]
pub struct ChequeStatusRequest {
    pub status: ChequeStatus,
}

#[derive(Debug, Deserialize)]
pub struct ChequeListQuery {
    pub status: Option<ChequeStatus>,
}

/// Billed vs paid vs outstanding per customer.
#[derive(Debug, Serialize)]
pub struct CreditSummaryRow {
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub total_billed: f64,
    pub total_paid: f64,
    pub total_due: f64,
}
