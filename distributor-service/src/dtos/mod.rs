mod auth;
mod billing;
mod customers;
mod inventory;
mod payments;

pub use auth::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};
pub use billing::{
    BottleLineRequest, ChequeRequest, IssueBillRequest, IssuedBillResponse, PaymentResponse,
};
pub use customers::{
    CreateCustomerRequest, CustomerListQuery, CustomerResponse, UpdateCustomerRequest,
};
pub use inventory::{BatchResponse, IntakeBatchRequest, IntakeLineRequest, StockQuery};
pub use payments::{
    ChequeListQuery, ChequeStatusRequest, CreditSummaryRow, ListPaymentsQuery, PaymentListResponse,
};
