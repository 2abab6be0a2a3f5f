mod billing;
mod database;
mod inventory;
mod metrics;
mod stock_ledger;

pub use billing::{BillCustomer, BillingService};
pub use database::{is_duplicate_key_error, Database};
pub use inventory::InventoryService;
pub use metrics::{get_metrics, init_metrics, record_bill_issued, record_billing_failure};
pub use stock_ledger::{IntakeMetadata, StockLedger};
