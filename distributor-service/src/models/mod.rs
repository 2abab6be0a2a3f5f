mod batch;
mod customer;
mod payment;
mod stock;
mod user;

pub use batch::{BottleLine, InventoryBatch};
pub use customer::{Customer, CustomerType, PriceRate};
pub use payment::{ChequeDetails, ChequeStatus, GuestInfo, Payment, PaymentMethod, PaymentStatus};
pub use stock::StockEntry;
pub use user::{Role, User};
