pub mod auth;
pub mod billing;
pub mod customers;
pub mod health;
pub mod inventory;
pub mod payments;
pub mod reports;
