use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Customer, CustomerType, PriceRate};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    pub customer_type: Option<CustomerType>,
    #[serde(default)]
    pub price_rates: Vec<PriceRate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub price_rates: Option<Vec<PriceRate>>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerListQuery {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub customer_type: CustomerType,
    pub price_rates: Vec<PriceRate>,
    pub balance: f64,
}

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            name: c.name,
            phone: c.phone,
            customer_type: c.customer_type,
            price_rates: c.price_rates,
            balance: c.balance,
        }
    }
}
