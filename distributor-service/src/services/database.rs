//! MongoDB connection and collection handles.

use crate::config::Config;
use crate::models::{Customer, InventoryBatch, Payment, StockEntry, User};
use anyhow::Result;
use mongodb::options::IndexOptions;
use mongodb::{bson::doc, options::ClientOptions, Client, Collection, IndexModel};
use secrecy::ExposeSecret;

/// Typed handles to every collection the service touches, plus the client
/// itself for starting multi-document transactions.
#[derive(Clone)]
pub struct Database {
    client: Client,
    stock_entries: Collection<StockEntry>,
    inventory_batches: Collection<InventoryBatch>,
    customers: Collection<Customer>,
    payments: Collection<Payment>,
    users: Collection<User>,
}

impl Database {
    pub async fn connect(config: &Config) -> Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        Ok(Self {
            client,
            stock_entries: db.collection("stock_entries"),
            inventory_batches: db.collection("inventory_batches"),
            customers: db.collection("customers"),
            payments: db.collection("payments"),
            users: db.collection("users"),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn stock_entries(&self) -> &Collection<StockEntry> {
        &self.stock_entries
    }

    pub fn inventory_batches(&self) -> &Collection<InventoryBatch> {
        &self.inventory_batches
    }

    pub fn customers(&self) -> &Collection<Customer> {
        &self.customers
    }

    pub fn payments(&self) -> &Collection<Payment> {
        &self.payments
    }

    pub fn users(&self) -> &Collection<User> {
        &self.users
    }

    /// Create the indexes the service relies on: uniqueness of
    /// (brand, item_code), customer name and username, plus the payment
    /// lookups used by balance recomputation and invoice grouping.
    pub async fn init_indexes(&self) -> Result<()> {
        let brand_item_idx = IndexModel::builder()
            .keys(doc! { "brand": 1, "item_code": 1 })
            .options(
                IndexOptions::builder()
                    .name("brand_item_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        self.stock_entries.create_index(brand_item_idx, None).await?;

        let customer_name_idx = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(
                IndexOptions::builder()
                    .name("customer_name_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        self.customers.create_index(customer_name_idx, None).await?;

        let username_idx = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(
                IndexOptions::builder()
                    .name("username_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        self.users.create_index(username_idx, None).await?;

        let customer_status_idx = IndexModel::builder()
            .keys(doc! { "customer_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("payment_customer_status_idx".to_string())
                    .build(),
            )
            .build();
        let invoice_idx = IndexModel::builder()
            .keys(doc! { "invoice_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("payment_invoice_idx".to_string())
                    .build(),
            )
            .build();
        self.payments
            .create_indexes([customer_status_idx, invoice_idx], None)
            .await?;

        tracing::info!("Distributor service indexes initialized");
        Ok(())
    }
}

/// True when a write failed on a unique index (duplicate customer name,
/// item code or username).
pub fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == 11000,
        ErrorKind::Command(ce) => ce.code == 11000,
        _ => false,
    }
}
