//! Shared setup for distributor-service integration tests.
//!
//! These tests need a MongoDB deployment that supports multi-document
//! transactions (a replica set); point TEST_MONGODB_URL at one. Each test
//! gets its own database so tests can run in parallel.

#![allow(dead_code)]

use distributor_service::config::{AuthConfig, Config, DatabaseConfig, ServerConfig};
use distributor_service::services::Database;
use distributor_service::startup::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};

static DB_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn test_database_url() -> String {
    std::env::var("TEST_MONGODB_URL")
        .unwrap_or_else(|_| "mongodb://localhost:27017/?replicaSet=rs0".to_string())
}

fn unique_db_name() -> String {
    let counter = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("distributor_test_{}_{}", std::process::id(), counter)
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: Database,
    pub client: reqwest::Client,
    db_name: String,
}

impl TestApp {
    /// Spawn the application on a random port against a fresh database.
    pub async fn spawn() -> Self {
        let db_name = unique_db_name();
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                url: Secret::new(test_database_url()),
                db_name: db_name.clone(),
            },
            auth: AuthConfig {
                jwt_secret: Secret::new("test-secret".to_string()),
                token_expiry_hours: 1,
            },
            service_name: "distributor-service-test".to_string(),
        };

        let app = Application::build(config.clone())
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let db = Database::connect(&config)
            .await
            .expect("Failed to connect test database handle");

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("http://127.0.0.1:{}/health", port);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            db,
            client,
            db_name,
        }
    }

    /// Register the bootstrap admin account and return its bearer token.
    pub async fn bootstrap_admin(&self) -> String {
        let response = self
            .client
            .post(format!("{}/auth/register", self.address))
            .json(&json!({ "username": "admin", "password": "password123" }))
            .send()
            .await
            .expect("register request");
        assert_eq!(response.status().as_u16(), 201, "bootstrap registration");

        let response = self
            .client
            .post(format!("{}/auth/login", self.address))
            .json(&json!({ "username": "admin", "password": "password123" }))
            .send()
            .await
            .expect("login request");
        assert_eq!(response.status().as_u16(), 200, "bootstrap login");

        let body: Value = response.json().await.expect("token body");
        body["token"].as_str().expect("token field").to_string()
    }

    /// Record an intake batch so the ledger has stock to sell.
    pub async fn seed_stock(&self, token: &str, brand: &str, item_code: &str, quantity: i64) {
        let response = self
            .client
            .post(format!("{}/inventory/batches", self.address))
            .bearer_auth(token)
            .json(&json!({
                "date": "2024-06-01",
                "brand": brand,
                "bottles": [{
                    "item_code": item_code,
                    "item_name": format!("{} bottle", item_code),
                    "quantity": quantity,
                    "cost_per_unit": 30.0,
                    "selling_price": 50.0,
                    "supplier_name": "Acme Waters"
                }]
            }))
            .send()
            .await
            .expect("intake request");
        assert_eq!(response.status().as_u16(), 201, "intake batch");
    }

    /// Read an item's available quantity back from the stock ledger.
    pub async fn available_quantity(&self, token: &str, brand: &str, item_code: &str) -> i64 {
        let response = self
            .client
            .get(format!("{}/stock?brand={}", self.address, brand))
            .bearer_auth(token)
            .send()
            .await
            .expect("stock query");
        assert_eq!(response.status().as_u16(), 200);

        let entries: Vec<Value> = response.json().await.expect("stock body");
        entries
            .iter()
            .find(|e| e["item_code"] == item_code)
            .map(|e| e["available_quantity"].as_i64().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Create a registered customer and return its id.
    pub async fn create_customer(&self, token: &str, name: &str) -> String {
        let response = self
            .client
            .post(format!("{}/customers", self.address))
            .bearer_auth(token)
            .json(&json!({ "name": name, "phone": "0300-1234567" }))
            .send()
            .await
            .expect("customer request");
        assert_eq!(response.status().as_u16(), 201, "customer creation");

        let body: Value = response.json().await.expect("customer body");
        body["id"].as_str().expect("customer id").to_string()
    }

    /// Fetch a customer's cached balance.
    pub async fn customer_balance(&self, token: &str, customer_id: &str) -> f64 {
        let response = self
            .client
            .get(format!("{}/customers/{}", self.address, customer_id))
            .bearer_auth(token)
            .send()
            .await
            .expect("customer fetch");
        assert_eq!(response.status().as_u16(), 200);

        let body: Value = response.json().await.expect("customer body");
        body["balance"].as_f64().expect("balance field")
    }

    /// Count Payment rows through the list endpoint.
    pub async fn payment_count(&self, token: &str) -> i64 {
        let response = self
            .client
            .get(format!("{}/payments", self.address))
            .bearer_auth(token)
            .send()
            .await
            .expect("payments list");
        assert_eq!(response.status().as_u16(), 200);

        let body: Value = response.json().await.expect("payments body");
        body["total_count"].as_i64().expect("total_count")
    }

    /// Drop the per-test database.
    pub async fn cleanup(&self) {
        self.db
            .client()
            .database(&self.db_name)
            .drop(None)
            .await
            .ok();
    }
}
