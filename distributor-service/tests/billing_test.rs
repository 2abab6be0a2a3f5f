//! End-to-end billing transaction tests.
//!
//! Run with a MongoDB replica set available:
//!   cargo test -- --ignored

mod common;

use common::TestApp;
use serde_json::{json, Value};

#[tokio::test]
#[ignore = "requires a MongoDB replica set"]
async fn cash_bill_decrements_stock_and_completes() {
    let app = TestApp::spawn().await;
    let token = app.bootstrap_admin().await;
    app.seed_stock(&token, "AquaPure", "500ml", 10).await;

    let response = app
        .client
        .post(format!("{}/billing", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "customer_type": "guest",
            "guest_name": "Walk In",
            "guest_phone": "0300-0000000",
            "brand": "AquaPure",
            "bottles": [{ "item_code": "500ml", "quantity": 4, "price": 50.0 }],
            "total_amount": 200.0,
            "payment_method": "Cash"
        }))
        .send()
        .await
        .expect("billing request");
    assert_eq!(response.status().as_u16(), 201);

    let bill: Value = response.json().await.expect("bill body");
    assert_eq!(bill["payments"].as_array().map(Vec::len), Some(1));
    assert_eq!(bill["payments"][0]["amount"], 200.0);
    assert_eq!(bill["payments"][0]["paid_amount"], 200.0);
    assert_eq!(bill["payments"][0]["due_amount"], 0.0);
    assert_eq!(bill["payments"][0]["status"], "Completed");
    assert_eq!(bill["customer_balance"], 0.0);

    assert_eq!(app.available_quantity(&token, "AquaPure", "500ml").await, 6);

    // The guest was materialized in the customer directory.
    let response = app
        .client
        .get(format!("{}/customers?search=Walk", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("customer search");
    let customers: Vec<Value> = response.json().await.expect("customers body");
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0]["customer_type"], "Guest");

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a MongoDB replica set"]
async fn insufficient_stock_rolls_back_the_whole_bill() {
    let app = TestApp::spawn().await;
    let token = app.bootstrap_admin().await;
    app.seed_stock(&token, "AquaPure", "500ml", 5).await;
    app.seed_stock(&token, "AquaPure", "1L", 3).await;

    // First line is satisfiable, second is not; nothing may persist.
    let response = app
        .client
        .post(format!("{}/billing", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "customer_type": "guest",
            "guest_name": "Walk In",
            "guest_phone": "0300-0000000",
            "brand": "AquaPure",
            "bottles": [
                { "item_code": "500ml", "quantity": 2, "price": 50.0 },
                { "item_code": "1L", "quantity": 50, "price": 80.0 }
            ],
            "total_amount": 4100.0,
            "payment_method": "Cash"
        }))
        .send()
        .await
        .expect("billing request");
    assert_eq!(response.status().as_u16(), 409);

    let body: Value = response.json().await.expect("error body");
    assert!(body["error"].as_str().unwrap_or("").contains("1L"));

    assert_eq!(app.payment_count(&token).await, 0);
    assert_eq!(app.available_quantity(&token, "AquaPure", "500ml").await, 5);
    assert_eq!(app.available_quantity(&token, "AquaPure", "1L").await, 3);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a MongoDB replica set"]
async fn unknown_item_fails_before_any_write() {
    let app = TestApp::spawn().await;
    let token = app.bootstrap_admin().await;
    app.seed_stock(&token, "AquaPure", "500ml", 5).await;

    let response = app
        .client
        .post(format!("{}/billing", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "customer_type": "guest",
            "guest_name": "Walk In",
            "guest_phone": "0300-0000000",
            "brand": "AquaPure",
            "bottles": [{ "item_code": "19L", "quantity": 1, "price": 120.0 }],
            "total_amount": 120.0,
            "payment_method": "Cash"
        }))
        .send()
        .await
        .expect("billing request");
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(app.payment_count(&token).await, 0);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a MongoDB replica set"]
async fn credit_bill_leaves_pending_rows_and_balance() {
    let app = TestApp::spawn().await;
    let token = app.bootstrap_admin().await;
    app.seed_stock(&token, "AquaPure", "500ml", 20).await;
    app.seed_stock(&token, "AquaPure", "1L", 20).await;
    let customer_id = app.create_customer(&token, "Hilltop Hotel").await;

    let response = app
        .client
        .post(format!("{}/billing", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "customer_type": "registered",
            "customer_id": customer_id,
            "brand": "AquaPure",
            "bottles": [
                { "item_code": "500ml", "quantity": 2, "price": 50.0 },
                { "item_code": "1L", "quantity": 1, "price": 50.0 }
            ],
            "total_amount": 150.0,
            "payment_method": "Credit",
            "paid_amount": 90.0
        }))
        .send()
        .await
        .expect("billing request");
    assert_eq!(response.status().as_u16(), 201);

    let bill: Value = response.json().await.expect("bill body");
    assert!((bill["customer_balance"].as_f64().unwrap() - 60.0).abs() < 1e-6);
    for payment in bill["payments"].as_array().expect("rows") {
        assert_eq!(payment["status"], "Pending");
    }

    assert!((app.customer_balance(&token, &customer_id).await - 60.0).abs() < 1e-6);

    // Settling one row shrinks the balance by exactly that row's due.
    let payment_id = bill["payments"][0]["id"].as_str().expect("payment id");
    let first_due = bill["payments"][0]["due_amount"].as_f64().expect("due");

    let response = app
        .client
        .post(format!("{}/payments/{}/settle", app.address, payment_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("settle request");
    assert_eq!(response.status().as_u16(), 200);

    let settled: Value = response.json().await.expect("settled body");
    assert_eq!(settled["status"], "Completed");
    assert_eq!(settled["due_amount"], 0.0);

    let balance = app.customer_balance(&token, &customer_id).await;
    assert!((balance - (60.0 - first_due)).abs() < 1e-6);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a MongoDB replica set"]
async fn balance_accumulates_across_credit_invoices() {
    let app = TestApp::spawn().await;
    let token = app.bootstrap_admin().await;
    app.seed_stock(&token, "AquaPure", "500ml", 50).await;
    let customer_id = app.create_customer(&token, "Hilltop Hotel").await;

    // Three unpaid credit bills with dues 100, 50 and 30; the balance after
    // each must be the sum over every Pending row, not just the last invoice.
    for (quantity, price, expected_balance) in
        [(2_i64, 50.0, 100.0), (1, 50.0, 150.0), (1, 30.0, 180.0)]
    {
        let response = app
            .client
            .post(format!("{}/billing", app.address))
            .bearer_auth(&token)
            .json(&json!({
                "customer_type": "registered",
                "customer_id": customer_id,
                "brand": "AquaPure",
                "bottles": [{ "item_code": "500ml", "quantity": quantity, "price": price }],
                "total_amount": quantity as f64 * price,
                "payment_method": "Credit",
                "paid_amount": 0.0
            }))
            .send()
            .await
            .expect("billing request");
        assert_eq!(response.status().as_u16(), 201);

        let bill: Value = response.json().await.expect("bill body");
        assert!(
            (bill["customer_balance"].as_f64().unwrap() - expected_balance).abs() < 1e-6
        );
        assert!((app.customer_balance(&token, &customer_id).await - expected_balance).abs() < 1e-6);
    }

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a MongoDB replica set"]
async fn cheque_bill_stores_details_and_transitions_status() {
    let app = TestApp::spawn().await;
    let token = app.bootstrap_admin().await;
    app.seed_stock(&token, "AquaPure", "500ml", 10).await;
    let customer_id = app.create_customer(&token, "Corner Mart").await;

    let response = app
        .client
        .post(format!("{}/billing", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "customer_type": "registered",
            "customer_id": customer_id,
            "brand": "AquaPure",
            "bottles": [{ "item_code": "500ml", "quantity": 3, "price": 50.0 }],
            "total_amount": 150.0,
            "payment_method": "Cheque",
            "cheque": {
                "cheque_no": "CHQ-1001",
                "cheque_date": "2024-06-01",
                "bank_name": "HBL",
                "status": "Pending"
            }
        }))
        .send()
        .await
        .expect("billing request");
    assert_eq!(response.status().as_u16(), 201);

    let bill: Value = response.json().await.expect("bill body");
    let payment_id = bill["payments"][0]["id"].as_str().expect("payment id");

    // Pending cheques show up in the cheque report.
    let response = app
        .client
        .get(format!("{}/reports/cheques?status=Pending", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("cheque report");
    let cheques: Vec<Value> = response.json().await.expect("cheques body");
    assert_eq!(cheques.len(), 1);

    let response = app
        .client
        .patch(format!(
            "{}/payments/{}/cheque-status",
            app.address, payment_id
        ))
        .bearer_auth(&token)
        .json(&json!({ "status": "Cleared" }))
        .send()
        .await
        .expect("cheque transition");
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .client
        .get(format!("{}/reports/cheques?status=Pending", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("cheque report");
    let cheques: Vec<Value> = response.json().await.expect("cheques body");
    assert!(cheques.is_empty());

    // Pending is not a reachable target state.
    let response = app
        .client
        .patch(format!(
            "{}/payments/{}/cheque-status",
            app.address, payment_id
        ))
        .bearer_auth(&token)
        .json(&json!({ "status": "Pending" }))
        .send()
        .await
        .expect("cheque transition");
    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a MongoDB replica set"]
async fn invoice_groups_rows_issued_together() {
    let app = TestApp::spawn().await;
    let token = app.bootstrap_admin().await;
    app.seed_stock(&token, "AquaPure", "500ml", 10).await;
    app.seed_stock(&token, "AquaPure", "1L", 10).await;

    let response = app
        .client
        .post(format!("{}/billing", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "customer_type": "guest",
            "guest_name": "Walk In",
            "guest_phone": "0300-0000000",
            "brand": "AquaPure",
            "bottles": [
                { "item_code": "500ml", "quantity": 1, "price": 50.0 },
                { "item_code": "1L", "quantity": 2, "price": 80.0 }
            ],
            "total_amount": 210.0,
            "payment_method": "Cash"
        }))
        .send()
        .await
        .expect("billing request");
    assert_eq!(response.status().as_u16(), 201);

    let bill: Value = response.json().await.expect("bill body");
    let invoice_id = bill["invoice_id"].as_str().expect("invoice id");

    let response = app
        .client
        .get(format!("{}/billing/invoices/{}", app.address, invoice_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("invoice fetch");
    assert_eq!(response.status().as_u16(), 200);

    let rows: Vec<Value> = response.json().await.expect("invoice body");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["invoice_id"] == invoice_id));

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a MongoDB replica set"]
async fn billing_requires_a_token() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/billing", app.address))
        .json(&json!({
            "customer_type": "guest",
            "guest_name": "Walk In",
            "guest_phone": "0300-0000000",
            "brand": "AquaPure",
            "bottles": [{ "item_code": "500ml", "quantity": 1, "price": 50.0 }],
            "total_amount": 50.0,
            "payment_method": "Cash"
        }))
        .send()
        .await
        .expect("billing request");
    assert_eq!(response.status().as_u16(), 401);

    app.cleanup().await;
}
