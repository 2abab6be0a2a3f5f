//! The billing transaction: validation, payment-row construction, stock
//! deduction and customer balance recomputation inside one MongoDB
//! session transaction.

use std::collections::HashMap;

use anyhow::anyhow;
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime};
use mongodb::options::FindOptions;
use mongodb::{Client, ClientSession, Collection};
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{IssueBillRequest, IssuedBillResponse};
use crate::models::{
    ChequeDetails, ChequeStatus, Customer, CustomerType, GuestInfo, Payment, PaymentMethod,
    PaymentStatus,
};

use super::{record_bill_issued, record_billing_failure, Database, StockLedger};

/// Tolerance for money comparisons; amounts are f64 sums of quantity*price.
const AMOUNT_EPSILON: f64 = 1e-6;

/// Customer descriptor after request validation.
#[derive(Debug, Clone, PartialEq)]
pub enum BillCustomer {
    Registered(Uuid),
    Guest { name: String, phone: String },
}

#[derive(Clone)]
pub struct BillingService {
    client: Client,
    customers: Collection<Customer>,
    payments: Collection<Payment>,
    ledger: StockLedger,
}

impl BillingService {
    pub fn new(db: &Database, ledger: StockLedger) -> Self {
        Self {
            client: db.client().clone(),
            customers: db.customers().clone(),
            payments: db.payments().clone(),
            ledger,
        }
    }

    /// Issue a bill: the only write path that creates Payment rows.
    ///
    /// Validation is fail-fast and happens before the transaction opens;
    /// everything that writes happens inside one session transaction, so a
    /// failure at any step (including insufficient stock on the last line)
    /// leaves no partial Payment rows and no partial deduction.
    #[instrument(skip(self, req), fields(brand = %req.brand, payment_method = ?req.payment_method, line_count = req.bottles.len()))]
    pub async fn issue_bill(&self, req: IssueBillRequest) -> Result<IssuedBillResponse, AppError> {
        req.validate()?;
        let customer_kind = validate_request(&req)?;

        // Every line must resolve to a ledger entry before anything is
        // written; the resolved names also feed the payment rows.
        let mut item_names = HashMap::new();
        for line in &req.bottles {
            let entry = self
                .ledger
                .find_entry(&req.brand, &line.item_code)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(anyhow!(
                        "no stock entry for item '{}' of brand '{}'",
                        line.item_code,
                        req.brand
                    ))
                })?;
            let name = line
                .item_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| {
                    if entry.item_name.is_empty() {
                        entry.item_code.clone()
                    } else {
                        entry.item_name.clone()
                    }
                });
            item_names.insert(line.item_code.clone(), name);
        }

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self
            .execute_bill(&mut session, &req, &customer_kind, &item_names)
            .await
        {
            Ok(resp) => {
                session.commit_transaction().await?;
                let status = if resp.payments.iter().all(|p| p.status == PaymentStatus::Completed)
                {
                    "Completed"
                } else {
                    "Pending"
                };
                record_bill_issued(method_label(req.payment_method), status);
                tracing::info!(
                    invoice_id = %resp.invoice_id,
                    customer_id = %resp.customer_id,
                    balance = resp.customer_balance,
                    "Bill issued"
                );
                Ok(resp)
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!(error = %abort_err, "Failed to abort billing transaction");
                }
                record_billing_failure(failure_label(&err));
                Err(err)
            }
        }
    }

    async fn execute_bill(
        &self,
        session: &mut ClientSession,
        req: &IssueBillRequest,
        customer_kind: &BillCustomer,
        item_names: &HashMap<String, String>,
    ) -> Result<IssuedBillResponse, AppError> {
        // Resolve or create the customer as a sub-step of the same
        // transaction; a later failure rolls the guest record back too.
        let customer = match customer_kind {
            BillCustomer::Registered(id) => self
                .customers
                .find_one_with_session(doc! { "_id": id.to_string() }, None, session)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow!("customer {} not found", id)))?,
            BillCustomer::Guest { name, phone } => {
                let existing = self
                    .customers
                    .find_one_with_session(doc! { "name": name }, None, session)
                    .await?;
                match existing {
                    Some(c) => c,
                    None => {
                        let now = DateTime::now();
                        let customer = Customer {
                            id: Uuid::new_v4(),
                            name: name.clone(),
                            phone: phone.clone(),
                            customer_type: CustomerType::Guest,
                            price_rates: Vec::new(),
                            balance: 0.0,
                            created_at: now,
                            updated_at: now,
                        };
                        self.customers
                            .insert_one_with_session(&customer, None, session)
                            .await?;
                        customer
                    }
                }
            }
        };

        let invoice_id = Uuid::new_v4();
        let rows = build_payment_rows(req, &customer, invoice_id, item_names);

        self.payments
            .insert_many_with_session(&rows, None, session)
            .await?;

        // Overwrite the cached balance from the payment ledger; never
        // increment it.
        let balance = self
            .recompute_balance_in_session(session, customer.id)
            .await?;

        for line in &req.bottles {
            self.ledger
                .reserve_and_deduct(session, &req.brand, &line.item_code, line.quantity)
                .await?;
        }

        Ok(IssuedBillResponse {
            invoice_id,
            customer_id: customer.id,
            customer_balance: balance,
            payments: rows.into_iter().map(Into::into).collect(),
        })
    }

    /// balance(customer) = sum of due_amount over that customer's Pending
    /// payments. Recomputed in full after every billing transaction and
    /// every status transition away from Pending; idempotent when nothing
    /// changed in between.
    async fn recompute_balance_in_session(
        &self,
        session: &mut ClientSession,
        customer_id: Uuid,
    ) -> Result<f64, AppError> {
        let pipeline = vec![
            doc! { "$match": { "customer_id": customer_id.to_string(), "status": "Pending" } },
            doc! { "$group": { "_id": null, "total": { "$sum": "$due_amount" } } },
        ];
        let mut cursor = self
            .payments
            .aggregate_with_session(pipeline, None, session)
            .await?;

        let balance = match cursor.next(session).await {
            Some(doc) => doc?.get_f64("total").unwrap_or(0.0),
            None => 0.0,
        };

        self.customers
            .update_one_with_session(
                doc! { "_id": customer_id.to_string() },
                doc! { "$set": { "balance": balance, "updated_at": DateTime::now() } },
                None,
                session,
            )
            .await?;

        Ok(balance)
    }

    /// Settle an outstanding Credit payment: fold the due amount into the
    /// paid amount, mark it Completed and recompute the customer balance.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn settle_payment(&self, payment_id: Uuid) -> Result<Payment, AppError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self.settle_in_session(&mut session, payment_id).await {
            Ok(payment) => {
                session.commit_transaction().await?;
                tracing::info!(payment_id = %payment_id, "Payment settled");
                Ok(payment)
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!(error = %abort_err, "Failed to abort settlement transaction");
                }
                Err(err)
            }
        }
    }

    async fn settle_in_session(
        &self,
        session: &mut ClientSession,
        payment_id: Uuid,
    ) -> Result<Payment, AppError> {
        let mut payment = self
            .payments
            .find_one_with_session(doc! { "_id": payment_id.to_string() }, None, session)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("payment {} not found", payment_id)))?;

        if payment.status != PaymentStatus::Pending {
            return Err(AppError::BadRequest(anyhow!(
                "payment {} is not pending",
                payment_id
            )));
        }

        let paid = payment.paid_amount + payment.due_amount;
        let now = DateTime::now();
        self.payments
            .update_one_with_session(
                doc! { "_id": payment_id.to_string() },
                doc! { "$set": {
                    "paid_amount": paid,
                    "due_amount": 0.0,
                    "status": "Completed",
                    "updated_at": now,
                } },
                None,
                session,
            )
            .await?;

        payment.paid_amount = paid;
        payment.due_amount = 0.0;
        payment.status = PaymentStatus::Completed;
        payment.updated_at = now;

        if let Some(customer_id) = payment.customer_id {
            self.recompute_balance_in_session(session, customer_id)
                .await?;
        }

        Ok(payment)
    }

    /// Transition a cheque from Pending to Cleared or Bounced. The balance
    /// recomputation runs unconditionally so the cached balance can never
    /// drift across a status transition.
    #[instrument(skip(self), fields(payment_id = %payment_id, status = ?new_status))]
    pub async fn update_cheque_status(
        &self,
        payment_id: Uuid,
        new_status: ChequeStatus,
    ) -> Result<Payment, AppError> {
        if new_status == ChequeStatus::Pending {
            return Err(AppError::BadRequest(anyhow!(
                "cheques cannot transition back to Pending"
            )));
        }

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = async {
            let mut payment = self
                .payments
                .find_one_with_session(doc! { "_id": payment_id.to_string() }, None, &mut session)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow!("payment {} not found", payment_id)))?;

            let Some(cheque) = payment.cheque.as_mut() else {
                return Err(AppError::BadRequest(anyhow!(
                    "payment {} is not a cheque payment",
                    payment_id
                )));
            };

            let status_bson = mongodb::bson::to_bson(&new_status)
                .map_err(|e| AppError::InternalError(anyhow!(e)))?;
            let now = DateTime::now();
            self.payments
                .update_one_with_session(
                    doc! { "_id": payment_id.to_string() },
                    doc! { "$set": { "cheque.status": status_bson, "updated_at": now } },
                    None,
                    &mut session,
                )
                .await?;
            cheque.status = new_status;
            payment.updated_at = now;

            if let Some(customer_id) = payment.customer_id {
                self.recompute_balance_in_session(&mut session, customer_id)
                    .await?;
            }

            Ok(payment)
        }
        .await;

        match result {
            Ok(payment) => {
                session.commit_transaction().await?;
                Ok(payment)
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!(error = %abort_err, "Failed to abort cheque transaction");
                }
                Err(err)
            }
        }
    }

    /// Reconstruct an invoice: all Payment rows sharing one invoice_id.
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "item_code": 1 })
            .build();
        let cursor = self
            .payments
            .find(doc! { "invoice_id": invoice_id.to_string() }, options)
            .await?;
        let payments: Vec<Payment> = cursor.try_collect().await?;
        if payments.is_empty() {
            return Err(AppError::NotFound(anyhow!(
                "invoice {} not found",
                invoice_id
            )));
        }
        Ok(payments)
    }
}

fn method_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cash => "cash",
        PaymentMethod::Cheque => "cheque",
        PaymentMethod::Credit => "credit",
        PaymentMethod::Card => "card",
        PaymentMethod::Online => "online",
    }
}

fn failure_label(err: &AppError) -> &'static str {
    match err {
        AppError::InsufficientStock(_) => "insufficient_stock",
        AppError::NotFound(_) => "not_found",
        AppError::ValidationError(_) | AppError::BadRequest(_) => "validation",
        AppError::Conflict(_) => "conflict",
        AppError::DatabaseError(_) => "database",
        _ => "internal",
    }
}

/// Fail-fast request validation (everything that needs no database).
/// Returns the resolved customer descriptor.
pub fn validate_request(req: &IssueBillRequest) -> Result<BillCustomer, AppError> {
    let customer = match req.customer_type.to_ascii_lowercase().as_str() {
        "registered" => {
            let id = req.customer_id.ok_or_else(|| {
                AppError::BadRequest(anyhow!("customer_id is required for registered customers"))
            })?;
            BillCustomer::Registered(id)
        }
        "guest" => {
            let name = req
                .guest_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    AppError::BadRequest(anyhow!("guest_name is required for guest customers"))
                })?;
            let phone = req
                .guest_phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    AppError::BadRequest(anyhow!("guest_phone is required for guest customers"))
                })?;
            BillCustomer::Guest {
                name: name.to_string(),
                phone: phone.to_string(),
            }
        }
        other => {
            return Err(AppError::BadRequest(anyhow!(
                "customer_type must be 'registered' or 'guest', got '{}'",
                other
            )));
        }
    };

    let mut total = 0.0;
    for (i, line) in req.bottles.iter().enumerate() {
        if line.item_code.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow!(
                "bottle line {}: item_code is required",
                i + 1
            )));
        }
        // quantity < 1 or a negative price rejects the whole bill; a price
        // of exactly 0 is permitted.
        if line.quantity < 1 {
            return Err(AppError::BadRequest(anyhow!(
                "bottle line {} ('{}'): quantity must be at least 1",
                i + 1,
                line.item_code
            )));
        }
        if line.price < 0.0 {
            return Err(AppError::BadRequest(anyhow!(
                "bottle line {} ('{}'): price must not be negative",
                i + 1,
                line.item_code
            )));
        }
        total += line.quantity as f64 * line.price;
    }

    if (req.total_amount - total).abs() > AMOUNT_EPSILON {
        return Err(AppError::BadRequest(anyhow!(
            "total_amount {} does not match bottle lines (expected {})",
            req.total_amount,
            total
        )));
    }

    if req.payment_method == PaymentMethod::Cheque {
        let cheque = req
            .cheque
            .as_ref()
            .ok_or_else(|| AppError::BadRequest(anyhow!("cheque details are required")))?;
        if cheque.cheque_no.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(AppError::BadRequest(anyhow!("cheque_no is required")));
        }
        if cheque.cheque_date.is_none() {
            return Err(AppError::BadRequest(anyhow!("cheque_date is required")));
        }
        if cheque.bank_name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(AppError::BadRequest(anyhow!("bank_name is required")));
        }
        if cheque.status.is_none() {
            return Err(AppError::BadRequest(anyhow!("cheque status is required")));
        }
    }

    if req.payment_method == PaymentMethod::Credit {
        let paid = req.paid_amount.unwrap_or(0.0);
        if paid < 0.0 {
            return Err(AppError::BadRequest(anyhow!(
                "paid_amount must not be negative"
            )));
        }
        if paid > total + AMOUNT_EPSILON {
            return Err(AppError::BadRequest(anyhow!(
                "paid_amount {} exceeds bill total {}",
                paid,
                total
            )));
        }
    }

    Ok(customer)
}

/// Split a paid total across lines proportionally to each line's amount;
/// the last line absorbs the floating-point remainder so the per-line paid
/// and due amounts sum exactly to the totals. Returns (paid, due) pairs.
pub fn allocate_proportional(line_amounts: &[f64], paid_total: f64) -> Vec<(f64, f64)> {
    let total: f64 = line_amounts.iter().sum();
    if line_amounts.is_empty() {
        return Vec::new();
    }
    if total <= AMOUNT_EPSILON {
        return line_amounts.iter().map(|_| (0.0, 0.0)).collect();
    }

    let mut allocated = Vec::with_capacity(line_amounts.len());
    let mut paid_so_far = 0.0;
    for (i, &amount) in line_amounts.iter().enumerate() {
        let paid = if i + 1 == line_amounts.len() {
            paid_total - paid_so_far
        } else {
            paid_total * amount / total
        };
        paid_so_far += paid;
        allocated.push((paid, amount - paid));
    }
    allocated
}

/// Construct one Payment row per bottle line. An invoice is a read-time
/// grouping, not a stored document.
pub fn build_payment_rows(
    req: &IssueBillRequest,
    customer: &Customer,
    invoice_id: Uuid,
    item_names: &HashMap<String, String>,
) -> Vec<Payment> {
    let line_amounts: Vec<f64> = req
        .bottles
        .iter()
        .map(|l| l.quantity as f64 * l.price)
        .collect();
    let total: f64 = line_amounts.iter().sum();

    let (allocations, status) = match req.payment_method {
        // Cash-like methods are paid in full at issuance.
        PaymentMethod::Cash
        | PaymentMethod::Cheque
        | PaymentMethod::Card
        | PaymentMethod::Online => (
            line_amounts.iter().map(|&a| (a, 0.0)).collect::<Vec<_>>(),
            PaymentStatus::Completed,
        ),
        PaymentMethod::Credit => {
            let paid_total = req.paid_amount.unwrap_or(0.0);
            let status = if paid_total + AMOUNT_EPSILON >= total {
                PaymentStatus::Completed
            } else {
                PaymentStatus::Pending
            };
            (allocate_proportional(&line_amounts, paid_total), status)
        }
    };

    let cheque = if req.payment_method == PaymentMethod::Cheque {
        req.cheque.as_ref().map(|c| ChequeDetails {
            cheque_no: c.cheque_no.clone().unwrap_or_default(),
            cheque_date: c.cheque_date.unwrap_or_default(),
            bank_name: c.bank_name.clone().unwrap_or_default(),
            status: c.status.unwrap_or(ChequeStatus::Pending),
        })
    } else {
        None
    };

    let guest_info = if customer.customer_type == CustomerType::Guest {
        Some(GuestInfo {
            name: customer.name.clone(),
            phone: customer.phone.clone(),
        })
    } else {
        None
    };

    let now = DateTime::now();
    req.bottles
        .iter()
        .zip(allocations)
        .map(|(line, (paid, due))| Payment {
            id: Uuid::new_v4(),
            invoice_id,
            customer_id: Some(customer.id),
            customer_type: customer.customer_type,
            guest_info: guest_info.clone(),
            brand: req.brand.clone(),
            item_code: line.item_code.clone(),
            item_name: item_names
                .get(&line.item_code)
                .cloned()
                .unwrap_or_else(|| line.item_code.clone()),
            quantity: line.quantity,
            unit_price: line.price,
            amount: line.quantity as f64 * line.price,
            paid_amount: paid,
            due_amount: due,
            payment_method: req.payment_method,
            status,
            cheque: cheque.clone(),
            created_at: now,
            updated_at: now,
        })
        .collect()
}
