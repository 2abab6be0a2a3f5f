//! Application wiring and lifecycle.

use axum::middleware::from_fn;
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers;
use crate::services::{init_metrics, BillingService, Database, InventoryService, StockLedger};

/// Shared application state. The Stock Ledger is constructed once here and
/// injected into both billing and intake.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub ledger: StockLedger,
    pub billing: BillingService,
    pub inventory: InventoryService,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::connect(&config).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(e)
        })?;

        db.init_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            AppError::DatabaseError(e)
        })?;

        let ledger = StockLedger::new(db.stock_entries().clone());
        let billing = BillingService::new(&db, ledger.clone());
        let inventory = InventoryService::new(&db, ledger.clone());

        let state = AppState {
            db,
            config: config.clone(),
            ledger,
            billing,
            inventory,
        };

        let router = Router::new()
            .route("/health", get(handlers::health::health_check))
            .route("/ready", get(handlers::health::readiness_check))
            .route("/metrics", get(handlers::health::metrics_endpoint))
            // Auth
            .route("/auth/register", post(handlers::auth::register))
            .route("/auth/login", post(handlers::auth::login))
            .route("/auth/users/:id", delete(handlers::auth::delete_user))
            // Billing
            .route("/billing", post(handlers::billing::issue_bill))
            .route(
                "/billing/invoices/:id",
                get(handlers::billing::get_invoice),
            )
            // Payment history and status transitions
            .route("/payments", get(handlers::payments::list_payments))
            .route(
                "/payments/:id/settle",
                post(handlers::payments::settle_payment),
            )
            .route(
                "/payments/:id/cheque-status",
                patch(handlers::payments::update_cheque_status),
            )
            // Stock ledger and intake
            .route("/stock", get(handlers::inventory::query_stock))
            .route(
                "/inventory/batches",
                post(handlers::inventory::record_intake).get(handlers::inventory::list_batches),
            )
            .route(
                "/inventory/batches/:id",
                put(handlers::inventory::update_batch),
            )
            // Customer directory
            .route(
                "/customers",
                post(handlers::customers::create_customer)
                    .get(handlers::customers::list_customers),
            )
            .route(
                "/customers/:id",
                get(handlers::customers::get_customer)
                    .put(handlers::customers::update_customer)
                    .delete(handlers::customers::delete_customer),
            )
            // Reporting
            .route(
                "/reports/credit-summary",
                get(handlers::reports::credit_summary),
            )
            .route("/reports/cheques", get(handlers::reports::list_cheques))
            .layer(from_fn(metrics_middleware))
            .layer(from_fn(request_id_middleware))
            // The browser frontend is served from a different origin.
            .layer(CorsLayer::permissive())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
            .with_state(state);

        // Port 0 gives a random port for tests.
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        tracing::info!("Distributor service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}
