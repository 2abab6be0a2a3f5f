use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::{Once, OnceLock};

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static BILLS_ISSUED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static BILLING_FAILURES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static DB_QUERY_DURATION: OnceLock<HistogramVec> = OnceLock::new();

static INIT: Once = Once::new();

pub fn init_metrics() {
    // Tests spawn several applications in one process; later calls are no-ops.
    INIT.call_once(|| {
        // The facade recorder backs the HTTP middleware series
        // (http_requests_total, http_request_duration_seconds).
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder");
        METRICS_HANDLE
            .set(handle)
            .unwrap_or_else(|_| panic!("Failed to set metrics handle"));

        let registry = Registry::new();

        let bills_counter = IntCounterVec::new(
            Opts::new(
                "bills_issued_total",
                "Billing transactions committed, by payment method and status",
            ),
            &["payment_method", "status"],
        )
        .expect("Failed to create bills_issued_total metric");

        let failures_counter = IntCounterVec::new(
            Opts::new(
                "billing_failures_total",
                "Billing transactions aborted, by failure reason",
            ),
            &["reason"],
        )
        .expect("Failed to create billing_failures_total metric");

        let query_duration = HistogramVec::new(
            HistogramOpts::new("db_query_duration_seconds", "Database operation latency"),
            &["operation"],
        )
        .expect("Failed to create db_query_duration_seconds metric");

        registry
            .register(Box::new(bills_counter.clone()))
            .expect("Failed to register bills_issued_total");
        registry
            .register(Box::new(failures_counter.clone()))
            .expect("Failed to register billing_failures_total");
        registry
            .register(Box::new(query_duration.clone()))
            .expect("Failed to register db_query_duration_seconds");

        PROMETHEUS_REGISTRY
            .set(registry)
            .expect("Failed to set prometheus registry");
        BILLS_ISSUED_TOTAL
            .set(bills_counter)
            .expect("Failed to set bills_issued_total");
        BILLING_FAILURES_TOTAL
            .set(failures_counter)
            .expect("Failed to set billing_failures_total");
        DB_QUERY_DURATION
            .set(query_duration)
            .expect("Failed to set db_query_duration_seconds");
    });
}

/// Render the recorder-backed HTTP series, then append the billing counters
/// from the registry.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(billing_metrics) = String::from_utf8(buffer) {
            output.push_str(&billing_metrics);
        }
    }

    output
}

pub fn record_bill_issued(payment_method: &str, status: &str) {
    if let Some(counter) = BILLS_ISSUED_TOTAL.get() {
        counter.with_label_values(&[payment_method, status]).inc();
    }
}

pub fn record_billing_failure(reason: &str) {
    if let Some(counter) = BILLING_FAILURES_TOTAL.get() {
        counter.with_label_values(&[reason]).inc();
    }
}
