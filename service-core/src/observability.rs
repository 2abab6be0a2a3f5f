use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber: env-filter (RUST_LOG wins over the
/// configured default) plus a structured fmt layer.
pub fn init_tracing(service_name: &str, log_level: &str) {
    let default_directive = format!("{},{}=debug", log_level, service_name.replace('-', "_"));
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}
