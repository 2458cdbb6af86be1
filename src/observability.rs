use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: bookings committed.
pub const BOOKINGS_CREATED_TOTAL: &str = "chairtime_bookings_created_total";

/// Counter: reschedules committed.
pub const BOOKINGS_RESCHEDULED_TOTAL: &str = "chairtime_bookings_rescheduled_total";

/// Counter: lifecycle transitions committed. Labels: action.
pub const TRANSITIONS_TOTAL: &str = "chairtime_transitions_total";

/// Counter: mutations rejected. Labels: reason (error label).
pub const MUTATIONS_REJECTED_TOTAL: &str = "chairtime_mutations_rejected_total";

/// Counter: availability queries served.
pub const AVAILABILITY_QUERIES_TOTAL: &str = "chairtime_availability_queries_total";

/// Counter: optimistic races lost against the store and retried.
pub const STORE_RACES_TOTAL: &str = "chairtime_store_races_total";

/// Install the Prometheus metrics exporter on the given port. No-op if port
/// is None; the `metrics` facade then discards everything.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Convenience tracing setup for embedders and examples; honors
/// `RUST_LOG` via the env filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
