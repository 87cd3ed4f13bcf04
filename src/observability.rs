use std::net::SocketAddr;

/// Counter: booking submissions. Labels: outcome (booked, room_conflict,
/// user_conflict).
pub const BOOKINGS_TOTAL: &str = "huddle_bookings_total";

/// Counter: series occurrences created by the recurrence generator.
pub const OCCURRENCES_CREATED_TOTAL: &str = "huddle_occurrences_created_total";

/// Counter: candidate dates skipped (room busy, unresolvable local time,
/// per-date insert failure).
pub const OCCURRENCES_SKIPPED_TOTAL: &str = "huddle_occurrences_skipped_total";

/// Counter: meetings moved into the archive.
pub const MEETINGS_ARCHIVED_TOTAL: &str = "huddle_meetings_archived_total";

/// Counter: series-head promotions.
pub const PROMOTIONS_TOTAL: &str = "huddle_promotions_total";

/// Counter: expired meetings whose archival failed and was rolled back.
pub const SWEEP_FAILURES_TOTAL: &str = "huddle_sweep_failures_total";

/// Counter: scheduler passes that ended in error backoff.
pub const SCHEDULER_ERRORS_TOTAL: &str = "huddle_scheduler_errors_total";

/// Histogram: duration of one mover pass in seconds.
pub const SWEEP_DURATION_SECONDS: &str = "huddle_sweep_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
