//! Prometheus metrics collection for gridd.
//!
//! Metrics live in `OnceLock` statics registered by [`init`]; recording
//! before `init` is a no-op, which keeps unit tests free of global setup.
//!
//! - `grid_command_total{command}` - Commands processed by type
//! - `grid_command_duration_seconds{command}` - Command latency histogram
//! - `grid_notifications_forwarded_total{category}` - Hub events pushed to clients
//! - `grid_node_frames_total{outcome}` - Telemetry frames by outcome

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Currently connected client sessions.
pub static ACTIVE_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

/// Nodes with an open telemetry link.
pub static NODES_CONNECTED: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Command Metrics
// ========================================================================

/// Commands processed by type (SetHost, GetState, etc.).
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Command processing latency by command type.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Command errors by type and error kind.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Fan-out and Telemetry
// ========================================================================

/// Hub events forwarded to clients, by category.
pub static NOTIFICATIONS_FORWARDED: OnceLock<IntCounterVec> = OnceLock::new();

/// Hub events skipped by lagging sessions, by category.
pub static NOTIFICATIONS_LAGGED: OnceLock<IntCounterVec> = OnceLock::new();

/// Node telemetry frames by outcome (stats, request, invalid, malformed).
pub static NODE_FRAMES: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at server startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(
                            error = %e,
                            concat!("Failed to register metric ", stringify!($metric))
                        );
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        concat!("Failed to create metric ", stringify!($metric))
                    );
                }
            }
        };
    }

    register!(
        ACTIVE_SESSIONS,
        IntGauge::new("grid_active_sessions", "Currently connected client sessions")
    );
    register!(
        NODES_CONNECTED,
        IntGauge::new("grid_nodes_connected", "Nodes with an open telemetry link")
    );

    register!(
        COMMAND_COUNTER,
        IntCounterVec::new(
            Opts::new("grid_command_total", "Client commands processed by type"),
            &["command"]
        )
    );
    register!(
        COMMAND_LATENCY,
        HistogramVec::new(
            HistogramOpts::new("grid_command_duration_seconds", "Client command latency by type")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["command"]
        )
    );
    register!(
        COMMAND_ERRORS,
        IntCounterVec::new(
            Opts::new("grid_command_errors_total", "Client command errors by type"),
            &["command", "error"]
        )
    );

    register!(
        NOTIFICATIONS_FORWARDED,
        IntCounterVec::new(
            Opts::new("grid_notifications_forwarded_total", "Hub events pushed to clients"),
            &["category"]
        )
    );
    register!(
        NOTIFICATIONS_LAGGED,
        IntCounterVec::new(
            Opts::new(
                "grid_notifications_lagged_total",
                "Hub events skipped by lagging sessions"
            ),
            &["category"]
        )
    );
    register!(
        NODE_FRAMES,
        IntCounterVec::new(
            Opts::new("grid_node_frames_total", "Node telemetry frames by outcome"),
            &["outcome"]
        )
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

fn get_counter_vec(metric: &OnceLock<IntCounterVec>) -> Option<&IntCounterVec> {
    metric.get()
}

fn get_histogram_vec(metric: &OnceLock<HistogramVec>) -> Option<&HistogramVec> {
    metric.get()
}

/// Record a command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(c) = get_counter_vec(&COMMAND_COUNTER) {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = get_histogram_vec(&COMMAND_LATENCY) {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a command error.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    if let Some(c) = get_counter_vec(&COMMAND_ERRORS) {
        c.with_label_values(&[command, error]).inc();
    }
}

/// Record a hub event pushed to a client.
#[inline]
pub fn record_forwarded(category: &str) {
    if let Some(c) = get_counter_vec(&NOTIFICATIONS_FORWARDED) {
        c.with_label_values(&[category]).inc();
    }
}

/// Record hub events a session skipped after falling behind.
#[inline]
pub fn record_lagged(category: &str, skipped: u64) {
    if let Some(c) = get_counter_vec(&NOTIFICATIONS_LAGGED) {
        c.with_label_values(&[category]).inc_by(skipped);
    }
}

/// Record one node telemetry frame.
#[inline]
pub fn record_node_frame(outcome: &str) {
    if let Some(c) = get_counter_vec(&NODE_FRAMES) {
        c.with_label_values(&[outcome]).inc();
    }
}
