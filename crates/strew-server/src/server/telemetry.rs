//! # Telemetry Features
//!
//! Structured console logging is always on: spans and events go through
//! `tracing` and are printed via `tracing_subscriber::fmt`. Metrics are
//! optional and exported via OpenTelemetry.
//!
//! ## Feature matrix
//!
//! - `metrics`: Enables OpenTelemetry metrics (counters, histograms).
//! - `stdout`: Enables the stdout metrics exporter.
//!
//! ## Feature constraints
//!
//! - `stdout` requires `metrics`.
//!
//! ## Metrics behavior
//!
//! - Request rate, units in flight, unit failures, batch sizes and batch
//!   durations are exported if `metrics` is enabled.
//! - The recording helpers below compile to no-ops when `metrics` is
//!   disabled, so call sites stay unconditional.
//!
//! ## Example usage
//!
//! Enable metrics exported to stdout:
//!
//! ```bash
//! cargo run --features metrics,stdout
//! ```

// Disallow using `stdout` without `metrics`
#[cfg(all(feature = "stdout", not(feature = "metrics")))]
compile_error!("The 'stdout' feature requires 'metrics' to be enabled.");

// Core imports - always needed
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// Metrics-specific imports
#[cfg(feature = "metrics")]
use opentelemetry::InstrumentationScope;
#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::Resource;
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

pub struct TelemetryProviders {
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics()?;

    // Standard tracing logs printed to the console via
    // `tracing_subscriber::fmt`, unrelated to any metrics exporter.
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        );

    #[cfg(feature = "metrics")]
    {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let scope = InstrumentationScope::builder("strew")
            .with_version(env!("CARGO_PKG_VERSION"))
            .build();
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(meter);
    }

    registry.init();

    Ok(TelemetryProviders {
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(feature = "metrics")]
fn resource() -> Resource {
    Resource::builder().with_service_name("strew-server").build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> anyhow::Result<sdkmetrics::SdkMeterProvider> {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::MetricExporter;
        let exporter = MetricExporter::default();
        let reader = sdkmetrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();

        builder.with_reader(reader)
    };

    Ok(builder.build())
}

// Metric handles - only compiled when metrics feature is enabled
#[cfg(feature = "metrics")]
static REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static REQUEST_ERRORS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static UNITS_INFLIGHT: OnceLock<UpDownCounter<i64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static UNIT_FAILURES: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static UNITS_PER_BATCH: OnceLock<Histogram<f64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static BATCH_DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static QUEUE_REJECTIONS: OnceLock<Counter<u64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = REQUESTS.set(
        meter
            .u64_counter("requests")
            .with_description("Total dispatch requests")
            .build(),
    );

    let _ = REQUEST_ERRORS.set(
        meter
            .u64_counter("request_errors")
            .with_description("Requests answered with an error status")
            .build(),
    );

    let _ = UNITS_INFLIGHT.set(
        meter
            .i64_up_down_counter("units_inflight")
            .with_description("Work units currently dispatched")
            .build(),
    );

    let _ = UNIT_FAILURES.set(
        meter
            .u64_counter("unit_failures")
            .with_description("Work units that resolved with a failure")
            .build(),
    );

    let _ = UNITS_PER_BATCH.set(
        meter
            .f64_histogram("units_per_batch")
            .with_description("Work units per dispatched batch")
            .build(),
    );

    let _ = BATCH_DURATION_MS.set(
        meter
            .f64_histogram("batch_duration")
            .with_unit("ms")
            .with_description("End-to-end batch dispatch duration")
            .build(),
    );

    let _ = QUEUE_REJECTIONS.set(
        meter
            .u64_counter("queue_rejections")
            .with_description("Submissions refused because the queue was full")
            .build(),
    );
}

// Convenience functions that compile to no-ops when metrics are disabled
#[cfg(feature = "metrics")]
pub fn increment_requests() {
    if let Some(counter) = REQUESTS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_requests() {}

#[cfg(feature = "metrics")]
pub fn increment_request_errors() {
    if let Some(counter) = REQUEST_ERRORS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_request_errors() {}

#[cfg(feature = "metrics")]
pub fn increment_units_inflight(count: u64) {
    if let Some(counter) = UNITS_INFLIGHT.get() {
        counter.add(count as i64, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_units_inflight(_count: u64) {}

#[cfg(feature = "metrics")]
pub fn decrement_units_inflight(count: u64) {
    if let Some(counter) = UNITS_INFLIGHT.get() {
        counter.add(-(count as i64), &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn decrement_units_inflight(_count: u64) {}

#[cfg(feature = "metrics")]
pub fn increment_unit_failures() {
    if let Some(counter) = UNIT_FAILURES.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_unit_failures() {}

#[cfg(feature = "metrics")]
pub fn record_units_per_batch(count: f64) {
    if let Some(histogram) = UNITS_PER_BATCH.get() {
        histogram.record(count, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_units_per_batch(_count: f64) {}

#[cfg(feature = "metrics")]
pub fn record_batch_duration(duration_ms: f64) {
    if let Some(histogram) = BATCH_DURATION_MS.get() {
        histogram.record(duration_ms, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_batch_duration(_duration_ms: f64) {}

#[cfg(feature = "metrics")]
pub fn increment_queue_rejections() {
    if let Some(counter) = QUEUE_REJECTIONS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_queue_rejections() {}
