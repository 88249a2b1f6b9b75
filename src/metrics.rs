//! Prometheus metrics for the companion chat service.
//!
//! Exposes:
//! - `companion_chat_request_duration_seconds` (histogram)
//! - `companion_chat_request_total` (counter with status)
//! - `companion_chat_stage_fallback_total` (counter per degraded stage)
//! - `companion_chat_indexed_chunks` (gauge)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};
use tracing::{error, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Exponential buckets from 50ms up to ~1.5 minutes.
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 11).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "companion_chat_request_duration_seconds",
        "Chat request duration in seconds",
        &["route"],
        buckets
    )
    .expect("failed to register request duration histogram")
});

static REQUEST_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "companion_chat_request_total",
        "Total chat requests by outcome",
        &["route", "status"]
    )
    .expect("failed to register request counter")
});

static STAGE_FALLBACK_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "companion_chat_stage_fallback_total",
        "Pipeline stages that degraded to their fallback path",
        &["stage"]
    )
    .expect("failed to register stage fallback counter")
});

static INDEXED_CHUNKS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "companion_chat_indexed_chunks",
        "Number of chunks in the embedding index"
    )
    .expect("failed to register indexed chunks gauge")
});

/// Ensure collectors are registered.
pub fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&REQUEST_DURATION);
    Lazy::force(&REQUEST_TOTAL);
    Lazy::force(&STAGE_FALLBACK_TOTAL);
    Lazy::force(&INDEXED_CHUNKS);
}

/// Record one completed request. `status` is `ok`, `fallback` or `bad_request`.
pub fn record_request(route: &'static str, duration: Duration, status: &str) {
    init_collectors();
    REQUEST_DURATION
        .with_label_values(&[route])
        .observe(duration.as_secs_f64());
    REQUEST_TOTAL.with_label_values(&[route, status]).inc();
}

/// Record one degraded pipeline stage (history_read, rewrite, retrieve,
/// history_append).
pub fn record_stage_fallback(stage: &'static str) {
    init_collectors();
    STAGE_FALLBACK_TOTAL.with_label_values(&[stage]).inc();
}

/// Publish the size of the freshly built embedding index.
pub fn set_indexed_chunks(count: usize) {
    init_collectors();
    INDEXED_CHUNKS.set(count as i64);
}

/// Render all registered metrics in Prometheus text format.
pub async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Full::from("encode error"))
            .unwrap());
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(hyper::header::CONTENT_TYPE, encoder.format_type())
        .body(Full::from(buffer))
        .unwrap())
}
