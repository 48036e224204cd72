use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::MatchedPath;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use tracing::error;

/// Path label for requests no route matched, so arbitrary URIs cannot
/// create new series.
const UNMATCHED_PATH: &str = "unmatched";

/// Global metrics registry
static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// All application metrics
pub struct Metrics {
    // Webhook metrics
    pub webhook_total: IntCounterVec,
    pub scan_cycle_resets: IntCounter,
    pub updates_tracked: IntGauge,

    // Storage metrics
    pub store_save_duration: Histogram,

    // HTTP request metrics
    pub http_requests_total: IntCounterVec,
    pub http_request_duration: HistogramVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

impl Metrics {
    fn new(registry: &Registry) -> Self {
        // ── Webhook metrics ──────────────────────────────────────────
        let webhook_total = IntCounterVec::new(
            Opts::new("diun_webhook_total", "Total number of webhook notifications"),
            &["outcome"],
        )
        .expect("failed to create webhook_total metric");

        let scan_cycle_resets = IntCounter::new(
            "diun_scan_cycle_resets_total",
            "Number of times a new scan cycle discarded the previous updates",
        )
        .expect("failed to create scan_cycle_resets metric");

        let updates_tracked = IntGauge::new(
            "diun_updates_tracked",
            "Number of images in the current scan cycle",
        )
        .expect("failed to create updates_tracked metric");

        // ── Storage metrics ──────────────────────────────────────────
        let store_save_duration = Histogram::with_opts(
            HistogramOpts::new(
                "diun_store_save_duration_seconds",
                "Duration of update document saves",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )
        .expect("failed to create store_save_duration metric");

        // ── HTTP request metrics ─────────────────────────────────────
        let http_requests_total = IntCounterVec::new(
            Opts::new("diun_http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("failed to create http_requests_total metric");

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "diun_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
            &["method", "path"],
        )
        .expect("failed to create http_request_duration metric");

        // Register all metrics with the registry
        registry.register(Box::new(webhook_total.clone())).expect("register webhook_total");
        registry.register(Box::new(scan_cycle_resets.clone())).expect("register scan_cycle_resets");
        registry.register(Box::new(updates_tracked.clone())).expect("register updates_tracked");
        registry.register(Box::new(store_save_duration.clone())).expect("register store_save_duration");
        registry.register(Box::new(http_requests_total.clone())).expect("register http_requests_total");
        registry.register(Box::new(http_request_duration.clone())).expect("register http_request_duration");

        Self {
            webhook_total,
            scan_cycle_resets,
            updates_tracked,
            store_save_duration,
            http_requests_total,
            http_request_duration,
        }
    }
}

/// Get the global metrics instance, initializing on first call
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let registry = REGISTRY.get_or_init(Registry::new);
        Metrics::new(registry)
    })
}

/// Axum handler for GET /metrics — returns Prometheus text format
pub async fn handle_metrics() -> Response {
    // Ensure all metric collectors are registered on first call.
    let _ = metrics();
    let registry = REGISTRY.get_or_init(Registry::new);
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("failed to encode metrics: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response();
    }
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Axum middleware that records HTTP request count and duration.
pub async fn track_metrics(request: Request<axum::body::Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let m = metrics();
    m.http_requests_total
        .with_label_values(&[&method, &path, &status])
        .inc();
    m.http_request_duration
        .with_label_values(&[&method, &path])
        .observe(elapsed);

    response
}
