//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (batches, transfers, previews)
//! - Image processing (validation, optimization, CDN hand-off)
//! - External services (gateway, CDN)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Orchestrator Metrics
// =============================================================================

/// Batches submitted by outcome.
pub static BATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("squeeze_batches_total", "Total upload batches submitted"),
        &["result"], // "accepted", "truncated", "partial", "rejected"
    )
    .unwrap()
});

/// Transfers finished by result.
pub static TRANSFERS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("squeeze_transfers_total", "Total upload transfers finished"),
        &["result"], // "complete", "error", "discarded"
    )
    .unwrap()
});

/// Transfer duration in seconds (gateway round trip).
pub static TRANSFER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "squeeze_transfer_duration_seconds",
            "Duration of upload transfers",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["result"],
    )
    .unwrap()
});

/// Transfers currently waiting on the gateway.
pub static TRANSFERS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "squeeze_transfers_in_flight",
        "Number of gateway calls currently outstanding",
    )
    .unwrap()
});

/// Preview handles not yet released.
pub static PREVIEWS_OUTSTANDING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "squeeze_previews_outstanding",
        "Number of preview handles not yet released",
    )
    .unwrap()
});

// =============================================================================
// Processing Metrics
// =============================================================================

/// Images handled by the processing endpoint, by result.
pub static IMAGES_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("squeeze_images_processed_total", "Total images handled"),
        &["result"], // "success", "rejected", "failed"
    )
    .unwrap()
});

/// Rejections by code.
pub static IMAGE_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "squeeze_image_rejections_total",
            "Total images rejected by validation",
        ),
        &["code"],
    )
    .unwrap()
});

/// Optimization duration in seconds.
pub static OPTIMIZATION_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "squeeze_optimization_duration_seconds",
            "Duration of decode, resize and encode",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )
    .unwrap()
});

/// Bytes received in source images.
pub static BYTES_IN: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("squeeze_bytes_in_total", "Total source image bytes received").unwrap()
});

/// Bytes produced as optimized images.
pub static BYTES_OUT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("squeeze_bytes_out_total", "Total optimized image bytes produced").unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "squeeze_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "squeeze_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Orchestrator
        Box::new(BATCHES_TOTAL.clone()),
        Box::new(TRANSFERS_TOTAL.clone()),
        Box::new(TRANSFER_DURATION.clone()),
        Box::new(TRANSFERS_IN_FLIGHT.clone()),
        Box::new(PREVIEWS_OUTSTANDING.clone()),
        // Processing
        Box::new(IMAGES_PROCESSED.clone()),
        Box::new(IMAGE_REJECTIONS.clone()),
        Box::new(OPTIMIZATION_DURATION.clone()),
        Box::new(BYTES_IN.clone()),
        Box::new(BYTES_OUT.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
