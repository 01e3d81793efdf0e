/// Prometheus counters for the upload/payment/job lifecycle
///
/// Registered against the default registry and scraped through the
/// /metrics endpoint.
use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, TextEncoder};

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!(
        "http_requests_total",
        "Total HTTP requests",
        &["method", "path", "status"]
    )
    .expect("valid metric opts for http_requests_total")
});

pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    prometheus::register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latency",
        &["method", "path", "status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("valid metric opts for http_request_duration_seconds")
});

pub static UPLOADS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!(
        "promptcut_uploads_completed_total",
        "Uploads confirmed and promoted to videos"
    )
    .expect("valid metric opts for promptcut_uploads_completed_total")
});

pub static QUOTES_PAID: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!(
        "promptcut_quotes_paid_total",
        "Payment quotes confirmed as paid"
    )
    .expect("valid metric opts for promptcut_quotes_paid_total")
});

pub static JOBS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!(
        "promptcut_jobs_created_total",
        "Edit jobs accepted and queued"
    )
    .expect("valid metric opts for promptcut_jobs_created_total")
});

pub static JOBS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!(
        "promptcut_jobs_completed_total",
        "Edit jobs that reached done"
    )
    .expect("valid metric opts for promptcut_jobs_completed_total")
});

pub static JOBS_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!(
        "promptcut_jobs_failed_total",
        "Edit jobs that reached failed"
    )
    .expect("valid metric opts for promptcut_jobs_failed_total")
});

pub static DOWNLOADS_ISSUED: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!(
        "promptcut_downloads_issued_total",
        "Presigned download URLs issued"
    )
    .expect("valid metric opts for promptcut_downloads_issued_total")
});

/// Render the default registry in the Prometheus text exposition format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::warn!(error = %e, "metrics encoding failed");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_and_render() {
        JOBS_CREATED.inc();
        let before = JOBS_CREATED.get();
        JOBS_CREATED.inc();
        assert_eq!(JOBS_CREATED.get(), before + 1);

        let text = gather();
        assert!(text.contains("promptcut_jobs_created_total"));
    }

    #[test]
    fn request_metrics_record_per_label() {
        let labels = ["GET", "/api/v1/jobs", "200"];
        let before = HTTP_REQUESTS_TOTAL.with_label_values(&labels).get();
        HTTP_REQUESTS_TOTAL.with_label_values(&labels).inc();
        HTTP_REQUEST_DURATION_SECONDS
            .with_label_values(&labels)
            .observe(0.01);
        assert_eq!(HTTP_REQUESTS_TOTAL.with_label_values(&labels).get(), before + 1);

        let text = gather();
        assert!(text.contains("http_request_duration_seconds"));
    }
}
