/// HTTP handlers for the upload, billing, and job endpoints
///
/// - Uploads: reserve, complete, and inspect upload sessions
/// - Billing: price previews and payment confirmation
/// - Jobs: submit directives, poll status, fetch downloads, and the
///   internal engine callback
pub mod billing;
pub mod jobs;
pub mod uploads;

pub use billing::{confirm_quote, preview_quote};
pub use jobs::{create_job, download_job, get_job, job_result, list_jobs};
pub use uploads::{complete_upload, get_session, init_upload};

use actix_web::HttpResponse;

use crate::metrics;

/// Liveness probe
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

/// Prometheus scrape endpoint
pub async fn metrics_endpoint() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::gather())
}
