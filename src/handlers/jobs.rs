/// Job handlers - HTTP endpoints for edit job submission and retrieval
use actix_web::web;
use aws_sdk_s3::Client;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::models::{CreateJobRequest, DownloadResponse, JobResponse, ProcessingOutcome};
use crate::services::{jobs, storage, JobService};
use crate::Config;

/// Submit an edit job for an uploaded video
pub async fn create_job(
    service: web::Data<JobService>,
    user: UserId,
    req: web::Json<CreateJobRequest>,
) -> Result<actix_web::HttpResponse> {
    let video_uuid = Uuid::parse_str(&req.video_id)
        .map_err(|_| AppError::BadRequest("Invalid video ID".to_string()))?;

    let job = service.create(user.0, video_uuid, &req.directive_text).await?;

    Ok(actix_web::HttpResponse::Created().json(JobResponse::from(job)))
}

/// List the caller's jobs, newest first
pub async fn list_jobs(
    service: web::Data<JobService>,
    user: UserId,
) -> Result<actix_web::HttpResponse> {
    let jobs = service.list(user.0).await?;
    let responses: Vec<JobResponse> = jobs.into_iter().map(JobResponse::from).collect();

    Ok(actix_web::HttpResponse::Ok().json(responses))
}

/// Poll one job's status
pub async fn get_job(
    service: web::Data<JobService>,
    user: UserId,
    job_id: web::Path<String>,
) -> Result<actix_web::HttpResponse> {
    let job_uuid = Uuid::parse_str(&job_id)
        .map_err(|_| AppError::BadRequest("Invalid job ID".to_string()))?;

    let job = service.get(job_uuid, user.0).await?;

    Ok(actix_web::HttpResponse::Ok().json(JobResponse::from(job)))
}

/// Issue a presigned download URL for a finished job
pub async fn download_job(
    service: web::Data<JobService>,
    s3_client: web::Data<Client>,
    config: web::Data<Config>,
    user: UserId,
    job_id: web::Path<String>,
) -> Result<actix_web::HttpResponse> {
    let job_uuid = Uuid::parse_str(&job_id)
        .map_err(|_| AppError::BadRequest("Invalid job ID".to_string()))?;

    let (download_key, window_end) = service.authorize_download(job_uuid, user.0).await?;

    let ttl = jobs::download_url_ttl(Utc::now(), window_end);
    let download_url = storage::generate_presigned_download_url(
        s3_client.get_ref(),
        &config.s3,
        &download_key,
        ttl,
    )
    .await?;

    Ok(actix_web::HttpResponse::Ok().json(DownloadResponse {
        download_url,
        expires_at: window_end.timestamp(),
    }))
}

/// Internal callback where the execution engine reports a terminal
/// outcome. Not routed through the identity middleware; reachable only
/// from inside the deployment.
pub async fn job_result(
    service: web::Data<JobService>,
    job_id: web::Path<String>,
    outcome: web::Json<ProcessingOutcome>,
) -> Result<actix_web::HttpResponse> {
    let job_uuid = Uuid::parse_str(&job_id)
        .map_err(|_| AppError::BadRequest("Invalid job ID".to_string()))?;

    let job = service
        .on_processing_result(job_uuid, outcome.into_inner())
        .await?;

    Ok(actix_web::HttpResponse::Ok().json(JobResponse::from(job)))
}
