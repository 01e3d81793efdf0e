/// Upload handlers - HTTP endpoints for the upload session lifecycle
use actix_web::web;
use aws_sdk_s3::Client;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::video_repo;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::middleware::UserId;
use crate::models::{
    CompleteUploadRequest, CompleteUploadResponse, InitUploadRequest, InitUploadResponse,
    QuoteResponse, SessionStatusResponse,
};
use crate::services::{billing, storage, BillingService, UploadService};
use crate::Config;

/// Reserve an upload session and hand back a presigned write destination
pub async fn init_upload(
    pool: web::Data<PgPool>,
    s3_client: web::Data<Client>,
    config: web::Data<Config>,
    user: UserId,
    req: web::Json<InitUploadRequest>,
) -> Result<actix_web::HttpResponse> {
    let service = UploadService::new((**pool).clone());
    let (session, quote) = service
        .init(user.0, &req.filename, req.size_bytes, &req.ext)
        .await?;

    let upload_url = storage::generate_presigned_upload_url(
        s3_client.get_ref(),
        &config.s3,
        &session.object_key,
        storage::content_type_for(&session.extension),
    )
    .await?;

    Ok(actix_web::HttpResponse::Created().json(InitUploadResponse {
        session_id: session.id.to_string(),
        upload_url,
        object_key: session.object_key,
        payment_required: session.payment_required,
        quote: quote.map(QuoteResponse::from),
    }))
}

/// Confirm that the client finished writing to the reserved destination
pub async fn complete_upload(
    pool: web::Data<PgPool>,
    user: UserId,
    session_id: web::Path<String>,
    req: web::Json<CompleteUploadRequest>,
) -> Result<actix_web::HttpResponse> {
    let session_uuid = Uuid::parse_str(&session_id)
        .map_err(|_| AppError::BadRequest("Invalid session ID".to_string()))?;

    let service = UploadService::new((**pool).clone());
    let (session, video) = service
        .complete(user.0, session_uuid, &req.object_key, req.size_bytes)
        .await?;

    metrics::UPLOADS_COMPLETED.inc();

    Ok(actix_web::HttpResponse::Ok().json(CompleteUploadResponse {
        video_id: video.id.to_string(),
        payment_required: session.payment_required,
    }))
}

/// Session status, including the canonical checkout step
pub async fn get_session(
    pool: web::Data<PgPool>,
    user: UserId,
    session_id: web::Path<String>,
) -> Result<actix_web::HttpResponse> {
    let session_uuid = Uuid::parse_str(&session_id)
        .map_err(|_| AppError::BadRequest("Invalid session ID".to_string()))?;

    let service = UploadService::new((**pool).clone());
    let session = service
        .get_session(session_uuid)
        .await?
        .ok_or(AppError::NotFound("Upload session not found".to_string()))?;

    if session.owner_id != user.0 {
        return Err(AppError::Forbidden(
            "upload session belongs to another owner".to_string(),
        ));
    }

    let quote = BillingService::new((**pool).clone())
        .quote_for_session(session.id)
        .await?;
    let video = video_repo::get_video_for_session(pool.get_ref(), session.id).await?;

    let checkout_step = billing::checkout_step_for(
        session.get_status(),
        session.payment_required,
        quote.as_ref().map(|q| q.get_status()),
    );

    Ok(actix_web::HttpResponse::Ok().json(SessionStatusResponse {
        id: session.id.to_string(),
        filename: session.filename,
        size_bytes: session.size_bytes,
        payment_required: session.payment_required,
        status: session.status,
        checkout_step,
        quote: quote.map(QuoteResponse::from),
        video_id: video.map(|v| v.id.to_string()),
        created_at: session.created_at.timestamp(),
    }))
}
