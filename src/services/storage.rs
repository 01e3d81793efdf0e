/// S3 storage access for source uploads and rendered outputs
///
/// Clients never talk to the bucket with our credentials; every transfer
/// goes through a presigned URL scoped to one object key.
use crate::config::S3Config;
use crate::error::{AppError, Result};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use std::time::Duration;

/// Default presigned URL expiry time (15 minutes)
pub const DEFAULT_PRESIGNED_URL_EXPIRY_SECS: u64 = 900;

/// Initialize AWS S3 client with credentials from config
///
/// Falls back to the default credential chain when no explicit keys are
/// configured. A custom endpoint supports S3-compatible storage like MinIO.
pub async fn get_s3_client(config: &S3Config) -> Result<Client> {
    use aws_sdk_s3::config::Region;

    let mut aws_config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.region.clone()));

    if let (Some(access_key_id), Some(secret_access_key)) =
        (&config.access_key_id, &config.secret_access_key)
    {
        use aws_sdk_s3::config::Credentials;

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None, // No session token
            None, // No expiration
            "promptcut_service_s3",
        );

        aws_config_builder = aws_config_builder.credentials_provider(credentials);
    }

    if let Some(endpoint) = &config.endpoint {
        aws_config_builder = aws_config_builder.endpoint_url(endpoint);
    }

    let aws_config = aws_config_builder.load().await;

    Ok(Client::new(&aws_config))
}

/// Generate a presigned PUT URL for uploading a source video
///
/// The URL allows a single direct upload to the reserved object key
/// without exposing AWS credentials to the client. Expires after 15
/// minutes.
pub async fn generate_presigned_upload_url(
    client: &Client,
    config: &S3Config,
    object_key: &str,
    content_type: &str,
) -> Result<String> {
    let expires_in = Duration::from_secs(DEFAULT_PRESIGNED_URL_EXPIRY_SECS);
    let presigning_config = PresigningConfig::builder()
        .expires_in(expires_in)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to create presigning config: {e}")))?;

    let presigned_request = client
        .put_object()
        .bucket(&config.bucket)
        .key(object_key)
        .content_type(content_type)
        .presigned(presigning_config)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to generate presigned URL: {e}")))?;

    Ok(presigned_request.uri().to_string())
}

/// Generate a presigned GET URL for a rendered output
///
/// `ttl` is supplied by the caller so the URL never outlives the job's
/// download window.
pub async fn generate_presigned_download_url(
    client: &Client,
    config: &S3Config,
    object_key: &str,
    ttl: Duration,
) -> Result<String> {
    let presigning_config = PresigningConfig::builder()
        .expires_in(ttl)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to create presigning config: {e}")))?;

    let presigned_request = client
        .get_object()
        .bucket(&config.bucket)
        .key(object_key)
        .presigned(presigning_config)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to generate presigned URL: {e}")))?;

    Ok(presigned_request.uri().to_string())
}

/// Delete an object from S3
///
/// Used by the expiry sweep to reclaim rendered outputs whose download
/// window has closed.
pub async fn delete_object(client: &Client, config: &S3Config, object_key: &str) -> Result<()> {
    client
        .delete_object()
        .bucket(&config.bucket)
        .key(object_key)
        .send()
        .await
        .map_err(|e| {
            let error_msg = e.to_string();
            if error_msg.contains("403") || error_msg.contains("Forbidden") {
                AppError::Internal("S3 auth failed (403): Check AWS credentials".to_string())
            } else {
                AppError::Internal(format!("S3 delete failed: {}", e))
            }
        })?;

    Ok(())
}

/// Health check for S3 connectivity and bucket access
///
/// Uploads and downloads both depend on the bucket, so a failure here is
/// fatal at startup.
pub async fn health_check(client: &Client, config: &S3Config) -> Result<()> {
    match client
        .list_objects_v2()
        .bucket(&config.bucket)
        .max_keys(1)
        .send()
        .await
    {
        Ok(_) => {
            tracing::info!(
                bucket = %config.bucket,
                region = %config.region,
                "S3 connection validated"
            );
            Ok(())
        }
        Err(e) => {
            let error_msg = e.to_string();

            let guidance = if error_msg.contains("InvalidAccessKeyId") {
                "Invalid AWS Access Key ID. Check AWS_ACCESS_KEY_ID environment variable."
            } else if error_msg.contains("SignatureDoesNotMatch") {
                "Invalid AWS Secret Access Key. Check AWS_SECRET_ACCESS_KEY environment variable."
            } else if error_msg.contains("NoSuchBucket") {
                "Bucket does not exist. Check S3_BUCKET environment variable."
            } else if error_msg.contains("AccessDenied") {
                "Access denied to S3 bucket. Ensure IAM user/role has S3 permissions."
            } else {
                "S3 health check failed. Ensure S3 bucket is accessible and credentials are valid."
            };

            tracing::error!(
                bucket = %config.bucket,
                region = %config.region,
                error = %error_msg,
                guidance,
                "S3 health check failed"
            );

            Err(AppError::Internal(format!(
                "S3 health check failed: {}. {}",
                error_msg, guidance
            )))
        }
    }
}

/// MIME type sent with the presigned upload for a source extension
pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "mp4" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "mpeg" => "video/mpeg",
        "ogv" => "video/ogg",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}
