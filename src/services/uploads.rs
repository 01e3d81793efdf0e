/// Upload session service
///
/// Owns the reservation lifecycle: extension and size validation,
/// payment-requirement determination at init, and the uploaded
/// transition that creates the Video record exactly once.
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::{payment_repo, upload_repo, video_repo};
use crate::error::{AppError, Result};
use crate::models::{PaymentQuote, UploadSession, UploadStatus, Video};
use crate::services::billing;

/// Hard cap on a single upload: 2 GiB
pub const MAX_FILE_SIZE_BYTES: i64 = 2 * 1024 * 1024 * 1024;

/// Uploads above this size require payment; equal is free: 200 MiB
pub const PAYMENT_THRESHOLD_BYTES: i64 = 200 * 1024 * 1024;

/// Extensions accepted for source uploads
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["mp4", "mkv", "avi", "mov", "mpeg", "ogv", "webm"];

/// Lowercase the extension, strip a leading dot, and check it against the
/// supported set
pub fn normalize_extension(ext: &str) -> Result<String> {
    let normalized = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    if SUPPORTED_EXTENSIONS.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(AppError::UnsupportedExtension(ext.to_string()))
    }
}

/// Whether an upload of this size is gated on payment
pub fn requires_payment(size_bytes: i64) -> bool {
    size_bytes > PAYMENT_THRESHOLD_BYTES
}

/// Validate an init request; returns the normalized extension.
///
/// Checked in order: filename, positive size, extension, size cap.
fn validate_init(filename: &str, size_bytes: i64, ext: &str) -> Result<String> {
    if filename.is_empty() {
        return Err(AppError::BadRequest("filename is required".to_string()));
    }
    if size_bytes <= 0 {
        return Err(AppError::BadRequest(
            "size_bytes must be positive".to_string(),
        ));
    }
    let extension = normalize_extension(ext)?;
    if size_bytes > MAX_FILE_SIZE_BYTES {
        return Err(AppError::FileTooLarge(size_bytes));
    }
    Ok(extension)
}

/// Upload service for handling session operations
pub struct UploadService {
    pool: PgPool,
}

impl UploadService {
    /// Create a new UploadService
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reserve an upload session.
    ///
    /// Validates extension and size, computes the payment flag, and
    /// inserts the `reserved` session together with its pending quote
    /// (when one is owed) in a single transaction. The presigned write
    /// destination for the returned object key is issued by the caller
    /// through the storage collaborator.
    pub async fn init(
        &self,
        owner_id: Uuid,
        filename: &str,
        size_bytes: i64,
        ext: &str,
    ) -> Result<(UploadSession, Option<PaymentQuote>)> {
        let extension = validate_init(filename, size_bytes, ext)?;

        let session_id = Uuid::new_v4();
        let payment_required = requires_payment(size_bytes);
        let object_key = format!("uploads/{}/{}.{}", owner_id, session_id, extension);

        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        let session = sqlx::query_as::<_, UploadSession>(&format!(
            "INSERT INTO upload_sessions \
             (id, owner_id, filename, extension, size_bytes, payment_required, object_key, \
              status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'reserved', NOW(), NOW()) \
             RETURNING {}",
            upload_repo::SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(owner_id)
        .bind(filename)
        .bind(&extension)
        .bind(size_bytes)
        .bind(payment_required)
        .bind(&object_key)
        .fetch_one(tx.as_mut())
        .await?;

        let quote = if payment_required {
            let quote = sqlx::query_as::<_, PaymentQuote>(&format!(
                "INSERT INTO payment_quotes \
                 (id, session_id, amount_minor, currency, status, created_at) \
                 VALUES ($1, $2, $3, $4, 'pending', NOW()) \
                 RETURNING {}",
                payment_repo::QUOTE_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(session_id)
            .bind(billing::quote_amount_minor(size_bytes))
            .bind(billing::CURRENCY)
            .fetch_one(tx.as_mut())
            .await?;
            Some(quote)
        } else {
            None
        };

        tx.commit().await?;

        tracing::info!(
            session_id = %session.id,
            owner_id = %owner_id,
            size_bytes,
            payment_required,
            "upload session reserved"
        );

        Ok((session, quote))
    }

    /// Complete an upload session.
    ///
    /// The reported size must equal the size declared at init; a mismatch
    /// points at a tampered or partial transfer. On success the session
    /// transitions to `uploaded` and the Video record is created exactly
    /// once. Repeating the call with identical arguments returns the same
    /// Video.
    pub async fn complete(
        &self,
        owner_id: Uuid,
        session_id: Uuid,
        object_key: &str,
        size_bytes: i64,
    ) -> Result<(UploadSession, Video)> {
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        let session = sqlx::query_as::<_, UploadSession>(&format!(
            "SELECT {} FROM upload_sessions WHERE id = $1 FOR UPDATE",
            upload_repo::SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(tx.as_mut())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Upload session {} not found", session_id)))?;

        if session.owner_id != owner_id {
            return Err(AppError::Forbidden(
                "upload session belongs to another owner".to_string(),
            ));
        }
        if size_bytes != session.size_bytes {
            return Err(AppError::SizeMismatch {
                declared: session.size_bytes,
                reported: size_bytes,
            });
        }
        if object_key != session.object_key {
            return Err(AppError::BadRequest(
                "object_key does not match the reserved destination".to_string(),
            ));
        }

        if session.get_status() == UploadStatus::Uploaded {
            // Identical repeat of a completed session returns the same video
            let video = sqlx::query_as::<_, Video>(&format!(
                "SELECT {} FROM videos WHERE session_id = $1",
                video_repo::VIDEO_COLUMNS
            ))
            .bind(session_id)
            .fetch_one(tx.as_mut())
            .await?;
            tx.commit().await?;
            return Ok((session, video));
        }

        let session = sqlx::query_as::<_, UploadSession>(&format!(
            "UPDATE upload_sessions SET status = 'uploaded', updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            upload_repo::SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_one(tx.as_mut())
        .await?;

        let video = sqlx::query_as::<_, Video>(&format!(
            "INSERT INTO videos (id, owner_id, session_id, object_key, size_bytes, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) \
             RETURNING {}",
            video_repo::VIDEO_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(session_id)
        .bind(object_key)
        .bind(size_bytes)
        .fetch_one(tx.as_mut())
        .await?;

        tx.commit().await?;

        tracing::info!(
            session_id = %session.id,
            video_id = %video.id,
            "upload completed"
        );

        Ok((session, video))
    }

    /// Get a session by ID
    pub async fn get_session(&self, session_id: Uuid) -> Result<Option<UploadSession>> {
        upload_repo::get_session(&self.pool, session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extensions_normalize() {
        assert_eq!(normalize_extension("mp4").unwrap(), "mp4");
        assert_eq!(normalize_extension(".MOV").unwrap(), "mov");
        assert_eq!(normalize_extension("WebM").unwrap(), "webm");
    }

    #[test]
    fn unsupported_extensions_rejected() {
        for bad in ["avi2", "exe", "gif", ""] {
            assert!(matches!(
                normalize_extension(bad),
                Err(AppError::UnsupportedExtension(_))
            ));
        }
    }

    #[test]
    fn payment_threshold_is_exclusive() {
        assert!(!requires_payment(PAYMENT_THRESHOLD_BYTES));
        assert!(requires_payment(PAYMENT_THRESHOLD_BYTES + 1));
        assert!(!requires_payment(1));
    }

    #[test]
    fn size_constants_match_contract() {
        assert_eq!(MAX_FILE_SIZE_BYTES, 2 * 1024 * 1024 * 1024);
        assert_eq!(PAYMENT_THRESHOLD_BYTES, 200 * 1024 * 1024);
    }

    #[test]
    fn oversized_init_rejected() {
        let result = validate_init("clip.mp4", MAX_FILE_SIZE_BYTES + 1, "mp4");
        assert!(matches!(
            result,
            Err(AppError::FileTooLarge(size)) if size == MAX_FILE_SIZE_BYTES + 1
        ));
    }

    #[test]
    fn init_accepted_at_exactly_the_cap() {
        assert_eq!(
            validate_init("clip.mp4", MAX_FILE_SIZE_BYTES, "mp4").unwrap(),
            "mp4"
        );
    }

    #[test]
    fn empty_or_nonpositive_init_rejected() {
        assert!(matches!(
            validate_init("", 100, "mp4"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_init("clip.mp4", 0, "mp4"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_init("clip.mp4", -1, "mp4"),
            Err(AppError::BadRequest(_))
        ));
    }
}
