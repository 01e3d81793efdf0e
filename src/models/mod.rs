/// Data models for promptcut-service
///
/// This module defines structures for:
/// - UploadSession: storage reservation and completion
/// - Video: the uploaded source object
/// - PaymentQuote: priced amount owed for processing an upload
/// - Job: the asynchronous edit job lifecycle
///
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ========================================
// Upload Session Models
// ========================================

/// Upload session status in the reservation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Reserved,
    Uploaded,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Uploaded => "uploaded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "reserved" => Some(Self::Reserved),
            "uploaded" => Some(Self::Uploaded),
            _ => None,
        }
    }
}

/// Upload session database entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UploadSession {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub extension: String,
    pub size_bytes: i64,
    pub payment_required: bool,
    pub object_key: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadSession {
    pub fn get_status(&self) -> UploadStatus {
        UploadStatus::from_str(&self.status).unwrap_or(UploadStatus::Reserved)
    }
}

/// Video database entity, created exactly once when a session completes
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Video {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub session_id: Uuid,
    pub object_key: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

// ========================================
// Payment Models
// ========================================

/// Payment quote status; pending transitions to paid exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Pending,
    Paid,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Payment quote database entity, bound to one upload session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentQuote {
    pub id: Uuid,
    pub session_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentQuote {
    pub fn get_status(&self) -> QuoteStatus {
        QuoteStatus::from_str(&self.status).unwrap_or(QuoteStatus::Pending)
    }
}

// ========================================
// Job Models
// ========================================

/// Job status in the processing lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Failed,
    Expired,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Terminal states never accept another processing result
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Expired)
    }
}

/// Edit job database entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub video_id: Uuid,
    pub directive_text: String,
    pub edit_plan: serde_json::Value,
    pub status: String,
    pub error_message: Option<String>,
    pub download_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn get_status(&self) -> JobStatus {
        JobStatus::from_str(&self.status).unwrap_or(JobStatus::Queued)
    }
}

/// Terminal outcome reported by the execution engine for one job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ProcessingOutcome {
    Done {
        /// Object key of the rendered output; the orchestrator derives one
        /// when the engine does not report it
        #[serde(default)]
        output_key: Option<String>,
    },
    Failed {
        error_message: String,
    },
}

// ========================================
// Checkout step derivation
// ========================================

/// Canonical client-facing step of the upload/payment/submit flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStep {
    Upload,
    Payment,
    Submit,
}

/// Derive the single canonical checkout step from lifecycle state.
///
/// Display state is derived here and nowhere else.
pub fn derive_checkout_step(
    payment_required: bool,
    payment_complete: bool,
    upload_complete: bool,
) -> CheckoutStep {
    if !upload_complete {
        CheckoutStep::Upload
    } else if payment_required && !payment_complete {
        CheckoutStep::Payment
    } else {
        CheckoutStep::Submit
    }
}

// ========================================
// Request/Response DTOs
// ========================================

/// Init upload request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitUploadRequest {
    pub filename: String,
    pub size_bytes: i64,
    pub ext: String,
}

/// Payment quote response DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
}

impl From<PaymentQuote> for QuoteResponse {
    fn from(quote: PaymentQuote) -> Self {
        Self {
            id: quote.id.to_string(),
            amount_minor: quote.amount_minor,
            currency: quote.currency,
            status: quote.status,
        }
    }
}

/// Init upload response: opaque write destination plus computed flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitUploadResponse {
    pub session_id: String,
    pub upload_url: String,
    pub object_key: String,
    pub payment_required: bool,
    pub quote: Option<QuoteResponse>,
}

/// Complete upload request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteUploadRequest {
    pub object_key: String,
    pub size_bytes: i64,
}

/// Complete upload response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteUploadResponse {
    pub video_id: String,
    pub payment_required: bool,
}

/// Upload session status response, including the canonical checkout step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub id: String,
    pub filename: String,
    pub size_bytes: i64,
    pub payment_required: bool,
    pub status: String,
    pub checkout_step: CheckoutStep,
    pub quote: Option<QuoteResponse>,
    /// Set once the upload has been completed
    pub video_id: Option<String>,
    pub created_at: i64,
}

/// Create job request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub video_id: String,
    pub directive_text: String,
}

/// Job response DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: String,
    pub video_id: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub expires_at: Option<i64>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id.to_string(),
            video_id: job.video_id.to_string(),
            status: job.status,
            error_message: job.error_message,
            created_at: job.created_at.timestamp(),
            completed_at: job.completed_at.map(|dt| dt.timestamp()),
            expires_at: job.expires_at.map(|dt| dt.timestamp()),
        }
    }
}

/// Download URL response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub download_url: String,
    pub expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Done,
            JobStatus::Failed,
            JobStatus::Expired,
        ] {
            assert_eq!(JobStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::from_str("bogus"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Expired.is_terminal());
    }

    #[test]
    fn checkout_step_before_upload_is_upload() {
        // Upload wins regardless of payment flags
        for required in [false, true] {
            for complete in [false, true] {
                assert_eq!(
                    derive_checkout_step(required, complete, false),
                    CheckoutStep::Upload
                );
            }
        }
    }

    #[test]
    fn checkout_step_after_upload() {
        assert_eq!(
            derive_checkout_step(true, false, true),
            CheckoutStep::Payment
        );
        assert_eq!(derive_checkout_step(true, true, true), CheckoutStep::Submit);
        assert_eq!(
            derive_checkout_step(false, false, true),
            CheckoutStep::Submit
        );
        assert_eq!(
            derive_checkout_step(false, true, true),
            CheckoutStep::Submit
        );
    }

    #[test]
    fn outcome_serialization_shape() {
        let done: ProcessingOutcome = serde_json::from_value(serde_json::json!({
            "outcome": "done",
            "output_key": "outputs/u/j.mp4"
        }))
        .unwrap();
        assert!(matches!(
            done,
            ProcessingOutcome::Done {
                output_key: Some(_)
            }
        ));

        let failed: ProcessingOutcome = serde_json::from_value(serde_json::json!({
            "outcome": "failed",
            "error_message": "source unreadable"
        }))
        .unwrap();
        assert!(matches!(failed, ProcessingOutcome::Failed { .. }));
    }
}
