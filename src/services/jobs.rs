/// Job orchestrator
///
/// Drives the queued → processing → {done, failed} state machine, with
/// the time-triggered done → expired transition evaluated lazily at read
/// time. Creation compiles the directive, checks the upload/payment
/// preconditions and inserts the queued row in one transaction, then
/// hands the plan to the execution engine.
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::{job_repo, payment_repo, upload_repo, video_repo};
use crate::directive;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    Job, JobStatus, PaymentQuote, ProcessingOutcome, QuoteStatus, UploadSession, UploadStatus,
    Video,
};
use crate::services::engine::ExecutionEngine;

/// Days a completed job's download stays retrievable
pub const DOWNLOAD_VALIDITY_DAYS: i64 = 7;

/// Ceiling on a single presigned download URL (15 minutes)
pub const MAX_DOWNLOAD_URL_TTL_SECS: i64 = 900;

/// Jobs returned by a list call
const LIST_LIMIT: i64 = 20;

/// When the download window closes for a job completed at `completed_at`
pub fn download_expiry(completed_at: DateTime<Utc>) -> DateTime<Utc> {
    completed_at + Duration::days(DOWNLOAD_VALIDITY_DAYS)
}

/// Lifetime for one presigned URL: the remaining window, capped
pub fn download_url_ttl(now: DateTime<Utc>, expires_at: DateTime<Utc>) -> std::time::Duration {
    let remaining = (expires_at - now).num_seconds().max(0);
    std::time::Duration::from_secs(remaining.min(MAX_DOWNLOAD_URL_TTL_SECS) as u64)
}

/// Outcome of the download-readiness check for a job row at time `now`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadDecision {
    Ready {
        download_key: String,
        expires_at: DateTime<Utc>,
    },
    NotReady,
    Expired,
}

/// Decide download availability from a single consistent read of the job
/// row plus a wall-clock comparison
pub fn download_decision(job: &Job, now: DateTime<Utc>) -> DownloadDecision {
    match job.get_status() {
        JobStatus::Done => match (&job.download_key, job.expires_at) {
            (Some(key), Some(expires_at)) if now < expires_at => DownloadDecision::Ready {
                download_key: key.clone(),
                expires_at,
            },
            (_, Some(_)) => DownloadDecision::Expired,
            _ => DownloadDecision::NotReady,
        },
        JobStatus::Expired => DownloadDecision::Expired,
        _ => DownloadDecision::NotReady,
    }
}

/// Check the submission preconditions against one consistent snapshot of
/// the video, its session, the quote (when one is owed), and the count of
/// active jobs. Evaluated in order: ownership, upload state, payment,
/// duplicate submission.
fn check_submission(
    owner_id: Uuid,
    video: &Video,
    session: &UploadSession,
    quote: Option<&PaymentQuote>,
    active_jobs: i64,
) -> Result<()> {
    if video.owner_id != owner_id {
        return Err(AppError::Forbidden(
            "video belongs to another owner".to_string(),
        ));
    }
    if session.get_status() != UploadStatus::Uploaded {
        return Err(AppError::VideoNotUploaded(video.id));
    }
    if session.payment_required && quote.map(|q| q.get_status()) != Some(QuoteStatus::Paid) {
        return Err(AppError::PaymentRequired(video.id));
    }
    if active_jobs > 0 {
        return Err(AppError::DuplicateSubmission(video.id));
    }
    Ok(())
}

/// Terminal write implied by an engine outcome
#[derive(Debug, Clone, PartialEq, Eq)]
enum OutcomeTransition {
    Done { download_key: String },
    Failed { error_message: String },
}

/// Resolve an engine outcome against the job's current state. Returns
/// None when the job is already terminal, which makes a repeat delivery
/// a no-op.
fn outcome_transition(job: &Job, outcome: ProcessingOutcome) -> Option<OutcomeTransition> {
    if job.get_status().is_terminal() {
        return None;
    }
    Some(match outcome {
        ProcessingOutcome::Done { output_key } => OutcomeTransition::Done {
            download_key: output_key.unwrap_or_else(|| default_output_key(job)),
        },
        ProcessingOutcome::Failed { error_message } => {
            OutcomeTransition::Failed { error_message }
        }
    })
}

/// Object key for a rendered output when the engine does not name one
fn default_output_key(job: &Job) -> String {
    let ext = job
        .edit_plan
        .get("output_format")
        .and_then(|v| v.as_str())
        .unwrap_or("mp4")
        .to_string();
    format!("outputs/{}/{}.{}", job.owner_id, job.id, ext)
}

/// Job service for orchestrating edit jobs
pub struct JobService {
    pool: PgPool,
    engine: Arc<dyn ExecutionEngine>,
}

impl JobService {
    /// Create a new JobService
    pub fn new(pool: PgPool, engine: Arc<dyn ExecutionEngine>) -> Self {
        Self { pool, engine }
    }

    /// Create a job for an uploaded video from directive text.
    ///
    /// The directive is compiled first; parser errors propagate verbatim.
    /// The four preconditions (video exists and is owned, session
    /// uploaded, quote paid when owed, no active job for the video) are
    /// evaluated and the queued row inserted inside one transaction,
    /// serialized per video by a row lock so concurrent submissions
    /// cannot both pass the duplicate check.
    pub async fn create(&self, owner_id: Uuid, video_id: Uuid, directive_text: &str) -> Result<Job> {
        let plan = directive::parse(directive_text)?;

        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        let video = sqlx::query_as::<_, Video>(&format!(
            "SELECT {} FROM videos WHERE id = $1 FOR UPDATE",
            video_repo::VIDEO_COLUMNS
        ))
        .bind(video_id)
        .fetch_optional(tx.as_mut())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

        let session = sqlx::query_as::<_, UploadSession>(&format!(
            "SELECT {} FROM upload_sessions WHERE id = $1",
            upload_repo::SESSION_COLUMNS
        ))
        .bind(video.session_id)
        .fetch_one(tx.as_mut())
        .await?;

        let quote = if session.payment_required {
            sqlx::query_as::<_, PaymentQuote>(&format!(
                "SELECT {} FROM payment_quotes WHERE session_id = $1",
                payment_repo::QUOTE_COLUMNS
            ))
            .bind(session.id)
            .fetch_optional(tx.as_mut())
            .await?
        } else {
            None
        };

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE video_id = $1 AND status IN ('queued', 'processing')",
        )
        .bind(video_id)
        .fetch_one(tx.as_mut())
        .await?;

        check_submission(owner_id, &video, &session, quote.as_ref(), active)?;

        let job = sqlx::query_as::<_, Job>(&format!(
            "INSERT INTO jobs \
             (id, owner_id, video_id, directive_text, edit_plan, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, 'queued', NOW()) \
             RETURNING {}",
            job_repo::JOB_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(video_id)
        .bind(directive_text)
        .bind(serde_json::to_value(&plan)?)
        .fetch_one(tx.as_mut())
        .await?;

        tx.commit().await?;

        metrics::JOBS_CREATED.inc();
        tracing::info!(job_id = %job.id, video_id = %video_id, "job queued");

        // Hand off to the execution engine; it reports back through
        // on_processing_result and never blocks this call
        self.engine.submit(&job, &plan, &video).await?;

        Ok(job)
    }

    /// Record the terminal outcome reported by the execution engine.
    ///
    /// A repeat delivery for a job already in a terminal state is a no-op;
    /// the stored state and side effects stay unchanged.
    pub async fn on_processing_result(
        &self,
        job_id: Uuid,
        outcome: ProcessingOutcome,
    ) -> Result<Job> {
        let job = job_repo::get_job(&self.pool, job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

        let Some(transition) = outcome_transition(&job, outcome) else {
            tracing::debug!(job_id = %job_id, status = %job.status, "duplicate result ignored");
            return Ok(job);
        };

        let updated = match transition {
            OutcomeTransition::Done { download_key } => {
                let completed_at = Utc::now();
                let applied = job_repo::apply_done(
                    &self.pool,
                    job_id,
                    &download_key,
                    completed_at,
                    download_expiry(completed_at),
                )
                .await?;
                if applied.is_some() {
                    metrics::JOBS_COMPLETED.inc();
                    tracing::info!(job_id = %job_id, "job done");
                }
                applied
            }
            OutcomeTransition::Failed { error_message } => {
                let applied =
                    job_repo::apply_failed(&self.pool, job_id, &error_message, Utc::now()).await?;
                if applied.is_some() {
                    metrics::JOBS_FAILED.inc();
                    tracing::warn!(job_id = %job_id, error = %error_message, "job failed");
                }
                applied
            }
        };

        // None means another delivery won the guarded update; re-read
        match updated {
            Some(job) => Ok(job),
            None => job_repo::get_job(&self.pool, job_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id))),
        }
    }

    /// Read one job, applying the lazy done → expired transition
    pub async fn get(&self, job_id: Uuid, requester: Uuid) -> Result<Job> {
        let job = job_repo::get_job(&self.pool, job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

        if job.owner_id != requester {
            return Err(AppError::Forbidden("job belongs to another owner".to_string()));
        }

        if let DownloadDecision::Expired = download_decision(&job, Utc::now()) {
            if job.get_status() == JobStatus::Done {
                if let Some(expired) = job_repo::expire_if_due(&self.pool, job_id).await? {
                    return Ok(expired);
                }
            }
        }

        Ok(job)
    }

    /// Authorize a download: ownership, readiness, and the expiry window.
    ///
    /// Returns the output key and the window end on success; flips the job
    /// to `expired` (one-way) when the window has closed.
    pub async fn authorize_download(
        &self,
        job_id: Uuid,
        requester: Uuid,
    ) -> Result<(String, DateTime<Utc>)> {
        let job = job_repo::get_job(&self.pool, job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

        if job.owner_id != requester {
            return Err(AppError::Forbidden("job belongs to another owner".to_string()));
        }

        match download_decision(&job, Utc::now()) {
            DownloadDecision::Ready {
                download_key,
                expires_at,
            } => {
                metrics::DOWNLOADS_ISSUED.inc();
                Ok((download_key, expires_at))
            }
            DownloadDecision::NotReady => Err(AppError::NotReady(format!(
                "job {} is {}",
                job_id, job.status
            ))),
            DownloadDecision::Expired => {
                if job.get_status() == JobStatus::Done {
                    job_repo::expire_if_due(&self.pool, job_id).await?;
                }
                Err(AppError::Gone(format!(
                    "download window for job {} has closed",
                    job_id
                )))
            }
        }
    }

    /// All jobs for an owner, newest first
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Job>> {
        job_repo::list_jobs(&self.pool, owner_id, LIST_LIMIT).await
    }
}

/// Periodic reclamation sweep: flips overdue jobs and reports their
/// output keys for storage cleanup. Correctness of reads never depends
/// on this running; expiry is also applied lazily at read time.
pub async fn run_expiry_sweep(pool: &PgPool) -> Result<Vec<Job>> {
    let expired = job_repo::expire_overdue(pool).await?;
    if !expired.is_empty() {
        tracing::info!(count = expired.len(), "expired overdue jobs");
    }
    Ok(expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job_with(status: &str, completed_at: Option<DateTime<Utc>>) -> Job {
        let completed = completed_at.unwrap_or_else(Utc::now);
        Job {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            video_id: Uuid::new_v4(),
            directive_text: "Keep: 00:00-00:30".to_string(),
            edit_plan: json!({"output_format": "mp4"}),
            status: status.to_string(),
            error_message: None,
            download_key: Some("outputs/u/j.mp4".to_string()),
            created_at: completed - Duration::minutes(5),
            completed_at,
            expires_at: completed_at.map(download_expiry),
        }
    }

    #[test]
    fn expiry_is_seven_days_after_completion() {
        let completed = Utc::now();
        assert_eq!(download_expiry(completed) - completed, Duration::days(7));
    }

    #[test]
    fn download_ready_inside_window() {
        let now = Utc::now();
        let job = job_with("done", Some(now - Duration::days(6)));
        match download_decision(&job, now) {
            DownloadDecision::Ready { download_key, .. } => {
                assert_eq!(download_key, "outputs/u/j.mp4");
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn download_gone_at_and_after_expiry() {
        let now = Utc::now();
        let job = job_with("done", Some(now - Duration::days(7)));
        // expires_at == now: the boundary itself is already closed
        assert_eq!(download_decision(&job, now), DownloadDecision::Expired);

        let job = job_with("done", Some(now - Duration::days(8)));
        assert_eq!(download_decision(&job, now), DownloadDecision::Expired);
    }

    #[test]
    fn download_not_ready_before_completion() {
        let now = Utc::now();
        for status in ["queued", "processing", "failed"] {
            let mut job = job_with(status, None);
            job.download_key = None;
            job.completed_at = None;
            job.expires_at = None;
            assert_eq!(download_decision(&job, now), DownloadDecision::NotReady);
        }
    }

    #[test]
    fn expired_status_maps_to_expired() {
        let now = Utc::now();
        let job = job_with("expired", Some(now - Duration::days(8)));
        assert_eq!(download_decision(&job, now), DownloadDecision::Expired);
    }

    #[test]
    fn url_ttl_is_clamped_to_the_window() {
        let now = Utc::now();
        // Plenty of window left: capped at the presign ceiling
        assert_eq!(
            download_url_ttl(now, now + Duration::days(3)),
            std::time::Duration::from_secs(MAX_DOWNLOAD_URL_TTL_SECS as u64)
        );
        // Less window than the ceiling: only the remainder
        assert_eq!(
            download_url_ttl(now, now + Duration::seconds(30)),
            std::time::Duration::from_secs(30)
        );
        // Closed window never yields a negative lifetime
        assert_eq!(
            download_url_ttl(now, now - Duration::seconds(30)),
            std::time::Duration::from_secs(0)
        );
    }

    fn video_owned_by(owner_id: Uuid) -> Video {
        Video {
            id: Uuid::new_v4(),
            owner_id,
            session_id: Uuid::new_v4(),
            object_key: "uploads/u/s.mp4".to_string(),
            size_bytes: 300 * 1024 * 1024,
            created_at: Utc::now(),
        }
    }

    fn session_for(video: &Video, status: &str, payment_required: bool) -> UploadSession {
        UploadSession {
            id: video.session_id,
            owner_id: video.owner_id,
            filename: "clip.mp4".to_string(),
            extension: "mp4".to_string(),
            size_bytes: video.size_bytes,
            payment_required,
            object_key: video.object_key.clone(),
            status: status.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn quote_with(session: &UploadSession, status: &str) -> PaymentQuote {
        PaymentQuote {
            id: Uuid::new_v4(),
            session_id: session.id,
            amount_minor: 4900,
            currency: "INR".to_string(),
            status: status.to_string(),
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    #[test]
    fn submission_rejected_for_foreign_video() {
        let video = video_owned_by(Uuid::new_v4());
        let session = session_for(&video, "uploaded", false);
        let result = check_submission(Uuid::new_v4(), &video, &session, None, 0);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn submission_rejected_before_upload_completes() {
        let video = video_owned_by(Uuid::new_v4());
        let session = session_for(&video, "reserved", false);
        let result = check_submission(video.owner_id, &video, &session, None, 0);
        assert!(matches!(result, Err(AppError::VideoNotUploaded(id)) if id == video.id));
    }

    #[test]
    fn submission_gated_until_quote_is_paid() {
        let video = video_owned_by(Uuid::new_v4());
        let session = session_for(&video, "uploaded", true);

        // A pending quote still blocks submission
        let pending = quote_with(&session, "pending");
        let result = check_submission(video.owner_id, &video, &session, Some(&pending), 0);
        assert!(matches!(result, Err(AppError::PaymentRequired(id)) if id == video.id));

        // So does a session that owes a quote but has none recorded
        let result = check_submission(video.owner_id, &video, &session, None, 0);
        assert!(matches!(result, Err(AppError::PaymentRequired(_))));

        // Once paid the same snapshot passes
        let paid = quote_with(&session, "paid");
        assert!(check_submission(video.owner_id, &video, &session, Some(&paid), 0).is_ok());
    }

    #[test]
    fn free_uploads_skip_the_payment_gate() {
        let video = video_owned_by(Uuid::new_v4());
        let session = session_for(&video, "uploaded", false);
        assert!(check_submission(video.owner_id, &video, &session, None, 0).is_ok());
    }

    #[test]
    fn active_job_blocks_resubmission() {
        let video = video_owned_by(Uuid::new_v4());
        let session = session_for(&video, "uploaded", false);
        let result = check_submission(video.owner_id, &video, &session, None, 1);
        assert!(matches!(result, Err(AppError::DuplicateSubmission(id)) if id == video.id));
    }

    #[test]
    fn repeat_delivery_to_terminal_job_is_dropped() {
        let now = Utc::now();
        for status in ["done", "failed", "expired"] {
            let job = job_with(status, Some(now - Duration::minutes(1)));
            let transition = outcome_transition(
                &job,
                ProcessingOutcome::Done {
                    output_key: Some("outputs/u/other.mp4".to_string()),
                },
            );
            assert_eq!(transition, None, "delivery to {} job must be a no-op", status);

            let transition = outcome_transition(
                &job,
                ProcessingOutcome::Failed {
                    error_message: "late failure".to_string(),
                },
            );
            assert_eq!(transition, None);
        }
    }

    #[test]
    fn outcome_resolves_for_in_flight_jobs() {
        let mut job = job_with("processing", None);
        job.completed_at = None;
        job.expires_at = None;
        job.download_key = None;

        let transition = outcome_transition(
            &job,
            ProcessingOutcome::Done {
                output_key: Some("outputs/custom/key.mp4".to_string()),
            },
        );
        assert_eq!(
            transition,
            Some(OutcomeTransition::Done {
                download_key: "outputs/custom/key.mp4".to_string()
            })
        );

        // No key reported: the orchestrator derives the default
        let transition = outcome_transition(&job, ProcessingOutcome::Done { output_key: None });
        match transition {
            Some(OutcomeTransition::Done { download_key }) => {
                assert_eq!(download_key, default_output_key(&job));
            }
            other => panic!("expected Done transition, got {:?}", other),
        }

        let transition = outcome_transition(
            &job,
            ProcessingOutcome::Failed {
                error_message: "codec unsupported".to_string(),
            },
        );
        assert_eq!(
            transition,
            Some(OutcomeTransition::Failed {
                error_message: "codec unsupported".to_string()
            })
        );
    }

    #[test]
    fn default_output_key_uses_plan_format() {
        let mut job = job_with("queued", None);
        job.edit_plan = json!({"output_format": "webm"});
        let key = default_output_key(&job);
        assert!(key.starts_with(&format!("outputs/{}/", job.owner_id)));
        assert!(key.ends_with(".webm"));

        job.edit_plan = json!({});
        assert!(default_output_key(&job).ends_with(".mp4"));
    }
}
