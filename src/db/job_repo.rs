/// Job repository - database operations for edit jobs
///
/// Terminal transitions are written as guarded updates: the WHERE clause
/// only matches non-terminal rows, so a duplicated result delivery or a
/// race with the expiry sweep becomes a no-op instead of a second write.
use crate::error::Result;
use crate::models::Job;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const JOB_COLUMNS: &str = "id, owner_id, video_id, directive_text, edit_plan, \
     status, error_message, download_key, created_at, completed_at, expires_at";

pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<Job>> {
    let job = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs WHERE id = $1",
        JOB_COLUMNS
    ))
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    Ok(job)
}

/// All jobs for one owner, newest first
pub async fn list_jobs(pool: &PgPool, owner_id: Uuid, limit: i64) -> Result<Vec<Job>> {
    let jobs = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs WHERE owner_id = $1 ORDER BY created_at DESC LIMIT $2",
        JOB_COLUMNS
    ))
    .bind(owner_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(jobs)
}

/// Move a queued job to processing. Returns None once the job left `queued`.
pub async fn mark_processing(pool: &PgPool, job_id: Uuid) -> Result<Option<Job>> {
    let job = sqlx::query_as::<_, Job>(&format!(
        "UPDATE jobs SET status = 'processing' \
         WHERE id = $1 AND status = 'queued' \
         RETURNING {}",
        JOB_COLUMNS
    ))
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    Ok(job)
}

/// Apply a successful processing result. Returns None if the job was
/// already terminal (idempotent repeat delivery).
pub async fn apply_done(
    pool: &PgPool,
    job_id: Uuid,
    download_key: &str,
    completed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<Option<Job>> {
    let job = sqlx::query_as::<_, Job>(&format!(
        "UPDATE jobs \
         SET status = 'done', download_key = $2, completed_at = $3, expires_at = $4 \
         WHERE id = $1 AND status IN ('queued', 'processing') \
         RETURNING {}",
        JOB_COLUMNS
    ))
    .bind(job_id)
    .bind(download_key)
    .bind(completed_at)
    .bind(expires_at)
    .fetch_optional(pool)
    .await?;

    Ok(job)
}

/// Apply a failed processing result. Returns None if the job was already
/// terminal (idempotent repeat delivery).
pub async fn apply_failed(
    pool: &PgPool,
    job_id: Uuid,
    error_message: &str,
    completed_at: DateTime<Utc>,
) -> Result<Option<Job>> {
    let job = sqlx::query_as::<_, Job>(&format!(
        "UPDATE jobs \
         SET status = 'failed', error_message = $2, completed_at = $3 \
         WHERE id = $1 AND status IN ('queued', 'processing') \
         RETURNING {}",
        JOB_COLUMNS
    ))
    .bind(job_id)
    .bind(error_message)
    .bind(completed_at)
    .fetch_optional(pool)
    .await?;

    Ok(job)
}

/// Lazily flip an overdue `done` job to `expired` at read time.
///
/// Expiry is one-way; the guard keeps a concurrent flip or sweep from
/// writing twice.
pub async fn expire_if_due(pool: &PgPool, job_id: Uuid) -> Result<Option<Job>> {
    let job = sqlx::query_as::<_, Job>(&format!(
        "UPDATE jobs SET status = 'expired' \
         WHERE id = $1 AND status = 'done' AND expires_at <= NOW() \
         RETURNING {}",
        JOB_COLUMNS
    ))
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    Ok(job)
}

/// Flip every overdue `done` job; used by the reclamation sweep only.
/// State-machine correctness never depends on this running.
pub async fn expire_overdue(pool: &PgPool) -> Result<Vec<Job>> {
    let jobs = sqlx::query_as::<_, Job>(&format!(
        "UPDATE jobs SET status = 'expired' \
         WHERE status = 'done' AND expires_at <= NOW() \
         RETURNING {}",
        JOB_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(jobs)
}
