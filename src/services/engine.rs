/// Execution engine seam
///
/// The engine renders an edit plan against the source object and reports
/// a terminal outcome. Submission must not block the request path; real
/// engines acknowledge the handoff and report back later through the
/// internal result endpoint.
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::db::job_repo;
use crate::directive::EditPlan;
use crate::error::Result;
use crate::metrics;
use crate::models::{Job, Video};
use crate::services::jobs::download_expiry;

#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Accept a queued job for rendering. Returns once the handoff is
    /// acknowledged, never once the render finishes.
    async fn submit(&self, job: &Job, plan: &EditPlan, source: &Video) -> Result<()>;
}

/// In-process stand-in for the rendering cluster.
///
/// Walks the job through processing and into done on a background task,
/// exercising the full state machine without real media work.
pub struct MockEngine {
    pool: PgPool,
    render_delay: Duration,
}

impl MockEngine {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            render_delay: Duration::from_secs(2),
        }
    }

    fn output_key(job_id: Uuid, owner_id: Uuid, plan: &EditPlan) -> String {
        format!("outputs/{}/{}.{}", owner_id, job_id, plan.output_format.as_str())
    }
}

#[async_trait]
impl ExecutionEngine for MockEngine {
    async fn submit(&self, job: &Job, plan: &EditPlan, source: &Video) -> Result<()> {
        let pool = self.pool.clone();
        let delay = self.render_delay;
        let job_id = job.id;
        let output_key = Self::output_key(job.id, job.owner_id, plan);
        let segment_count = plan.segments.len();
        let source_key = source.object_key.clone();

        tokio::spawn(async move {
            tracing::info!(
                job_id = %job_id,
                source_key = %source_key,
                segment_count,
                "mock render started"
            );

            match job_repo::mark_processing(&pool, job_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    // Job left `queued` before we picked it up; nothing to do
                    tracing::debug!(job_id = %job_id, "mock render skipped, job not queued");
                    return;
                }
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "mock render transition failed");
                    return;
                }
            }

            tokio::time::sleep(delay).await;

            let completed_at = Utc::now();
            match job_repo::apply_done(
                &pool,
                job_id,
                &output_key,
                completed_at,
                download_expiry(completed_at),
            )
            .await
            {
                Ok(Some(_)) => {
                    metrics::JOBS_COMPLETED.inc();
                    tracing::info!(job_id = %job_id, output_key = %output_key, "mock render done");
                }
                Ok(None) => {
                    tracing::debug!(job_id = %job_id, "mock render result dropped, job already terminal");
                }
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "mock render completion failed");
                }
            }
        });

        Ok(())
    }
}

/// Engine stub for deployments where rendering runs out of process.
///
/// Jobs stay `queued` until the external workers pull them and report
/// outcomes through the internal result endpoint.
pub struct DetachedEngine;

#[async_trait]
impl ExecutionEngine for DetachedEngine {
    async fn submit(&self, job: &Job, plan: &EditPlan, source: &Video) -> Result<()> {
        tracing::info!(
            job_id = %job.id,
            source_key = %source.object_key,
            segment_count = plan.segments.len(),
            "job handed off to external workers"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive;

    #[test]
    fn output_key_reflects_plan_format() {
        let plan = directive::parse("Keep: 00:00-00:30. Output: webm").unwrap();
        let job_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        let key = MockEngine::output_key(job_id, owner_id, &plan);
        assert_eq!(key, format!("outputs/{}/{}.webm", owner_id, job_id));
    }

    #[test]
    fn detached_engine_acknowledges_without_processing() {
        let owner_id = Uuid::new_v4();
        let plan = directive::parse("Keep: 00:00-00:30").unwrap();
        let video = Video {
            id: Uuid::new_v4(),
            owner_id,
            session_id: Uuid::new_v4(),
            object_key: "uploads/u/s.mp4".to_string(),
            size_bytes: 1024,
            created_at: Utc::now(),
        };
        let job = Job {
            id: Uuid::new_v4(),
            owner_id,
            video_id: video.id,
            directive_text: "Keep: 00:00-00:30".to_string(),
            edit_plan: serde_json::to_value(&plan).unwrap(),
            status: "queued".to_string(),
            error_message: None,
            download_key: None,
            created_at: Utc::now(),
            completed_at: None,
            expires_at: None,
        };

        tokio_test::block_on(DetachedEngine.submit(&job, &plan, &video)).unwrap();
    }
}
