/// Video repository - database operations for videos
use crate::error::Result;
use crate::models::Video;
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const VIDEO_COLUMNS: &str =
    "id, owner_id, session_id, object_key, size_bytes, created_at";

pub async fn get_video_for_session(pool: &PgPool, session_id: Uuid) -> Result<Option<Video>> {
    let video = sqlx::query_as::<_, Video>(&format!(
        "SELECT {} FROM videos WHERE session_id = $1",
        VIDEO_COLUMNS
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(video)
}
