/// Upload session repository - database operations for upload sessions
use crate::error::Result;
use crate::models::UploadSession;
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const SESSION_COLUMNS: &str = "id, owner_id, filename, extension, size_bytes, \
     payment_required, object_key, status, created_at, updated_at";

pub async fn get_session(pool: &PgPool, session_id: Uuid) -> Result<Option<UploadSession>> {
    let session = sqlx::query_as::<_, UploadSession>(&format!(
        "SELECT {} FROM upload_sessions WHERE id = $1",
        SESSION_COLUMNS
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(session)
}
