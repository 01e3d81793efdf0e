/// Database access layer
///
/// Single-statement operations live here; multi-statement transactional
/// flows (upload completion, checked job creation) live in the service
/// layer next to the logic that owns them.
pub mod job_repo;
pub mod payment_repo;
pub mod upload_repo;
pub mod video_repo;
