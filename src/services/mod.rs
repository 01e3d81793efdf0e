/// Service layer
///
/// Business logic for the upload/payment/job lifecycle:
/// - Upload service: reservation, validation, completion
/// - Billing service: quoting and payment confirmation
/// - Job service: the queued → processing → {done, failed} → expired
///   state machine
/// - Storage: presigned S3 access for the object-storage collaborator
/// - Engine: the execution-engine seam
pub mod billing;
pub mod engine;
pub mod jobs;
pub mod storage;
pub mod uploads;

pub use billing::BillingService;
pub use engine::{DetachedEngine, ExecutionEngine, MockEngine};
pub use jobs::JobService;
pub use uploads::UploadService;
