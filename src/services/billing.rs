/// Billing service
///
/// Quoting is a pure function of the declared size; quotes are created by
/// the upload service at init time and confirmed here. The payment
/// processor itself is an external collaborator: its confirmation
/// callback lands on `mark_paid`, which tolerates duplicate delivery.
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::payment_repo;
use crate::error::{AppError, Result};
use crate::models::{CheckoutStep, PaymentQuote, QuoteStatus, UploadStatus};

/// All quotes are denominated in INR, stored in minor units (paise)
pub const CURRENCY: &str = "INR";

const MIB: i64 = 1024 * 1024;

/// Tiered one-time price for processing an upload of the given size
pub fn quote_amount_minor(size_bytes: i64) -> i64 {
    if size_bytes <= 500 * MIB {
        4900
    } else if size_bytes <= 1000 * MIB {
        9900
    } else {
        14900
    }
}

/// Billing service for quote operations
pub struct BillingService {
    pool: PgPool,
}

impl BillingService {
    /// Create a new BillingService
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Confirm payment of a quote. Idempotent: confirming an already-paid
    /// quote is a no-op success.
    pub async fn mark_paid(&self, owner_id: Uuid, quote_id: Uuid) -> Result<PaymentQuote> {
        let quote = payment_repo::get_quote(&self.pool, quote_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quote {} not found", quote_id)))?;

        let session = crate::db::upload_repo::get_session(&self.pool, quote.session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Upload session not found".to_string()))?;
        if session.owner_id != owner_id {
            return Err(AppError::Forbidden(
                "quote belongs to another owner".to_string(),
            ));
        }

        let quote = payment_repo::mark_paid(&self.pool, quote_id).await?;
        tracing::info!(quote_id = %quote.id, session_id = %quote.session_id, "quote paid");
        Ok(quote)
    }

    /// Quote bound to an upload session, if the session owes one
    pub async fn quote_for_session(&self, session_id: Uuid) -> Result<Option<PaymentQuote>> {
        payment_repo::get_quote_for_session(&self.pool, session_id).await
    }
}

/// Canonical checkout step for a session, derived from the lifecycle state
pub fn checkout_step_for(
    session_status: UploadStatus,
    payment_required: bool,
    quote_status: Option<QuoteStatus>,
) -> CheckoutStep {
    crate::models::derive_checkout_step(
        payment_required,
        quote_status == Some(QuoteStatus::Paid),
        session_status == UploadStatus::Uploaded,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_tiers() {
        assert_eq!(quote_amount_minor(10 * MIB), 4900);
        assert_eq!(quote_amount_minor(500 * MIB), 4900);
        assert_eq!(quote_amount_minor(500 * MIB + 1), 9900);
        assert_eq!(quote_amount_minor(1000 * MIB), 9900);
        assert_eq!(quote_amount_minor(1000 * MIB + 1), 14900);
        assert_eq!(quote_amount_minor(2 * 1024 * MIB), 14900);
    }

    #[test]
    fn quoting_is_deterministic() {
        let size = 750 * MIB;
        assert_eq!(quote_amount_minor(size), quote_amount_minor(size));
    }

    #[test]
    fn checkout_step_derivation() {
        assert_eq!(
            checkout_step_for(UploadStatus::Reserved, true, Some(QuoteStatus::Pending)),
            CheckoutStep::Upload
        );
        assert_eq!(
            checkout_step_for(UploadStatus::Uploaded, true, Some(QuoteStatus::Pending)),
            CheckoutStep::Payment
        );
        assert_eq!(
            checkout_step_for(UploadStatus::Uploaded, true, Some(QuoteStatus::Paid)),
            CheckoutStep::Submit
        );
        assert_eq!(
            checkout_step_for(UploadStatus::Uploaded, false, None),
            CheckoutStep::Submit
        );
    }
}
