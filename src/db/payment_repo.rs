/// Payment quote repository - database operations for quotes
use crate::error::{AppError, Result};
use crate::models::PaymentQuote;
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const QUOTE_COLUMNS: &str =
    "id, session_id, amount_minor, currency, status, created_at, paid_at";

pub async fn get_quote(pool: &PgPool, quote_id: Uuid) -> Result<Option<PaymentQuote>> {
    let quote = sqlx::query_as::<_, PaymentQuote>(&format!(
        "SELECT {} FROM payment_quotes WHERE id = $1",
        QUOTE_COLUMNS
    ))
    .bind(quote_id)
    .fetch_optional(pool)
    .await?;

    Ok(quote)
}

pub async fn get_quote_for_session(pool: &PgPool, session_id: Uuid) -> Result<Option<PaymentQuote>> {
    let quote = sqlx::query_as::<_, PaymentQuote>(&format!(
        "SELECT {} FROM payment_quotes WHERE session_id = $1",
        QUOTE_COLUMNS
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(quote)
}

/// Transition a quote from pending to paid.
///
/// The transition happens exactly once; repeat calls for an already-paid
/// quote return the quote unchanged so duplicated payment confirmations
/// are harmless.
pub async fn mark_paid(pool: &PgPool, quote_id: Uuid) -> Result<PaymentQuote> {
    let updated = sqlx::query_as::<_, PaymentQuote>(&format!(
        "UPDATE payment_quotes SET status = 'paid', paid_at = NOW() \
         WHERE id = $1 AND status = 'pending' \
         RETURNING {}",
        QUOTE_COLUMNS
    ))
    .bind(quote_id)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(quote) => Ok(quote),
        None => get_quote(pool, quote_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quote {} not found", quote_id))),
    }
}
