/// Billing handlers - HTTP endpoints for quoting and payment confirmation
use actix_web::web;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::metrics;
use crate::middleware::UserId;
use crate::models::QuoteResponse;
use crate::services::{billing, uploads, BillingService};

#[derive(Debug, Deserialize)]
pub struct QuotePreviewQuery {
    pub size_bytes: i64,
}

/// Preview the price for an upload of a given size without reserving
/// anything
pub async fn preview_quote(query: web::Query<QuotePreviewQuery>) -> Result<actix_web::HttpResponse> {
    if query.size_bytes <= 0 {
        return Err(AppError::BadRequest(
            "size_bytes must be positive".to_string(),
        ));
    }
    if query.size_bytes > uploads::MAX_FILE_SIZE_BYTES {
        return Err(AppError::FileTooLarge(query.size_bytes));
    }

    let payment_required = uploads::requires_payment(query.size_bytes);
    Ok(actix_web::HttpResponse::Ok().json(serde_json::json!({
        "payment_required": payment_required,
        "amount_minor": if payment_required {
            Some(billing::quote_amount_minor(query.size_bytes))
        } else {
            None
        },
        "currency": billing::CURRENCY,
    })))
}

/// Confirm payment of a quote (payment-processor callback relayed by the
/// client)
pub async fn confirm_quote(
    pool: web::Data<PgPool>,
    user: UserId,
    quote_id: web::Path<String>,
) -> Result<actix_web::HttpResponse> {
    let quote_uuid = Uuid::parse_str(&quote_id)
        .map_err(|_| AppError::BadRequest("Invalid quote ID".to_string()))?;

    let service = BillingService::new((**pool).clone());
    let quote = service.mark_paid(user.0, quote_uuid).await?;

    metrics::QUOTES_PAID.inc();

    Ok(actix_web::HttpResponse::Ok().json(QuoteResponse::from(quote)))
}
