// src/payment.rs

use actix_web::{web, HttpResponse};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ProcessPaymentRequest {
    /// Smallest currency unit (paise, cents).
    pub amount: f64,
}

fn minor_units(amount: f64) -> ApiResult<i64> {
    if !amount.is_finite() || amount.round() < 1.0 {
        return Err(ApiError::bad_request("Please enter a valid amount"));
    }
    Ok(amount.round() as i64)
}

/// POST /payment/process
pub async fn process_payment(
    data: web::Data<AppState>,
    body: web::Json<ProcessPaymentRequest>,
) -> ApiResult<HttpResponse> {
    let amount = minor_units(body.amount)?;
    let intent = data.stripe.create_payment_intent(amount).await?;
    info!("payment intent {} created for {}", intent.id, amount);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "client_secret": intent.client_secret,
    })))
}

/// GET /payment/stripeapikey
pub async fn stripe_api_key(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "stripeApikey": data.config.stripe_api_key }))
}
