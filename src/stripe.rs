//! Minimal Stripe client: payment intent creation only.

use log::{debug, error};
use serde::Deserialize;
use thiserror::Error;

const STRIPE_API: &str = "https://api.stripe.com/v1";
const MERCHANT_NAME: &str = "Multivendor Market";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Stripe is not configured")]
    NotConfigured,

    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    currency: String,
}

impl StripeClient {
    pub fn new(secret_key: &str, currency: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.to_string(),
            currency: currency.to_string(),
        }
    }

    /// Creates a PaymentIntent for `amount` in the smallest currency unit.
    pub async fn create_payment_intent(&self, amount: i64) -> Result<PaymentIntent, PaymentError> {
        if self.secret_key.is_empty() {
            return Err(PaymentError::NotConfigured);
        }
        let params = intent_params(amount, &self.currency)?;

        debug!("creating payment intent for {} {}", amount, self.currency);
        let resp = self
            .http
            .post(format!("{STRIPE_API}/payment_intents"))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<StripeErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.to_string(),
            };
            error!("stripe rejected payment intent: {}", message);
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json::<PaymentIntent>().await?)
    }
}

fn intent_params(amount: i64, currency: &str) -> Result<Vec<(&'static str, String)>, PaymentError> {
    if amount <= 0 {
        return Err(PaymentError::InvalidAmount(amount));
    }
    Ok(vec![
        ("amount", amount.to_string()),
        ("currency", currency.to_string()),
        ("metadata[company]", MERCHANT_NAME.to_string()),
    ])
}
