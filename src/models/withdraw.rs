use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Shop;
use crate::error::ApiError;

pub const MIN_WITHDRAW_AMOUNT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WithdrawStatus {
    #[default]
    Processing,
    #[serde(rename = "succeed")]
    Succeed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdraw {
    #[serde(rename = "_id")]
    pub id: String,
    pub seller: Shop,
    pub amount: f64,
    #[serde(default)]
    pub status: WithdrawStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Checks a payout request against the seller's current balance.
pub fn validate_amount(amount: f64, available_balance: f64) -> Result<(), ApiError> {
    if !amount.is_finite() || amount < MIN_WITHDRAW_AMOUNT || amount > available_balance {
        return Err(ApiError::bad_request("You can't withdraw this amount!"));
    }
    Ok(())
}
