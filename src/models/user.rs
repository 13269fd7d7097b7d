use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, Role};
use crate::error::ApiError;

/// Buyer account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    /// bcrypt hash; cleared before an account leaves the service.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default)]
    pub phone_number: Option<i64>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn without_password(mut self) -> Self {
        self.password.clear();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "_id", default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub address1: String,
    #[serde(default)]
    pub address2: String,
    #[serde(default)]
    pub zip_code: Option<i64>,
    pub address_type: String,
}

/// Replaces the address sharing `address.id`, or appends it.
///
/// Each address type ("Home", "Office", ...) may appear once, so a type
/// already held by a different address is rejected.
pub fn upsert_address(addresses: &mut Vec<Address>, address: Address) -> Result<(), ApiError> {
    if addresses
        .iter()
        .any(|a| a.address_type == address.address_type && a.id != address.id)
    {
        return Err(ApiError::bad_request(format!(
            "{} address already exists",
            address.address_type
        )));
    }

    match addresses.iter_mut().find(|a| a.id == address.id) {
        Some(existing) => *existing = address,
        None => addresses.push(address),
    }
    Ok(())
}
