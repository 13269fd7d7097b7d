use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

fn seller_role() -> Role {
    Role::Seller
}

/// Seller account with its own balance and withdrawal workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone_number: Option<i64>,
    #[serde(default = "seller_role")]
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub zip_code: Option<i64>,
    /// Payout details as entered by the seller (bank, UPI, ...).
    #[serde(default)]
    pub withdraw_method: Option<serde_json::Value>,
    #[serde(default)]
    pub available_balance: f64,
    #[serde(default)]
    pub transections: Vec<Transaction>,
    pub created_at: DateTime<Utc>,
}

impl Shop {
    pub fn without_password(mut self) -> Self {
        self.password.clear();
        self
    }
}

/// Public face of a shop, embedded in its products and events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopSnapshot {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Shop> for ShopSnapshot {
    fn from(shop: &Shop) -> Self {
        Self {
            id: shop.id.clone(),
            name: shop.name.clone(),
            avatar: shop.avatar.clone(),
            description: shop.description.clone(),
            address: shop.address.clone(),
            created_at: shop.created_at,
        }
    }
}

/// A completed payout, recorded on the shop once an admin settles a withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: String,
    pub amount: f64,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_leaves_out_account_and_payout_fields() {
        let shop = Shop {
            id: "s1".into(),
            name: "Lamps".into(),
            email: "l@example.com".into(),
            password: "hash".into(),
            description: Some("brass".into()),
            address: "Market Rd".into(),
            phone_number: Some(9876543210),
            role: Role::Seller,
            avatar: None,
            zip_code: Some(110001),
            withdraw_method: Some(serde_json::json!({ "bankName": "SBI" })),
            available_balance: 450.0,
            transections: vec![Transaction {
                id: "t1".into(),
                amount: 50.0,
                status: "succeed".into(),
                updated_at: Utc::now(),
            }],
            created_at: Utc::now(),
        };

        let wire = serde_json::to_value(ShopSnapshot::from(&shop)).unwrap();
        let fields = wire.as_object().unwrap();
        assert_eq!(fields["_id"], "s1");
        assert_eq!(fields["description"], "brass");
        for hidden in [
            "email",
            "password",
            "phoneNumber",
            "zipCode",
            "withdrawMethod",
            "availableBalance",
            "transections",
        ] {
            assert!(!fields.contains_key(hidden), "{hidden} leaked");
        }
    }
}
