use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CartItem;
use crate::error::ApiError;

/// Percentage discount a seller offers on its own items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponCode {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// Percent off, 1..=100.
    pub value: f64,
    #[serde(default)]
    pub min_amount: Option<f64>,
    #[serde(default)]
    pub max_amount: Option<f64>,
    pub shop_id: String,
    #[serde(default)]
    pub selected_product: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouponDiscount {
    pub eligible_price: f64,
    pub discount: f64,
}

impl CouponCode {
    fn applies_to(&self, item: &CartItem) -> bool {
        item.shop_id == self.shop_id
            && self
                .selected_product
                .as_deref()
                .map_or(true, |p| p.is_empty() || p == item.id || p == item.name)
    }

    /// Discount this coupon grants on `cart`.
    pub fn discount_for(&self, cart: &[CartItem]) -> Result<CouponDiscount, ApiError> {
        let eligible: Vec<&CartItem> = cart.iter().filter(|i| self.applies_to(i)).collect();
        if eligible.is_empty() {
            return Err(ApiError::bad_request("Coupon code is not valid for this shop"));
        }

        let eligible_price: f64 = eligible.iter().map(|i| i.line_total()).sum();
        if let Some(min) = self.min_amount {
            if eligible_price < min {
                return Err(ApiError::bad_request(format!(
                    "Coupon code needs a minimum purchase of {min}"
                )));
            }
        }
        if let Some(max) = self.max_amount {
            if eligible_price > max {
                return Err(ApiError::bad_request(format!(
                    "Coupon code is valid up to a purchase of {max}"
                )));
            }
        }

        Ok(CouponDiscount {
            eligible_price,
            discount: eligible_price * self.value / 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon() -> CouponCode {
        CouponCode {
            id: "c1".into(),
            name: "FEST10".into(),
            value: 10.0,
            min_amount: None,
            max_amount: None,
            shop_id: "s1".into(),
            selected_product: None,
            created_at: Utc::now(),
        }
    }

    fn item(id: &str, shop: &str, price: f64, qty: i64) -> CartItem {
        CartItem {
            id: id.into(),
            name: format!("item {id}"),
            shop_id: shop.into(),
            discount_price: price,
            qty,
            images: vec![],
            is_reviewed: false,
        }
    }

    #[test]
    fn discounts_only_the_coupon_shops_items() {
        let cart = vec![item("p1", "s1", 100.0, 2), item("p2", "s2", 500.0, 1)];
        let d = coupon().discount_for(&cart).unwrap();
        assert_eq!(d.eligible_price, 200.0);
        assert_eq!(d.discount, 20.0);
    }

    #[test]
    fn foreign_cart_is_rejected() {
        let cart = vec![item("p2", "s2", 500.0, 1)];
        let err = coupon().discount_for(&cart).unwrap_err();
        assert_eq!(err.to_string(), "Coupon code is not valid for this shop");
    }

    #[test]
    fn selected_product_narrows_eligibility() {
        let mut c = coupon();
        c.selected_product = Some("item p3".into());
        let cart = vec![item("p1", "s1", 100.0, 1), item("p3", "s1", 40.0, 1)];
        assert_eq!(c.discount_for(&cart).unwrap().eligible_price, 40.0);
    }

    #[test]
    fn amount_bounds_are_enforced() {
        let mut c = coupon();
        c.min_amount = Some(300.0);
        assert!(c.discount_for(&[item("p1", "s1", 100.0, 2)]).is_err());
        c.min_amount = None;
        c.max_amount = Some(100.0);
        assert!(c.discount_for(&[item("p1", "s1", 100.0, 2)]).is_err());
        assert!(c.discount_for(&[item("p1", "s1", 100.0, 1)]).is_ok());
    }
}
