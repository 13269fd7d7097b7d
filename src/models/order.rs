use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub mod order_status {
    pub const PROCESSING: &str = "Processing";
    pub const TRANSFERRED: &str = "Transferred to delivery partner";
    pub const SHIPPING: &str = "Shipping";
    pub const RECEIVED: &str = "Received";
    pub const ON_THE_WAY: &str = "On the way";
    pub const DELIVERED: &str = "Delivered";
    pub const PROCESSING_REFUND: &str = "Processing refund";
    pub const REFUND_SUCCESS: &str = "Refund Success";
}

/// Fulfilment steps a seller walks an order through, in order.
const FULFILMENT: [&str; 6] = [
    order_status::PROCESSING,
    order_status::TRANSFERRED,
    order_status::SHIPPING,
    order_status::RECEIVED,
    order_status::ON_THE_WAY,
    order_status::DELIVERED,
];

/// Side effect that comes with a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEffect {
    /// Only the label changes.
    Relabel,
    /// Goods leave the shelf: stock down, `sold_out` up.
    TakeStock,
    /// Order delivered: the seller is credited its payout.
    PaySeller,
    /// Refunded goods come back: stock up, `sold_out` down.
    ReturnStock,
}

pub fn is_fulfilment_status(status: &str) -> bool {
    FULFILMENT.contains(&status)
}

/// Checks that an order may move from `from` to `to`.
///
/// Fulfilment only moves forward and must pass through the hand-over to the
/// delivery partner, so stock is taken exactly once. Refunds are only
/// possible after delivery, so returned stock was always taken before.
pub fn transition(from: &str, to: &str) -> Result<StatusEffect, ApiError> {
    let step = |s: &str| FULFILMENT.iter().position(|f| *f == s);
    let effect = match (from, to) {
        (order_status::DELIVERED, order_status::PROCESSING_REFUND) => Some(StatusEffect::Relabel),
        (order_status::PROCESSING_REFUND, order_status::REFUND_SUCCESS) => {
            Some(StatusEffect::ReturnStock)
        }
        _ => match (step(from), step(to)) {
            (Some(0), Some(1)) => Some(StatusEffect::TakeStock),
            (Some(i), Some(j)) if i > 0 && j > i && to == order_status::DELIVERED => {
                Some(StatusEffect::PaySeller)
            }
            (Some(i), Some(j)) if i > 0 && j > i => Some(StatusEffect::Relabel),
            _ => None,
        },
    };
    effect.ok_or_else(|| ApiError::bad_request(format!("Order can not move from {from} to {to}")))
}

/// Platform cut taken from a delivered order before the seller is credited.
const SERVICE_CHARGE_RATE: f64 = 0.10;

/// One cart line as the storefront sends it: a product snapshot plus quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub shop_id: String,
    pub discount_price: f64,
    pub qty: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_reviewed: bool,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.discount_price * self.qty as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaymentInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    pub cart: Vec<CartItem>,
    pub shipping_address: serde_json::Value,
    pub user: serde_json::Value,
    pub total_price: f64,
    pub status: String,
    #[serde(default)]
    pub payment_info: PaymentInfo,
    pub paid_at: DateTime<Utc>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Shop that fulfils this order; every line of a split order shares it.
    pub fn shop_id(&self) -> Option<&str> {
        self.cart.first().map(|item| item.shop_id.as_str())
    }
}

/// Groups cart lines by shop, keeping the lines' original order within a shop.
pub fn split_cart_by_shop(cart: Vec<CartItem>) -> BTreeMap<String, Vec<CartItem>> {
    let mut by_shop: BTreeMap<String, Vec<CartItem>> = BTreeMap::new();
    for item in cart {
        by_shop.entry(item.shop_id.clone()).or_default().push(item);
    }
    by_shop
}

/// Splits the amount the buyer paid across per-shop orders in proportion to
/// each shop's subtotal, so coupon discounts and shipping are shared fairly.
///
/// Shares are whole cents; the rounding remainder goes to the largest share
/// so the shares always add up to the paid amount.
pub fn allocate_total(total_price: f64, subtotals: &[f64]) -> Vec<f64> {
    if subtotals.is_empty() {
        return Vec::new();
    }
    let total_cents = (total_price * 100.0).round() as i64;
    let sum: f64 = subtotals.iter().sum();
    let mut cents: Vec<i64> = subtotals
        .iter()
        .map(|subtotal| {
            let weight = if sum > 0.0 {
                subtotal / sum
            } else {
                1.0 / subtotals.len() as f64
            };
            (total_cents as f64 * weight).round() as i64
        })
        .collect();

    let largest = cents
        .iter()
        .enumerate()
        .max_by_key(|(_, c)| **c)
        .map_or(0, |(i, _)| i);
    let allocated: i64 = cents.iter().sum();
    cents[largest] += total_cents - allocated;

    cents.into_iter().map(|c| c as f64 / 100.0).collect()
}

pub fn service_charge(total_price: f64) -> f64 {
    total_price * SERVICE_CHARGE_RATE
}

/// Amount credited to a seller's balance once an order is delivered.
pub fn seller_payout(total_price: f64) -> f64 {
    total_price - service_charge(total_price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, shop: &str, price: f64, qty: i64) -> CartItem {
        CartItem {
            id: id.into(),
            name: id.to_uppercase(),
            shop_id: shop.into(),
            discount_price: price,
            qty,
            images: vec![],
            is_reviewed: false,
        }
    }

    #[test]
    fn cart_is_split_per_shop() {
        let cart = vec![
            item("p1", "s2", 10.0, 1),
            item("p2", "s1", 20.0, 2),
            item("p3", "s2", 5.0, 4),
        ];
        let split = split_cart_by_shop(cart);
        assert_eq!(split.len(), 2);

        let s2: Vec<_> = split["s2"].iter().map(|i| i.id.as_str()).collect();
        assert_eq!(s2, ["p1", "p3"]);
        let s2_total: f64 = split["s2"].iter().map(CartItem::line_total).sum();
        assert_eq!(s2_total, 30.0);
        assert_eq!(split["s1"][0].line_total(), 40.0);
    }

    fn in_cents(shares: &[f64]) -> i64 {
        shares.iter().map(|s| (s * 100.0).round() as i64).sum()
    }

    #[test]
    fn paid_total_is_shared_by_subtotal() {
        assert_eq!(allocate_total(90.0, &[50.0, 50.0]), vec![45.0, 45.0]);
        assert_eq!(allocate_total(150.0, &[100.0, 200.0]), vec![50.0, 100.0]);
        assert_eq!(allocate_total(10.0, &[0.0, 0.0]), vec![5.0, 5.0]);
        assert_eq!(allocate_total(99.99, &[10.0]), vec![99.99]);
    }

    #[test]
    fn rounding_remainder_keeps_the_paid_sum() {
        let shares = allocate_total(100.0, &[1.0, 1.0, 1.0]);
        assert_eq!(in_cents(&shares), 10_000);
        assert_eq!(shares.iter().filter(|s| **s == 33.33).count(), 2);
        assert!(shares.contains(&33.34));

        let shares = allocate_total(70.0, &[100.0, 40.0]);
        assert_eq!(in_cents(&shares), 7_000);

        let shares = allocate_total(0.05, &[3.0, 3.0, 3.0, 3.0]);
        assert_eq!(in_cents(&shares), 5);
        assert!(shares.iter().all(|s| *s >= 0.0));
    }

    #[test]
    fn fulfilment_moves_forward_through_hand_over() {
        use order_status::*;
        assert_eq!(transition(PROCESSING, TRANSFERRED).unwrap(), StatusEffect::TakeStock);
        assert_eq!(transition(TRANSFERRED, SHIPPING).unwrap(), StatusEffect::Relabel);
        assert_eq!(transition(ON_THE_WAY, DELIVERED).unwrap(), StatusEffect::PaySeller);
        assert_eq!(transition(TRANSFERRED, DELIVERED).unwrap(), StatusEffect::PaySeller);

        // skipping the hand-over would deliver goods that never left stock
        assert!(transition(PROCESSING, DELIVERED).is_err());
        assert!(transition(PROCESSING, SHIPPING).is_err());
    }

    #[test]
    fn stock_and_payout_moves_can_not_repeat() {
        use order_status::*;
        assert!(transition(DELIVERED, PROCESSING).is_err());
        assert!(transition(DELIVERED, TRANSFERRED).is_err());
        assert!(transition(DELIVERED, DELIVERED).is_err());
        assert!(transition(SHIPPING, TRANSFERRED).is_err());
        assert!(transition(TRANSFERRED, TRANSFERRED).is_err());
        assert!(transition(REFUND_SUCCESS, DELIVERED).is_err());
        assert!(transition(PROCESSING_REFUND, DELIVERED).is_err());
    }

    #[test]
    fn refunds_only_follow_delivery() {
        use order_status::*;
        assert_eq!(transition(DELIVERED, PROCESSING_REFUND).unwrap(), StatusEffect::Relabel);
        assert_eq!(
            transition(PROCESSING_REFUND, REFUND_SUCCESS).unwrap(),
            StatusEffect::ReturnStock
        );
        assert!(transition(PROCESSING, PROCESSING_REFUND).is_err());
        assert!(transition(TRANSFERRED, REFUND_SUCCESS).is_err());
        assert!(transition(DELIVERED, REFUND_SUCCESS).is_err());
        assert!(transition(REFUND_SUCCESS, REFUND_SUCCESS).is_err());
        assert_eq!(
            transition(PROCESSING, REFUND_SUCCESS).unwrap_err().to_string(),
            "Order can not move from Processing to Refund Success"
        );
    }

    #[test]
    fn fulfilment_statuses_exclude_refunds() {
        assert!(is_fulfilment_status(order_status::ON_THE_WAY));
        assert!(!is_fulfilment_status(order_status::PROCESSING_REFUND));
        assert!(!is_fulfilment_status("Lost"));
    }

    #[test]
    fn payout_keeps_ninety_percent() {
        assert_eq!(service_charge(200.0), 20.0);
        assert_eq!(seller_payout(200.0), 180.0);
    }

    #[test]
    fn payouts_are_additive() {
        let orders = [120.0, 80.0, 300.0];
        let credited: f64 = orders.iter().copied().map(seller_payout).sum();
        let combined = seller_payout(orders.iter().sum());
        assert!((credited - combined).abs() < 1e-9);
    }

    #[test]
    fn payment_type_uses_reserved_word_on_the_wire() {
        let info: PaymentInfo =
            serde_json::from_str(r#"{"id":"pi_1","status":"succeeded","type":"Credit Card"}"#)
                .unwrap();
        assert_eq!(info.kind.as_deref(), Some("Credit Card"));
    }
}
