mod conversation;
mod coupon;
mod event;
mod message;
mod order;
mod product;
mod shop;
mod user;
mod withdraw;

pub use conversation::{sort_by_activity, Conversation};
pub use coupon::CouponCode;
pub use event::{Event, EventStatus};
pub use message::Message;
pub use order::{
    allocate_total, is_fulfilment_status, order_status, seller_payout, split_cart_by_shop, transition,
    CartItem, Order, PaymentInfo, StatusEffect,
};
pub use product::{Product, Review, ReviewAuthor};
pub use shop::{Shop, ShopSnapshot, Transaction};
pub use user::{upsert_address, Address, User};
pub use withdraw::{validate_amount, Withdraw, WithdrawStatus};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role, stored on users/shops and carried in auth tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Role {
    #[default]
    #[serde(rename = "user")]
    User,
    Admin,
    Seller,
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}
