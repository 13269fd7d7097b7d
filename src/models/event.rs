use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ShopSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EventStatus {
    #[default]
    Running,
    Ended,
}

/// Time-boxed sale; shaped like a product with a start and finish date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "start_Date")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "Finish_Date")]
    pub finish_date: DateTime<Utc>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub original_price: Option<f64>,
    pub discount_price: f64,
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    pub shop_id: String,
    pub shop: ShopSnapshot,
    #[serde(rename = "sold_out", default)]
    pub sold_out: i64,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Marks a running event as ended once its finish date has passed.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) {
        if self.status == EventStatus::Running && self.finish_date < now {
            self.status = EventStatus::Ended;
        }
    }
}
