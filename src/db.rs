use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Cursor, Database, IndexModel};
use serde::de::DeserializeOwned;

use crate::models::{
    CouponCode, Conversation, Event, Message, Order, Product, Shop, User, Withdraw,
};

pub const USERS: &str = "users";
pub const SHOPS: &str = "shops";
pub const PRODUCTS: &str = "products";
pub const EVENTS: &str = "events";
pub const COUPONS: &str = "coupons";
pub const ORDERS: &str = "orders";
pub const CONVERSATIONS: &str = "conversations";
pub const MESSAGES: &str = "messages";
pub const WITHDRAWS: &str = "withdraws";

pub struct MongoDB {
    pub db: Database,
}

impl MongoDB {
    pub async fn init(uri: &str, db_name: &str) -> mongodb::error::Result<Self> {
        let mut client_options = ClientOptions::parse(uri).await?;
        client_options.app_name = Some("multivendor-market".to_string());
        let client = Client::with_options(client_options)?;
        let mongodb = MongoDB {
            db: client.database(db_name),
        };
        mongodb.ensure_indexes().await?;
        Ok(mongodb)
    }

    async fn ensure_indexes(&self) -> mongodb::error::Result<()> {
        let unique_name = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.coupons().create_index(unique_name).await?;
        Ok(())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    pub fn shops(&self) -> Collection<Shop> {
        self.db.collection(SHOPS)
    }

    pub fn products(&self) -> Collection<Product> {
        self.db.collection(PRODUCTS)
    }

    pub fn events(&self) -> Collection<Event> {
        self.db.collection(EVENTS)
    }

    pub fn coupons(&self) -> Collection<CouponCode> {
        self.db.collection(COUPONS)
    }

    pub fn orders(&self) -> Collection<Order> {
        self.db.collection(ORDERS)
    }

    pub fn conversations(&self) -> Collection<Conversation> {
        self.db.collection(CONVERSATIONS)
    }

    pub fn messages(&self) -> Collection<Message> {
        self.db.collection(MESSAGES)
    }

    pub fn withdraws(&self) -> Collection<Withdraw> {
        self.db.collection(WITHDRAWS)
    }
}

/// Drains a cursor, failing on the first bad document.
pub async fn collect_all<T>(cursor: Cursor<T>) -> mongodb::error::Result<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    cursor.try_collect().await
}

/// True when a write was refused by a unique index.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == 11000
    )
}

/// Current time in the same string form chrono uses when serializing models.
pub fn timestamp() -> Bson {
    Bson::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Sorts documents by creation time, newest first.
pub fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn newest_first_orders_descending() {
        let now = Utc::now();
        let mut items = vec![(1, now - Duration::hours(2)), (2, now), (3, now - Duration::hours(1))];
        newest_first(&mut items, |i| i.1);
        let ids: Vec<_> = items.iter().map(|i| i.0).collect();
        assert_eq!(ids, [2, 3, 1]);
    }

    #[test]
    fn timestamp_parses_back_into_chrono() {
        let Bson::String(raw) = timestamp() else {
            panic!("timestamp is a string");
        };
        assert!(raw.parse::<DateTime<Utc>>().is_ok());
    }
}
