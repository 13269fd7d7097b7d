use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ShopSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub original_price: Option<f64>,
    pub discount_price: f64,
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub ratings: Option<f64>,
    pub shop_id: String,
    pub shop: ShopSnapshot,
    #[serde(rename = "sold_out", default)]
    pub sold_out: i64,
    pub created_at: DateTime<Utc>,
}

/// Reviewer snapshot; the storefront sends the whole user, only these are kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewAuthor {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user: ReviewAuthor,
    pub rating: f64,
    pub comment: String,
    pub product_id: String,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Stores `review`, replacing any earlier review by the same user, and
    /// recomputes the average rating.
    pub fn upsert_review(&mut self, review: Review) {
        match self.reviews.iter_mut().find(|r| r.user.id == review.user.id) {
            Some(existing) => {
                existing.rating = review.rating;
                existing.comment = review.comment;
                existing.user = review.user;
            }
            None => self.reviews.push(review),
        }
        self.ratings = average_rating(&self.reviews);
    }
}

pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: f64 = reviews.iter().map(|r| r.rating).sum();
    Some(total / reviews.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> ShopSnapshot {
        ShopSnapshot {
            id: "s1".into(),
            name: "Kirana".into(),
            avatar: None,
            description: None,
            address: "Market Rd".into(),
            created_at: Utc::now(),
        }
    }

    fn product() -> Product {
        Product {
            id: "p1".into(),
            name: "Tea".into(),
            description: "Assam".into(),
            category: "Food".into(),
            tags: None,
            original_price: Some(120.0),
            discount_price: 100.0,
            stock: 10,
            images: vec![],
            reviews: vec![],
            ratings: None,
            shop_id: "s1".into(),
            shop: shop(),
            sold_out: 0,
            created_at: Utc::now(),
        }
    }

    fn review(user: &str, rating: f64) -> Review {
        Review {
            user: ReviewAuthor {
                id: user.into(),
                name: user.to_uppercase(),
                avatar: None,
            },
            rating,
            comment: format!("{rating} stars"),
            product_id: "p1".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ratings_are_the_mean_of_reviews() {
        let mut p = product();
        p.upsert_review(review("u1", 5.0));
        p.upsert_review(review("u2", 2.0));
        assert_eq!(p.reviews.len(), 2);
        assert_eq!(p.ratings, Some(3.5));
    }

    #[test]
    fn second_review_by_same_user_replaces_first() {
        let mut p = product();
        p.upsert_review(review("u1", 1.0));
        p.upsert_review(review("u2", 4.0));
        p.upsert_review(review("u1", 5.0));
        assert_eq!(p.reviews.len(), 2);
        assert_eq!(p.reviews[0].comment, "5 stars");
        assert_eq!(p.ratings, Some(4.5));
    }

    #[test]
    fn no_reviews_means_no_rating() {
        assert_eq!(average_rating(&[]), None);
    }

    #[test]
    fn sold_out_keeps_snake_case_on_the_wire() {
        let value = serde_json::to_value(product()).unwrap();
        assert!(value.get("sold_out").is_some());
        assert!(value.get("shopId").is_some());
        assert!(value.get("discountPrice").is_some());
    }
}
