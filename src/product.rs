// src/product.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{info, warn};
use mongodb::bson::{doc, to_bson};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::{AuthAdmin, AuthSeller, AuthUser};
use crate::db::{collect_all, newest_first};
use crate::error::{ApiError, ApiResult};
use crate::models::{new_id, Product, Review, ReviewAuthor, ShopSnapshot};
use crate::validation::require_fields;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Option<String>,
    pub original_price: Option<f64>,
    pub discount_price: f64,
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    pub shop_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub user: ReviewAuthor,
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
    pub product_id: String,
    pub order_id: String,
}

/// Resolves the shop a listing is created for; sellers may only list for themselves.
pub(crate) async fn listing_shop(
    data: &AppState,
    seller: &AuthSeller,
    shop_id: &str,
) -> ApiResult<ShopSnapshot> {
    if shop_id != seller.0.id {
        return Err(ApiError::Forbidden(
            "You can only list items for your own shop".into(),
        ));
    }
    let shop = data
        .mongodb
        .shops()
        .find_one(doc! { "_id": shop_id })
        .await?
        .ok_or_else(|| ApiError::bad_request("Shop Id is invalid!"))?;
    Ok(ShopSnapshot::from(&shop))
}

pub(crate) fn check_pricing(discount_price: f64, stock: i64) -> ApiResult<()> {
    if !discount_price.is_finite() || discount_price <= 0.0 {
        return Err(ApiError::bad_request("Please enter a valid price"));
    }
    if stock < 0 {
        return Err(ApiError::bad_request("Stock can not be negative"));
    }
    Ok(())
}

/// POST /product/create-product
pub async fn create_product(
    data: web::Data<AppState>,
    seller: AuthSeller,
    body: web::Json<CreateProductRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    require_fields(&[&body.name, &body.description, &body.category])?;
    check_pricing(body.discount_price, body.stock)?;
    let shop = listing_shop(&data, &seller, &body.shop_id).await?;

    let product = Product {
        id: new_id(),
        name: body.name,
        description: body.description,
        category: body.category,
        tags: body.tags,
        original_price: body.original_price,
        discount_price: body.discount_price,
        stock: body.stock,
        images: body.images,
        reviews: Vec::new(),
        ratings: None,
        shop_id: shop.id.clone(),
        shop,
        sold_out: 0,
        created_at: Utc::now(),
    };
    data.mongodb.products().insert_one(&product).await?;
    info!("product {} listed by shop {}", product.id, product.shop_id);

    Ok(HttpResponse::Created().json(json!({ "success": true, "product": product })))
}

/// GET /product/get-all-products-shop/{id}
pub async fn get_shop_products(
    data: web::Data<AppState>,
    shop_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let cursor = data
        .mongodb
        .products()
        .find(doc! { "shopId": shop_id.as_str() })
        .await?;
    let products = collect_all(cursor).await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "products": products })))
}

/// DELETE /product/delete-shop-product/{id}
pub async fn delete_shop_product(
    data: web::Data<AppState>,
    seller: AuthSeller,
    product_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let products = data.mongodb.products();
    let product = products
        .find_one(doc! { "_id": product_id.as_str() })
        .await?
        .ok_or_else(|| ApiError::not_found("Product is not found with this id"))?;

    if product.shop_id != seller.0.id {
        return Err(ApiError::Forbidden("This product belongs to another shop".into()));
    }

    products.delete_one(doc! { "_id": &product.id }).await?;
    info!("product {} deleted by shop {}", product.id, seller.0.id);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Product Deleted successfully!",
    })))
}

/// GET /product/get-all-products
pub async fn get_all_products(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let cursor = data.mongodb.products().find(doc! {}).await?;
    let mut products = collect_all(cursor).await?;
    newest_first(&mut products, |p| p.created_at);
    Ok(HttpResponse::Created().json(json!({ "success": true, "products": products })))
}

/// PUT /product/create-new-review
/// Adds or replaces the caller's review, then flags the order line as reviewed.
pub async fn create_new_review(
    data: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<ReviewRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    if !(1.0..=5.0).contains(&body.rating) {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }

    let products = data.mongodb.products();
    let mut product = products
        .find_one(doc! { "_id": &body.product_id })
        .await?
        .ok_or_else(|| ApiError::not_found("Product is not found with this id"))?;

    let mut author = body.user;
    author.id = auth.0.id.clone();
    product.upsert_review(Review {
        user: author,
        rating: body.rating,
        comment: body.comment,
        product_id: product.id.clone(),
        created_at: Utc::now(),
    });

    products
        .update_one(
            doc! { "_id": &product.id },
            doc! { "$set": {
                "reviews": to_bson(&product.reviews)?,
                "ratings": product.ratings,
            } },
        )
        .await?;

    let flagged = data
        .mongodb
        .orders()
        .update_one(
            doc! { "_id": &body.order_id, "cart._id": &product.id },
            doc! { "$set": { "cart.$.isReviewed": true } },
        )
        .await?;
    if flagged.matched_count == 0 {
        warn!(
            "review for product {} did not match order {}",
            product.id, body.order_id
        );
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Reviwed succesfully!" })))
}

/// GET /product/admin-all-products
pub async fn admin_all_products(
    data: web::Data<AppState>,
    _admin: AuthAdmin,
) -> ApiResult<HttpResponse> {
    let cursor = data.mongodb.products().find(doc! {}).await?;
    let mut products = collect_all(cursor).await?;
    newest_first(&mut products, |p| p.created_at);
    Ok(HttpResponse::Created().json(json!({ "success": true, "products": products })))
}
