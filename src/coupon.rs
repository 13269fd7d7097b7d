// src/coupon.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::AuthSeller;
use crate::db::{collect_all, is_duplicate_key};
use crate::error::{ApiError, ApiResult};
use crate::models::{new_id, CartItem, CouponCode};
use crate::validation::require_fields;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    pub name: String,
    pub value: f64,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub selected_product: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    pub name: String,
    pub cart: Vec<CartItem>,
}

const NAME_TAKEN: &str = "Coupoun code already exists!";

fn ensure_name_free(existing: Option<&CouponCode>) -> ApiResult<()> {
    match existing {
        Some(_) => Err(ApiError::bad_request(NAME_TAKEN)),
        None => Ok(()),
    }
}

fn check_coupon(body: &CreateCouponRequest) -> ApiResult<()> {
    require_fields(&[&body.name])?;
    if !(body.value > 0.0 && body.value <= 100.0) {
        return Err(ApiError::bad_request("Coupon value must be a percentage"));
    }
    if let (Some(min), Some(max)) = (body.min_amount, body.max_amount) {
        if min > max {
            return Err(ApiError::bad_request(
                "Minimum amount can not exceed maximum amount",
            ));
        }
    }
    Ok(())
}

/// POST /coupon/create-coupon-code
/// Coupon names are unique across all shops; the unique index on `name`
/// settles concurrent creates.
pub async fn create_coupon_code(
    data: web::Data<AppState>,
    seller: AuthSeller,
    body: web::Json<CreateCouponRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    check_coupon(&body)?;

    let coupons = data.mongodb.coupons();
    let existing = coupons.find_one(doc! { "name": &body.name }).await?;
    ensure_name_free(existing.as_ref())?;

    let coupon = CouponCode {
        id: new_id(),
        name: body.name,
        value: body.value,
        min_amount: body.min_amount,
        max_amount: body.max_amount,
        shop_id: seller.0.id.clone(),
        selected_product: body.selected_product,
        created_at: Utc::now(),
    };
    coupons.insert_one(&coupon).await.map_err(|e| {
        if is_duplicate_key(&e) {
            ApiError::bad_request(NAME_TAKEN)
        } else {
            e.into()
        }
    })?;
    info!("coupon {} created by shop {}", coupon.name, coupon.shop_id);

    Ok(HttpResponse::Created().json(json!({ "success": true, "coupounCode": coupon })))
}

/// GET /coupon/get-coupon/{shop_id}
pub async fn get_shop_coupons(
    data: web::Data<AppState>,
    seller: AuthSeller,
    shop_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    if *shop_id != seller.0.id {
        return Err(ApiError::Forbidden("Coupons belong to another shop".into()));
    }
    let cursor = data
        .mongodb
        .coupons()
        .find(doc! { "shopId": shop_id.as_str() })
        .await?;
    let coupons = collect_all(cursor).await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "couponCodes": coupons })))
}

/// DELETE /coupon/delete-coupon/{id}
pub async fn delete_coupon_code(
    data: web::Data<AppState>,
    seller: AuthSeller,
    coupon_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let result = data
        .mongodb
        .coupons()
        .delete_one(doc! { "_id": coupon_id.as_str(), "shopId": &seller.0.id })
        .await?;
    if result.deleted_count == 0 {
        return Err(ApiError::bad_request("Coupon code dosen't exists!"));
    }
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Coupon code deleted successfully!",
    })))
}

/// GET /coupon/get-coupon-value/{name}
pub async fn get_coupon_value(
    data: web::Data<AppState>,
    name: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let coupon = data
        .mongodb
        .coupons()
        .find_one(doc! { "name": name.as_str() })
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "couponCode": coupon })))
}

/// POST /coupon/apply-coupon
/// Prices a coupon against the buyer's cart.
pub async fn apply_coupon(
    data: web::Data<AppState>,
    body: web::Json<ApplyCouponRequest>,
) -> ApiResult<HttpResponse> {
    let coupon = data
        .mongodb
        .coupons()
        .find_one(doc! { "name": &body.name })
        .await?
        .ok_or_else(|| ApiError::bad_request("Coupon code doesn't exists!"))?;

    let discount = coupon.discount_for(&body.cart)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "couponCode": coupon,
        "discount": discount,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(value: f64, min: Option<f64>, max: Option<f64>) -> CreateCouponRequest {
        CreateCouponRequest {
            name: "FEST".into(),
            value,
            min_amount: min,
            max_amount: max,
            selected_product: None,
        }
    }

    #[test]
    fn coupon_value_is_a_percentage() {
        assert!(check_coupon(&request(15.0, None, None)).is_ok());
        assert!(check_coupon(&request(0.0, None, None)).is_err());
        assert!(check_coupon(&request(120.0, None, None)).is_err());
    }

    #[test]
    fn bounds_must_be_ordered() {
        assert!(check_coupon(&request(10.0, Some(100.0), Some(50.0))).is_err());
        assert!(check_coupon(&request(10.0, Some(50.0), Some(100.0))).is_ok());
    }

    #[test]
    fn taken_names_are_refused() {
        assert!(ensure_name_free(None).is_ok());

        let existing = CouponCode {
            id: "c1".into(),
            name: "FEST".into(),
            value: 10.0,
            min_amount: None,
            max_amount: None,
            shop_id: "s2".into(),
            selected_product: None,
            created_at: Utc::now(),
        };
        let err = ensure_name_free(Some(&existing)).unwrap_err();
        assert_eq!(err.to_string(), "Coupoun code already exists!");
    }
}
