// src/shop_management.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{debug, info};
use mongodb::bson::{doc, to_bson, Bson};
use mongodb::options::ReturnDocument;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::{
    create_activation_token, create_jwt, expired_cookie, hash_password, read_activation_token,
    session_cookie, verify_password, AuthAdmin, AuthSeller, SELLER_COOKIE,
};
use crate::db::{collect_all, newest_first};
use crate::error::{ApiError, ApiResult};
use crate::mailer::activation_email;
use crate::models::{new_id, Role, Shop};
use crate::validation::{require_email, require_fields};

// ─── REQUEST PAYLOADS ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShopRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
    pub address: String,
    pub phone_number: Option<i64>,
    pub zip_code: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingShop {
    name: String,
    email: String,
    password: String,
    avatar: Option<String>,
    address: String,
    phone_number: Option<i64>,
    zip_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ActivationRequest {
    pub activation_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvatarRequest {
    pub avatar: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSellerInfoRequest {
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub phone_number: Option<i64>,
    pub zip_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodRequest {
    pub withdraw_method: serde_json::Value,
}

// ─── HELPERS ──────────────────────────────────────────────────────────────────

pub(crate) async fn find_shop(data: &AppState, shop_id: &str) -> ApiResult<Shop> {
    data.mongodb
        .shops()
        .find_one(doc! { "_id": shop_id })
        .await?
        .ok_or_else(|| ApiError::bad_request("Shop doesn't exists"))
}

fn seller_session(data: &AppState, shop: Shop) -> ApiResult<HttpResponse> {
    let token = create_jwt(
        &shop.id,
        Role::Seller,
        &data.config.jwt_secret,
        data.config.jwt_expires_days,
    )?;
    Ok(HttpResponse::Created()
        .cookie(session_cookie(SELLER_COOKIE, token.clone(), data.config.jwt_expires_days))
        .json(json!({ "success": true, "user": shop.without_password(), "token": token })))
}

async fn update_shop(data: &AppState, shop_id: &str, set: mongodb::bson::Document) -> ApiResult<Shop> {
    data.mongodb
        .shops()
        .find_one_and_update(doc! { "_id": shop_id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::bad_request("Seller not found"))
}

// ─── SIGNUP & SESSION ─────────────────────────────────────────────────────────

/// POST /shop/create-shop
pub async fn create_shop(
    data: web::Data<AppState>,
    body: web::Json<CreateShopRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    require_fields(&[&body.name, &body.email, &body.password, &body.address])?;
    require_email(&body.email)?;

    if data
        .mongodb
        .shops()
        .find_one(doc! { "email": &body.email })
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request("User already exists"));
    }

    let pending = PendingShop {
        name: body.name,
        email: body.email,
        password: hash_password(&body.password)?,
        avatar: body.avatar,
        address: body.address,
        phone_number: body.phone_number,
        zip_code: body.zip_code,
    };
    let token = create_activation_token(&pending, &data.config.activation_secret)?;
    let activation_url = format!("{}/seller/activation/{}", data.config.frontend_origin, token);

    data.mailer
        .send(
            &pending.email,
            "Activate your Shop",
            &activation_email(&pending.name, &activation_url),
        )
        .await?;

    info!("activation mail sent for new shop {}", pending.email);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": format!("please check your email:- {} to activate your shop!", pending.email),
    })))
}

/// POST /shop/activation
pub async fn activate_shop(
    data: web::Data<AppState>,
    body: web::Json<ActivationRequest>,
) -> ApiResult<HttpResponse> {
    let pending: PendingShop =
        read_activation_token(&body.activation_token, &data.config.activation_secret)?;

    let shops = data.mongodb.shops();
    if shops
        .find_one(doc! { "email": &pending.email })
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request("User already exists"));
    }

    let shop = Shop {
        id: new_id(),
        name: pending.name,
        email: pending.email,
        password: pending.password,
        description: None,
        address: pending.address,
        phone_number: pending.phone_number,
        role: Role::Seller,
        avatar: pending.avatar,
        zip_code: pending.zip_code,
        withdraw_method: None,
        available_balance: 0.0,
        transections: Vec::new(),
        created_at: Utc::now(),
    };
    shops.insert_one(&shop).await?;
    info!("shop {} activated", shop.id);

    seller_session(&data, shop)
}

/// POST /shop/login-shop
pub async fn login_shop(
    data: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    require_fields(&[&body.email, &body.password])?;

    let shop = data
        .mongodb
        .shops()
        .find_one(doc! { "email": &body.email })
        .await?
        .ok_or_else(|| ApiError::bad_request("User doesn't exists!"))?;

    if !verify_password(&body.password, &shop.password) {
        debug!("bad password for shop {}", shop.id);
        return Err(ApiError::bad_request("Please provide the correct information"));
    }

    seller_session(&data, shop)
}

/// GET /shop/getSeller
pub async fn get_seller(data: web::Data<AppState>, auth: AuthSeller) -> ApiResult<HttpResponse> {
    let shop = find_shop(&data, &auth.0.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "seller": shop.without_password() })))
}

/// GET /shop/logout
pub async fn logout_seller() -> HttpResponse {
    HttpResponse::Created()
        .cookie(expired_cookie(SELLER_COOKIE))
        .json(json!({ "success": true, "message": "Log out successful!" }))
}

/// GET /shop/get-shop-info/{id}
pub async fn get_shop_info(
    data: web::Data<AppState>,
    shop_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let shop = find_shop(&data, &shop_id).await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "shop": shop.without_password() })))
}

// ─── PROFILE ──────────────────────────────────────────────────────────────────

/// PUT /shop/update-shop-avatar
pub async fn update_shop_avatar(
    data: web::Data<AppState>,
    auth: AuthSeller,
    body: web::Json<UpdateAvatarRequest>,
) -> ApiResult<HttpResponse> {
    let shop = update_shop(&data, &auth.0.id, doc! { "avatar": &body.avatar }).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "seller": shop.without_password() })))
}

/// PUT /shop/update-seller-info
pub async fn update_seller_info(
    data: web::Data<AppState>,
    auth: AuthSeller,
    body: web::Json<UpdateSellerInfoRequest>,
) -> ApiResult<HttpResponse> {
    require_fields(&[&body.name, &body.address])?;

    let shop = update_shop(
        &data,
        &auth.0.id,
        doc! {
            "name": &body.name,
            "description": body.description.clone(),
            "address": &body.address,
            "phoneNumber": body.phone_number,
            "zipCode": body.zip_code,
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(json!({ "success": true, "shop": shop.without_password() })))
}

/// PUT /shop/update-payment-methods
pub async fn update_payment_methods(
    data: web::Data<AppState>,
    auth: AuthSeller,
    body: web::Json<PaymentMethodRequest>,
) -> ApiResult<HttpResponse> {
    let method = to_bson(&body.withdraw_method)?;
    let shop = update_shop(&data, &auth.0.id, doc! { "withdrawMethod": method }).await?;
    info!("seller {} updated payout method", shop.id);
    Ok(HttpResponse::Created().json(json!({ "success": true, "seller": shop.without_password() })))
}

/// DELETE /shop/delete-withdraw-method
pub async fn delete_withdraw_method(
    data: web::Data<AppState>,
    auth: AuthSeller,
) -> ApiResult<HttpResponse> {
    let shop = update_shop(&data, &auth.0.id, doc! { "withdrawMethod": Bson::Null }).await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "seller": shop.without_password() })))
}

// ─── ADMIN ────────────────────────────────────────────────────────────────────

/// GET /shop/admin-all-sellers
pub async fn admin_all_sellers(
    data: web::Data<AppState>,
    _admin: AuthAdmin,
) -> ApiResult<HttpResponse> {
    let cursor = data.mongodb.shops().find(doc! {}).await?;
    let mut sellers = collect_all(cursor).await?;
    newest_first(&mut sellers, |s| s.created_at);
    let sellers: Vec<Shop> = sellers.into_iter().map(Shop::without_password).collect();

    Ok(HttpResponse::Created().json(json!({ "success": true, "sellers": sellers })))
}

/// DELETE /shop/delete-seller/{id}
pub async fn delete_seller(
    data: web::Data<AppState>,
    admin: AuthAdmin,
    shop_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let result = data
        .mongodb
        .shops()
        .delete_one(doc! { "_id": shop_id.as_str() })
        .await?;
    if result.deleted_count == 0 {
        return Err(ApiError::bad_request("Seller is not available with this id"));
    }

    info!("admin {} deleted seller {}", admin.0.id, shop_id);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Seller deleted successfully!",
    })))
}
