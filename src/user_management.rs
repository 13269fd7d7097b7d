// src/user_management.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{debug, info};
use mongodb::bson::{doc, to_bson};
use mongodb::options::ReturnDocument;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::{
    create_activation_token, create_jwt, expired_cookie, hash_password, read_activation_token,
    session_cookie, verify_password, AuthAdmin, AuthUser, USER_COOKIE,
};
use crate::db::{collect_all, newest_first};
use crate::error::{ApiError, ApiResult};
use crate::mailer::activation_email;
use crate::models::{new_id, upsert_address, Address, Role, User};
use crate::validation::{require_email, require_fields};

// ─── REQUEST PAYLOADS ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
}

/// Account waiting for its owner to follow the activation link.
#[derive(Debug, Serialize, Deserialize)]
struct PendingUser {
    name: String,
    email: String,
    password: String,
    avatar: Option<String>,
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
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInfoRequest {
    pub email: String,
    pub password: String,
    pub phone_number: Option<i64>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvatarRequest {
    pub avatar: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

// ─── HELPERS ──────────────────────────────────────────────────────────────────

async fn find_user(data: &AppState, user_id: &str) -> ApiResult<User> {
    data.mongodb
        .users()
        .find_one(doc! { "_id": user_id })
        .await?
        .ok_or_else(|| ApiError::bad_request("User doesn't exists"))
}

fn user_session(data: &AppState, user: User) -> ApiResult<HttpResponse> {
    let token = create_jwt(
        &user.id,
        user.role,
        &data.config.jwt_secret,
        data.config.jwt_expires_days,
    )?;
    Ok(HttpResponse::Created()
        .cookie(session_cookie(USER_COOKIE, token.clone(), data.config.jwt_expires_days))
        .json(json!({ "success": true, "user": user.without_password(), "token": token })))
}

// ─── SIGNUP & SESSION ─────────────────────────────────────────────────────────

/// POST /user/create-user
/// Emails an activation link; the account is only stored once activated.
pub async fn create_user(
    data: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    require_fields(&[&body.name, &body.email, &body.password])?;
    require_email(&body.email)?;

    if data
        .mongodb
        .users()
        .find_one(doc! { "email": &body.email })
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request("User already exists"));
    }

    let pending = PendingUser {
        name: body.name,
        email: body.email,
        password: hash_password(&body.password)?,
        avatar: body.avatar,
    };
    let token = create_activation_token(&pending, &data.config.activation_secret)?;
    let activation_url = format!("{}/activation/{}", data.config.frontend_origin, token);

    data.mailer
        .send(
            &pending.email,
            "Activate your account",
            &activation_email(&pending.name, &activation_url),
        )
        .await?;

    info!("activation mail sent for new user {}", pending.email);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": format!("please check your email:- {} to activate your account!", pending.email),
    })))
}

/// POST /user/activation
pub async fn activate_user(
    data: web::Data<AppState>,
    body: web::Json<ActivationRequest>,
) -> ApiResult<HttpResponse> {
    let pending: PendingUser =
        read_activation_token(&body.activation_token, &data.config.activation_secret)?;

    let users = data.mongodb.users();
    if users
        .find_one(doc! { "email": &pending.email })
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request("User already exists"));
    }

    let user = User {
        id: new_id(),
        name: pending.name,
        email: pending.email,
        password: pending.password,
        phone_number: None,
        addresses: Vec::new(),
        role: Role::User,
        avatar: pending.avatar,
        created_at: Utc::now(),
    };
    users.insert_one(&user).await?;
    info!("user {} activated", user.id);

    user_session(&data, user)
}

/// POST /user/login-user
pub async fn login_user(
    data: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    require_fields(&[&body.email, &body.password])?;

    let user = data
        .mongodb
        .users()
        .find_one(doc! { "email": &body.email })
        .await?
        .ok_or_else(|| ApiError::bad_request("User doesn't exists!"))?;

    if !verify_password(&body.password, &user.password) {
        debug!("bad password for user {}", user.id);
        return Err(ApiError::bad_request("Please provide the correct information"));
    }

    user_session(&data, user)
}

/// GET /user/getuser
pub async fn get_user(data: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let user = find_user(&data, &auth.0.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": user.without_password() })))
}

/// GET /user/logout
pub async fn logout_user() -> HttpResponse {
    HttpResponse::Created()
        .cookie(expired_cookie(USER_COOKIE))
        .json(json!({ "success": true, "message": "Log out successful!" }))
}

// ─── PROFILE ──────────────────────────────────────────────────────────────────

/// PUT /user/update-user-info
/// Requires the current password.
pub async fn update_user_info(
    data: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<UpdateUserInfoRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    require_fields(&[&body.name, &body.email])?;
    require_email(&body.email)?;

    let user = find_user(&data, &auth.0.id).await?;
    if !verify_password(&body.password, &user.password) {
        return Err(ApiError::bad_request("Please provide the correct information"));
    }

    let users = data.mongodb.users();
    if body.email != user.email
        && users
            .find_one(doc! { "email": &body.email })
            .await?
            .is_some()
    {
        return Err(ApiError::bad_request("User already exists"));
    }

    let updated = users
        .find_one_and_update(
            doc! { "_id": &user.id },
            doc! { "$set": {
                "name": &body.name,
                "email": &body.email,
                "phoneNumber": body.phone_number,
            } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::bad_request("User not found"))?;

    Ok(HttpResponse::Created().json(json!({ "success": true, "user": updated.without_password() })))
}

/// PUT /user/update-avatar
pub async fn update_avatar(
    data: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<UpdateAvatarRequest>,
) -> ApiResult<HttpResponse> {
    let updated = data
        .mongodb
        .users()
        .find_one_and_update(
            doc! { "_id": &auth.0.id },
            doc! { "$set": { "avatar": &body.avatar } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::bad_request("User doesn't exists"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": updated.without_password() })))
}

/// PUT /user/update-user-addresses
pub async fn update_user_addresses(
    data: web::Data<AppState>,
    auth: AuthUser,
    address: web::Json<Address>,
) -> ApiResult<HttpResponse> {
    let mut user = find_user(&data, &auth.0.id).await?;
    upsert_address(&mut user.addresses, address.into_inner())?;

    data.mongodb
        .users()
        .update_one(
            doc! { "_id": &user.id },
            doc! { "$set": { "addresses": to_bson(&user.addresses)? } },
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": user.without_password() })))
}

/// DELETE /user/delete-user-address/{id}
pub async fn delete_user_address(
    data: web::Data<AppState>,
    auth: AuthUser,
    address_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let updated = data
        .mongodb
        .users()
        .find_one_and_update(
            doc! { "_id": &auth.0.id },
            doc! { "$pull": { "addresses": { "_id": address_id.as_str() } } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::bad_request("User doesn't exists"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": updated.without_password() })))
}

/// PUT /user/update-user-password
pub async fn update_user_password(
    data: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<UpdatePasswordRequest>,
) -> ApiResult<HttpResponse> {
    let user = find_user(&data, &auth.0.id).await?;
    if !verify_password(&body.old_password, &user.password) {
        return Err(ApiError::bad_request("Old password is incorrect!"));
    }
    if body.new_password != body.confirm_password {
        return Err(ApiError::bad_request(
            "Password doesn't matched with each other!",
        ));
    }
    require_fields(&[&body.new_password])?;

    let hashed = hash_password(&body.new_password)?;
    data.mongodb
        .users()
        .update_one(doc! { "_id": &user.id }, doc! { "$set": { "password": hashed } })
        .await?;

    info!("user {} changed password", user.id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password updated successfully!",
    })))
}

/// GET /user/user-info/{id}
pub async fn get_user_info(
    data: web::Data<AppState>,
    user_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = find_user(&data, &user_id).await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "user": user.without_password() })))
}

// ─── ADMIN ────────────────────────────────────────────────────────────────────

/// GET /user/admin-all-users
pub async fn admin_all_users(
    data: web::Data<AppState>,
    _admin: AuthAdmin,
) -> ApiResult<HttpResponse> {
    let cursor = data.mongodb.users().find(doc! {}).await?;
    let mut users = collect_all(cursor).await?;
    newest_first(&mut users, |u| u.created_at);
    let users: Vec<User> = users.into_iter().map(User::without_password).collect();

    Ok(HttpResponse::Created().json(json!({ "success": true, "users": users })))
}

/// DELETE /user/delete-user/{id}
pub async fn delete_user(
    data: web::Data<AppState>,
    admin: AuthAdmin,
    user_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let users = data.mongodb.users();
    let result = users.delete_one(doc! { "_id": user_id.as_str() }).await?;
    if result.deleted_count == 0 {
        return Err(ApiError::bad_request("User is not available with this id"));
    }

    info!("admin {} deleted user {}", admin.0.id, user_id);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "User deleted successfully!",
    })))
}
