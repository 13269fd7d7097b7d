// src/auth.rs

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use futures::future::{ok, ready, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::Role;

pub const USER_COOKIE: &str = "token";
pub const SELLER_COOKIE: &str = "seller_token";

/// Activation links stay valid for five minutes.
const ACTIVATION_TTL_MINUTES: i64 = 5;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct ActivationClaims<T> {
    account: T,
    exp: usize,
}

pub fn create_jwt(id: &str, role: Role, secret: &str, ttl_days: i64) -> Result<String, ApiError> {
    let expiration = Utc::now() + Duration::days(ttl_days);
    let claims = Claims {
        sub: id.to_string(),
        role,
        exp: expiration.timestamp() as usize,
    };
    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))?)
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Signs a pending account into a short-lived activation token.
pub fn create_activation_token<T: Serialize>(account: &T, secret: &str) -> Result<String, ApiError> {
    let claims = ActivationClaims {
        account,
        exp: (Utc::now() + Duration::minutes(ACTIVATION_TTL_MINUTES)).timestamp() as usize,
    };
    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))?)
}

pub fn read_activation_token<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, ApiError> {
    let data = decode::<ActivationClaims<T>>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("activation token rejected: {}", e);
        ApiError::bad_request("Invalid token")
    })?;
    Ok(data.claims.account)
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    Ok(hash(password, DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hashed: &str) -> bool {
    verify(password, hashed).unwrap_or(false)
}

/// Session cookie carrying a login token.
pub fn session_cookie(name: &'static str, token: String, ttl_days: i64) -> Cookie<'static> {
    Cookie::build(name, token)
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .max_age(CookieDuration::days(ttl_days))
        .finish()
}

pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "")
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .finish();
    cookie.make_removal();
    cookie
}

/// An authenticated account resolved from a token.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

/// Accounts resolved for the current request; a browser may be logged in
/// as a buyer and a seller at the same time.
#[derive(Debug, Clone, Default)]
pub struct Principals {
    pub user: Option<Principal>,
    pub seller: Option<Principal>,
}

impl Principals {
    fn insert(&mut self, claims: Claims) {
        let principal = Principal {
            id: claims.sub,
            role: claims.role,
        };
        match principal.role {
            Role::Seller => self.seller = Some(principal),
            Role::User | Role::Admin => self.user = Some(principal),
        }
    }

    /// Whether either logged-in account has this id.
    pub fn holds(&self, id: &str) -> bool {
        [&self.user, &self.seller]
            .into_iter()
            .flatten()
            .any(|p| p.id == id)
    }
}

fn principals(req: &HttpRequest) -> Principals {
    req.extensions().get::<Principals>().cloned().unwrap_or_default()
}

/// A logged-in buyer (or admin).
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

/// A logged-in seller.
#[derive(Debug, Clone)]
pub struct AuthSeller(pub Principal);

/// A logged-in buyer whose role is `Admin`.
#[derive(Debug, Clone)]
pub struct AuthAdmin(pub Principal);

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            principals(req)
                .user
                .map(AuthUser)
                .ok_or_else(|| ApiError::Unauthorized("Please login to continue".into())),
        )
    }
}

impl FromRequest for AuthSeller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            principals(req)
                .seller
                .map(AuthSeller)
                .ok_or_else(|| ApiError::Unauthorized("Please login to continue".into())),
        )
    }
}

impl FromRequest for AuthAdmin {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match principals(req).user {
            Some(p) if p.role == Role::Admin => Ok(AuthAdmin(p)),
            Some(p) => Err(ApiError::Forbidden(format!(
                "{:?} can not access this resources!",
                p.role
            ))),
            None => Err(ApiError::Unauthorized("Please login to continue".into())),
        };
        ready(result)
    }
}

/// Any logged-in account, buyer or seller.
impl FromRequest for Principals {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let found = principals(req);
        ready(if found.user.is_none() && found.seller.is_none() {
            Err(ApiError::Unauthorized("Please login to continue".into()))
        } else {
            Ok(found)
        })
    }
}

/// Resolves bearer and cookie tokens into [`Principals`] on every request.
///
/// Requests without credentials pass through untouched; handlers decide
/// whether they need an account through the extractors above.
#[derive(Debug, Clone)]
pub struct Authentication {
    secret: Rc<str>,
}

impl Authentication {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Rc::from(secret),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service,
            secret: self.secret.clone(),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    secret: Rc<str>,
}

impl<S> AuthMiddleware<S> {
    fn resolve(&self, req: &ServiceRequest) -> Result<Principals, jsonwebtoken::errors::Error> {
        let mut found = Principals::default();

        // unreadable session cookies count as logged out
        for name in [USER_COOKIE, SELLER_COOKIE] {
            let Some(cookie) = req.cookie(name) else { continue };
            if cookie.value().is_empty() {
                continue;
            }
            match validate_jwt(cookie.value(), &self.secret) {
                Ok(claims) => found.insert(claims),
                Err(e) => debug!("ignoring {} cookie: {}", name, e),
            }
        }

        // an explicit bearer token must be valid
        if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
            if let Ok(auth_str) = auth_header.to_str() {
                if let Some(token) = auth_str.strip_prefix("Bearer ") {
                    found.insert(validate_jwt(token.trim(), &self.secret)?);
                }
            }
        }

        Ok(found)
    }
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.resolve(&req) {
            Ok(principals) => {
                req.extensions_mut().insert(principals);
            }
            Err(e) => {
                debug!("rejecting request with bad token: {}", e);
                let resp = ApiError::Unauthorized("Invalid token".into())
                    .error_response()
                    .map_into_boxed_body();
                let (req_parts, _payload) = req.into_parts();
                let srv_resp = ServiceResponse::new(req_parts, resp);
                return Box::pin(async move { Ok(srv_resp) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{call_and_read_body, call_service, init_service, TestRequest};
    use actix_web::{http::StatusCode, web, App, HttpResponse};

    const SECRET: &str = "test-secret";

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.0.id)
    }

    async fn seller_only(seller: AuthSeller) -> HttpResponse {
        HttpResponse::Ok().body(seller.0.id)
    }

    async fn admin_only(admin: AuthAdmin) -> HttpResponse {
        HttpResponse::Ok().body(admin.0.id)
    }

    #[test]
    fn jwt_round_trip_keeps_role() {
        let token = create_jwt("shop-1", Role::Seller, SECRET, 1).unwrap();
        let claims = validate_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "shop-1");
        assert_eq!(claims.role, Role::Seller);
        assert!(validate_jwt(&token, "other-secret").is_err());
    }

    #[test]
    fn activation_token_carries_pending_account() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Pending {
            email: String,
        }
        let pending = Pending {
            email: "new@example.com".into(),
        };
        let token = create_activation_token(&pending, SECRET).unwrap();
        let back: Pending = read_activation_token(&token, SECRET).unwrap();
        assert_eq!(back, pending);

        let err = read_activation_token::<Pending>(&token, "nope").unwrap_err();
        assert_eq!(err.to_string(), "Invalid token");
    }

    #[test]
    fn holds_checks_both_accounts() {
        let mut both = Principals::default();
        assert!(!both.holds("u1"));
        both.insert(validate_jwt(&create_jwt("u1", Role::User, SECRET, 1).unwrap(), SECRET).unwrap());
        both.insert(validate_jwt(&create_jwt("s1", Role::Seller, SECRET, 1).unwrap(), SECRET).unwrap());
        assert!(both.holds("u1"));
        assert!(both.holds("s1"));
        assert!(!both.holds("s2"));
    }

    #[test]
    fn password_hashes_verify() {
        let hashed = hash("hunter22", 4).unwrap();
        assert!(verify_password("hunter22", &hashed));
        assert!(!verify_password("hunter23", &hashed));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }

    #[actix_web::test]
    async fn bearer_and_cookie_tokens_resolve_to_principals() {
        let app = init_service(
            App::new()
                .wrap(Authentication::new(SECRET))
                .route("/me", web::get().to(whoami))
                .route("/shop", web::get().to(seller_only)),
        )
        .await;

        let user_token = create_jwt("user-1", Role::User, SECRET, 1).unwrap();
        let req = TestRequest::get()
            .uri("/me")
            .insert_header((http::header::AUTHORIZATION, format!("Bearer {user_token}")))
            .to_request();
        let body = call_and_read_body(&app, req).await;
        assert_eq!(body, "user-1");

        let seller_token = create_jwt("shop-9", Role::Seller, SECRET, 1).unwrap();
        let req = TestRequest::get()
            .uri("/shop")
            .cookie(Cookie::new(SELLER_COOKIE, seller_token))
            .to_request();
        let body = call_and_read_body(&app, req).await;
        assert_eq!(body, "shop-9");
    }

    #[actix_web::test]
    async fn missing_or_bad_tokens_are_rejected() {
        let app = init_service(
            App::new()
                .wrap(Authentication::new(SECRET))
                .route("/me", web::get().to(whoami))
                .route("/admin", web::get().to(admin_only)),
        )
        .await;

        let resp = call_service(&app, TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::get()
            .uri("/me")
            .insert_header((http::header::AUTHORIZATION, "Bearer garbage"))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::get()
            .uri("/me")
            .cookie(Cookie::new(USER_COOKIE, "expired-or-forged"))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let user_token = create_jwt("user-1", Role::User, SECRET, 1).unwrap();
        let req = TestRequest::get()
            .uri("/admin")
            .insert_header((http::header::AUTHORIZATION, format!("Bearer {user_token}")))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let admin_token = create_jwt("root", Role::Admin, SECRET, 1).unwrap();
        let req = TestRequest::get()
            .uri("/admin")
            .insert_header((http::header::AUTHORIZATION, format!("Bearer {admin_token}")))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
