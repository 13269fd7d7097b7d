use actix_web::error::{JsonPayloadError, PathError};
use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use log::{error, warn};
use serde_json::json;
use thiserror::Error;

use crate::mailer::MailError;
use crate::stripe::PaymentError;

/// Error returned by every controller.
///
/// Client-facing variants carry the message shown to the storefront; the
/// wrapped library errors are logged and reported as a generic 500/502.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    fn client_message(&self) -> String {
        match self {
            Self::BadRequest(m) | Self::Unauthorized(m) | Self::Forbidden(m) | Self::NotFound(m) => {
                m.clone()
            }
            Self::Token(_) => "Invalid token".to_string(),
            Self::Payment(_) => "Payment provider error".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Token(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Bson(_) | Self::Hash(_) | Self::Mail(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("request failed: {}", self);
        }
        HttpResponse::build(status).json(json!({
            "success": false,
            "message": self.client_message(),
        }))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn body_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("rejected body for {}: {}", req.path(), err);
    let message = match &err {
        JsonPayloadError::Deserialize(e) if e.to_string().starts_with("missing field") => {
            "Please provide the all fields!"
        }
        _ => "Invalid request body",
    };
    ApiError::bad_request(message).into()
}

fn path_error(err: PathError, req: &HttpRequest) -> actix_web::Error {
    warn!("rejected path {}: {}", req.path(), err);
    ApiError::bad_request("Invalid id in request path").into()
}

/// Extractor configs so malformed bodies and paths answer in the
/// `{"success":false,"message"}` envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(body_error)
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(path_error)
}
