use crate::models::entities::transaction::Transaction;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::r2d2;
use diesel::result::DatabaseErrorKind;
use http::StatusCode;
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    #[schema(example = "insufficient_balance")]
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum AuthError {
    MissingHeader,
    InvalidFormat,
    InvalidToken(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingHeader => write!(f, "Authorization header required"),
            AuthError::InvalidFormat => write!(f, "Invalid Authorization format"),
            AuthError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
        }
    }
}

#[derive(Debug)]
pub enum GatewayError {
    /// Transport failure, timeout or 5xx; retried by reconciliation.
    Unavailable(String),
    NotFound(String),
    Rejected(String),
    InvalidResponse(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Unavailable(msg) => write!(f, "Gateway unavailable: {}", msg),
            GatewayError::NotFound(msg) => write!(f, "Gateway resource not found: {}", msg),
            GatewayError::Rejected(msg) => write!(f, "Gateway rejected request: {}", msg),
            GatewayError::InvalidResponse(msg) => write!(f, "Invalid gateway response: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

#[derive(Debug)]
pub enum ApiError {
    Database(diesel::result::Error),
    DatabaseConnection(String),
    Validation(validator::ValidationErrors),
    Auth(AuthError),
    Forbidden(String),
    NotFound(String),
    InvalidAmount(String),
    InsufficientBalance { requested: i64, available: i64 },
    AlreadyFinalized(String),
    InvalidTransition(String),
    /// Carries the transaction that already owns the payment reference.
    DuplicatePaymentReference(Box<Transaction>),
    GatewayUnavailable(String),
    PaymentFailed(String),
    Webhook(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Database(diesel::result::Error::NotFound) => "not_found",
            ApiError::Database(_) => "database_error",
            ApiError::DatabaseConnection(_) => "database_unavailable",
            ApiError::Validation(_) => "validation_error",
            ApiError::Auth(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidAmount(_) => "invalid_amount",
            ApiError::InsufficientBalance { .. } => "insufficient_balance",
            ApiError::AlreadyFinalized(_) => "already_finalized",
            ApiError::InvalidTransition(_) => "invalid_transition",
            ApiError::DuplicatePaymentReference(_) => "duplicate_payment_reference",
            ApiError::GatewayUnavailable(_) => "gateway_unavailable",
            ApiError::PaymentFailed(_) => "payment_failed",
            ApiError::Webhook(_) => "invalid_webhook",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Database(diesel::result::Error::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::DatabaseConnection(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Validation(_)
            | ApiError::InvalidAmount(_)
            | ApiError::InvalidTransition(_)
            | ApiError::Webhook(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(AuthError::InvalidFormat) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::AlreadyFinalized(_) => StatusCode::CONFLICT,
            ApiError::DuplicatePaymentReference(_) => StatusCode::OK,
            ApiError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            ApiError::Database(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _
            ))
        )
    }

    // Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::Database(diesel::result::Error::NotFound) => "Resource not found".into(),
            ApiError::Database(_) => "Database error".into(),
            ApiError::DatabaseConnection(_) => "Database unavailable".into(),
            ApiError::Internal(_) => "Internal server error".into(),
            ApiError::GatewayUnavailable(_) => {
                "Payment gateway is temporarily unavailable, the payment is still being processed"
                    .into()
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Database(e) => write!(f, "Database error: {}", e),
            ApiError::DatabaseConnection(e) => write!(f, "Database connection error: {}", e),
            ApiError::Validation(e) => write!(f, "Validation error: {}", e),
            ApiError::Auth(e) => write!(f, "Authentication error: {}", e),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            ApiError::InsufficientBalance {
                requested,
                available,
            } => write!(
                f,
                "Insufficient balance: requested {}, available {}",
                requested, available
            ),
            ApiError::AlreadyFinalized(msg) => write!(f, "Already finalized: {}", msg),
            ApiError::InvalidTransition(msg) => write!(f, "Invalid status transition: {}", msg),
            ApiError::DuplicatePaymentReference(tx) => write!(
                f,
                "Payment reference already recorded by transaction {}",
                tx.transaction_id
            ),
            ApiError::GatewayUnavailable(msg) => write!(f, "Gateway unavailable: {}", msg),
            ApiError::PaymentFailed(msg) => write!(f, "Payment failed: {}", msg),
            ApiError::Webhook(msg) => write!(f, "Webhook error: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Database(e) => Some(e),
            ApiError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<r2d2::PoolError> for ApiError {
    fn from(err: r2d2::PoolError) -> Self {
        ApiError::DatabaseConnection(err.to_string())
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        ApiError::Database(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(msg) | GatewayError::InvalidResponse(msg) => {
                ApiError::GatewayUnavailable(msg)
            }
            GatewayError::NotFound(msg) => ApiError::NotFound(msg),
            GatewayError::Rejected(msg) => ApiError::PaymentFailed(msg),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::GatewayUnavailable(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ApiErrorResponse {
            code: self.code().to_string(),
            message: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}
