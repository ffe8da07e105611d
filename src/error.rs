use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Account {0} is inactive")]
    AccountInactive(i64),

    #[error("Insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: i64, required: i64 },

    #[error("Insufficient stock for product {product_id}: have {available}, need {requested}")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    #[error("Concurrent update conflict: {0}")]
    ConcurrencyError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status_code, error_code, message, details) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                    None,
                )
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None)
            }
            AppError::AccountInactive(id) => {
                log::warn!("Rejected operation on inactive account {id}");
                (
                    StatusCode::BAD_REQUEST,
                    "ACCOUNT_INACTIVE",
                    self.to_string(),
                    None,
                )
            }
            AppError::InsufficientBalance { balance, required } => (
                StatusCode::BAD_REQUEST,
                "INSUFFICIENT_BALANCE",
                self.to_string(),
                // current balance travels with the error so the cashier UI
                // can show how much is missing
                Some(json!({ "balance": balance, "required": required })),
            ),
            AppError::InsufficientStock {
                product_id,
                available,
                requested,
            } => (
                StatusCode::BAD_REQUEST,
                "INSUFFICIENT_STOCK",
                self.to_string(),
                Some(json!({
                    "product_id": product_id,
                    "available": available,
                    "requested": requested
                })),
            ),
            AppError::ConcurrencyError(msg) => {
                log::warn!("Concurrent update conflict: {msg}");
                (
                    StatusCode::CONFLICT,
                    "CONCURRENT_UPDATE",
                    "The account was modified concurrently, please retry".to_string(),
                    None,
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::MigrateError(err) => {
                log::error!("Migration error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MIGRATION_ERROR",
                    "Migration error".to_string(),
                    None,
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let error_body = crate::models::ApiError {
            code: error_code.to_string(),
            message,
            details,
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": error_body
        }))
    }
}
