//! Unified Error Handling
//!
//! Provides the application-wide error type and the response envelope every
//! handler returns. Each error carries a machine-readable code and a human
//! message that names the offending value, so callers can self-diagnose
//! without extra queries.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Unified API response structure
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Authentication Errors ==========
    #[error("Token de acesso requerido")]
    Unauthorized,

    #[error("Token expirado")]
    TokenExpired,

    #[error("Token inválido: {0}")]
    InvalidToken(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Acesso negado")]
    AccessDenied,

    // ========== Business Logic Errors ==========
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Status inválido: '{0}'")]
    InvalidStatus(String),

    #[error("Não é possível alterar de '{from}' para '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Pedido não pode ser cancelado no status '{0}'")]
    CannotCancel(String),

    #[error("Produto {0} está inativo")]
    ProductInactive(String),

    #[error("Estoque insuficiente para {product}. Disponível: {available}")]
    InsufficientStock { product: String, available: i64 },

    #[error("Operação ultrapassa o limite de estoque (máx. {0}).")]
    StockLimitExceeded(i64),

    #[error("{0}")]
    InvalidStock(String),

    #[error("Tipo de devolução deve ser \"defect\" ou \"no_defect\"")]
    InvalidReturnType,

    #[error("Prazo de devolução expirado. Máximo {max_days} dias para {kind}")]
    ReturnPeriodExpired { max_days: i64, kind: String },

    #[error("Já existe uma solicitação de devolução para este pedido")]
    ReturnAlreadyExists,

    // ========== System Errors ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn database(message: impl Into<String>) -> Self {
        AppError::Database(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }

    /// Machine-readable error code, part of the response contract
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "NO_TOKEN",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidToken(_) => "INVALID_TOKEN",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::AccessDenied => "ACCESS_DENIED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "INVALID_INPUT",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidStatus(_) => "INVALID_STATUS",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::CannotCancel(_) => "CANNOT_CANCEL",
            AppError::ProductInactive(_) => "PRODUCT_INACTIVE",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::StockLimitExceeded(_) => "STOCK_LIMIT_EXCEEDED",
            AppError::InvalidStock(_) => "INVALID_STOCK",
            AppError::InvalidReturnType => "INVALID_RETURN_TYPE",
            AppError::ReturnPeriodExpired { .. } => "RETURN_PERIOD_EXPIRED",
            AppError::ReturnAlreadyExists => "RETURN_ALREADY_EXISTS",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized
            | AppError::TokenExpired
            | AppError::InvalidToken(_)
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::ReturnAlreadyExists => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Do not leak storage details to callers
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                "Erro interno do servidor".to_string()
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                "Erro interno do servidor".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(AppResponse::<()> {
            code: self.code().to_string(),
            message,
            data: None,
        });

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "OK".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}

/// Create a successful response with custom message
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "OK".to_string(),
        message: message.into(),
        data: Some(data),
    })
}
