use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Only college emails (@{0}) are allowed.")]
    DomainRestricted(String),

    #[error("User already exists with this email")]
    AlreadyRegistered,

    #[error("Invalid or expired OTP")]
    InvalidOrExpiredCode,

    #[error("Please provide email and password")]
    MissingCredentials,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Please upload a photo")]
    MissingFile,

    #[error("Please upload an image")]
    MissingImage,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Item is already claimed")]
    AlreadyClaimed,

    #[error("Item cannot move from {from} to {to}")]
    InvalidStatus { from: String, to: String },

    #[error("You are not logged in. Please log in to get access.")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("upload error: {0}")]
    Upload(#[from] std::io::Error),

    #[error("email delivery failed: {0}")]
    Email(String),

    #[error("identity provider error: {0}")]
    IdentityProvider(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    fn is_server_fault(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Upload(_)
                | AppError::Email(_)
                | AppError::IdentityProvider(_)
                | AppError::Internal(_)
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("token error: {}", err))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("hashing error: {}", err))
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::Validation(format!("Malformed upload: {}", err))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DomainRestricted(_)
            | AppError::AlreadyRegistered
            | AppError::InvalidOrExpiredCode
            | AppError::MissingCredentials
            | AppError::MissingFile
            | AppError::MissingImage
            | AppError::AlreadyClaimed
            | AppError::InvalidStatus { .. }
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::IdentityProvider(_)
            | AppError::Upload(_)
            | AppError::Email(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if self.is_server_fault() {
            error!("{}", self);
            return HttpResponse::build(status).json(json!({ "status": "fail" }));
        }
        HttpResponse::build(status).json(json!({
            "status": "fail",
            "message": self.to_string(),
        }))
    }
}
