use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use log::error;
use thiserror::Error;

use crate::structs::Envelope;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransportError {
    pub fn validation(message: impl Into<String>) -> Self {
        TransportError::Validation(message.into())
    }

    pub fn not_found(what: &str) -> Self {
        TransportError::NotFound(format!("{what} not found"))
    }
}

impl ResponseError for TransportError {
    fn status_code(&self) -> StatusCode {
        match self {
            TransportError::Validation(_) => StatusCode::BAD_REQUEST,
            TransportError::NotFound(_) => StatusCode::NOT_FOUND,
            TransportError::Conflict(_) => StatusCode::CONFLICT,
            TransportError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            TransportError::Forbidden(_) => StatusCode::FORBIDDEN,
            TransportError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            TransportError::Internal(detail) => {
                error!("[Boundary] unhandled error: {}", detail);
                String::from("Server Error")
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(Envelope::<()>::failure(message))
    }
}

impl From<DieselError> for TransportError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => TransportError::NotFound(String::from("Record not found")),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                let detail = info.details().unwrap_or_else(|| info.message());
                TransportError::Conflict(format!("Duplicate value: {detail}"))
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                TransportError::Validation(format!("Invalid reference: {}", info.message()))
            }
            other => TransportError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for TransportError {
    fn from(err: r2d2::Error) -> Self {
        TransportError::Internal(format!("connection pool: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for TransportError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        // only token decoding goes through here, issuing maps its own failures
        match err.kind() {
            ErrorKind::ExpiredSignature => {
                TransportError::Unauthorized(String::from("Token expired"))
            }
            _ => TransportError::Unauthorized(String::from(
                "Not authorized to access this route",
            )),
        }
    }
}

impl From<bcrypt::BcryptError> for TransportError {
    fn from(err: bcrypt::BcryptError) -> Self {
        TransportError::Internal(format!("password hashing: {err}"))
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Internal(format!("json: {err}"))
    }
}

impl From<actix_web::error::BlockingError> for TransportError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        TransportError::Internal(format!("blocking task: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(
            TransportError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TransportError::not_found("Application").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TransportError::Conflict(String::new()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            TransportError::Unauthorized(String::new()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            TransportError::Forbidden(String::new()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(
            TransportError::not_found("Route").to_string(),
            "Route not found"
        );
    }

    #[test]
    fn missing_diesel_row_is_not_found() {
        let err: TransportError = DieselError::NotFound.into();
        assert!(matches!(err, TransportError::NotFound(_)));
    }
}
