use crate::entities::TransitionError;
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: &'static str,
    details: Option<String>,
}

impl AppError {
    pub fn new(status: StatusCode, message: &'static str) -> Self {
        Self {
            status,
            message,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    // Common error constructors
    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: &'static str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: &'static str) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: &'static str) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal_server_error(message: &'static str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn service_unavailable(message: &'static str) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("Resource not found"),

            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::conflict("Resource already exists").with_details(db_err.message().to_string())
            }

            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                Self::not_found("Referenced resource not found")
            }

            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                Self::bad_request("Constraint violated").with_details(db_err.message().to_string())
            }

            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::service_unavailable("Database unavailable")
            }

            other => {
                error!("Unexpected database error: {:?}", other);
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

impl From<axum::Error> for AppError {
    fn from(err: axum::Error) -> Self {
        Self::internal_server_error("Internal server error").with_details(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::bad_request("Validation error").with_details(err.to_string())
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NotReceiver => {
                Self::forbidden("Only the receiver can respond to this request")
            }
            TransitionError::NotSender => Self::forbidden("Only the sender can withdraw this request"),
            TransitionError::NotPending(status) => Self::conflict("Connection request is no longer pending")
                .with_details(format!("Connection is {:?}", status)),
            TransitionError::AlreadyPending => {
                Self::conflict("A connection request is already pending between these users")
            }
            TransitionError::AlreadyConnected => Self::conflict("Users are already connected"),
            TransitionError::Blocked => Self::forbidden("You cannot connect with this user"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(ErrorResponse {
            error: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ConnectionStatus;

    #[test]
    fn transition_errors_map_to_taxonomy() {
        assert_eq!(AppError::from(TransitionError::NotReceiver).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::from(TransitionError::NotSender).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::from(TransitionError::Blocked).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::from(TransitionError::NotPending(ConnectionStatus::Accepted)).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::from(TransitionError::AlreadyPending).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn row_not_found_is_404() {
        assert_eq!(AppError::from(sqlx::Error::RowNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::from(sqlx::Error::PoolTimedOut).status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
