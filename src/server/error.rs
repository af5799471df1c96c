// file: src/server/error.rs
// description: maps agent errors onto HTTP responses
// reference: https://docs.rs/axum/latest/axum/response/trait.IntoResponse.html

use crate::error::AgentError;
use crate::models::ErrorBody;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

impl AgentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AgentError::Validation(_) => StatusCode::BAD_REQUEST,
            err if err.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AgentError::Validation(message) => message.clone(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!("Request failed: {}", message);
        } else {
            warn!("Request rejected: {}", message);
        }

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AgentError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AgentError::Elasticsearch("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AgentError::Model("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AgentError::Config("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
