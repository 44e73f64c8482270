use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mediavault_core::CoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ServerError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "Unauthorized", msg.clone()),
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "MalformedInput", msg.clone()),
            ServerError::Core(err) => {
                let status = match err {
                    CoreError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                    CoreError::StateConflict(_) => StatusCode::CONFLICT,
                    CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                    CoreError::MalformedInput(_) => StatusCode::BAD_REQUEST,
                    CoreError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                tracing::debug!("Request refused: {}", err);
                (status, err.kind(), err.reason().to_string())
            }
        };

        (status, Json(json!({ "error": message, "kind": kind }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_status() {
        let cases = [
            (CoreError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (CoreError::StateConflict("x".into()), StatusCode::CONFLICT),
            (CoreError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CoreError::MalformedInput("x".into()), StatusCode::BAD_REQUEST),
            (
                CoreError::UpstreamUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).into_response().status(), status);
        }
        assert_eq!(
            ServerError::Unauthorized("x".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
