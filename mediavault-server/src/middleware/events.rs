use crate::error::ServerError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Middleware that checks `X-Event-Token` when an event secret is configured
pub async fn require_event_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if let Some(expected) = &state.config.events.token {
        let presented = request
            .headers()
            .get("X-Event-Token")
            .and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            return Err(ServerError::Unauthorized("Invalid event token".into()));
        }
    }
    Ok(next.run(request).await)
}
