use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

/// Bearer token from the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> ServerResult<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServerError::Unauthorized("Missing bearer token".into()))
}

/// Middleware that resolves the caller and stores its `Identity` in request extensions
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let token = bearer_token(request.headers())?.to_string();

    let identity = state
        .vault
        .resolve_caller(&token)
        .await?
        .ok_or_else(|| ServerError::Unauthorized("Unknown bearer token".into()))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
