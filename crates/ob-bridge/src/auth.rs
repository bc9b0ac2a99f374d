//! Bearer API-key authentication for the Control API.
//!
//! Every request must carry `Authorization: Bearer <key>`; the key resolves
//! to an active user (with membership project ids) which is inserted into
//! the request extensions as [`CurrentUser`]. Unknown or missing keys get a
//! 401 problem response.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use ob_core::types::CurrentUser;
use tracing::debug;

use crate::http_api::state::ApiState;
use crate::problem::Problem;

/// Extract the bearer token from an `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Authentication middleware: resolves the API key to a [`CurrentUser`] or
/// fails with 401.
pub async fn require_api_key(
    State(state): State<Arc<ApiState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return Problem::http(401, "Not authenticated").into_response();
    };

    match state.db.find_user_by_api_key(token).await {
        Ok(Some(user)) => {
            debug!(user_id = user.user.id, "api key accepted");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => Problem::http(401, "Invalid API key").into_response(),
        Err(err) => Problem::from(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        let headers = headers_with("Bearer secret123");
        assert_eq!(bearer_token(&headers), Some("secret123"));
    }

    #[test]
    fn rejects_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        let headers = headers_with("Basic dXNlcjpwdw==");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn rejects_empty_token() {
        let headers = headers_with("Bearer ");
        assert_eq!(bearer_token(&headers), None);
    }
}
