//! Bearer token authentication.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// The authenticated caller, identified by email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

/// Token from `Authorization: Bearer …`, or from a `token` query parameter
/// for clients that cannot set headers on a WebSocket upgrade.
pub fn request_token(parts: &Parts) -> Option<String> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());
    header.or_else(|| {
        parts.uri.query()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == "token" && !value.is_empty()).then(|| value.to_string())
        })
    })
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = request_token(parts).ok_or(ApiError::Unauthorized)?;
        state.user_for(&token).map(AuthUser).ok_or_else(|| {
            tracing::debug!("Rejected unknown token");
            ApiError::Unauthorized
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_header_token() {
        let request = Request::builder()
            .uri("/ws")
            .header(AUTHORIZATION, "Bearer abc")
            .body(())
            .unwrap();
        assert_eq!(request_token(&parts(request)).as_deref(), Some("abc"));
    }

    #[test]
    fn test_query_token() {
        let request = Request::builder().uri("/ws?x=1&token=xyz").body(()).unwrap();
        assert_eq!(request_token(&parts(request)).as_deref(), Some("xyz"));
        let request = Request::builder().uri("/ws").body(()).unwrap();
        assert_eq!(request_token(&parts(request)), None);
    }
}
