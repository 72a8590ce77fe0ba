use crate::core::error::AccessError;
use crate::core::state::AppState;
use crate::models::principal::Principal;
use crate::stores::session_store::SessionToken;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use std::convert::Infallible;
use std::sync::Arc;

pub const SESSION_HEADER: &str = "x-session-token";

/// Session token from `Authorization: Bearer <token>` or `x-session-token`
pub fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|t| !t.is_empty())
        })
        .map(SessionToken::new)
}

pub fn resolve_principal(state: &AppState, headers: &HeaderMap) -> Option<Arc<Principal>> {
    session_token(headers).and_then(|token| state.sessions.get(&token))
}

/// Principal of an authenticated caller; rejects with 401 otherwise
pub struct CurrentPrincipal(pub Arc<Principal>);

impl FromRequestParts<Arc<AppState>> for CurrentPrincipal {
    type Rejection = AccessError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        resolve_principal(state, &parts.headers)
            .map(CurrentPrincipal)
            .ok_or(AccessError::Unauthenticated)
    }
}

/// Principal if the caller has a live session
pub struct MaybePrincipal(pub Option<Arc<Principal>>);

impl MaybePrincipal {
    pub fn as_ref(&self) -> Option<&Principal> {
        self.0.as_deref()
    }
}

impl FromRequestParts<Arc<AppState>> for MaybePrincipal {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(resolve_principal(state, &parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));

        assert_eq!(session_token(&headers), Some(SessionToken::new("abc123")));
    }

    #[test]
    fn test_session_header_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        headers.insert(SESSION_HEADER, HeaderValue::from_static(" tok "));

        assert_eq!(session_token(&headers), Some(SessionToken::new("tok")));
    }

    #[test]
    fn test_missing_or_empty_token() {
        assert_eq!(session_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(session_token(&headers), None);

        headers.insert(SESSION_HEADER, HeaderValue::from_static("  "));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_empty_bearer_falls_back_to_session_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        headers.insert(SESSION_HEADER, HeaderValue::from_static("tok"));

        assert_eq!(session_token(&headers), Some(SessionToken::new("tok")));
    }
}
