use crate::core::error::AccessError;
use crate::core::state::AppState;
use crate::guard::session::{session_token, CurrentPrincipal};
use crate::models::api::{ApiKeyQuery, SessionResponse, SuccessResponse};
use crate::models::principal::Principal;
use crate::stores::session_store::SessionToken;
use crate::utils::auth::verify_api_key;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Open a session for an already-authenticated user
///
/// POST /session?api_key=<key>
///
/// The body is the raw user record from the identity provider, in any of the
/// legacy field layouts. It is normalized once here; everything downstream
/// sees only the `Principal`.
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ApiKeyQuery>,
    Json(raw): Json<Value>,
) -> Result<Response, AccessError> {
    if !verify_api_key(&params.api_key, &state.config.auth.api_key) {
        warn!("Unauthorized session creation attempt");
        return Err(AccessError::InvalidApiKey);
    }

    let principal = Principal::from_raw(&raw)
        .ok_or_else(|| AccessError::InvalidParameter("user record must be a JSON object".to_string()))?;

    // subscriptions are keyed by id; an id-less user would share a slot
    if principal.id.trim().is_empty() {
        warn!(role = %principal.role, "Session creation rejected, user record has no id");
        return Err(AccessError::InvalidParameter("user record must carry a non-empty id".to_string()));
    }

    let token = SessionToken::generate();
    state.sessions.set(token.clone(), principal.clone());

    info!(
        user_id = %principal.id,
        role = %principal.role,
        superuser = principal.is_superuser,
        explicit_features = principal.enabled_features.as_ref().map(Vec::len),
        "Session opened"
    );

    Ok((
        StatusCode::OK,
        Json(SessionResponse {
            success: true,
            token: token.to_string(),
            principal,
        }),
    )
        .into_response())
}

/// DELETE /session
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AccessError> {
    let token = session_token(&headers).ok_or(AccessError::Unauthenticated)?;

    if !state.sessions.clear(&token) {
        return Err(AccessError::Unauthenticated);
    }

    info!("Session closed");

    Ok((
        StatusCode::OK,
        Json(SuccessResponse {
            success: true,
            message: "Session closed".to_string(),
        }),
    )
        .into_response())
}

/// GET /me
pub async fn me_handler(CurrentPrincipal(principal): CurrentPrincipal) -> Json<Principal> {
    Json(principal.as_ref().clone())
}
