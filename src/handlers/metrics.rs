// Metrics endpoint

use crate::core::error::MonitoringError;
use crate::core::state::AppState;
use crate::models::api::ApiKeyQuery;
use crate::utils::auth::verify_api_key;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::warn;

/// Returns JSON with access decision statistics:
/// - Feature and route checks, granted/denied counts, grant rate
/// - Fail-fast rejections
/// - Subscription fetches and de-duplicated waits
/// - Active sessions, loaded subscriptions, uptime
///
/// Requires valid API key for authentication.
pub async fn metrics_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ApiKeyQuery>,
) -> Result<Response, MonitoringError> {
    if !verify_api_key(&params.api_key, &state.config.auth.api_key) {
        warn!("Unauthorized metrics access attempt");
        return Err(MonitoringError::InvalidApiKey);
    }

    let snapshot = state
        .metrics
        .get_snapshot(state.sessions.len(), state.subscriptions.loaded());

    Ok((StatusCode::OK, Json(snapshot)).into_response())
}
