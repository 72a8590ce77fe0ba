use crate::core::error::AccessError;
use crate::core::state::AppState;
use crate::guard::session::MaybePrincipal;
use crate::metrics::collector::CheckKind;
use crate::models::api::{AccessDecision, FeatureQuery, RouteQuery};
use crate::models::feature::FeatureCode;
use axum::{
    extract::{Query, State},
    response::Json,
};
use std::sync::Arc;

/// Whether the caller may use a feature
///
/// GET /access/feature?feature=<code>
pub async fn feature_access_handler(
    State(state): State<Arc<AppState>>,
    principal: MaybePrincipal,
    Query(params): Query<FeatureQuery>,
) -> Result<Json<AccessDecision>, AccessError> {
    let code = params.feature.trim();
    if code.is_empty() {
        return Err(AccessError::InvalidParameter("feature must not be empty".to_string()));
    }

    let feature = FeatureCode::new(code);
    let granted = state.metrics.record(
        CheckKind::Feature,
        state.evaluator.has_feature_access(principal.as_ref(), &feature),
    );

    Ok(Json(AccessDecision {
        subject: feature.to_string(),
        feature: Some(feature),
        granted,
    }))
}

/// Whether the caller may open a route
///
/// GET /access/route?path=<route>
pub async fn route_access_handler(
    State(state): State<Arc<AppState>>,
    principal: MaybePrincipal,
    Query(params): Query<RouteQuery>,
) -> Result<Json<AccessDecision>, AccessError> {
    if !params.path.starts_with('/') {
        return Err(AccessError::InvalidParameter("path must start with '/'".to_string()));
    }

    let granted = state.metrics.record(
        CheckKind::Route,
        state.evaluator.has_route_access(principal.as_ref(), &params.path),
    );

    Ok(Json(AccessDecision {
        feature: state.evaluator.registry().lookup_feature_by_route(&params.path).cloned(),
        subject: params.path,
        granted,
    }))
}
