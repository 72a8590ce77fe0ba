use crate::core::state::AppState;
use crate::guard::feature_access::FeatureGuard;
use crate::guard::session::MaybePrincipal;
use crate::models::api::{NavItem, NavigationQuery, NavigationResponse};
use crate::models::feature::{FeatureCode, FeatureDescriptor};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use std::sync::Arc;
use tracing::debug;

/// GET /features
pub async fn list_features_handler(State(state): State<Arc<AppState>>) -> Json<Vec<FeatureDescriptor>> {
    Json(state.evaluator.registry().features().to_vec())
}

/// Descriptor for `code`, or the placeholder when it is not registered
///
/// GET /features/{code}
pub async fn feature_info_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Json<FeatureDescriptor> {
    let descriptor = state.evaluator.registry().get_feature_info(&FeatureCode::new(code));
    if descriptor.is_placeholder() {
        debug!(code = %descriptor.code, "Feature info requested for unregistered code");
    }
    Json(descriptor)
}

/// Navigation entries the caller may open, in catalogue order
///
/// GET /navigation[?show_locked=true]
pub async fn navigation_handler(
    State(state): State<Arc<AppState>>,
    principal: MaybePrincipal,
    Query(params): Query<NavigationQuery>,
) -> Json<NavigationResponse> {
    let show_locked = params.show_locked;

    let items = state
        .evaluator
        .registry()
        .features()
        .iter()
        .filter_map(|descriptor| {
            let entry = NavItem {
                feature: descriptor.clone(),
                locked: false,
            };
            let guard = FeatureGuard::new(descriptor.code.clone(), entry);
            if show_locked {
                guard
                    .with_fallback(NavItem {
                        feature: descriptor.clone(),
                        locked: true,
                    })
                    .render(&state.evaluator, principal.as_ref())
            } else {
                guard.render(&state.evaluator, principal.as_ref())
            }
        })
        .collect();

    Json(NavigationResponse { items })
}
