// Demo module views mounted behind the guards

use crate::core::error::AccessError;
use crate::core::state::AppState;
use crate::guard::session::{CurrentPrincipal, MaybePrincipal};
use crate::models::feature::FeatureCode;
use axum::{
    extract::{OriginalUri, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleView {
    pub module: String,
    pub path: String,
    pub viewer: Option<String>,
}

/// Placeholder content for a gated module; the route gate has already
/// decided by the time this runs.
pub async fn module_view_handler(
    State(state): State<Arc<AppState>>,
    principal: MaybePrincipal,
    OriginalUri(uri): OriginalUri,
) -> Json<ModuleView> {
    let path = uri.path().to_string();
    let module = state
        .evaluator
        .registry()
        .lookup_feature_by_route(&path)
        .map(|code| state.evaluator.registry().get_feature_info(code).display_name)
        .unwrap_or_else(|| "Unassigned".to_string());

    Json(ModuleView {
        module,
        path,
        viewer: principal.0.map(|p| p.id.clone()),
    })
}

/// Practice-management workspace, only reachable through the subscription gate
pub async fn practice_view_handler(
    CurrentPrincipal(principal): CurrentPrincipal,
    OriginalUri(uri): OriginalUri,
) -> Json<ModuleView> {
    Json(ModuleView {
        module: "Practice Management".to_string(),
        path: uri.path().to_string(),
        viewer: Some(principal.id.clone()),
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportExport {
    pub requested_by: String,
    pub features: Vec<FeatureCode>,
}

/// GET /reports/export
///
/// Uses the fail-fast check: a denial propagates as `FeatureRequired` (403).
pub async fn export_reports_handler(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<ReportExport>, AccessError> {
    let reports = FeatureCode::new("reports");

    if let Err(e) = state.evaluator.require_feature(Some(&*principal), &reports) {
        state.metrics.increment_fail_fast();
        info!(user_id = %principal.id, role = %principal.role, "Report export refused");
        return Err(e);
    }

    info!(user_id = %principal.id, "Report export generated");

    Ok(Json(ReportExport {
        requested_by: principal.id.clone(),
        features: state.evaluator.accessible_features(Some(&*principal)),
    }))
}
