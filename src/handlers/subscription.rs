use crate::core::error::AccessError;
use crate::core::state::AppState;
use crate::guard::session::CurrentPrincipal;
use crate::models::api::{PlanQuery, PlansResponse, SubscriptionResponse};
use crate::subscription::gate::GateState;
use crate::subscription::loader::LoadState;
use crate::utils::time::current_timestamp;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;

/// Gate state for the caller; starts the fetch on first use
///
/// GET /subscription
pub async fn subscription_state_handler(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Response {
    let gate = match state.subscriptions.state(&principal.id) {
        LoadState::Unloaded => {
            state.subscriptions.ensure_loading(&principal.id);
            GateState::Loading
        }
        LoadState::Loading => GateState::Loading,
        LoadState::Ready(subscription) => {
            state
                .subscription_gate
                .evaluate(false, subscription.as_ref(), current_timestamp())
        }
    };

    let status = match gate {
        GateState::Loading => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };

    (status, Json(gate)).into_response()
}

/// Refetch the caller's subscription and return the resulting gate state
///
/// POST /subscription/refresh
///
/// Concurrent refreshes for the same user share one backend call.
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<GateState>, AccessError> {
    let subscription = state.subscriptions.refresh(&principal.id).await?;

    Ok(Json(state.subscription_gate.evaluate(
        false,
        subscription.as_ref(),
        current_timestamp(),
    )))
}

/// POST /subscription/upgrade?plan=<name>
pub async fn upgrade_handler(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(params): Query<PlanQuery>,
) -> Result<Response, AccessError> {
    let plan = state
        .subscription_gate
        .find_plan(params.plan.trim())
        .ok_or_else(|| AccessError::UnknownPlan(params.plan.clone()))?;

    let subscription = state
        .subscriptions
        .upgrade(&principal.id, plan, current_timestamp())
        .await?;

    Ok((
        StatusCode::OK,
        Json(SubscriptionResponse {
            success: true,
            subscription,
        }),
    )
        .into_response())
}

/// POST /subscription/cancel
pub async fn cancel_handler(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Response, AccessError> {
    let subscription = state.subscriptions.cancel(&principal.id).await?;

    info!(user_id = %principal.id, end_date = subscription.end_date, "Cancellation requested");

    Ok((
        StatusCode::OK,
        Json(SubscriptionResponse {
            success: true,
            subscription,
        }),
    )
        .into_response())
}

/// GET /plans
pub async fn plans_handler(State(state): State<Arc<AppState>>) -> Json<PlansResponse> {
    Json(PlansResponse {
        plans: state.subscription_gate.plans().to_vec(),
    })
}
