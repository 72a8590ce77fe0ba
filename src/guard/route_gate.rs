use crate::core::error::AccessError;
use crate::core::state::AppState;
use crate::guard::feature_access::{denial_response, GuardOptions};
use crate::guard::session::resolve_principal;
use crate::metrics::collector::CheckKind;
use crate::subscription::gate::GateState;
use crate::subscription::loader::LoadState;
use crate::utils::time::current_timestamp;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Gate every request on the feature owning its path.
///
/// Paths no feature owns follow the unregistered-route policy, so with the
/// default policy they pass even without a session.
pub async fn route_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let principal = resolve_principal(&state, request.headers());
    let path = request.uri().path().to_string();

    let granted = state.metrics.record(
        CheckKind::Route,
        state.evaluator.has_route_access(principal.as_deref(), &path),
    );

    if granted {
        return next.run(request).await;
    }

    let Some(principal) = principal else {
        return AccessError::Unauthenticated.into_response();
    };

    info!(user_id = %principal.id, role = %principal.role, path = %path, "Route access denied");

    match state.evaluator.registry().lookup_feature_by_route(&path) {
        Some(feature) => denial_response(&state, &principal, feature, GuardOptions::default()),
        // only reachable under the deny policy for unregistered routes
        None => (StatusCode::FORBIDDEN, "Route not available").into_response(),
    }
}

/// Gate a view behind the subscription feature.
///
/// First request for a user kicks off the subscription fetch and answers
/// 202 with the loading state; once resolved the view renders or a 402
/// paywall is returned.
pub async fn subscription_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(principal) = resolve_principal(&state, request.headers()) else {
        return AccessError::Unauthenticated.into_response();
    };

    let (loading, subscription) = match state.subscriptions.state(&principal.id) {
        LoadState::Unloaded => {
            state.subscriptions.ensure_loading(&principal.id);
            (true, None)
        }
        LoadState::Loading => (true, None),
        LoadState::Ready(subscription) => (false, subscription),
    };

    match state
        .subscription_gate
        .evaluate(loading, subscription.as_ref(), current_timestamp())
    {
        GateState::Granted => next.run(request).await,
        GateState::Loading => {
            debug!(user_id = %principal.id, "Subscription still loading");
            (StatusCode::ACCEPTED, Json(GateState::Loading)).into_response()
        }
        denied @ GateState::Denied(_) => {
            info!(
                user_id = %principal.id,
                plan = ?subscription.as_ref().map(|s| s.plan_name.as_str()),
                required = %state.subscription_gate.required_feature(),
                "Subscription gate denied"
            );
            (StatusCode::PAYMENT_REQUIRED, Json(denied)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::test_support::{create_test_state, login};
    use crate::models::feature::FeatureCode;
    use crate::models::principal::{Principal, Role};
    use crate::models::subscription::{Subscription, SubscriptionStatus};
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::middleware;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn ok_view() -> &'static str {
        "ok"
    }

    fn routed(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/billing/invoices", get(ok_view))
            .route("/help", get(ok_view))
            .layer(middleware::from_fn_with_state(Arc::clone(&state), route_gate))
            .with_state(state)
    }

    fn practice(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/practice/schedule", get(ok_view))
            .layer(middleware::from_fn_with_state(Arc::clone(&state), subscription_gate))
            .with_state(state)
    }

    fn get_request(uri: &str, token: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("x-session-token", token);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn practice_subscription(user_id: &str, end_date: i64) -> Subscription {
        Subscription {
            user_id: user_id.to_string(),
            plan_name: "professional".to_string(),
            status: SubscriptionStatus::Active,
            start_date: 0,
            end_date,
            features: vec![FeatureCode::new("practice_management")],
        }
    }

    #[tokio::test]
    async fn test_route_gate_grants_owner_feature() {
        let state = create_test_state(Vec::new());
        let token = login(&state, Principal::new("r1", Role::Receptionist));

        let response = routed(state)
            .oneshot(get_request("/billing/invoices", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_route_gate_denies_with_layout() {
        let state = create_test_state(Vec::new());
        let token = login(&state, Principal::new("n1", Role::Nurse));

        let response = routed(state)
            .oneshot(get_request("/billing/invoices", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_route_gate_anonymous_on_owned_route() {
        let state = create_test_state(Vec::new());

        let response = routed(state)
            .oneshot(get_request("/billing/invoices", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_route_gate_unregistered_route_is_open() {
        let state = create_test_state(Vec::new());

        let response = routed(state)
            .oneshot(get_request("/help", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_subscription_gate_loading_then_granted() {
        let now = current_timestamp();
        let state = create_test_state(vec![practice_subscription("u1", now + 86_400)]);
        let token = login(&state, Principal::new("u1", Role::Doctor));

        let first = practice(Arc::clone(&state))
            .oneshot(get_request("/practice/schedule", Some(&token)))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);
        let body = first.into_body().collect().await.unwrap().to_bytes();
        let gate: GateState = serde_json::from_slice(&body).unwrap();
        assert_eq!(gate, GateState::Loading);

        // wait for the spawned fetch to land
        state.subscriptions.get_or_load("u1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let second = practice(state)
            .oneshot(get_request("/practice/schedule", Some(&token)))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_subscription_gate_expired_is_paywalled() {
        let now = current_timestamp();
        let state = create_test_state(vec![practice_subscription("u2", now - 86_400)]);
        let token = login(&state, Principal::new("u2", Role::Admin));
        state.subscriptions.refresh("u2").await.unwrap();

        let response = practice(state)
            .oneshot(get_request("/practice/schedule", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let GateState::Denied(paywall) = serde_json::from_slice::<GateState>(&body).unwrap() else {
            panic!("expected paywall");
        };
        assert_eq!(paywall.current_plan.as_deref(), Some("professional"));
        assert!(!paywall.upgrade_plans.is_empty());
    }

    #[tokio::test]
    async fn test_subscription_gate_ignores_role() {
        let state = create_test_state(Vec::new());
        let token = login(&state, Principal::new("root", Role::SuperAdmin));
        state.subscriptions.refresh("root").await.unwrap();

        let response = practice(state)
            .oneshot(get_request("/practice/schedule", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }
}
