// HTTP routes configuration

use crate::core::state::AppState;
use crate::guard::feature_access::{with_feature_access, GuardOptions};
use crate::guard::route_gate::{route_gate, subscription_gate};
use crate::handlers::{access, features, fallback, health, metrics, session, subscription, views};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Module views whose access is decided by the route they live under
const ROUTE_GATED_MODULES: &[&str] = &[
    "/radiology",
    "/pathology",
    "/patients",
    "/billing",
    "/dna-sequencing",
];

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Public endpoints
        .route("/health", get(health::health_handler))
        .route("/features", get(features::list_features_handler))
        .route("/features/{code}", get(features::feature_info_handler))
        .route("/plans", get(subscription::plans_handler))

        // Session lifecycle
        .route(
            "/session",
            post(session::create_session_handler).delete(session::delete_session_handler),
        )
        .route("/me", get(session::me_handler))

        // Access decisions for the caller
        .route("/access/feature", get(access::feature_access_handler))
        .route("/access/route", get(access::route_access_handler))
        .route("/navigation", get(features::navigation_handler))

        // Subscription
        .route("/subscription", get(subscription::subscription_state_handler))
        .route("/subscription/refresh", post(subscription::refresh_handler))
        .route("/subscription/upgrade", post(subscription::upgrade_handler))
        .route("/subscription/cancel", post(subscription::cancel_handler))

        // Admin endpoints (require API key)
        .route("/metrics", get(metrics::metrics_handler))

        .route("/reports/export", get(views::export_reports_handler))

        .merge(route_gated_views(Arc::clone(&state)))
        .merge(telemedicine_views(Arc::clone(&state)))
        .merge(practice_views(Arc::clone(&state)))

        // 404 fallback for all unmatched routes
        .fallback(fallback::fallback_handler)

        .with_state(state)
}

fn route_gated_views(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let mut router = Router::new();
    for prefix in ROUTE_GATED_MODULES {
        router = router
            .route(prefix, get(views::module_view_handler))
            .route(&format!("{prefix}/{{*rest}}"), get(views::module_view_handler));
    }
    router.route_layer(middleware::from_fn_with_state(state, route_gate))
}

fn telemedicine_views(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let view = Router::new()
        .route("/telemedicine", get(views::module_view_handler))
        .route("/telemedicine/{*rest}", get(views::module_view_handler));

    with_feature_access(
        view,
        state,
        "telemedicine",
        GuardOptions {
            show_contact_admin: true,
        },
    )
}

fn practice_views(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/practice", get(views::practice_view_handler))
        .route("/practice/{*rest}", get(views::practice_view_handler))
        .route_layer(middleware::from_fn_with_state(state, subscription_gate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::test_support::{create_test_state, API_KEY};
    use crate::models::api::{AccessDenial, SessionResponse};
    use crate::subscription::gate::GateState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn open_session(app: &Router, user: Value) -> String {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/session?api_key={API_KEY}"))
            .header("content-type", "application/json")
            .body(Body::from(user.to_string()))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json::<SessionResponse>(response).await.token
    }

    fn get_as(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = build_router(create_test_state(Vec::new()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_radiology_route_gate_end_to_end() {
        let app = build_router(create_test_state(Vec::new()));
        let radiologist = open_session(&app, json!({"user_id": "r1", "role": "radiologist"})).await;
        let nurse = open_session(&app, json!({"userId": "n1", "userRole": "nurse"})).await;

        let granted = app
            .clone()
            .oneshot(get_as("/radiology/imaging/123", &radiologist))
            .await
            .unwrap();
        assert_eq!(granted.status(), StatusCode::OK);

        let denied = app
            .oneshot(get_as("/radiology/imaging/123", &nurse))
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
        let denial: AccessDenial = body_json(denied).await;
        assert_eq!(denial.required_feature.as_str(), "radiology");
        assert_eq!(denial.current_role, "nurse");
    }

    #[tokio::test]
    async fn test_superuser_flag_opens_everything() {
        let app = build_router(create_test_state(Vec::new()));
        let token = open_session(&app, json!({"id": "x", "role": "nurse", "isSuperAdmin": true})).await;

        for uri in ["/billing", "/dna-sequencing/runs", "/telemedicine/rooms/1"] {
            let response = app.clone().oneshot(get_as(uri, &token)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_telemedicine_denial_includes_contact() {
        let app = build_router(create_test_state(Vec::new()));
        let token = open_session(&app, json!({"id": "ph1", "role": "pharmacist"})).await;

        let response = app.oneshot(get_as("/telemedicine", &token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let denial: AccessDenial = body_json(response).await;
        assert_eq!(denial.contact_admin.as_deref(), Some("admin@clinic.example"));
    }

    #[tokio::test]
    async fn test_practice_views_start_loading() {
        let app = build_router(create_test_state(Vec::new()));
        let token = open_session(&app, json!({"id": "a1", "role": "admin"})).await;

        let response = app.oneshot(get_as("/practice/schedule", &token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json::<GateState>(response).await, GateState::Loading);
    }

    #[tokio::test]
    async fn test_idless_users_cannot_open_sessions() {
        let app = build_router(create_test_state(Vec::new()));

        for user in [json!({"role": "doctor", "name": "alice"}), json!({"role": "nurse", "name": "bob"})] {
            let request = Request::builder()
                .method("POST")
                .uri(format!("/session?api_key={API_KEY}"))
                .header("content-type", "application/json")
                .body(Body::from(user.to_string()))
                .unwrap();

            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_me_requires_session() {
        let app = build_router(create_test_state(Vec::new()));

        let response = app
            .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let app = build_router(create_test_state(Vec::new()));

        let response = app
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
