use crate::access::evaluator::AccessEvaluator;
use crate::core::error::AccessError;
use crate::core::state::AppState;
use crate::guard::session::resolve_principal;
use crate::metrics::collector::CheckKind;
use crate::models::api::AccessDenial;
use crate::models::feature::FeatureCode;
use crate::models::principal::Principal;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    Router,
};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct GuardOptions {
    /// Include the configured contact-admin address in the denial layout
    pub show_contact_admin: bool,
}

#[derive(Clone)]
struct FeatureRequirement {
    state: Arc<AppState>,
    feature: FeatureCode,
    options: GuardOptions,
}

/// Wrap `view` so every route in it requires `feature`.
///
/// Granted requests reach the wrapped handlers untouched. Denied ones get a
/// 403 with the denial layout; callers without a session get a 401.
pub fn with_feature_access<S>(
    view: Router<S>,
    state: Arc<AppState>,
    feature: impl Into<FeatureCode>,
    options: GuardOptions,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let requirement = FeatureRequirement {
        state,
        feature: feature.into(),
        options,
    };
    view.route_layer(middleware::from_fn_with_state(requirement, feature_access_middleware))
}

async fn feature_access_middleware(
    State(requirement): State<FeatureRequirement>,
    request: Request,
    next: Next,
) -> Response {
    let state = &requirement.state;
    let Some(principal) = resolve_principal(state, request.headers()) else {
        return AccessError::Unauthenticated.into_response();
    };

    let granted = state.metrics.record(
        CheckKind::Feature,
        state
            .evaluator
            .has_feature_access(Some(&*principal), &requirement.feature),
    );

    if granted {
        return next.run(request).await;
    }

    info!(
        user_id = %principal.id,
        role = %principal.role,
        feature = %requirement.feature,
        path = %request.uri().path(),
        "Feature access denied"
    );

    denial_response(
        state,
        &principal,
        &requirement.feature,
        requirement.options,
    )
}

/// Denial layout: required feature, caller's role and what they can use instead
pub fn denial_for(
    state: &AppState,
    principal: &Principal,
    feature: &FeatureCode,
    options: GuardOptions,
) -> AccessDenial {
    let evaluator: &AccessEvaluator = &state.evaluator;
    AccessDenial {
        required_feature: feature.clone(),
        feature: evaluator.registry().get_feature_info(feature),
        current_role: principal.role.to_string(),
        accessible_features: evaluator.accessible_features(Some(principal)),
        contact_admin: if options.show_contact_admin {
            state.config.access.contact_admin.clone()
        } else {
            None
        },
    }
}

pub fn denial_response(
    state: &AppState,
    principal: &Principal,
    feature: &FeatureCode,
    options: GuardOptions,
) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(denial_for(state, principal, feature, options)),
    )
        .into_response()
}

/// Inline guard: `children` when the principal may use `feature`, else
/// `fallback` (nothing by default). Synchronous; the principal must already
/// be resolved.
pub struct FeatureGuard<T> {
    feature: FeatureCode,
    children: T,
    fallback: Option<T>,
}

impl<T> FeatureGuard<T> {
    pub fn new(feature: impl Into<FeatureCode>, children: T) -> Self {
        Self {
            feature: feature.into(),
            children,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: T) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn render(self, evaluator: &AccessEvaluator, principal: Option<&Principal>) -> Option<T> {
        if evaluator.has_feature_access(principal, &self.feature) {
            Some(self.children)
        } else {
            self.fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::test_support::{create_test_state, login};
    use crate::models::principal::Role;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn protected_view() -> &'static str {
        "radiology workspace"
    }

    fn app(state: Arc<AppState>, options: GuardOptions) -> Router {
        let view = Router::new().route("/radiology/workspace", get(protected_view));
        with_feature_access(view, Arc::clone(&state), "radiology", options)
    }

    fn request(token: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/radiology/workspace");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_granted_passes_through_unchanged() {
        let state = create_test_state(Vec::new());
        let token = login(&state, Principal::new("d1", Role::Doctor));

        let response = app(Arc::clone(&state), GuardOptions::default())
            .oneshot(request(Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"radiology workspace");
    }

    #[tokio::test]
    async fn test_denied_renders_layout() {
        let state = create_test_state(Vec::new());
        let token = login(&state, Principal::new("n1", Role::Nurse));

        let response = app(Arc::clone(&state), GuardOptions::default())
            .oneshot(request(Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let denial: AccessDenial = serde_json::from_slice(&body).unwrap();

        assert_eq!(denial.required_feature.as_str(), "radiology");
        assert_eq!(denial.feature.display_name, "Radiology");
        assert_eq!(denial.current_role, "nurse");
        assert!(denial.accessible_features.contains(&FeatureCode::new("patients")));
        assert_eq!(denial.contact_admin, None);
    }

    #[tokio::test]
    async fn test_denied_with_contact_admin() {
        let state = create_test_state(Vec::new());
        let token = login(&state, Principal::new("p1", Role::Patient));
        let options = GuardOptions {
            show_contact_admin: true,
        };

        let response = app(Arc::clone(&state), options)
            .oneshot(request(Some(&token)))
            .await
            .unwrap();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let denial: AccessDenial = serde_json::from_slice(&body).unwrap();
        assert_eq!(denial.contact_admin.as_deref(), Some("admin@clinic.example"));
    }

    #[tokio::test]
    async fn test_missing_session_is_unauthorized() {
        let state = create_test_state(Vec::new());

        let response = app(Arc::clone(&state), GuardOptions::default())
            .oneshot(request(None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_decisions_are_counted() {
        let state = create_test_state(Vec::new());
        let doctor = login(&state, Principal::new("d1", Role::Doctor));
        let nurse = login(&state, Principal::new("n1", Role::Nurse));
        let router = app(Arc::clone(&state), GuardOptions::default());

        router.clone().oneshot(request(Some(&doctor))).await.unwrap();
        router.oneshot(request(Some(&nurse))).await.unwrap();

        let snapshot = state.metrics.get_snapshot(0, 0);
        assert_eq!(snapshot.feature_checks, 2);
        assert_eq!(snapshot.granted, 1);
        assert_eq!(snapshot.denied, 1);
    }

    #[test]
    fn test_feature_guard_children_or_fallback() {
        let state = create_test_state(Vec::new());
        let nurse = Principal::new("n1", Role::Nurse);

        let shown = FeatureGuard::new("patients", "chart").render(&state.evaluator, Some(&nurse));
        assert_eq!(shown, Some("chart"));

        let hidden = FeatureGuard::new("billing", "invoices").render(&state.evaluator, Some(&nurse));
        assert_eq!(hidden, None);

        let fallback = FeatureGuard::new("billing", "invoices")
            .with_fallback("upgrade")
            .render(&state.evaluator, Some(&nurse));
        assert_eq!(fallback, Some("upgrade"));

        let anonymous = FeatureGuard::new("patients", "chart").render(&state.evaluator, None);
        assert_eq!(anonymous, None);
    }
}
