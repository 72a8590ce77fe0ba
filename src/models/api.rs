use crate::models::feature::{FeatureCode, FeatureDescriptor};
use crate::models::principal::Principal;
use crate::models::subscription::{Plan, Subscription};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct ApiKeyQuery {
    pub api_key: String,
}

#[derive(Deserialize)]
pub struct FeatureQuery {
    pub feature: String,
}

#[derive(Deserialize)]
pub struct RouteQuery {
    pub path: String,
}

#[derive(Deserialize)]
pub struct PlanQuery {
    pub plan: String,
}

#[derive(Deserialize, Default)]
pub struct NavigationQuery {
    /// List denied features too, marked as locked
    #[serde(default)]
    pub show_locked: bool,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub principal: Principal,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub subject: String,
    /// Feature that owns the subject, absent for unregistered routes
    pub feature: Option<FeatureCode>,
    pub granted: bool,
}

/// Denial layout rendered by the feature guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDenial {
    pub required_feature: FeatureCode,
    pub feature: FeatureDescriptor,
    pub current_role: String,
    pub accessible_features: Vec<FeatureCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_admin: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItem {
    #[serde(flatten)]
    pub feature: FeatureDescriptor,
    pub locked: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResponse {
    pub items: Vec<NavItem>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlansResponse {
    pub plans: Vec<Plan>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub success: bool,
    pub subscription: Subscription,
}
