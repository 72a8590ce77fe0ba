use crate::models::feature::FeatureCode;
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

/// Subscription record for one user
///
/// Dates are unix timestamps in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub user_id: String,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub start_date: i64,
    pub end_date: i64,
    #[serde(default)]
    pub features: Vec<FeatureCode>,
}

impl Subscription {
    pub fn includes(&self, feature: &FeatureCode) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Active subscription on `plan`, starting at `now`
    pub fn from_plan(user_id: impl Into<String>, plan: &Plan, now: i64) -> Self {
        Self {
            user_id: user_id.into(),
            plan_name: plan.name.clone(),
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date: now.saturating_add(plan.duration_days.saturating_mul(SECONDS_PER_DAY)),
            features: plan.features.clone(),
        }
    }
}

/// Purchasable plan offered on the paywall
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub name: String,
    pub display_name: String,
    pub monthly_price_cents: u32,
    pub features: Vec<FeatureCode>,
    #[serde(default = "default_duration_days")]
    pub duration_days: i64,
}

fn default_duration_days() -> i64 {
    30
}

impl Plan {
    pub fn includes(&self, feature: &FeatureCode) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}
