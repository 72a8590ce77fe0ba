use crate::models::feature::FeatureCode;
use crate::models::subscription::{Plan, Subscription, SubscriptionStatus};
use serde::Serialize;
use std::sync::Arc;

pub const PRACTICE_MANAGEMENT: &str = "practice_management";

/// True iff a subscription is present and its plan includes practice management
pub fn has_practice_management(subscription: Option<&Subscription>) -> bool {
    has_feature(subscription, &FeatureCode::new(PRACTICE_MANAGEMENT))
}

pub fn has_feature(subscription: Option<&Subscription>, feature: &FeatureCode) -> bool {
    subscription.is_some_and(|sub| sub.includes(feature))
}

/// Active means `status == active` and `now <= end_date`
pub fn is_subscription_active(subscription: Option<&Subscription>, now: i64) -> bool {
    subscription.is_some_and(|sub| sub.status == SubscriptionStatus::Active && now <= sub.end_date)
}

/// Denial payload of the subscription gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paywall {
    pub required_feature: FeatureCode,
    /// Features the user would unlock by upgrading
    pub features: Vec<FeatureCode>,
    pub current_plan: Option<String>,
    pub upgrade_plans: Vec<Plan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum GateState {
    /// No decision yet, the subscription is still being fetched
    Loading,
    Granted,
    Denied(Paywall),
}

/// Gates a view behind one subscription feature, independently of role
/// based feature access.
#[derive(Debug, Clone)]
pub struct SubscriptionGate {
    required_feature: FeatureCode,
    plans: Arc<Vec<Plan>>,
}

impl SubscriptionGate {
    pub fn new(required_feature: FeatureCode, plans: Arc<Vec<Plan>>) -> Self {
        Self {
            required_feature,
            plans,
        }
    }

    pub fn required_feature(&self) -> &FeatureCode {
        &self.required_feature
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn find_plan(&self, name: &str) -> Option<&Plan> {
        self.plans.iter().find(|plan| plan.name == name)
    }

    pub fn evaluate(&self, loading: bool, subscription: Option<&Subscription>, now: i64) -> GateState {
        if loading {
            return GateState::Loading;
        }

        if has_feature(subscription, &self.required_feature)
            && is_subscription_active(subscription, now)
        {
            return GateState::Granted;
        }

        GateState::Denied(self.paywall(subscription))
    }

    fn paywall(&self, subscription: Option<&Subscription>) -> Paywall {
        let mut upgrade_plans: Vec<Plan> = self
            .plans
            .iter()
            .filter(|plan| plan.includes(&self.required_feature))
            .cloned()
            .collect();
        upgrade_plans.sort_by_key(|plan| plan.monthly_price_cents);

        let mut features = vec![self.required_feature.clone()];
        for plan in &upgrade_plans {
            for feature in &plan.features {
                let owned = has_feature(subscription, feature) && is_active_status(subscription);
                if !owned && !features.contains(feature) {
                    features.push(feature.clone());
                }
            }
        }

        Paywall {
            required_feature: self.required_feature.clone(),
            features,
            current_plan: subscription.map(|sub| sub.plan_name.clone()),
            upgrade_plans,
        }
    }
}

fn is_active_status(subscription: Option<&Subscription>) -> bool {
    subscription.is_some_and(|sub| sub.status == SubscriptionStatus::Active)
}

pub fn default_plans() -> Vec<Plan> {
    let codes = |items: &[&str]| items.iter().map(|c| FeatureCode::new(*c)).collect::<Vec<_>>();
    vec![
        Plan {
            name: "basic".to_string(),
            display_name: "Basic".to_string(),
            monthly_price_cents: 2_900,
            features: codes(&["dashboard", "patients", "appointments"]),
            duration_days: 30,
        },
        Plan {
            name: "professional".to_string(),
            display_name: "Professional".to_string(),
            monthly_price_cents: 9_900,
            features: codes(&[
                "dashboard",
                "patients",
                "appointments",
                "billing",
                "reports",
                PRACTICE_MANAGEMENT,
            ]),
            duration_days: 30,
        },
        Plan {
            name: "enterprise".to_string(),
            display_name: "Enterprise".to_string(),
            monthly_price_cents: 29_900,
            features: codes(&[
                "dashboard",
                "patients",
                "appointments",
                "billing",
                "reports",
                PRACTICE_MANAGEMENT,
                "pathology",
                "radiology",
                "dna_sequencing",
                "telemedicine",
            ]),
            duration_days: 30,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscription::SECONDS_PER_DAY;

    const NOW: i64 = 1_760_000_000;

    fn subscription(status: SubscriptionStatus, end_date: i64, features: &[&str]) -> Subscription {
        Subscription {
            user_id: "u1".to_string(),
            plan_name: "professional".to_string(),
            status,
            start_date: NOW - 10 * SECONDS_PER_DAY,
            end_date,
            features: features.iter().map(|f| FeatureCode::new(*f)).collect(),
        }
    }

    fn gate() -> SubscriptionGate {
        SubscriptionGate::new(FeatureCode::new(PRACTICE_MANAGEMENT), Arc::new(default_plans()))
    }

    #[test]
    fn test_active_until_yesterday_is_inactive() {
        let sub = subscription(SubscriptionStatus::Active, NOW - SECONDS_PER_DAY, &[PRACTICE_MANAGEMENT]);
        assert!(!is_subscription_active(Some(&sub), NOW));
    }

    #[test]
    fn test_active_until_tomorrow_with_practice_management() {
        let sub = subscription(SubscriptionStatus::Active, NOW + SECONDS_PER_DAY, &[PRACTICE_MANAGEMENT]);
        assert!(has_practice_management(Some(&sub)) && is_subscription_active(Some(&sub), NOW));
    }

    #[test]
    fn test_end_date_is_inclusive() {
        let sub = subscription(SubscriptionStatus::Active, NOW, &[]);
        assert!(is_subscription_active(Some(&sub), NOW));
        assert!(!is_subscription_active(Some(&sub), NOW + 1));
    }

    #[test]
    fn test_cancelled_and_expired_are_inactive() {
        let cancelled = subscription(SubscriptionStatus::Cancelled, NOW + SECONDS_PER_DAY, &[]);
        let expired = subscription(SubscriptionStatus::Expired, NOW + SECONDS_PER_DAY, &[]);

        assert!(!is_subscription_active(Some(&cancelled), NOW));
        assert!(!is_subscription_active(Some(&expired), NOW));
        assert!(!is_subscription_active(None, NOW));
        assert!(!has_practice_management(None));
    }

    #[test]
    fn test_gate_loading_takes_precedence() {
        let sub = subscription(SubscriptionStatus::Active, NOW + SECONDS_PER_DAY, &[PRACTICE_MANAGEMENT]);
        assert_eq!(gate().evaluate(true, Some(&sub), NOW), GateState::Loading);
    }

    #[test]
    fn test_gate_granted() {
        let sub = subscription(SubscriptionStatus::Active, NOW + SECONDS_PER_DAY, &[PRACTICE_MANAGEMENT]);
        assert_eq!(gate().evaluate(false, Some(&sub), NOW), GateState::Granted);
    }

    #[test]
    fn test_gate_denied_without_subscription() {
        let GateState::Denied(paywall) = gate().evaluate(false, None, NOW) else {
            panic!("expected paywall");
        };

        assert_eq!(paywall.current_plan, None);
        assert_eq!(paywall.features[0].as_str(), PRACTICE_MANAGEMENT);
        let names: Vec<_> = paywall.upgrade_plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["professional", "enterprise"]);
    }

    #[test]
    fn test_gate_denied_on_basic_plan_lists_missing_features() {
        let mut sub = subscription(
            SubscriptionStatus::Active,
            NOW + SECONDS_PER_DAY,
            &["dashboard", "patients", "appointments"],
        );
        sub.plan_name = "basic".to_string();

        let GateState::Denied(paywall) = gate().evaluate(false, Some(&sub), NOW) else {
            panic!("expected paywall");
        };

        assert_eq!(paywall.current_plan.as_deref(), Some("basic"));
        assert!(paywall.features.contains(&FeatureCode::new("billing")));
        assert!(!paywall.features.contains(&FeatureCode::new("patients")));
    }

    #[test]
    fn test_gate_denied_when_expired_even_with_feature() {
        let sub = subscription(SubscriptionStatus::Active, NOW - 1, &[PRACTICE_MANAGEMENT]);
        assert!(matches!(gate().evaluate(false, Some(&sub), NOW), GateState::Denied(_)));
    }

    #[test]
    fn test_find_plan() {
        let gate = gate();
        assert!(gate.find_plan("enterprise").is_some());
        assert!(gate.find_plan("platinum").is_none());
    }
}
