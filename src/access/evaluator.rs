use crate::core::error::AccessError;
use crate::models::feature::FeatureCode;
use crate::models::principal::Principal;
use crate::registry::feature_registry::FeatureRegistry;
use crate::registry::role_table::RoleTable;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// What `has_route_access` answers for routes no feature owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnregisteredRoutePolicy {
    #[default]
    Allow,
    Deny,
}

/// Pure access decisions over an already-resolved principal.
///
/// Never fails on malformed input: a missing principal or missing fields mean
/// no access. The one exception is a route that no feature owns, which is
/// answered by the configured [`UnregisteredRoutePolicy`] (allow by default).
#[derive(Debug, Clone)]
pub struct AccessEvaluator {
    registry: Arc<FeatureRegistry>,
    roles: Arc<RoleTable>,
    unregistered_routes: UnregisteredRoutePolicy,
}

impl AccessEvaluator {
    pub fn new(
        registry: Arc<FeatureRegistry>,
        roles: Arc<RoleTable>,
        unregistered_routes: UnregisteredRoutePolicy,
    ) -> Self {
        Self {
            registry,
            roles,
            unregistered_routes,
        }
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    pub fn has_feature_access(&self, principal: Option<&Principal>, feature: &FeatureCode) -> bool {
        let Some(principal) = principal else {
            return false;
        };

        if principal.is_all_access() {
            return true;
        }

        let granted = match principal.enabled_features.as_deref() {
            Some(enabled) if !enabled.is_empty() => enabled.contains(feature),
            _ => self.roles.grants(&principal.role, feature),
        };

        debug!(user_id = %principal.id, role = %principal.role, feature = %feature, granted, "Feature access evaluated");
        granted
    }

    pub fn has_route_access(&self, principal: Option<&Principal>, route: &str) -> bool {
        if principal.is_some_and(Principal::is_all_access) {
            return true;
        }

        match self.registry.lookup_feature_by_route(route) {
            Some(feature) => self.has_feature_access(principal, feature),
            None => {
                debug!(route = %route, policy = ?self.unregistered_routes, "Route not owned by any feature");
                self.unregistered_routes == UnregisteredRoutePolicy::Allow
            }
        }
    }

    /// Fail-fast variant of [`has_feature_access`](Self::has_feature_access)
    /// for call sites that want to propagate a denial with `?`.
    pub fn require_feature(
        &self,
        principal: Option<&Principal>,
        feature: &FeatureCode,
    ) -> Result<(), AccessError> {
        if self.has_feature_access(principal, feature) {
            Ok(())
        } else {
            Err(AccessError::FeatureRequired {
                feature: feature.clone(),
            })
        }
    }

    /// Registered features the principal may use, in catalogue order
    pub fn accessible_features(&self, principal: Option<&Principal>) -> Vec<FeatureCode> {
        self.registry
            .features()
            .iter()
            .filter(|descriptor| self.has_feature_access(principal, &descriptor.code))
            .map(|descriptor| descriptor.code.clone())
            .collect()
    }
}
