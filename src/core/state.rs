// Application state (AppState)

use crate::access::evaluator::AccessEvaluator;
use crate::api::client::SubscriptionClient;
use crate::core::config::{Config, SubscriptionSourceKind};
use crate::metrics::collector::AccessMetrics;
use crate::models::feature::FeatureCode;
use crate::registry::feature_registry::FeatureRegistry;
use crate::registry::role_table::RoleTable;
use crate::stores::session_store::{InMemorySessionStore, SessionStore};
use crate::subscription::gate::{default_plans, SubscriptionGate};
use crate::subscription::loader::SubscriptionLoader;
use crate::subscription::source::{MockSubscriptions, SubscriptionBackend};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
///
/// Registry, role table and plans are built once here and never mutated.
#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<AccessEvaluator>,

    pub subscription_gate: Arc<SubscriptionGate>,

    /// Per-user subscription slots with in-flight de-duplication
    pub subscriptions: Arc<SubscriptionLoader>,

    pub sessions: Arc<dyn SessionStore>,

    pub metrics: Arc<AccessMetrics>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let backend = match config.subscription.source {
            SubscriptionSourceKind::Mock => SubscriptionBackend::Mock(MockSubscriptions::with_records(
                config.subscription.mock.clone(),
                Duration::from_millis(config.subscription.mock_latency_ms),
            )),
            SubscriptionSourceKind::Remote => {
                let client = SubscriptionClient::new(
                    config.subscription.data_endpoint.clone().unwrap_or_default(),
                    config.subscription.api_key.clone().unwrap_or_default(),
                )
                .context("Failed to create subscription API client")?;
                SubscriptionBackend::Remote(client)
            }
        };

        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::with_capacity(
            config.auth.session_capacity,
            config.auth.session_ttl,
        ));

        Ok(Self::with_parts(config, backend, sessions))
    }

    /// Assemble state around an explicit subscription backend and session store
    pub fn with_parts(config: Config, backend: SubscriptionBackend, sessions: Arc<dyn SessionStore>) -> Self {
        let config = Arc::new(config);

        let registry = Arc::new(
            FeatureRegistry::builder()
                .register_all(crate::registry::feature_registry::default_features())
                .register_all(config.features.iter().cloned())
                .build(),
        );

        let roles = Arc::new(RoleTable::with_overrides(&config.roles));

        let evaluator = Arc::new(AccessEvaluator::new(
            registry,
            roles,
            config.access.unregistered_routes,
        ));

        let plans = if config.plans.is_empty() {
            default_plans()
        } else {
            config.plans.clone()
        };

        let subscription_gate = Arc::new(SubscriptionGate::new(
            FeatureCode::new(config.subscription.required_feature.trim()),
            Arc::new(plans),
        ));

        let metrics = Arc::new(AccessMetrics::new());

        Self {
            evaluator,
            subscription_gate,
            subscriptions: Arc::new(SubscriptionLoader::new(backend, Arc::clone(&metrics))),
            sessions,
            metrics,
            config,
        }
    }
}
