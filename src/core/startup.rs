use crate::core::state::AppState;
use crate::subscription::source::SubscriptionBackend;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Drop expired sessions once, then the subscription slots of users left
/// without a session. Returns how many sessions were removed.
pub fn purge_sessions(state: &AppState) -> usize {
    let removed = state.sessions.purge_expired();
    let evicted = state.subscriptions.retain_users(&state.sessions.active_users());

    if removed > 0 || evicted > 0 {
        info!(
            removed_sessions = removed,
            active_sessions = state.sessions.len(),
            evicted_subscriptions = evicted,
            "Session cleanup completed"
        );
    } else {
        debug!("Session cleanup completed, nothing to remove");
    }

    removed
}

/// Spawn a background task that periodically drops expired sessions
pub fn spawn_session_cleanup(state: Arc<AppState>, cleanup_interval: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(cleanup_interval));

        loop {
            interval.tick().await;
            debug!("Running session cleanup");
            purge_sessions(&state);
        }
    });
}

pub fn log_startup_summary(state: &AppState) {
    let registry = state.evaluator.registry();
    let endpoint = match state.subscriptions.backend() {
        SubscriptionBackend::Remote(client) => Some(client.endpoint()),
        SubscriptionBackend::Mock(_) => None,
    };
    info!(
        features = registry.len(),
        plans = state.subscription_gate.plans().len(),
        required_feature = %state.subscription_gate.required_feature(),
        subscription_source = state.subscriptions.backend().name(),
        subscription_endpoint = ?endpoint,
        unregistered_routes = ?state.config.access.unregistered_routes,
        "Access gate startup complete"
    );
}
