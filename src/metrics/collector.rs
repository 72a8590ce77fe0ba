use crate::utils::time::current_timestamp;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for access decisions and subscription loading
pub struct AccessMetrics {
    pub feature_checks: AtomicU64,
    pub route_checks: AtomicU64,
    pub granted: AtomicU64,
    pub denied: AtomicU64,
    pub fail_fast_rejections: AtomicU64,
    pub subscription_fetches: AtomicU64,
    pub deduplicated_fetches: AtomicU64,
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub feature_checks: u64,
    pub route_checks: u64,
    pub granted: u64,
    pub denied: u64,
    pub grant_rate: f64,
    pub fail_fast_rejections: u64,
    pub subscription_fetches: u64,
    pub deduplicated_fetches: u64,
    pub active_sessions: usize,
    pub loaded_subscriptions: usize,
    pub uptime_seconds: i64,
}

/// Kind of check being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Feature,
    Route,
}

impl AccessMetrics {
    pub fn new() -> Self {
        Self {
            feature_checks: AtomicU64::new(0),
            route_checks: AtomicU64::new(0),
            granted: AtomicU64::new(0),
            denied: AtomicU64::new(0),
            fail_fast_rejections: AtomicU64::new(0),
            subscription_fetches: AtomicU64::new(0),
            deduplicated_fetches: AtomicU64::new(0),
            start_time: current_timestamp(),
        }
    }

    /// Record one decision and hand it back, so call sites can wrap the check
    pub fn record(&self, kind: CheckKind, granted: bool) -> bool {
        match kind {
            CheckKind::Feature => self.feature_checks.fetch_add(1, Ordering::Relaxed),
            CheckKind::Route => self.route_checks.fetch_add(1, Ordering::Relaxed),
        };
        if granted {
            self.granted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied.fetch_add(1, Ordering::Relaxed);
        }
        granted
    }

    pub fn increment_fail_fast(&self) {
        self.fail_fast_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fetches(&self) {
        self.subscription_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deduplicated(&self) {
        self.deduplicated_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self, active_sessions: usize, loaded_subscriptions: usize) -> MetricsSnapshot {
        let granted = self.granted.load(Ordering::Relaxed);
        let denied = self.denied.load(Ordering::Relaxed);
        let total = granted + denied;

        let grant_rate = if total > 0 {
            (granted as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        MetricsSnapshot {
            feature_checks: self.feature_checks.load(Ordering::Relaxed),
            route_checks: self.route_checks.load(Ordering::Relaxed),
            granted,
            denied,
            grant_rate,
            fail_fast_rejections: self.fail_fast_rejections.load(Ordering::Relaxed),
            subscription_fetches: self.subscription_fetches.load(Ordering::Relaxed),
            deduplicated_fetches: self.deduplicated_fetches.load(Ordering::Relaxed),
            active_sessions,
            loaded_subscriptions,
            uptime_seconds: current_timestamp() - self.start_time,
        }
    }
}

impl Default for AccessMetrics {
    fn default() -> Self {
        Self::new()
    }
}
