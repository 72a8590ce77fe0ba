use crate::api::client::SubscriptionClient;
use crate::models::subscription::Subscription;
use anyhow::Result;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// In-memory subscription table keyed by user id
pub struct MockSubscriptions {
    records: DashMap<String, Subscription>,
    latency: Duration,
    fetches: AtomicU64,
}

impl MockSubscriptions {
    pub fn new(latency: Duration) -> Self {
        Self {
            records: DashMap::new(),
            latency,
            fetches: AtomicU64::new(0),
        }
    }

    pub fn with_records<I>(records: I, latency: Duration) -> Self
    where
        I: IntoIterator<Item = Subscription>,
    {
        let mock = Self::new(latency);
        for record in records {
            mock.insert(record);
        }
        mock
    }

    pub fn insert(&self, subscription: Subscription) {
        self.records.insert(subscription.user_id.clone(), subscription);
    }

    pub fn get(&self, user_id: &str) -> Option<Subscription> {
        self.records.get(user_id).map(|entry| entry.value().clone())
    }

    /// Number of fetches served so far
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Reads the record up front, then waits out the latency, so a write
    /// made during the wait is not seen, as with a remote call in flight.
    async fn fetch(&self, user_id: &str) -> Option<Subscription> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.get(user_id);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        snapshot
    }
}

/// Where subscription records come from
pub enum SubscriptionBackend {
    Mock(MockSubscriptions),
    Remote(SubscriptionClient),
}

impl SubscriptionBackend {
    pub fn name(&self) -> &'static str {
        match self {
            SubscriptionBackend::Mock(_) => "mock",
            SubscriptionBackend::Remote(_) => "remote",
        }
    }

    pub async fn fetch(&self, user_id: &str) -> Result<Option<Subscription>> {
        match self {
            SubscriptionBackend::Mock(mock) => Ok(mock.fetch(user_id).await),
            SubscriptionBackend::Remote(client) => client.fetch_subscription(user_id).await,
        }
    }

    pub async fn save(&self, subscription: &Subscription) -> Result<()> {
        match self {
            SubscriptionBackend::Mock(mock) => {
                mock.insert(subscription.clone());
                Ok(())
            }
            SubscriptionBackend::Remote(client) => client.save_subscription(subscription).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feature::FeatureCode;
    use crate::models::subscription::SubscriptionStatus;
    use std::sync::Arc;

    fn record(user_id: &str) -> Subscription {
        Subscription {
            user_id: user_id.to_string(),
            plan_name: "basic".to_string(),
            status: SubscriptionStatus::Active,
            start_date: 0,
            end_date: 100,
            features: vec![FeatureCode::new("patients")],
        }
    }

    #[tokio::test]
    async fn test_mock_fetch_counts_calls() {
        let backend = SubscriptionBackend::Mock(MockSubscriptions::with_records(
            [record("u1")],
            Duration::ZERO,
        ));

        assert_eq!(backend.fetch("u1").await.unwrap().unwrap().plan_name, "basic");
        assert!(backend.fetch("u2").await.unwrap().is_none());

        let SubscriptionBackend::Mock(mock) = &backend else {
            unreachable!()
        };
        assert_eq!(mock.fetch_count(), 2);
        assert_eq!(backend.name(), "mock");
    }

    #[tokio::test]
    async fn test_mock_fetch_reads_before_latency() {
        let mock = Arc::new(MockSubscriptions::with_records([record("u1")], Duration::from_millis(30)));

        let pending = {
            let mock = Arc::clone(&mock);
            tokio::spawn(async move { mock.fetch("u1").await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        let mut cancelled = record("u1");
        cancelled.status = SubscriptionStatus::Cancelled;
        mock.insert(cancelled);

        let fetched = pending.await.unwrap().unwrap();
        assert_eq!(fetched.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn test_mock_save_overwrites() {
        let backend = SubscriptionBackend::Mock(MockSubscriptions::new(Duration::ZERO));
        let mut sub = record("u1");
        backend.save(&sub).await.unwrap();

        sub.status = SubscriptionStatus::Cancelled;
        backend.save(&sub).await.unwrap();

        let fetched = backend.fetch("u1").await.unwrap().unwrap();
        assert_eq!(fetched.status, SubscriptionStatus::Cancelled);
    }
}
