use crate::core::error::AccessError;
use crate::metrics::collector::AccessMetrics;
use crate::models::subscription::{Plan, Subscription, SubscriptionStatus};
use crate::subscription::source::SubscriptionBackend;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Per-user subscription state as seen by the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Never requested, or evicted after the user's sessions ended
    Unloaded,
    Loading,
    Ready(Option<Subscription>),
}

enum Slot {
    /// `generation` identifies the fetch allowed to resolve this slot
    Loading {
        generation: u64,
        waiters: Vec<oneshot::Sender<Option<Subscription>>>,
    },
    Ready(Option<Subscription>),
}

impl Slot {
    fn is_loading(&self, expected: u64) -> bool {
        matches!(self, Slot::Loading { generation, .. } if *generation == expected)
    }
}

/// Loads subscriptions once per user and keeps them while the user holds a
/// session.
///
/// Concurrent `refresh` calls for the same user share a single backend
/// fetch: the first caller spawns it, later callers park on a oneshot and
/// receive the same result. The fetch runs on its own task so dropping a
/// caller never strands the slot in `Loading`. Each fetch is tagged with a
/// generation; a result landing after its slot moved on is discarded.
pub struct SubscriptionLoader {
    backend: Arc<SubscriptionBackend>,
    slots: DashMap<String, Slot>,
    generations: AtomicU64,
    metrics: Arc<AccessMetrics>,
}

impl SubscriptionLoader {
    pub fn new(backend: SubscriptionBackend, metrics: Arc<AccessMetrics>) -> Self {
        Self {
            backend: Arc::new(backend),
            slots: DashMap::new(),
            generations: AtomicU64::new(0),
            metrics,
        }
    }

    pub fn backend(&self) -> &SubscriptionBackend {
        &self.backend
    }

    pub fn state(&self, user_id: &str) -> LoadState {
        match self.slots.get(user_id).as_deref() {
            None => LoadState::Unloaded,
            Some(Slot::Loading { .. }) => LoadState::Loading,
            Some(Slot::Ready(subscription)) => LoadState::Ready(subscription.clone()),
        }
    }

    /// Number of users with a resolved subscription slot
    pub fn loaded(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| matches!(entry.value(), Slot::Ready(_)))
            .count()
    }

    /// Drop resolved slots of users outside `active`; returns how many went.
    ///
    /// Slots still loading are kept so their waiters get an answer.
    pub fn retain_users(&self, active: &HashSet<String>) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|user_id, slot| matches!(slot, Slot::Loading { .. }) || active.contains(user_id));
        before.saturating_sub(self.slots.len())
    }

    /// Start a fetch unless one is already running; does not wait for it.
    pub fn ensure_loading(self: &Arc<Self>, user_id: &str) {
        let mut spawn = None;
        match self.slots.entry(user_id.to_string()) {
            Entry::Occupied(_) => {}
            Entry::Vacant(entry) => {
                let generation = self.next_generation();
                entry.insert(Slot::Loading {
                    generation,
                    waiters: Vec::new(),
                });
                spawn = Some(generation);
            }
        }
        if let Some(generation) = spawn {
            self.spawn_fetch(user_id.to_string(), generation);
        }
    }

    /// Reset the user's slot to `Loading` and wait for a fresh fetch.
    /// Joins the fetch already in flight instead of starting a second one.
    pub async fn refresh(self: &Arc<Self>, user_id: &str) -> Result<Option<Subscription>, AccessError> {
        let (sender, receiver) = oneshot::channel();
        let mut spawn = None;

        match self.slots.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => match entry.get_mut() {
                Slot::Loading { waiters, .. } => {
                    waiters.push(sender);
                    self.metrics.increment_deduplicated();
                    debug!(user_id = %user_id, "Joining in-flight subscription fetch");
                }
                slot @ Slot::Ready(_) => {
                    let generation = self.next_generation();
                    *slot = Slot::Loading {
                        generation,
                        waiters: vec![sender],
                    };
                    spawn = Some(generation);
                }
            },
            Entry::Vacant(entry) => {
                let generation = self.next_generation();
                entry.insert(Slot::Loading {
                    generation,
                    waiters: vec![sender],
                });
                spawn = Some(generation);
            }
        }

        if let Some(generation) = spawn {
            self.spawn_fetch(user_id.to_string(), generation);
        }

        receiver
            .await
            .map_err(|_| AccessError::SubscriptionBackend("subscription fetch was abandoned".to_string()))
    }

    /// Resolved subscription, fetching it first if needed
    pub async fn get_or_load(self: &Arc<Self>, user_id: &str) -> Result<Option<Subscription>, AccessError> {
        match self.state(user_id) {
            LoadState::Ready(subscription) => Ok(subscription),
            LoadState::Loading | LoadState::Unloaded => self.refresh(user_id).await,
        }
    }

    /// Move the user onto `plan`, starting now
    pub async fn upgrade(&self, user_id: &str, plan: &Plan, now: i64) -> Result<Subscription, AccessError> {
        let subscription = Subscription::from_plan(user_id, plan, now);

        self.backend
            .save(&subscription)
            .await
            .map_err(|e| AccessError::SubscriptionBackend(e.to_string()))?;

        self.resolve(user_id, Some(subscription.clone()));

        info!(user_id = %user_id, plan = %plan.name, end_date = subscription.end_date, "Subscription upgraded");
        Ok(subscription)
    }

    pub async fn cancel(self: &Arc<Self>, user_id: &str) -> Result<Subscription, AccessError> {
        let mut subscription = self
            .get_or_load(user_id)
            .await?
            .ok_or_else(|| AccessError::NotFound("Subscription not found".to_string()))?;

        subscription.status = SubscriptionStatus::Cancelled;

        self.backend
            .save(&subscription)
            .await
            .map_err(|e| AccessError::SubscriptionBackend(e.to_string()))?;

        self.resolve(user_id, Some(subscription.clone()));

        info!(user_id = %user_id, plan = %subscription.plan_name, "Subscription cancelled");
        Ok(subscription)
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn spawn_fetch(self: &Arc<Self>, user_id: String, generation: u64) {
        let loader = Arc::clone(self);
        self.metrics.increment_fetches();

        tokio::spawn(async move {
            let subscription = match loader.backend.fetch(&user_id).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        backend = loader.backend.name(),
                        error = %e,
                        "Subscription fetch failed, treating user as unsubscribed"
                    );
                    None
                }
            };

            debug!(
                user_id = %user_id,
                generation,
                found = subscription.is_some(),
                "Subscription fetch completed"
            );
            loader.complete_fetch(&user_id, generation, subscription);
        });
    }

    /// Store a fetch result if the slot still waits on this generation.
    /// An upgrade, cancel or newer fetch that took over the slot wins.
    fn complete_fetch(&self, user_id: &str, generation: u64, subscription: Option<Subscription>) {
        let waiters = match self.slots.get_mut(user_id).as_deref_mut() {
            Some(slot) if slot.is_loading(generation) => {
                match std::mem::replace(slot, Slot::Ready(subscription.clone())) {
                    Slot::Loading { waiters, .. } => waiters,
                    Slot::Ready(_) => Vec::new(),
                }
            }
            _ => {
                debug!(user_id = %user_id, generation, "Discarding superseded subscription fetch");
                return;
            }
        };

        for waiter in waiters {
            let _ = waiter.send(subscription.clone());
        }
    }

    fn resolve(&self, user_id: &str, subscription: Option<Subscription>) {
        let previous = self
            .slots
            .insert(user_id.to_string(), Slot::Ready(subscription.clone()));

        if let Some(Slot::Loading { waiters, .. }) = previous {
            for waiter in waiters {
                let _ = waiter.send(subscription.clone());
            }
        }
    }
}
