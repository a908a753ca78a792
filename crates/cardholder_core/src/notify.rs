//! Live-query change notification.
//!
//! # Responsibility
//! - Register observers for one entity or one filtered collection.
//! - Deliver an initial snapshot on subscribe and update snapshots after
//!   committed mutations, over one `mpsc` channel per subscription.
//!
//! # Invariants
//! - An update is sent only when the re-evaluated snapshot differs from the
//!   last one delivered to that observer.
//! - One subscription observes events in commit order.
//! - After `Subscription::cancel` or drop, the registry holds no entry for
//!   the subscription and nothing is sent to it.

use crate::model::{CollectibleItem, ItemId, ItemSet, ItemSetId, ItemSort, ListKind};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// Registry-unique subscription handle id.
pub type SubscriptionId = u64;

/// Query re-evaluated after every committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveQuery {
    /// One set by id; zero or one element.
    ItemSet(ItemSetId),
    /// One item by id; zero or one element.
    Item(ItemId),
    /// Sets with `is_primary == true`.
    PrimarySet,
    /// Sets with `is_primary == false`, creation order.
    SecondarySets,
    /// Every set, creation order.
    AllSets,
    /// One membership list of one set.
    ListItems {
        set_id: ItemSetId,
        kind: ListKind,
        sort: ItemSort,
    },
}

impl LiveQuery {
    fn label(&self) -> &'static str {
        match self {
            Self::ItemSet(_) => "item_set",
            Self::Item(_) => "item",
            Self::PrimarySet => "primary_set",
            Self::SecondarySets => "secondary_sets",
            Self::AllSets => "all_sets",
            Self::ListItems { .. } => "list_items",
        }
    }
}

/// Plain-data result of one live query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySnapshot {
    Sets(Vec<ItemSet>),
    Items(Vec<CollectibleItem>),
}

impl QuerySnapshot {
    /// Set rows, empty for item snapshots.
    pub fn sets(&self) -> &[ItemSet] {
        match self {
            Self::Sets(sets) => sets,
            Self::Items(_) => &[],
        }
    }

    /// Item rows, empty for set snapshots.
    pub fn items(&self) -> &[CollectibleItem] {
        match self {
            Self::Items(items) => items,
            Self::Sets(_) => &[],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Sets(sets) => sets.len(),
            Self::Items(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Event delivered to one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Snapshot taken at subscribe time.
    Initial(QuerySnapshot),
    /// Snapshot after a commit that changed the query result.
    Update(QuerySnapshot),
    /// Query evaluation failed; the subscription stays registered.
    Error(String),
}

impl ChangeEvent {
    pub fn snapshot(&self) -> Option<&QuerySnapshot> {
        match self {
            Self::Initial(snapshot) | Self::Update(snapshot) => Some(snapshot),
            Self::Error(_) => None,
        }
    }
}

struct Observer {
    query: LiveQuery,
    last: Option<QuerySnapshot>,
    sender: Sender<ChangeEvent>,
}

type Registry = Mutex<BTreeMap<SubscriptionId, Observer>>;

/// Observer registry owned by the catalog service.
pub struct ChangeNotifier {
    observers: Arc<Registry>,
    next_id: AtomicU64,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            observers: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers `query` and sends its initial snapshot.
    ///
    /// `evaluate` runs once, before the observer becomes visible to
    /// `publish`.
    pub fn subscribe<E: Display>(
        &self,
        query: LiveQuery,
        evaluate: impl FnOnce(&LiveQuery) -> Result<QuerySnapshot, E>,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel();

        let last = match evaluate(&query) {
            Ok(snapshot) => {
                let _ = sender.send(ChangeEvent::Initial(snapshot.clone()));
                Some(snapshot)
            }
            Err(err) => {
                warn!(
                    "event=live_query_eval module=notify status=error subscription_id={id} query={} error={err}",
                    query.label()
                );
                let _ = sender.send(ChangeEvent::Error(err.to_string()));
                None
            }
        };

        debug!(
            "event=live_query_subscribe module=notify status=ok subscription_id={id} query={}",
            query.label()
        );
        lock(&self.observers).insert(
            id,
            Observer {
                query: query.clone(),
                last,
                sender,
            },
        );

        Subscription {
            id,
            query,
            receiver,
            registry: Arc::downgrade(&self.observers),
        }
    }

    /// Re-evaluates every live query and pushes changed snapshots.
    ///
    /// Observers whose receiving side is gone are pruned.
    pub fn publish<E: Display>(
        &self,
        mut evaluate: impl FnMut(&LiveQuery) -> Result<QuerySnapshot, E>,
    ) {
        let mut observers = lock(&self.observers);
        let mut disconnected = Vec::new();

        for (id, observer) in observers.iter_mut() {
            let event = match evaluate(&observer.query) {
                Ok(snapshot) => {
                    if observer.last.as_ref() == Some(&snapshot) {
                        continue;
                    }
                    observer.last = Some(snapshot.clone());
                    ChangeEvent::Update(snapshot)
                }
                Err(err) => {
                    warn!(
                        "event=live_query_eval module=notify status=error subscription_id={id} query={} error={err}",
                        observer.query.label()
                    );
                    observer.last = None;
                    ChangeEvent::Error(err.to_string())
                }
            };

            if observer.sender.send(event).is_err() {
                disconnected.push(*id);
            }
        }

        for id in disconnected {
            observers.remove(&id);
            debug!("event=live_query_prune module=notify status=ok subscription_id={id}");
        }
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        lock(&self.observers).len()
    }
}

/// Receiving handle of one live query.
///
/// Dropping the handle cancels the subscription.
pub struct Subscription {
    id: SubscriptionId,
    query: LiveQuery,
    receiver: Receiver<ChangeEvent>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn query(&self) -> &LiveQuery {
        &self.query
    }

    /// Blocks until the next event. `None` once the notifier is gone.
    pub fn recv(&self) -> Option<ChangeEvent> {
        self.receiver.recv().ok()
    }

    /// Returns the next pending event without blocking.
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Takes every pending event in delivery order.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.receiver.try_iter().collect()
    }

    /// Unregisters the observer. Pending events are discarded.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if lock(&registry).remove(&self.id).is_some() {
                debug!(
                    "event=live_query_cancel module=notify status=ok subscription_id={}",
                    self.id
                );
            }
        }
    }
}

fn lock(registry: &Registry) -> MutexGuard<'_, BTreeMap<SubscriptionId, Observer>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::{ChangeEvent, ChangeNotifier, LiveQuery, QuerySnapshot};
    use crate::model::CollectibleItem;
    use std::convert::Infallible;

    fn items(titles: &[&str]) -> QuerySnapshot {
        QuerySnapshot::Items(
            titles
                .iter()
                .map(|title| CollectibleItem::with_id(uuid::Uuid::nil(), *title, ""))
                .collect(),
        )
    }

    #[test]
    fn subscribe_sends_initial_snapshot() {
        let notifier = ChangeNotifier::new();
        let sub = notifier.subscribe(LiveQuery::AllSets, |_| {
            Ok::<_, Infallible>(QuerySnapshot::Sets(Vec::new()))
        });

        assert_eq!(
            sub.try_recv(),
            Some(ChangeEvent::Initial(QuerySnapshot::Sets(Vec::new())))
        );
        assert_eq!(sub.try_recv(), None);
        assert_eq!(notifier.observer_count(), 1);
    }

    #[test]
    fn publish_skips_unchanged_snapshots() {
        let notifier = ChangeNotifier::new();
        let sub = notifier.subscribe(LiveQuery::AllSets, |_| Ok::<_, Infallible>(items(&["a"])));
        sub.drain();

        notifier.publish(|_| Ok::<_, Infallible>(items(&["a"])));
        assert!(sub.drain().is_empty());

        notifier.publish(|_| Ok::<_, Infallible>(items(&["a", "b"])));
        assert_eq!(sub.drain(), vec![ChangeEvent::Update(items(&["a", "b"]))]);
    }

    #[test]
    fn evaluation_errors_are_delivered_and_recovered_from() {
        let notifier = ChangeNotifier::new();
        let sub = notifier.subscribe(LiveQuery::PrimarySet, |_| Ok::<_, String>(items(&[])));
        sub.drain();

        notifier.publish(|_| Err::<QuerySnapshot, _>("disk gone".to_string()));
        assert_eq!(sub.drain(), vec![ChangeEvent::Error("disk gone".to_string())]);

        notifier.publish(|_| Ok::<_, String>(items(&[])));
        assert_eq!(sub.drain(), vec![ChangeEvent::Update(items(&[]))]);
    }

    #[test]
    fn dropping_subscription_unregisters_observer() {
        let notifier = ChangeNotifier::new();
        let first = notifier.subscribe(LiveQuery::AllSets, |_| Ok::<_, Infallible>(items(&[])));
        let second = notifier.subscribe(LiveQuery::AllSets, |_| Ok::<_, Infallible>(items(&[])));
        assert_ne!(first.id(), second.id());

        first.cancel();
        assert_eq!(notifier.observer_count(), 1);
        drop(second);
        assert_eq!(notifier.observer_count(), 0);
    }

    #[test]
    fn subscription_outliving_notifier_is_disconnected() {
        let notifier = ChangeNotifier::new();
        let sub = notifier.subscribe(LiveQuery::AllSets, |_| Ok::<_, Infallible>(items(&[])));
        drop(notifier);

        assert!(matches!(sub.recv(), Some(ChangeEvent::Initial(_))));
        assert_eq!(sub.recv(), None);
    }
}
