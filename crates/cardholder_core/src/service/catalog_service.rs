//! Catalogue use-case service.
//!
//! # Responsibility
//! - Expose set/item operations, live queries and first-launch bootstrap to
//!   the presentation layer.
//! - Map repository failures onto the four caller-facing error kinds.
//!
//! # Invariants
//! - Input validation runs before any transaction is opened.
//! - Every public mutation is its own transaction; observers are notified
//!   only after a successful commit.
//! - No live-query event is sent for a rolled-back mutation.

use crate::db::DbError;
use crate::model::{
    AppFlag, CollectibleItem, ItemId, ItemSet, ItemSetId, ItemSort, ListKind, ValidationError,
};
use crate::notify::{ChangeNotifier, LiveQuery, QuerySnapshot, Subscription};
use crate::repo::{CatalogRepository, FlagRepository, ItemSetListQuery, RepoError, RepoResult};
use crate::seed::{mock_item_set, MockImageSource, NoMockImages};
use log::{error, info, warn};
use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Identifier carried by a not-found failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingEntity {
    ItemSet(ItemSetId),
    Item(ItemId),
}

/// Caller-facing error for catalogue operations.
#[derive(Debug)]
pub enum CatalogError {
    /// Required input is blank or otherwise rejected; store untouched.
    Validation(ValidationError),
    /// The operation referenced a missing set or item.
    NotFound(MissingEntity),
    /// The store could not be opened or is not a migrated catalogue.
    StorageInit(RepoError),
    /// The write or read failed in SQLite; the transaction was rolled back.
    Transaction(RepoError),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(MissingEntity::ItemSet(id)) => write!(f, "item set not found: {id}"),
            Self::NotFound(MissingEntity::Item(id)) => {
                write!(f, "collectible item not found: {id}")
            }
            Self::StorageInit(err) => write!(f, "catalog storage unavailable: {err}"),
            Self::Transaction(err) => write!(f, "catalog transaction failed: {err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::StorageInit(err) | Self::Transaction(err) => Some(err),
        }
    }
}

impl From<RepoError> for CatalogError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::SetNotFound(id) => Self::NotFound(MissingEntity::ItemSet(id)),
            RepoError::ItemNotFound(id) => Self::NotFound(MissingEntity::Item(id)),
            err @ (RepoError::UninitializedConnection { .. }
            | RepoError::MissingRequiredTable(_)
            | RepoError::MissingRequiredColumn { .. }) => Self::StorageInit(err),
            other => Self::Transaction(other),
        }
    }
}

impl From<ValidationError> for CatalogError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for CatalogError {
    fn from(value: DbError) -> Self {
        Self::StorageInit(RepoError::Db(value))
    }
}

/// Catalogue facade over a repository and a change notifier.
pub struct CatalogService<R> {
    repo: R,
    notifier: ChangeNotifier,
}

impl<R: CatalogRepository + FlagRepository> CatalogService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Creates a set and returns its id.
    ///
    /// # Contract
    /// - Blank `name` fails with `Validation` before touching the store.
    /// - `is_primary = true` clears every other primary flag in the same
    ///   transaction.
    pub fn create_item_set(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        image: Option<Vec<u8>>,
        is_primary: bool,
    ) -> CatalogResult<ItemSetId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::BlankSetName.into());
        }

        let set = ItemSet::new(name.trim(), description)
            .with_image(image)
            .primary(is_primary);
        let set_id = self.mutate("item_set_create", |repo| repo.create_item_set(&set))?;
        info!(
            "event=item_set_create module=catalog status=ok set_id={set_id} is_primary={is_primary}"
        );
        Ok(set_id)
    }

    /// Makes an existing set primary and clears the flag on all others.
    pub fn set_primary_set(&self, set_id: ItemSetId) -> CatalogResult<()> {
        self.mutate("item_set_primary", |repo| repo.set_primary(set_id))?;
        info!("event=item_set_primary module=catalog status=ok set_id={set_id}");
        Ok(())
    }

    /// Returns the primary set, if any.
    ///
    /// When more than one set carries the flag (legacy data) the oldest is
    /// returned.
    pub fn fetch_primary_set(&self) -> CatalogResult<Option<ItemSet>> {
        Ok(self.primary_set()?)
    }

    /// Returns every non-primary set in creation order.
    pub fn fetch_secondary_sets(&self) -> CatalogResult<Vec<ItemSet>> {
        Ok(self.repo.list_item_sets(&ItemSetListQuery {
            is_primary: Some(false),
        })?)
    }

    /// Returns every set in creation order.
    pub fn fetch_all_sets(&self) -> CatalogResult<Vec<ItemSet>> {
        Ok(self.repo.list_item_sets(&ItemSetListQuery::default())?)
    }

    pub fn fetch_item_set(&self, set_id: ItemSetId) -> CatalogResult<ItemSet> {
        self.repo
            .get_item_set(set_id)?
            .ok_or(CatalogError::NotFound(MissingEntity::ItemSet(set_id)))
    }

    /// Deletes a set together with every item its three lists reference.
    pub fn delete_item_set(&self, set_id: ItemSetId) -> CatalogResult<()> {
        let deleted_items = self.mutate("item_set_delete", |repo| repo.delete_item_set(set_id))?;
        info!(
            "event=item_set_delete module=catalog status=ok set_id={set_id} deleted_items={deleted_items}"
        );
        Ok(())
    }

    /// Stores `item` and appends it to one list of one set.
    pub fn add_item(
        &self,
        item: &CollectibleItem,
        kind: ListKind,
        set_id: ItemSetId,
    ) -> CatalogResult<()> {
        item.validate()?;
        self.mutate("item_add", |repo| repo.add_item(set_id, kind, item))?;
        info!(
            "event=item_add module=catalog status=ok set_id={set_id} item_id={} list={}",
            item.id,
            kind.as_str()
        );
        Ok(())
    }

    /// Removes an item reference from one list; the item record persists.
    ///
    /// Returns `false` (and changes nothing) when the item is not in that
    /// list.
    pub fn remove_item(
        &self,
        item_id: ItemId,
        kind: ListKind,
        set_id: ItemSetId,
    ) -> CatalogResult<bool> {
        let removed = self.mutate("item_remove", |repo| repo.remove_item(set_id, kind, item_id))?;
        info!(
            "event=item_remove module=catalog status=ok set_id={set_id} item_id={item_id} list={} removed={removed}",
            kind.as_str()
        );
        Ok(removed)
    }

    pub fn fetch_item(&self, item_id: ItemId) -> CatalogResult<CollectibleItem> {
        self.repo
            .get_item(item_id)?
            .ok_or(CatalogError::NotFound(MissingEntity::Item(item_id)))
    }

    /// Returns one membership list of one set.
    pub fn fetch_items(
        &self,
        set_id: ItemSetId,
        kind: ListKind,
        sort: ItemSort,
    ) -> CatalogResult<Vec<CollectibleItem>> {
        Ok(self.repo.list_items(set_id, kind, sort)?)
    }

    /// Deletes an item record and every list reference to it.
    pub fn delete_item(&self, item_id: ItemId) -> CatalogResult<()> {
        self.mutate("item_delete", |repo| repo.delete_item(item_id))?;
        info!("event=item_delete module=catalog status=ok item_id={item_id}");
        Ok(())
    }

    /// Clears every set and item. App flags are kept.
    pub fn delete_all_data(&self) -> CatalogResult<()> {
        self.mutate("catalog_reset", |repo| repo.delete_all())?;
        info!("event=catalog_reset module=catalog status=ok");
        Ok(())
    }

    pub fn count_item_sets(&self) -> CatalogResult<u64> {
        Ok(self.repo.count_item_sets()?)
    }

    pub fn count_items(&self) -> CatalogResult<u64> {
        Ok(self.repo.count_items()?)
    }

    /// Seeds the starter set when the store holds no set.
    ///
    /// Uses thread-local randomness and no artwork.
    pub fn create_mock_data_if_empty(&self) -> CatalogResult<bool> {
        self.create_mock_data_if_empty_with(&mut rand::thread_rng(), &NoMockImages)
    }

    /// Seeds the starter set with injected randomness and artwork.
    ///
    /// Returns `true` when the set was inserted, `false` when the store
    /// already held data.
    pub fn create_mock_data_if_empty_with<G, I>(&self, rng: &mut G, images: &I) -> CatalogResult<bool>
    where
        G: Rng + ?Sized,
        I: MockImageSource + ?Sized,
    {
        let set = mock_item_set(rng, images);
        let created = self.mutate("mock_seed", |repo| repo.create_item_set_if_empty(&set))?;
        info!(
            "event=mock_seed module=catalog status=ok created={created} items={}",
            set.item_count()
        );
        Ok(created)
    }

    /// Runs the first-launch bootstrap once per store.
    ///
    /// Seeds mock data (when the catalogue is empty) and records
    /// `HasLaunchedBefore`. Returns whether the bootstrap ran.
    pub fn bootstrap_first_launch<G, I>(&self, rng: &mut G, images: &I) -> CatalogResult<bool>
    where
        G: Rng + ?Sized,
        I: MockImageSource + ?Sized,
    {
        if self.repo.get_flag(AppFlag::HasLaunchedBefore)? {
            return Ok(false);
        }
        // Seeding is idempotent, so a crash before the flag write only
        // repeats a no-op on the next launch.
        self.create_mock_data_if_empty_with(rng, images)?;
        self.repo.set_flag(AppFlag::HasLaunchedBefore, true)?;
        info!("event=first_launch module=catalog status=ok");
        Ok(true)
    }

    /// Returns `true` exactly once per store, then records `OnboardingShown`.
    pub fn take_onboarding_pending(&self) -> CatalogResult<bool> {
        if self.repo.get_flag(AppFlag::OnboardingShown)? {
            return Ok(false);
        }
        self.repo.set_flag(AppFlag::OnboardingShown, true)?;
        Ok(true)
    }

    pub fn app_flag(&self, flag: AppFlag) -> CatalogResult<bool> {
        Ok(self.repo.get_flag(flag)?)
    }

    pub fn set_app_flag(&self, flag: AppFlag, value: bool) -> CatalogResult<()> {
        Ok(self.repo.set_flag(flag, value)?)
    }

    /// Registers a live query and delivers its initial snapshot.
    pub fn subscribe(&self, query: LiveQuery) -> Subscription {
        self.notifier.subscribe(query, |query| self.evaluate(query))
    }

    /// Number of live subscriptions currently registered.
    pub fn subscription_count(&self) -> usize {
        self.notifier.observer_count()
    }

    fn mutate<T>(
        &self,
        event: &'static str,
        op: impl FnOnce(&R) -> RepoResult<T>,
    ) -> CatalogResult<T> {
        match op(&self.repo) {
            Ok(value) => {
                self.notifier.publish(|query| self.evaluate(query));
                Ok(value)
            }
            Err(err) => {
                let err = CatalogError::from(err);
                match &err {
                    CatalogError::Validation(_) | CatalogError::NotFound(_) => warn!(
                        "event={event} module=catalog status=rejected error={err}"
                    ),
                    _ => error!("event={event} module=catalog status=error error={err}"),
                }
                Err(err)
            }
        }
    }

    fn primary_set(&self) -> RepoResult<Option<ItemSet>> {
        let mut primaries = self.repo.list_item_sets(&ItemSetListQuery {
            is_primary: Some(true),
        })?;
        if primaries.len() > 1 {
            warn!(
                "event=primary_set_conflict module=catalog status=degraded count={}",
                primaries.len()
            );
        }
        if primaries.is_empty() {
            return Ok(None);
        }
        Ok(Some(primaries.swap_remove(0)))
    }

    fn evaluate(&self, query: &LiveQuery) -> RepoResult<QuerySnapshot> {
        let snapshot = match query {
            LiveQuery::ItemSet(set_id) => {
                QuerySnapshot::Sets(self.repo.get_item_set(*set_id)?.into_iter().collect())
            }
            LiveQuery::Item(item_id) => {
                QuerySnapshot::Items(self.repo.get_item(*item_id)?.into_iter().collect())
            }
            LiveQuery::PrimarySet => {
                QuerySnapshot::Sets(self.primary_set()?.into_iter().collect())
            }
            LiveQuery::SecondarySets => {
                QuerySnapshot::Sets(self.repo.list_item_sets(&ItemSetListQuery {
                    is_primary: Some(false),
                })?)
            }
            LiveQuery::AllSets => {
                QuerySnapshot::Sets(self.repo.list_item_sets(&ItemSetListQuery::default())?)
            }
            LiveQuery::ListItems { set_id, kind, sort } => {
                match self.repo.list_items(*set_id, *kind, *sort) {
                    Ok(items) => QuerySnapshot::Items(items),
                    // A deleted set reads as an empty list.
                    Err(RepoError::SetNotFound(_)) => QuerySnapshot::Items(Vec::new()),
                    Err(err) => return Err(err),
                }
            }
        };
        Ok(snapshot)
    }
}
