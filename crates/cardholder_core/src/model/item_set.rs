//! Item set domain model.
//!
//! # Responsibility
//! - Define the named collection holding owned/wishlist/trade lists.
//! - Provide explicit list selection by `ListKind`.
//!
//! # Invariants
//! - `name` must be non-blank after trim before persistence.
//! - At most one persisted set has `is_primary = true` (enforced by storage).
//! - List vectors keep append order.

use super::item::CollectibleItem;
use super::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one item set.
pub type ItemSetId = Uuid;

/// Membership list selector inside one set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Owned,
    Wishlist,
    Trade,
}

impl ListKind {
    pub const ALL: [ListKind; 3] = [ListKind::Owned, ListKind::Wishlist, ListKind::Trade];

    /// Storage label used in `set_memberships.list_kind`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owned => "owned",
            Self::Wishlist => "wishlist",
            Self::Trade => "trade",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

/// Ordering applied when reading one membership list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ItemSort {
    /// Append order of the list.
    #[default]
    Insertion,
    /// Case-insensitive title, ties broken by append order.
    Title,
}

/// Named collection of collectible items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSet {
    pub id: ItemSetId,
    pub name: String,
    pub description: String,
    pub image: Option<Vec<u8>>,
    pub is_primary: bool,
    pub owned_items: Vec<CollectibleItem>,
    pub wishlist_items: Vec<CollectibleItem>,
    pub trade_items: Vec<CollectibleItem>,
}

impl ItemSet {
    /// Creates an empty, non-primary set with a generated stable ID.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            image: None,
            is_primary: false,
            owned_items: Vec::new(),
            wishlist_items: Vec::new(),
            trade_items: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: Option<Vec<u8>>) -> Self {
        self.image = image;
        self
    }

    pub fn primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    /// Returns the membership list selected by `kind`.
    pub fn list(&self, kind: ListKind) -> &[CollectibleItem] {
        match kind {
            ListKind::Owned => &self.owned_items,
            ListKind::Wishlist => &self.wishlist_items,
            ListKind::Trade => &self.trade_items,
        }
    }

    pub fn list_mut(&mut self, kind: ListKind) -> &mut Vec<CollectibleItem> {
        match kind {
            ListKind::Owned => &mut self.owned_items,
            ListKind::Wishlist => &mut self.wishlist_items,
            ListKind::Trade => &mut self.trade_items,
        }
    }

    /// Iterates `(kind, item)` over all three lists.
    pub fn members(&self) -> impl Iterator<Item = (ListKind, &CollectibleItem)> {
        ListKind::ALL
            .into_iter()
            .flat_map(move |kind| self.list(kind).iter().map(move |item| (kind, item)))
    }

    pub fn item_count(&self) -> usize {
        self.owned_items.len() + self.wishlist_items.len() + self.trade_items.len()
    }

    /// Checks write-path invariants for the set and its listed items.
    ///
    /// # Errors
    /// - `ValidationError::BlankSetName` when `name` is blank after trim.
    /// - `ValidationError::BlankItemTitle` for any listed item without title.
    /// - `ValidationError::ItemAlreadyListed` when one item id appears twice.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankSetName);
        }

        let mut seen = std::collections::HashSet::new();
        for (_, item) in self.members() {
            item.validate()?;
            if !seen.insert(item.id) {
                return Err(ValidationError::ItemAlreadyListed { item_id: item.id });
            }
        }
        Ok(())
    }
}
