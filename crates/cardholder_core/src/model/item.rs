//! Collectible item domain model.
//!
//! # Responsibility
//! - Define the card record stored in set membership lists.
//! - Define the ordered rarity scale shared by UI and storage.
//!
//! # Invariants
//! - `id` is generated once and never reused for another item.
//! - `title` must be non-blank after trim before persistence.

use super::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one collectible item.
pub type ItemId = Uuid;

/// Card scarcity tier, ordered from most to least common.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RarityTier {
    #[default]
    Common,
    Uncommon,
    Rare,
    SuperRare,
    UltraRare,
    SecretRare,
}

impl RarityTier {
    /// Every tier in ascending scarcity order.
    pub const ALL: [RarityTier; 6] = [
        RarityTier::Common,
        RarityTier::Uncommon,
        RarityTier::Rare,
        RarityTier::SuperRare,
        RarityTier::UltraRare,
        RarityTier::SecretRare,
    ];

    /// Storage label used in `collectible_items.rarity`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::SuperRare => "super_rare",
            Self::UltraRare => "ultra_rare",
            Self::SecretRare => "secret_rare",
        }
    }

    /// Parses a storage label. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.as_str() == value)
    }
}

/// One collectible card record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectibleItem {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    /// Encoded image bytes as handed over by the UI. Never decoded in core.
    pub image: Option<Vec<u8>>,
    pub rarity: RarityTier,
}

impl CollectibleItem {
    /// Creates a new item with a generated stable ID and `Common` rarity.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title, description)
    }

    /// Creates an item with a caller-provided ID.
    ///
    /// Used by import paths and tests that need deterministic identity.
    pub fn with_id(id: ItemId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            image: None,
            rarity: RarityTier::Common,
        }
    }

    pub fn with_rarity(mut self, rarity: RarityTier) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    /// Checks write-path invariants.
    ///
    /// # Errors
    /// - `ValidationError::BlankItemTitle` when `title` is blank after trim.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::BlankItemTitle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CollectibleItem, RarityTier};
    use crate::model::ValidationError;

    #[test]
    fn rarity_labels_roundtrip_through_parse() {
        for tier in RarityTier::ALL {
            assert_eq!(RarityTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(RarityTier::parse("legendary"), None);
    }

    #[test]
    fn rarity_serializes_with_storage_labels() {
        for tier in RarityTier::ALL {
            let json = serde_json::to_string(&tier).unwrap();
            assert_eq!(json, format!("\"{}\"", tier.as_str()));
        }
    }

    #[test]
    fn rarity_is_ordered_by_scarcity() {
        assert!(RarityTier::Common < RarityTier::Uncommon);
        assert!(RarityTier::UltraRare < RarityTier::SecretRare);
        assert_eq!(RarityTier::default(), RarityTier::Common);
    }

    #[test]
    fn blank_title_is_rejected() {
        let item = CollectibleItem::new("  \t ", "no title");
        assert_eq!(item.validate(), Err(ValidationError::BlankItemTitle));
    }

    #[test]
    fn new_items_get_distinct_ids() {
        let first = CollectibleItem::new("a", "");
        let second = CollectibleItem::new("a", "");
        assert_ne!(first.id, second.id);
    }
}
