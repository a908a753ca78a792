//! Catalogue domain model.
//!
//! # Responsibility
//! - Define canonical records for collectible items and item sets.
//! - Own write-path validation shared by repository and service layers.
//!
//! # Invariants
//! - Every record is identified by a stable UUID generated at creation.
//! - Validation never touches storage.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod flag;
pub mod item;
pub mod item_set;

pub use flag::AppFlag;
pub use item::{CollectibleItem, ItemId, RarityTier};
pub use item_set::{ItemSet, ItemSetId, ItemSort, ListKind};

/// Write-path validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Set name is empty after trimming whitespace.
    BlankSetName,
    /// Item title is empty after trimming whitespace.
    BlankItemTitle,
    /// Item is already referenced by a membership list.
    ItemAlreadyListed { item_id: ItemId },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankSetName => write!(f, "set name must not be blank"),
            Self::BlankItemTitle => write!(f, "item title must not be blank"),
            Self::ItemAlreadyListed { item_id } => {
                write!(f, "item is already listed in a set: {item_id}")
            }
        }
    }
}

impl Error for ValidationError {}
