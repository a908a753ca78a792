//! Starter collection for first launch.
//!
//! # Responsibility
//! - Build the "Inaugural Edition" primary set with its fixed roster.
//! - Keep randomness and image lookup injectable so callers can reproduce
//!   a seed exactly.
//!
//! # Invariants
//! - Titles, descriptions and roster order never change between calls.
//! - Rarity is drawn uniformly and independently per item.

use crate::model::{CollectibleItem, ItemSet, RarityTier};
use rand::seq::SliceRandom;
use rand::Rng;

pub const MOCK_SET_NAME: &str = "Inaugural Edition";
pub const MOCK_SET_DESCRIPTION: &str = "A groundbreaking set of cards featuring the next generation of superstars, top draft picks, and breakout rookies destined to define an era.";
pub const MOCK_SET_IMAGE_ASSET: &str = "artCol";

/// `(title, description, image asset key)` for every seeded owned item.
pub const MOCK_ROSTER: [(&str, &str, &str); 9] = [
    (
        "Antoine Dubo",
        "A midfield maestro whose field vision and precise passing can unlock any defense. A true artist with the ball.",
        "1",
    ),
    (
        "Marco Diager",
        "A cold-blooded striker with a predator's instinct. Give him half a chance in the box, and the ball will find the back of the net.",
        "5",
    ),
    (
        "Lucas Marton",
        "The team's tireless engine. Known for his incredible work rate, covering every blade of grass from box to box.",
        "8",
    ),
    (
        "Victor Morey",
        "An explosive playmaker with unmatched speed and agility. His crossover is considered one of the most unstoppable moves in the league.",
        "3",
    ),
    (
        "Leo Petiter",
        "A dominant force under the hoop. His shot-blocking ability and powerful rebounds make him the anchor of his team's defense.",
        "9",
    ),
    (
        "Lars Jansenyok",
        "A natural-born sniper with lethal accuracy from beyond the three-point arc. His quick release makes him a constant threat on the perimeter.",
        "7",
    ),
    (
        "John 'The Hammer' Riley",
        "A legendary power hitter, known for his crushing home runs. When he steps up to the plate, outfielders take a step back.",
        "2",
    ),
    (
        "Keni Tanka",
        "A defensive genius in the outfield with lightning-fast reflexes. His speed on the bases turns singles into extra-base hits.",
        "6",
    ),
    (
        "Sven van der Ger",
        "An unbreakable defenseman with a bone-crushing check. He protects the goal like a fortress and is a leader on the penalty kill.",
        "10",
    ),
];

/// Resolves bundled artwork for seeded records.
///
/// Implemented by the presentation layer, which owns the asset catalogue and
/// image encoding.
pub trait MockImageSource {
    /// Returns encoded image bytes for `asset`, or `None` when unavailable.
    fn image(&self, asset: &str) -> Option<Vec<u8>>;
}

/// Image source that never provides artwork.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMockImages;

impl MockImageSource for NoMockImages {
    fn image(&self, _asset: &str) -> Option<Vec<u8>> {
        None
    }
}

impl<F> MockImageSource for F
where
    F: Fn(&str) -> Option<Vec<u8>>,
{
    fn image(&self, asset: &str) -> Option<Vec<u8>> {
        self(asset)
    }
}

/// Builds the starter set: primary, nine owned items, empty wishlist/trade.
pub fn mock_item_set<R, I>(rng: &mut R, images: &I) -> ItemSet
where
    R: Rng + ?Sized,
    I: MockImageSource + ?Sized,
{
    let mut set = ItemSet::new(MOCK_SET_NAME, MOCK_SET_DESCRIPTION)
        .with_image(images.image(MOCK_SET_IMAGE_ASSET))
        .primary(true);

    for (title, description, asset) in MOCK_ROSTER {
        let rarity = RarityTier::ALL
            .choose(rng)
            .copied()
            .unwrap_or_default();
        let mut item = CollectibleItem::new(title, description).with_rarity(rarity);
        item.image = images.image(asset);
        set.owned_items.push(item);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::{mock_item_set, NoMockImages, MOCK_ROSTER, MOCK_SET_NAME};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn mock_set_has_fixed_roster_in_owned_list() {
        let set = mock_item_set(&mut StdRng::seed_from_u64(7), &NoMockImages);

        assert_eq!(set.name, MOCK_SET_NAME);
        assert!(set.is_primary);
        assert!(set.image.is_none());
        assert_eq!(set.owned_items.len(), 9);
        assert!(set.wishlist_items.is_empty());
        assert!(set.trade_items.is_empty());
        let titles: Vec<_> = set.owned_items.iter().map(|item| item.title.as_str()).collect();
        let expected: Vec<_> = MOCK_ROSTER.iter().map(|(title, _, _)| *title).collect();
        assert_eq!(titles, expected);
        set.validate().expect("mock set should be valid");
    }

    #[test]
    fn same_seed_gives_same_rarities() {
        let first = mock_item_set(&mut StdRng::seed_from_u64(42), &NoMockImages);
        let second = mock_item_set(&mut StdRng::seed_from_u64(42), &NoMockImages);

        let rarities = |set: &crate::model::ItemSet| {
            set.owned_items
                .iter()
                .map(|item| item.rarity)
                .collect::<Vec<_>>()
        };
        assert_eq!(rarities(&first), rarities(&second));
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn image_source_is_consulted_per_asset() {
        let images = |asset: &str| Some(asset.as_bytes().to_vec());
        let set = mock_item_set(&mut StdRng::seed_from_u64(1), &images);

        assert_eq!(set.image.as_deref(), Some("artCol".as_bytes()));
        assert_eq!(set.owned_items[0].image.as_deref(), Some("1".as_bytes()));
        assert_eq!(set.owned_items[8].image.as_deref(), Some("10".as_bytes()));
    }
}
