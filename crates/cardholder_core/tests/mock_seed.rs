use cardholder_core::db::open_db_in_memory;
use cardholder_core::seed::{MOCK_ROSTER, MOCK_SET_NAME};
use cardholder_core::{
    CatalogService, ItemSort, ListKind, NoMockImages, RarityTier, SqliteCatalogRepository,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusqlite::Connection;

fn service(conn: &Connection) -> CatalogService<SqliteCatalogRepository<'_>> {
    CatalogService::new(SqliteCatalogRepository::try_new(conn).unwrap())
}

#[test]
fn empty_store_gets_primary_starter_set() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(service.create_mock_data_if_empty().unwrap());

    let primary = service.fetch_primary_set().unwrap().unwrap();
    assert_eq!(primary.name, MOCK_SET_NAME);
    assert_eq!(primary.owned_items.len(), 9);
    assert!(primary.wishlist_items.is_empty());
    assert!(primary.trade_items.is_empty());

    let titles: Vec<_> = primary
        .owned_items
        .iter()
        .map(|item| item.title.as_str())
        .collect();
    let expected: Vec<_> = MOCK_ROSTER.iter().map(|(title, _, _)| *title).collect();
    assert_eq!(titles, expected);
    assert!(primary
        .owned_items
        .iter()
        .all(|item| RarityTier::ALL.contains(&item.rarity)));
}

#[test]
fn seeding_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(service.create_mock_data_if_empty().unwrap());
    assert!(!service.create_mock_data_if_empty().unwrap());

    assert_eq!(service.count_item_sets().unwrap(), 1);
    assert_eq!(service.count_items().unwrap(), 9);
}

#[test]
fn existing_data_blocks_seeding() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service.create_item_set("Mine", "", None, false).unwrap();

    assert!(!service.create_mock_data_if_empty().unwrap());

    assert_eq!(service.count_item_sets().unwrap(), 1);
    assert!(service.fetch_primary_set().unwrap().is_none());
}

#[test]
fn seeded_rarities_are_reproducible_with_fixed_rng() {
    let rarities = |seed: u64| {
        let conn = open_db_in_memory().unwrap();
        let service = service(&conn);
        service
            .create_mock_data_if_empty_with(&mut StdRng::seed_from_u64(seed), &NoMockImages)
            .unwrap();
        let primary = service.fetch_primary_set().unwrap().unwrap();
        let owned = service
            .fetch_items(primary.id, ListKind::Owned, ItemSort::Insertion)
            .unwrap();
        owned.into_iter().map(|item| item.rarity).collect::<Vec<_>>()
    };

    assert_eq!(rarities(11), rarities(11));
}

#[test]
fn injected_images_are_stored_with_seeded_records() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let images = |asset: &str| Some(format!("img:{asset}").into_bytes());

    service
        .create_mock_data_if_empty_with(&mut StdRng::seed_from_u64(3), &images)
        .unwrap();

    let primary = service.fetch_primary_set().unwrap().unwrap();
    assert_eq!(primary.image, Some(b"img:artCol".to_vec()));
    assert_eq!(primary.owned_items[0].image, Some(b"img:1".to_vec()));
}
