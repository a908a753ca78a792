use cardholder_core::db::open_db_in_memory;
use cardholder_core::{
    CatalogError, CatalogRepository, CatalogService, CollectibleItem, ItemSet, ItemSetListQuery,
    ItemSort, ListKind, MissingEntity, SqliteCatalogRepository, ValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn service(conn: &Connection) -> CatalogService<SqliteCatalogRepository<'_>> {
    CatalogService::new(SqliteCatalogRepository::try_new(conn).unwrap())
}

#[test]
fn create_and_fetch_set_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let id = service
        .create_item_set("Rookies", "first year players", Some(vec![1, 2, 3]), false)
        .unwrap();

    let set = service.fetch_item_set(id).unwrap();
    assert_eq!(set.id, id);
    assert_eq!(set.name, "Rookies");
    assert_eq!(set.description, "first year players");
    assert_eq!(set.image, Some(vec![1, 2, 3]));
    assert!(!set.is_primary);
    assert_eq!(set.item_count(), 0);
}

#[test]
fn set_name_is_stored_trimmed() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let id = service.create_item_set("  Legends ", "", None, false).unwrap();

    assert_eq!(service.fetch_item_set(id).unwrap().name, "Legends");
}

#[test]
fn blank_set_name_is_rejected_without_mutation() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service.create_item_set("   ", "desc", None, true).unwrap_err();

    assert!(matches!(
        err,
        CatalogError::Validation(ValidationError::BlankSetName)
    ));
    assert_eq!(service.count_item_sets().unwrap(), 0);
}

#[test]
fn creating_primary_set_demotes_previous_primary() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let first = service.create_item_set("A", "", None, true).unwrap();
    let second = service.create_item_set("B", "", None, true).unwrap();

    let primary = service.fetch_primary_set().unwrap().unwrap();
    assert_eq!(primary.id, second);
    assert_eq!(primary.name, "B");

    let secondary = service.fetch_secondary_sets().unwrap();
    assert_eq!(secondary.len(), 1);
    assert_eq!(secondary[0].id, first);
    assert!(!secondary[0].is_primary);
}

#[test]
fn at_most_one_primary_set_after_any_sequence_of_creates() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    for (index, is_primary) in [true, false, true, true, false].into_iter().enumerate() {
        service
            .create_item_set(format!("set {index}"), "", None, is_primary)
            .unwrap();
        let primaries = service
            .fetch_all_sets()
            .unwrap()
            .into_iter()
            .filter(|set| set.is_primary)
            .count();
        assert!(primaries <= 1);
    }
    assert_eq!(service.fetch_primary_set().unwrap().unwrap().name, "set 3");
}

#[test]
fn set_primary_set_moves_the_flag() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let first = service.create_item_set("A", "", None, true).unwrap();
    let second = service.create_item_set("B", "", None, false).unwrap();

    service.set_primary_set(second).unwrap();

    assert_eq!(service.fetch_primary_set().unwrap().unwrap().id, second);
    assert!(!service.fetch_item_set(first).unwrap().is_primary);

    let err = service.set_primary_set(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(MissingEntity::ItemSet(_))));
    assert_eq!(service.fetch_primary_set().unwrap().unwrap().id, second);
}

#[test]
fn fetch_primary_set_is_none_without_primary() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    service.create_item_set("A", "", None, false).unwrap();

    assert!(service.fetch_primary_set().unwrap().is_none());
}

#[test]
fn fetch_primary_set_prefers_oldest_when_legacy_rows_conflict() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let older = service.create_item_set("Old", "", None, true).unwrap();
    let newer = service.create_item_set("New", "", None, false).unwrap();

    conn.execute(
        "UPDATE item_sets SET is_primary = 1 WHERE uuid = ?1;",
        [newer.to_string()],
    )
    .unwrap();

    assert_eq!(service.fetch_primary_set().unwrap().unwrap().id, older);
}

#[test]
fn sets_are_listed_in_creation_order() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let ids: Vec<_> = ["Zeta", "Alpha", "Mid"]
        .into_iter()
        .map(|name| service.create_item_set(name, "", None, false).unwrap())
        .collect();

    let listed: Vec<_> = service
        .fetch_all_sets()
        .unwrap()
        .into_iter()
        .map(|set| set.id)
        .collect();
    assert_eq!(listed, ids);
}

#[test]
fn fetch_missing_set_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let missing = Uuid::new_v4();

    let err = service.fetch_item_set(missing).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::NotFound(MissingEntity::ItemSet(id)) if id == missing
    ));
}

#[test]
fn delete_set_removes_every_listed_item() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let doomed = service.create_item_set("Doomed", "", None, false).unwrap();
    let kept = service.create_item_set("Kept", "", None, false).unwrap();

    let owned = CollectibleItem::new("Owned", "");
    let wished = CollectibleItem::new("Wished", "");
    let traded = CollectibleItem::new("Traded", "");
    let survivor = CollectibleItem::new("Survivor", "");
    service.add_item(&owned, ListKind::Owned, doomed).unwrap();
    service.add_item(&wished, ListKind::Wishlist, doomed).unwrap();
    service.add_item(&traded, ListKind::Trade, doomed).unwrap();
    service.add_item(&survivor, ListKind::Owned, kept).unwrap();

    service.delete_item_set(doomed).unwrap();

    for item in [&owned, &wished, &traded] {
        let err = service.fetch_item(item.id).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(MissingEntity::Item(_))));
    }
    assert_eq!(service.fetch_item(survivor.id).unwrap().title, "Survivor");
    assert_eq!(service.count_items().unwrap(), 1);
    assert!(matches!(
        service.fetch_item_set(doomed).unwrap_err(),
        CatalogError::NotFound(_)
    ));

    let orphans: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM set_memberships WHERE set_uuid = ?1;",
            [doomed.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn delete_missing_set_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service.delete_item_set(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(MissingEntity::ItemSet(_))));
}

#[test]
fn failed_set_delete_rolls_back_item_deletes() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let set_id = service.create_item_set("Guarded", "", None, false).unwrap();
    let item = CollectibleItem::new("Card", "");
    service.add_item(&item, ListKind::Owned, set_id).unwrap();

    conn.execute_batch(
        "CREATE TRIGGER block_set_delete
         BEFORE DELETE ON item_sets
         BEGIN
            SELECT RAISE(ABORT, 'set delete blocked');
         END;",
    )
    .unwrap();

    let err = service.delete_item_set(set_id).unwrap_err();
    assert!(matches!(err, CatalogError::Transaction(_)));

    assert_eq!(service.fetch_item(item.id).unwrap().title, "Card");
    let owned = service
        .fetch_items(set_id, ListKind::Owned, ItemSort::Insertion)
        .unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].id, item.id);
}

#[test]
fn repository_creates_set_with_nested_lists() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let mut set = ItemSet::new("Bundle", "").primary(true);
    set.owned_items.push(CollectibleItem::new("One", ""));
    set.wishlist_items.push(CollectibleItem::new("Two", ""));
    set.trade_items.push(CollectibleItem::new("Three", ""));
    let id = repo.create_item_set(&set).unwrap();

    let loaded = repo.get_item_set(id).unwrap().unwrap();
    assert_eq!(loaded, set);
    assert_eq!(repo.count_items().unwrap(), 3);

    let primaries = repo
        .list_item_sets(&ItemSetListQuery {
            is_primary: Some(true),
        })
        .unwrap();
    assert_eq!(primaries.len(), 1);
}

#[test]
fn repository_rejects_item_listed_twice_in_one_set() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();

    let item = CollectibleItem::new("Dup", "");
    let mut set = ItemSet::new("Bundle", "");
    set.owned_items.push(item.clone());
    set.trade_items.push(item);

    assert!(repo.create_item_set(&set).is_err());
    assert_eq!(repo.count_item_sets().unwrap(), 0);
    assert_eq!(repo.count_items().unwrap(), 0);
}
