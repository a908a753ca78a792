//! Catalogue repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide transactional CRUD over item sets, collectible items and the
//!   ordered membership lists linking them.
//! - Keep SQL and ordering rules inside the persistence boundary.
//!
//! # Invariants
//! - Each mutating method runs in one `IMMEDIATE` transaction; any error
//!   drops the transaction and rolls every statement back.
//! - Marking a set primary clears `is_primary` on all other sets in the same
//!   transaction.
//! - An item is referenced by at most one membership row
//!   (`idx_set_memberships_item`).
//! - Membership lists are read in `position ASC` order unless sorted by title.

use super::{
    bool_to_int, ensure_connection_ready, int_to_bool, parse_uuid, RepoError, RepoResult,
};
use crate::model::{
    CollectibleItem, ItemId, ItemSet, ItemSetId, ItemSort, ListKind, RarityTier, ValidationError,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const ITEM_SET_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    image,
    is_primary
FROM item_sets";

const ITEM_SET_ORDER_SQL: &str = " ORDER BY created_at ASC, rowid ASC";

const MEMBER_SELECT_SQL: &str = "SELECT
    i.uuid AS uuid,
    i.title AS title,
    i.description AS description,
    i.image AS image,
    i.rarity AS rarity
FROM set_memberships m
INNER JOIN collectible_items i ON i.uuid = m.item_uuid
WHERE m.set_uuid = ?1
  AND m.list_kind = ?2";

/// Query options for listing item sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemSetListQuery {
    /// `Some(flag)` keeps only sets whose `is_primary` equals `flag`.
    pub is_primary: Option<bool>,
}

/// Repository interface for catalogue operations.
pub trait CatalogRepository {
    /// Inserts a set together with any items already in its lists.
    fn create_item_set(&self, set: &ItemSet) -> RepoResult<ItemSetId>;
    /// Inserts `set` only when the store holds no set. Returns whether it did.
    fn create_item_set_if_empty(&self, set: &ItemSet) -> RepoResult<bool>;
    /// Makes one existing set primary and clears the flag everywhere else.
    fn set_primary(&self, set_id: ItemSetId) -> RepoResult<()>;
    fn get_item_set(&self, set_id: ItemSetId) -> RepoResult<Option<ItemSet>>;
    fn list_item_sets(&self, query: &ItemSetListQuery) -> RepoResult<Vec<ItemSet>>;
    /// Deletes a set and every item its lists reference. Returns the number
    /// of deleted items.
    fn delete_item_set(&self, set_id: ItemSetId) -> RepoResult<usize>;
    fn add_item(&self, set_id: ItemSetId, kind: ListKind, item: &CollectibleItem)
        -> RepoResult<()>;
    /// Removes one list reference. Returns `false` when it was not listed.
    fn remove_item(&self, set_id: ItemSetId, kind: ListKind, item_id: ItemId)
        -> RepoResult<bool>;
    fn get_item(&self, item_id: ItemId) -> RepoResult<Option<CollectibleItem>>;
    fn list_items(
        &self,
        set_id: ItemSetId,
        kind: ListKind,
        sort: ItemSort,
    ) -> RepoResult<Vec<CollectibleItem>>;
    /// Deletes an item record and every reference to it.
    fn delete_item(&self, item_id: ItemId) -> RepoResult<()>;
    /// Clears all sets, items and memberships.
    fn delete_all(&self) -> RepoResult<()>;
    fn count_item_sets(&self) -> RepoResult<u64>;
    fn count_items(&self) -> RepoResult<u64>;
}

/// SQLite-backed catalogue repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    /// Creates a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` / `MissingRequired*` when the connection
    ///   was not bootstrapped through `db::open_db*`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        self.conn
    }

    fn begin(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn create_item_set(&self, set: &ItemSet) -> RepoResult<ItemSetId> {
        set.validate()?;

        let tx = self.begin()?;
        insert_item_set(&tx, set)?;
        tx.commit()?;
        Ok(set.id)
    }

    fn create_item_set_if_empty(&self, set: &ItemSet) -> RepoResult<bool> {
        set.validate()?;

        let tx = self.begin()?;
        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM item_sets;", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(false);
        }
        insert_item_set(&tx, set)?;
        tx.commit()?;
        Ok(true)
    }

    fn set_primary(&self, set_id: ItemSetId) -> RepoResult<()> {
        let tx = self.begin()?;
        ensure_set_exists(&tx, set_id)?;
        tx.execute(
            "UPDATE item_sets SET is_primary = 0 WHERE is_primary = 1 AND uuid <> ?1;",
            [set_id.to_string()],
        )?;
        tx.execute(
            "UPDATE item_sets SET is_primary = 1 WHERE uuid = ?1;",
            [set_id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_item_set(&self, set_id: ItemSetId) -> RepoResult<Option<ItemSet>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SET_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([set_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(load_item_set(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_item_sets(&self, query: &ItemSetListQuery) -> RepoResult<Vec<ItemSet>> {
        let mut sets = Vec::new();
        match query.is_primary {
            Some(flag) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{ITEM_SET_SELECT_SQL} WHERE is_primary = ?1{ITEM_SET_ORDER_SQL};"
                ))?;
                let mut rows = stmt.query([bool_to_int(flag)])?;
                while let Some(row) = rows.next()? {
                    sets.push(load_item_set(self.conn, row)?);
                }
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{ITEM_SET_SELECT_SQL}{ITEM_SET_ORDER_SQL};"))?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    sets.push(load_item_set(self.conn, row)?);
                }
            }
        }
        Ok(sets)
    }

    fn delete_item_set(&self, set_id: ItemSetId) -> RepoResult<usize> {
        let tx = self.begin()?;
        ensure_set_exists(&tx, set_id)?;

        let deleted_items = tx.execute(
            "DELETE FROM collectible_items
             WHERE uuid IN (
                SELECT item_uuid
                FROM set_memberships
                WHERE set_uuid = ?1
             );",
            [set_id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM item_sets WHERE uuid = ?1;",
            [set_id.to_string()],
        )?;

        tx.commit()?;
        Ok(deleted_items)
    }

    fn add_item(
        &self,
        set_id: ItemSetId,
        kind: ListKind,
        item: &CollectibleItem,
    ) -> RepoResult<()> {
        item.validate()?;

        let tx = self.begin()?;
        ensure_set_exists(&tx, set_id)?;
        append_member(&tx, set_id, kind, item)?;
        tx.commit()?;
        Ok(())
    }

    fn remove_item(&self, set_id: ItemSetId, kind: ListKind, item_id: ItemId) -> RepoResult<bool> {
        let tx = self.begin()?;
        ensure_set_exists(&tx, set_id)?;
        let removed = tx.execute(
            "DELETE FROM set_memberships
             WHERE set_uuid = ?1
               AND list_kind = ?2
               AND item_uuid = ?3;",
            params![set_id.to_string(), kind.as_str(), item_id.to_string()],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn get_item(&self, item_id: ItemId) -> RepoResult<Option<CollectibleItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                uuid,
                title,
                description,
                image,
                rarity
             FROM collectible_items
             WHERE uuid = ?1;",
        )?;
        let mut rows = stmt.query([item_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn list_items(
        &self,
        set_id: ItemSetId,
        kind: ListKind,
        sort: ItemSort,
    ) -> RepoResult<Vec<CollectibleItem>> {
        ensure_set_exists(self.conn, set_id)?;
        load_members(self.conn, set_id, kind, sort)
    }

    fn delete_item(&self, item_id: ItemId) -> RepoResult<()> {
        let tx = self.begin()?;
        tx.execute(
            "DELETE FROM set_memberships WHERE item_uuid = ?1;",
            [item_id.to_string()],
        )?;
        let changed = tx.execute(
            "DELETE FROM collectible_items WHERE uuid = ?1;",
            [item_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::ItemNotFound(item_id));
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_all(&self) -> RepoResult<()> {
        let tx = self.begin()?;
        tx.execute_batch(
            "DELETE FROM set_memberships;
             DELETE FROM collectible_items;
             DELETE FROM item_sets;",
        )?;
        tx.commit()?;
        Ok(())
    }

    fn count_item_sets(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM item_sets;", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn count_items(&self) -> RepoResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM collectible_items;", [], |row| {
                    row.get(0)
                })?;
        Ok(count.max(0) as u64)
    }
}

fn insert_item_set(conn: &Connection, set: &ItemSet) -> RepoResult<()> {
    if set.is_primary {
        conn.execute(
            "UPDATE item_sets SET is_primary = 0 WHERE is_primary = 1;",
            [],
        )?;
    }

    conn.execute(
        "INSERT INTO item_sets (
            uuid,
            name,
            description,
            image,
            is_primary
        ) VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            set.id.to_string(),
            set.name.trim(),
            set.description.as_str(),
            set.image.as_deref(),
            bool_to_int(set.is_primary),
        ],
    )?;

    for (kind, item) in set.members() {
        append_member(conn, set.id, kind, item)?;
    }
    Ok(())
}

fn append_member(
    conn: &Connection,
    set_id: ItemSetId,
    kind: ListKind,
    item: &CollectibleItem,
) -> RepoResult<()> {
    let already_listed: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM set_memberships WHERE item_uuid = ?1);",
        [item.id.to_string()],
        |row| row.get(0),
    )?;
    if already_listed == 1 {
        return Err(ValidationError::ItemAlreadyListed { item_id: item.id }.into());
    }

    // An unlisted record with the same id takes the incoming fields.
    conn.execute(
        "INSERT INTO collectible_items (
            uuid,
            title,
            description,
            image,
            rarity
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (uuid) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            image = excluded.image,
            rarity = excluded.rarity;",
        params![
            item.id.to_string(),
            item.title.trim(),
            item.description.as_str(),
            item.image.as_deref(),
            item.rarity.as_str(),
        ],
    )?;

    let position: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1
         FROM set_memberships
         WHERE set_uuid = ?1
           AND list_kind = ?2;",
        params![set_id.to_string(), kind.as_str()],
        |row| row.get(0),
    )?;
    conn.execute(
        "INSERT INTO set_memberships (set_uuid, list_kind, item_uuid, position)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            set_id.to_string(),
            kind.as_str(),
            item.id.to_string(),
            position
        ],
    )?;
    Ok(())
}

fn ensure_set_exists(conn: &Connection, set_id: ItemSetId) -> RepoResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM item_sets WHERE uuid = ?1;",
            [set_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(RepoError::SetNotFound(set_id)),
    }
}

fn load_item_set(conn: &Connection, row: &Row<'_>) -> RepoResult<ItemSet> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "item_sets.uuid")?;
    let is_primary = int_to_bool(row.get("is_primary")?, "item_sets.is_primary")?;

    Ok(ItemSet {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        image: row.get("image")?,
        is_primary,
        owned_items: load_members(conn, id, ListKind::Owned, ItemSort::Insertion)?,
        wishlist_items: load_members(conn, id, ListKind::Wishlist, ItemSort::Insertion)?,
        trade_items: load_members(conn, id, ListKind::Trade, ItemSort::Insertion)?,
    })
}

fn load_members(
    conn: &Connection,
    set_id: ItemSetId,
    kind: ListKind,
    sort: ItemSort,
) -> RepoResult<Vec<CollectibleItem>> {
    let order = match sort {
        ItemSort::Insertion => " ORDER BY m.position ASC",
        ItemSort::Title => " ORDER BY i.title COLLATE NOCASE ASC, m.position ASC",
    };
    let mut stmt = conn.prepare(&format!("{MEMBER_SELECT_SQL}{order};"))?;
    let mut rows = stmt.query(params![set_id.to_string(), kind.as_str()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_item_row(row)?);
    }
    Ok(items)
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<CollectibleItem> {
    let uuid_text: String = row.get("uuid")?;
    let rarity_text: String = row.get("rarity")?;
    let rarity = RarityTier::parse(&rarity_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid rarity `{rarity_text}` in collectible_items.rarity"
        ))
    })?;

    Ok(CollectibleItem {
        id: parse_uuid(&uuid_text, "collectible_items.uuid")?,
        title: row.get("title")?,
        description: row.get("description")?,
        image: row.get("image")?,
        rarity,
    })
}
