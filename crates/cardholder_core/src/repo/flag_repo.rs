//! Persisted application flag storage.
//!
//! # Invariants
//! - A missing row reads as `false`.
//! - Flags are untouched by catalogue resets.

use super::{bool_to_int, int_to_bool, RepoResult, SqliteCatalogRepository};
use crate::model::AppFlag;
use rusqlite::{params, OptionalExtension};

/// Repository interface for boolean application flags.
pub trait FlagRepository {
    fn get_flag(&self, flag: AppFlag) -> RepoResult<bool>;
    fn set_flag(&self, flag: AppFlag, value: bool) -> RepoResult<()>;
}

impl FlagRepository for SqliteCatalogRepository<'_> {
    fn get_flag(&self, flag: AppFlag) -> RepoResult<bool> {
        let value: Option<i64> = self
            .conn()
            .query_row(
                "SELECT value FROM app_flags WHERE key = ?1;",
                [flag.key()],
                |row| row.get(0),
            )
            .optional()?;
        match value {
            Some(value) => int_to_bool(value, "app_flags.value"),
            None => Ok(false),
        }
    }

    fn set_flag(&self, flag: AppFlag, value: bool) -> RepoResult<()> {
        self.conn().execute(
            "INSERT INTO app_flags (key, value)
             VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![flag.key(), bool_to_int(value)],
        )?;
        Ok(())
    }
}
