use mcl_core::Result;
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use crate::store::{ManagerStore, db_err};

/// Keys of the `manager_config` table.
pub const AUTONOMY_LEVEL_KEY: &str = "autonomy_level";
pub const EVALUATION_MODEL_KEY: &str = "evaluation_model";

impl ManagerStore {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let db = self.db();
        db.query_row(
            "SELECT value FROM manager_config WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)
    }

    /// Upsert a setting; the last write wins.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db();
        let updated_at = self.timestamp();
        db.execute(
            "INSERT INTO manager_config (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, updated_at],
        )
        .map_err(db_err)?;
        debug!(key, value, "manager setting stored");
        Ok(())
    }
}
