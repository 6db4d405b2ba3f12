//! JSON key-value operations

use crate::{DbError, DbPool, Result};
use rusqlite::OptionalExtension;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key-value store; each value is a JSON document
#[derive(Clone)]
pub struct KvStore {
    pool: DbPool,
}

impl KvStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Read and decode a value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let conn = self.pool.get().map_err(|e| DbError::Pool(e.to_string()))?;

        let raw: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Encode and store a value, replacing any previous one
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let conn = self.pool.get().map_err(|e| DbError::Pool(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = strftime('%s', 'now')
            "#,
            rusqlite::params![key, json],
        )?;

        Ok(())
    }

    /// Remove a key; returns whether it existed
    pub fn remove(&self, key: &str) -> Result<bool> {
        let conn = self.pool.get().map_err(|e| DbError::Pool(e.to_string()))?;
        let changed = conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(changed > 0)
    }
}
