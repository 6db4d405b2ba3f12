//! Favorited node ids, persisted as one JSON array

use crate::Result;
use app_db::{DbError, KvStore};
use parking_lot::RwLock;

const FAVORITES_KEY: &str = "favorites";

/// Ordered set of bookmarked ids. Insertion order is kept.
pub struct BookmarkStore {
    kv: KvStore,
    ids: RwLock<Vec<String>>,
}

impl BookmarkStore {
    /// An unreadable favorites value starts an empty set rather than
    /// failing startup; it is overwritten on the next change.
    pub fn open(kv: KvStore) -> Result<Self> {
        let ids: Vec<String> = match kv.get(FAVORITES_KEY) {
            Ok(ids) => ids.unwrap_or_default(),
            Err(DbError::Serialization(e)) => {
                tracing::warn!("Favorites are corrupt, starting empty: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Loaded {} favorites", ids.len());

        Ok(Self {
            kv,
            ids: RwLock::new(ids),
        })
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.read().clone()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.read().iter().any(|i| i == id)
    }

    /// Returns false if the id was already bookmarked
    pub fn add(&self, id: &str) -> Result<bool> {
        let mut ids = self.ids.write();
        if ids.iter().any(|i| i == id) {
            return Ok(false);
        }

        let mut next = ids.clone();
        next.push(id.to_string());
        self.kv.put(FAVORITES_KEY, &next)?;
        *ids = next;
        Ok(true)
    }

    /// Returns false if the id was not bookmarked
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut ids = self.ids.write();
        if !ids.iter().any(|i| i == id) {
            return Ok(false);
        }

        let next: Vec<String> = ids.iter().filter(|i| *i != id).cloned().collect();
        self.kv.put(FAVORITES_KEY, &next)?;
        *ids = next;
        Ok(true)
    }

    /// Flip the bookmark; returns whether the id is now bookmarked
    pub fn toggle(&self, id: &str) -> Result<bool> {
        if self.contains(id) {
            self.remove(id)?;
            Ok(false)
        } else {
            self.add(id)?;
            Ok(true)
        }
    }

    /// Rewrite a bookmarked id after its item moved
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut ids = self.ids.write();
        if !ids.iter().any(|i| i == from) {
            return Ok(());
        }

        let next: Vec<String> = ids
            .iter()
            .map(|i| if i == from { to.to_string() } else { i.clone() })
            .collect();
        self.kv.put(FAVORITES_KEY, &next)?;
        *ids = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_remove_toggle() {
        let dir = TempDir::new().unwrap();
        let store = BookmarkStore::open(app_db::open(dir.path()).unwrap()).unwrap();

        assert!(store.add("DCIM").unwrap());
        assert!(!store.add("DCIM").unwrap());
        assert!(store.toggle("Download").unwrap());
        assert_eq!(store.ids(), vec!["DCIM", "Download"]);

        assert!(!store.toggle("DCIM").unwrap());
        assert!(!store.contains("DCIM"));
        assert!(!store.remove("DCIM").unwrap());
    }

    #[test]
    fn test_persisted_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = BookmarkStore::open(app_db::open(dir.path()).unwrap()).unwrap();
            store.add("Music").unwrap();
            store.add("trash").unwrap();
            store.rename("Music", "Audio/Music").unwrap();
        }

        let store = BookmarkStore::open(app_db::open(dir.path()).unwrap()).unwrap();
        assert_eq!(store.ids(), vec!["Audio/Music", "trash"]);
    }

    #[test]
    fn test_corrupt_favorites_start_empty() {
        let dir = TempDir::new().unwrap();
        let kv = app_db::open(dir.path()).unwrap();
        kv.put(FAVORITES_KEY, "not a list").unwrap();

        let store = BookmarkStore::open(kv).unwrap();
        assert!(store.ids().is_empty());

        assert!(store.add("DCIM").unwrap());
        drop(store);
        let store = BookmarkStore::open(app_db::open(dir.path()).unwrap()).unwrap();
        assert_eq!(store.ids(), vec!["DCIM"]);
    }
}
