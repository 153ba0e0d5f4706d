use crate::models::ListCollection;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// Fixed slot under which the last known collection snapshot is stored.
/// One cached collection per device, not per user.
const SNAPSHOT_KEY: &str = "shopping_lists";

/// Local key-value cache backed by SQLite.
///
/// Holds the last known list snapshot as serialized text, plus small string
/// slots such as the anonymous user id. Snapshot writes are best-effort and
/// never interrupt the live-data path.
pub struct ListCache {
    conn: Mutex<Connection>,
}

impl ListCache {
    /// Open the cache at the given path and initialize the table if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open cache database: {}", path.display()))?;
        Self::init(conn)
    }

    /// Open a throwaway in-memory cache (tests and local-only mode).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory cache")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Store a string value under a key.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read a string value; `Ok(None)` when the key has never been set.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store the full collection under the snapshot slot.
    ///
    /// Serialization or storage failures are logged and swallowed; caching
    /// must never break the live path.
    pub fn write(&self, lists: &ListCollection) {
        if let Err(e) = self.try_write(lists) {
            tracing::warn!("failed to cache list snapshot: {e:#}");
        }
    }

    fn try_write(&self, lists: &ListCollection) -> Result<()> {
        let payload =
            serde_json::to_string(lists).context("Failed to serialize list snapshot")?;
        self.set(SNAPSHOT_KEY, &payload)
    }

    /// Read the cached collection; empty when nothing has been stored yet or
    /// the stored payload does not deserialize.
    pub fn read(&self) -> ListCollection {
        match self.get(SNAPSHOT_KEY) {
            Ok(Some(payload)) => serde_json::from_str(&payload).unwrap_or_else(|e| {
                tracing::warn!("failed to decode cached snapshot: {e}");
                ListCollection::new()
            }),
            Ok(None) => ListCollection::new(),
            Err(e) => {
                tracing::warn!("failed to read cached snapshot: {e:#}");
                ListCollection::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShoppingList;

    #[test]
    fn read_returns_empty_before_first_write() {
        let cache = ListCache::open_in_memory().unwrap();
        assert!(cache.read().is_empty());
    }

    #[test]
    fn snapshot_round_trips() {
        let cache = ListCache::open_in_memory().unwrap();
        let mut groceries =
            ShoppingList::new("u1", "Groceries", vec!["Milk".into(), "Eggs".into()]);
        groceries.id = Some("1".into());
        let lists = vec![
            groceries,
            ShoppingList::new("u1", "Hardware", vec!["Nails".into(), "Hammer".into()]),
        ];

        cache.write(&lists);
        assert_eq!(cache.read(), lists);
    }

    #[test]
    fn write_overwrites_previous_snapshot() {
        let cache = ListCache::open_in_memory().unwrap();
        cache.write(&vec![ShoppingList::new("u1", "Old", vec!["a".into()])]);
        let newer = vec![ShoppingList::new("u1", "New", vec!["b".into()])];
        cache.write(&newer);
        assert_eq!(cache.read(), newer);
    }

    #[test]
    fn corrupt_payload_reads_as_empty() {
        let cache = ListCache::open_in_memory().unwrap();
        cache.set("shopping_lists", "not json").unwrap();
        assert!(cache.read().is_empty());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let lists = vec![ShoppingList::new("u1", "Groceries", vec!["Milk".into()])];
        {
            let cache = ListCache::open(&path).unwrap();
            cache.write(&lists);
        }
        let cache = ListCache::open(&path).unwrap();
        assert_eq!(cache.read(), lists);
    }
}
