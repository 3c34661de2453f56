//! ACID-durable snapshot store backed by redb.
//!
//! The whole knowledge store is kept as one bincode-encoded
//! [`StoreSnapshot`] under the `snapshot` key of the `meta` table. A save
//! is a single write transaction, so a crash leaves either the old or the
//! new snapshot, never a mix.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, TableDefinition};

use crate::error::StoreError;
use crate::store::{SnapshotStore, StoreResult, StoreSnapshot};

/// Table for general metadata (string keys → binary values).
const META_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("meta");

/// Key under which the store snapshot lives.
const SNAPSHOT_KEY: &[u8] = b"snapshot";

/// Database file name inside the data directory.
pub const DB_FILE: &str = "noema.redb";

/// ACID-durable store using redb.
///
/// All writes go through transactions. Reads use MVCC snapshots.
pub struct DurableStore {
    db: Arc<Database>,
}

impl DurableStore {
    /// Open or create a durable store in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join(DB_FILE);
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Store a key-value pair with full ACID guarantees.
    pub fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            let mut table = txn.open_table(META_TABLE).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            table.insert(key, value).map_err(|e| StoreError::Redb {
                message: format!("insert failed: {e}"),
            })?;
        }
        txn.commit().map_err(|e| StoreError::Redb {
            message: format!("commit failed: {e}"),
        })?;
        Ok(())
    }

    /// Read a value by key. Returns `Ok(None)` if the key (or the table) doesn't exist.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = match txn.open_table(META_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => {
                return Err(StoreError::Redb {
                    message: format!("open_table failed: {e}"),
                });
            }
        };
        let result = table.get(key).map_err(|e| StoreError::Redb {
            message: format!("get failed: {e}"),
        })?;
        Ok(result.map(|guard| guard.value().to_vec()))
    }
}

impl SnapshotStore for DurableStore {
    fn load(&self) -> StoreResult<Option<StoreSnapshot>> {
        let Some(bytes) = self.get(SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        let snapshot = bincode::deserialize(&bytes).map_err(|e| StoreError::Serialization {
            message: format!("failed to decode snapshot: {e}"),
        })?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &StoreSnapshot) -> StoreResult<()> {
        let bytes = bincode::serialize(snapshot).map_err(|e| StoreError::Serialization {
            message: format!("failed to encode snapshot: {e}"),
        })?;
        self.put(SNAPSHOT_KEY, &bytes)?;
        tracing::debug!(
            bytes = bytes.len(),
            nodes = snapshot.nodes.len(),
            domains = snapshot.domains.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::{ConceptKind, ConceptNode, Domain};
    use crate::graph::Edge;
    use tempfile::TempDir;

    fn sample_snapshot() -> StoreSnapshot {
        StoreSnapshot {
            nodes: vec![
                ConceptNode::new("math", ConceptKind::Domain, 0.9).with_patterns(["proof"]),
                ConceptNode::new("physics", ConceptKind::Domain, 0.8),
            ],
            edges: vec![Edge::new("math", "physics", 0.75)],
            domains: vec![Domain::new("math", "Mathematics").with_concepts(["proof", "Lemma"])],
            ..Default::default()
        }
    }

    #[test]
    fn put_get_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();

        assert_eq!(store.get(b"key").unwrap(), None);
        store.put(b"key", b"val1").unwrap();
        store.put(b"key", b"val2").unwrap();
        assert_eq!(store.get(b"key").unwrap(), Some(b"val2".to_vec()));
    }

    #[test]
    fn empty_store_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn snapshot_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = DurableStore::open(dir.path()).unwrap();
            store.save(&sample_snapshot()).unwrap();
        }

        let store = DurableStore::open(dir.path()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.nodes.len(), 2);
        assert_eq!(loaded.edges[0].weight, 0.75);
        assert!(loaded.domains[0].concepts.contains("lemma"));
    }

    #[test]
    fn corrupt_snapshot_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();
        store.put(SNAPSHOT_KEY, b"\xff\xff").unwrap();
        assert!(matches!(
            store.load().unwrap_err(),
            StoreError::Serialization { .. }
        ));
    }
}
