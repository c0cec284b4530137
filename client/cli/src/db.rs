use nyaya_vault::{Node, NodeId, Store, StoreError};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Key holding the serialized node collection
pub const VAULT_KEY: &str = "nyaya_vault";
/// Key holding the breadcrumb of the last CLI session
pub const CWD_KEY: &str = "nyaya_vault_cwd";
/// Key holding an unserved "open this folder" request
pub const DEEP_LINK_KEY: &str = "nyaya_vault_deep_link";

/// Local key-value database shared by the vault store and session state.
pub struct LocalDb {
    conn: Mutex<Connection>,
}

impl LocalDb {
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("db lock: {}", e))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("db lock: {}", e))?;
        let mut stmt = conn.prepare("SELECT value FROM kv_store WHERE key = ?")?;
        let result = stmt.query_row([key], |row| row.get(0));
        match result {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("db lock: {}", e))?;
        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
            [key, value],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("db lock: {}", e))?;
        conn.execute("DELETE FROM kv_store WHERE key = ?", [key])?;
        Ok(())
    }

    // =========================================================================
    // Session state
    // =========================================================================

    /// Breadcrumb saved by the previous command; empty if none or unreadable.
    pub fn load_cwd(&self) -> anyhow::Result<Vec<NodeId>> {
        let Some(raw) = self.get(CWD_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(path) => Ok(path),
            Err(e) => {
                tracing::warn!("Ignoring unreadable saved breadcrumb: {}", e);
                Ok(Vec::new())
            }
        }
    }

    pub fn save_cwd(&self, path: &[NodeId]) -> anyhow::Result<()> {
        self.set(CWD_KEY, &serde_json::to_string(path)?)
    }

    pub fn pending_deep_link(&self) -> anyhow::Result<Option<NodeId>> {
        Ok(self.get(DEEP_LINK_KEY)?.map(NodeId::from))
    }

    pub fn request_deep_link(&self, folder_id: &NodeId) -> anyhow::Result<()> {
        self.set(DEEP_LINK_KEY, folder_id.as_str())
    }

    pub fn clear_deep_link(&self) -> anyhow::Result<()> {
        self.remove(DEEP_LINK_KEY)
    }

    /// Open an in-memory database (for testing).
    #[cfg(test)]
    pub fn open_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }
}

/// Vault store over a shared [`LocalDb`]; the collection lives under
/// [`VAULT_KEY`] as one JSON document.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<LocalDb>,
}

impl SqliteStore {
    pub fn new(db: Arc<LocalDb>) -> Self {
        Self { db }
    }
}

impl Store for SqliteStore {
    fn load(&self) -> Result<Option<Vec<Node>>, StoreError> {
        let raw = self
            .db
            .get(VAULT_KEY)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, nodes: &[Node]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(nodes)?;
        self.db
            .set(VAULT_KEY, &raw)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
