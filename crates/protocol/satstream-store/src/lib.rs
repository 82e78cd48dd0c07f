//! Local storage layer for the Satstream payment core.
//!
//! This crate provides persistence for all payment state that must survive a
//! process restart:
//!
//! - **Session records** (SQLite): the per-session payment record, so a
//!   crashed or restarted process resumes metering instead of losing track
//!   of spent funds. Suspended (exhausted) sessions live here while the
//!   funding interrupt awaits an answer — possibly for days.
//! - **Recovery log** (SQLite, append-only): tokens that need operator
//!   attention, stored in full plaintext.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.satstream/
//! └── satstream.db             # SQLite: sessions, recovery_log
//! ```
//!
//! # Trait-Based Design
//!
//! Storage components are defined as traits ([`SessionStore`],
//! [`RecoveryLog`]), allowing alternative implementations. The default
//! implementations use SQLite behind a shared connection.

// Module declarations
pub mod error;
pub mod recovery;
pub mod schema;
pub mod session;
pub mod traits;

// Re-export error types
pub use error::{Result, StoreError};

// Re-export traits and types
pub use traits::{RecoveryEntry, RecoveryLog, RecoveryReason, SessionStore};

// Re-export implementations
pub use recovery::SqliteRecoveryLog;
pub use session::SqliteSessionStore;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

/// Get the default data directory for Satstream state.
///
/// Priority:
/// 1. `SATSTREAM_DATA_DIR` environment variable (if set)
/// 2. Platform-specific data directory
/// 3. Fallback to `$HOME/.satstream`
///
/// Both walletd and the CLI use this function so they share the same
/// storage location on a single machine.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SATSTREAM_DATA_DIR") {
        return PathBuf::from(dir);
    }

    directories::ProjectDirs::from("io", "satstream", "satstream")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".satstream")
        })
}

/// Configuration for PaymentStore.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base directory for all payment data.
    pub base_dir: PathBuf,
    /// Database file path (default: base_dir/satstream.db).
    pub database_path: Option<PathBuf>,
}

impl StoreConfig {
    /// Create a new configuration with the given base directory.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            database_path: None,
        }
    }

    /// Set the database path.
    pub fn with_database_path(mut self, path: impl AsRef<Path>) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Get the database path.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.base_dir.join("satstream.db"))
    }
}

/// Complete payment state with all storage components.
pub struct PaymentStore {
    /// Session record storage.
    pub sessions: SqliteSessionStore,
    /// Recovery log.
    pub recovery: SqliteRecoveryLog,
    /// Shared database connection.
    conn: Arc<Mutex<Connection>>,
    /// Configuration used to open this store.
    config: StoreConfig,
}

impl PaymentStore {
    /// Open payment state with the given configuration.
    ///
    /// Creates the base directory and initializes the database schema.
    pub fn open(config: StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.base_dir)?;

        let db_path = config.database_path();
        tracing::info!(db_path = %db_path.display(), "Opening payment store database");
        let conn = Connection::open(&db_path)?;

        schema::initialize_schema(&conn)?;

        let conn = Arc::new(Mutex::new(conn));

        Ok(Self {
            sessions: SqliteSessionStore::new(Arc::clone(&conn)),
            recovery: SqliteRecoveryLog::new(Arc::clone(&conn)),
            conn,
            config,
        })
    }

    /// Open payment state in memory (for tests and local simulation).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        Ok(Self {
            sessions: SqliteSessionStore::new(Arc::clone(&conn)),
            recovery: SqliteRecoveryLog::new(Arc::clone(&conn)),
            conn,
            config: StoreConfig::new(":memory:"),
        })
    }

    /// Get the configuration used to open this store.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Get a reference to the shared database connection.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satstream_types::SessionPaymentRecord;
    use tempfile::TempDir;

    #[test]
    fn test_payment_store_open() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(temp_dir.path());

        let store = PaymentStore::open(config);
        assert!(store.is_ok());
    }

    #[test]
    fn test_store_config_defaults() {
        let config = StoreConfig::new("/home/user/.satstream");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/home/user/.satstream/satstream.db")
        );
    }

    #[test]
    fn test_store_config_custom_path() {
        let config = StoreConfig::new("/home/user/.satstream").with_database_path("/data/db.sqlite");
        assert_eq!(config.database_path(), PathBuf::from("/data/db.sqlite"));
    }

    #[test]
    fn test_session_roundtrip_through_store() {
        let mut store = PaymentStore::open_in_memory().unwrap();

        let mut record = SessionPaymentRecord::new("s1", Some("cashuAabc".into()), 10, 0);
        record.activate(100);
        store.sessions.upsert(&record).unwrap();

        let loaded = store.sessions.get("s1").unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(temp_dir.path());

        {
            let mut store = PaymentStore::open(config.clone()).unwrap();
            let mut record = SessionPaymentRecord::new("s1", Some("cashuAabc".into()), 10, 0);
            record.activate(100);
            record.deduct().unwrap();
            store.sessions.upsert(&record).unwrap();
        }

        // Reopen: the suspended session is still there, balances intact.
        let store = PaymentStore::open(config).unwrap();
        let loaded = store.sessions.get("s1").unwrap().unwrap();
        assert_eq!(loaded.balance, 90);
        assert_eq!(loaded.spent, 10);
        assert!(loaded.conservation_holds());
    }

    #[test]
    fn test_shared_connection() {
        let store = PaymentStore::open_in_memory().unwrap();
        let conn = store.connection();

        let conn_guard = conn.lock().unwrap();
        let count: i64 = conn_guard
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
