//! Append-only recovery log storage.

use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

use satstream_types::Amount;

use crate::error::{Result, StoreError};
use crate::traits::{RecoveryEntry, RecoveryLog, RecoveryReason};

/// SQLite-based recovery log.
///
/// Entries are only ever appended; nothing here updates or deletes rows.
/// The token column holds the full plaintext token because a bearer
/// instrument is only recoverable from its complete text.
pub struct SqliteRecoveryLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecoveryLog {
    /// Create a new recovery log with the given database connection.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

impl RecoveryLog for SqliteRecoveryLog {
    fn append(
        &mut self,
        session_id: &str,
        reason: RecoveryReason,
        token: &str,
        amount: Option<Amount>,
        logged_at: u64,
    ) -> Result<i64> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::lock_poisoned("database connection lock poisoned"))?;

        conn.execute(
            "INSERT INTO recovery_log (session_id, reason, token, amount, logged_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session_id,
                reason as u8,
                token,
                amount.map(|a| a as i64),
                logged_at as i64,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn entries(&self) -> Result<Vec<RecoveryEntry>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::lock_poisoned("database connection lock poisoned"))?;

        let mut stmt = conn.prepare(
            "SELECT id, session_id, reason, token, amount, logged_at
             FROM recovery_log ORDER BY id",
        )?;

        let entries: Vec<RecoveryEntry> = stmt
            .query_map([], |row| {
                let reason_u8: u8 = row.get(2)?;
                Ok(RecoveryEntry {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    reason: RecoveryReason::from_u8(reason_u8)
                        .unwrap_or(RecoveryReason::RedemptionFailed),
                    token: row.get(3)?,
                    amount: row.get::<_, Option<i64>>(4)?.map(|a| a as Amount),
                    logged_at: row.get::<_, i64>(5)? as u64,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::initialize_schema;
    use rusqlite::Connection;

    fn setup_log() -> SqliteRecoveryLog {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        SqliteRecoveryLog::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_append_and_list() {
        let mut log = setup_log();

        let id = log
            .append(
                "session-1",
                RecoveryReason::RedemptionFailed,
                "cashuAfulltokentext",
                Some(100),
                1_700_000_000,
            )
            .unwrap();
        assert!(id > 0);

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].session_id, "session-1");
        assert_eq!(entries[0].reason, RecoveryReason::RedemptionFailed);
        assert_eq!(entries[0].token, "cashuAfulltokentext");
        assert_eq!(entries[0].amount, Some(100));
    }

    #[test]
    fn test_full_token_text_preserved() {
        // The whole point of the log: no truncation, ever.
        let mut log = setup_log();
        let long_token = format!("cashuA{}", "x".repeat(4096));

        log.append("s", RecoveryReason::RedemptionFailed, &long_token, None, 0)
            .unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries[0].token, long_token);
    }

    #[test]
    fn test_entries_in_append_order() {
        let mut log = setup_log();
        log.append("a", RecoveryReason::WorkFailed, "token-a", None, 1)
            .unwrap();
        log.append("b", RecoveryReason::RedemptionFailed, "token-b", Some(5), 2)
            .unwrap();
        log.append("c", RecoveryReason::WorkFailed, "token-c", None, 3)
            .unwrap();

        let entries = log.entries().unwrap();
        let sessions: Vec<&str> = entries.iter().map(|e| e.session_id.as_str()).collect();
        assert_eq!(sessions, vec!["a", "b", "c"]);
    }
}
