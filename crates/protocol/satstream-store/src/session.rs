//! Session payment record storage.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use satstream_types::{Amount, PaymentStatus, SessionPaymentRecord};

use crate::error::{Result, StoreError};
use crate::traits::SessionStore;

/// SQLite-based session store.
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Create a new session store with the given database connection.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Deserialize a session record from a database row.
    fn deserialize_record(row: &rusqlite::Row) -> rusqlite::Result<SessionPaymentRecord> {
        let status_u8: u8 = row.get(7)?;
        let topup_tokens_json: String = row.get(6)?;

        Ok(SessionPaymentRecord {
            session_id: row.get(0)?,
            original_token: row.get(1)?,
            face_value: row.get::<_, i64>(2)? as Amount,
            balance: row.get::<_, i64>(3)? as Amount,
            spent: row.get::<_, i64>(4)? as Amount,
            topups: row.get::<_, i64>(5)? as Amount,
            topup_tokens: serde_json::from_str(&topup_tokens_json).unwrap_or_default(),
            // Unknown discriminants (from a newer schema) degrade to Error,
            // which keeps the record terminal and the funds untouched.
            status: PaymentStatus::from_u8(status_u8).unwrap_or(PaymentStatus::Error),
            refund_token: row.get(8)?,
            refund_claimed: row.get::<_, i64>(9)? != 0,
            cost_per_operation: row.get::<_, i64>(10)? as Amount,
            created_at: row.get::<_, i64>(11)? as u64,
            updated_at: row.get::<_, i64>(12)? as u64,
        })
    }
}

const SELECT_COLUMNS: &str = "session_id, payment_token, face_value, balance, spent, topups, \
     topup_tokens, status, refund_token, refund_claimed, cost_per_operation, created_at, \
     updated_at";

impl SessionStore for SqliteSessionStore {
    fn upsert(&mut self, record: &SessionPaymentRecord) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::lock_poisoned("database connection lock poisoned"))?;

        let topup_tokens_json = serde_json::to_string(&record.topup_tokens)
            .map_err(|e| StoreError::invalid_data(format!("top-up token list: {}", e)))?;

        conn.execute(
            "INSERT OR REPLACE INTO sessions (session_id, payment_token, face_value, balance, \
             spent, topups, topup_tokens, status, refund_token, refund_claimed, \
             cost_per_operation, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.session_id,
                record.original_token,
                record.face_value as i64,
                record.balance as i64,
                record.spent as i64,
                record.topups as i64,
                topup_tokens_json,
                record.status as u8,
                record.refund_token,
                record.refund_claimed as i64,
                record.cost_per_operation as i64,
                record.created_at as i64,
                record.updated_at as i64,
            ],
        )?;

        Ok(())
    }

    fn get(&self, session_id: &str) -> Result<Option<SessionPaymentRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::lock_poisoned("database connection lock poisoned"))?;

        let record = conn
            .query_row(
                &format!("SELECT {} FROM sessions WHERE session_id = ?1", SELECT_COLUMNS),
                [session_id],
                Self::deserialize_record,
            )
            .optional()?;

        Ok(record)
    }

    fn list_unfinished(&self) -> Result<Vec<SessionPaymentRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::lock_poisoned("database connection lock poisoned"))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sessions WHERE status IN (?1, ?2, ?3) ORDER BY updated_at",
            SELECT_COLUMNS
        ))?;

        let records: Vec<SessionPaymentRecord> = stmt
            .query_map(
                [
                    PaymentStatus::Pending as u8,
                    PaymentStatus::Active as u8,
                    PaymentStatus::Exhausted as u8,
                ],
                Self::deserialize_record,
            )?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    fn delete(&mut self, session_id: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::lock_poisoned("database connection lock poisoned"))?;

        let rows = conn.execute("DELETE FROM sessions WHERE session_id = ?1", [session_id])?;
        if rows == 0 {
            return Err(StoreError::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }
}
