//! The hot-wallet proof ledger.
//!
//! Received tokens are broken into proofs and stored here; the settled
//! balance is the sum of unspent proofs. Sending debits the ledger and
//! issues a fresh ledger-signed token (mint swap is delegated to the
//! operator's own wallet tooling - this service only accounts for and
//! safeguards the proofs).
//!
//! All read-then-write operations run inside a transaction behind one
//! connection lock, so concurrent receives and sends serialize.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rand::RngCore;
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::info;

use satstream_token::{encode_v3, FormatError, ProofV3, TokenV3, TokenV3Entry};
use satstream_types::constants::DEFAULT_UNIT;
use satstream_types::Amount;

/// Keyset identifier stamped on ledger-issued proofs.
const LEDGER_KEYSET_ID: &str = "00satstream01";

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur in the proof ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The token could not be decoded.
    #[error("malformed token: {0}")]
    Malformed(#[from] FormatError),

    /// At least one proof in the token is already in the ledger.
    #[error("token already spent")]
    AlreadySpent,

    /// Not enough unspent balance for the requested debit.
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance {
        /// Available balance
        have: Amount,
        /// Required balance
        need: Amount,
    },

    /// A zero-amount token makes no sense.
    #[error("send amount must be positive")]
    InvalidAmount,

    /// Underlying SQLite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The connection lock was poisoned.
    #[error("ledger lock poisoned")]
    LockPoisoned,
}

/// SQLite-backed proof ledger.
pub struct Ledger {
    conn: Arc<Mutex<Connection>>,
    mint_url: String,
}

impl Ledger {
    /// Open (or create) a ledger database at the given path.
    ///
    /// Fails fast: any problem opening or migrating the database is returned
    /// immediately so the daemon refuses to start on a broken store.
    pub fn open(path: &Path, mint_url: &str) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        Self::initialize(&conn)?;
        info!(path = %path.display(), "Ledger database opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            mint_url: mint_url.to_string(),
        })
    }

    /// Open an in-memory ledger (for tests).
    pub fn open_in_memory(mint_url: &str) -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            mint_url: mint_url.to_string(),
        })
    }

    fn initialize(conn: &Connection) -> LedgerResult<()> {
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS proofs (
                secret TEXT PRIMARY KEY,
                amount INTEGER NOT NULL,
                mint TEXT,
                received_at INTEGER NOT NULL,
                spent INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_proofs_spent ON proofs(spent)",
            [],
        )?;
        Ok(())
    }

    /// Receive a token: store its proofs and credit the balance.
    ///
    /// All-or-nothing: if any proof secret is already known, the whole token
    /// is rejected as spent and nothing is stored.
    pub fn receive(&self, token: &str) -> LedgerResult<Amount> {
        let parsed = satstream_token::parse(token)?;

        let mut conn = self.conn.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let tx = conn.transaction()?;

        for proof in &parsed.proofs {
            let known: i64 = tx.query_row(
                "SELECT COUNT(*) FROM proofs WHERE secret = ?1",
                [&proof.secret],
                |row| row.get(0),
            )?;
            if known > 0 {
                return Err(LedgerError::AlreadySpent);
            }
        }

        let now = now_secs();
        for proof in &parsed.proofs {
            tx.execute(
                "INSERT INTO proofs (secret, amount, mint, received_at, spent)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![proof.secret, proof.amount as i64, parsed.mint, now as i64],
            )?;
        }
        tx.commit()?;

        info!(
            amount = parsed.amount,
            proofs = parsed.proofs.len(),
            mint = ?parsed.mint,
            "received token"
        );
        Ok(parsed.amount)
    }

    /// Sum of unspent proofs.
    pub fn balance(&self) -> LedgerResult<Amount> {
        let conn = self.conn.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let balance: i64 = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM proofs WHERE spent = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(balance as Amount)
    }

    /// Issue a token for exactly `amount`, debiting the ledger.
    ///
    /// Marks stored proofs spent until the amount is covered; any overshoot
    /// is credited back as a fresh ledger-issued change proof.
    pub fn send(&self, amount: Amount) -> LedgerResult<String> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let mut conn = self.conn.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let tx = conn.transaction()?;

        let have: i64 = tx.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM proofs WHERE spent = 0",
            [],
            |row| row.get(0),
        )?;
        let have = have as Amount;
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount });
        }

        // Consume unspent proofs oldest-first until the amount is covered.
        let mut covered: Amount = 0;
        {
            let mut stmt = tx.prepare(
                "SELECT secret, amount FROM proofs WHERE spent = 0 ORDER BY received_at, secret",
            )?;
            let rows: Vec<(String, i64)> = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .filter_map(|r| r.ok())
                .collect();

            for (secret, proof_amount) in rows {
                if covered >= amount {
                    break;
                }
                tx.execute("UPDATE proofs SET spent = 1 WHERE secret = ?1", [&secret])?;
                covered += proof_amount as Amount;
            }
        }

        // Credit overshoot back as change.
        if covered > amount {
            tx.execute(
                "INSERT INTO proofs (secret, amount, mint, received_at, spent)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![
                    random_secret(),
                    (covered - amount) as i64,
                    self.mint_url,
                    now_secs() as i64,
                ],
            )?;
        }

        tx.commit()?;

        info!(amount, "issued send token");
        Ok(self.issue_token(amount))
    }

    /// Sweep every unspent proof into a single token.
    ///
    /// Returns `None` when the ledger is empty. This removes the funds from
    /// the ledger - the returned token is the only copy.
    pub fn sweep(&self) -> LedgerResult<Option<(Amount, String)>> {
        let mut conn = self.conn.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let tx = conn.transaction()?;

        let balance: i64 = tx.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM proofs WHERE spent = 0",
            [],
            |row| row.get(0),
        )?;
        if balance == 0 {
            return Ok(None);
        }

        tx.execute("UPDATE proofs SET spent = 1 WHERE spent = 0", [])?;
        tx.commit()?;

        let amount = balance as Amount;
        info!(amount, "swept all funds");
        Ok(Some((amount, self.issue_token(amount))))
    }

    /// Serialize a ledger-issued V3 token for `amount`.
    fn issue_token(&self, amount: Amount) -> String {
        encode_v3(&TokenV3 {
            token: vec![TokenV3Entry {
                mint: self.mint_url.clone(),
                proofs: vec![ProofV3 {
                    id: LEDGER_KEYSET_ID.to_string(),
                    amount,
                    secret: random_secret(),
                    c: random_signature(),
                }],
            }],
            unit: Some(DEFAULT_UNIT.to_string()),
            memo: Some("satstream walletd".to_string()),
        })
    }
}

/// 32 random bytes, hex-encoded.
fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Placeholder for a mint signature on ledger-issued proofs.
fn random_signature() -> String {
    let mut bytes = [0u8; 33];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes[0] = 0x02;
    hex::encode(bytes)
}

/// Current Unix timestamp in seconds.
fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
