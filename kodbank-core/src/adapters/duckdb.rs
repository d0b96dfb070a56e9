//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use duckdb::{params, Connection, OptionalExt};
use rust_decimal::Decimal;
use serde::Serialize;

use super::pool::ConnectionPool;
use super::row_locks::RowLocks;
use crate::domain::amount;
use crate::domain::result::{is_unique_violation, Error, Result};
use crate::domain::{Account, NewAccount, Session};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str = "account_id, name, email, password_hash, \
     CAST(balance AS VARCHAR), CAST(created_at AS VARCHAR)";

const SESSION_COLUMNS: &str = "token_id, token_value, account_id, \
     CAST(expires_at AS VARCHAR), CAST(created_at AS VARCHAR)";

/// Pool and lock sizing for a store handle
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub pool_size: usize,
    pub pool_timeout: Duration,
    pub lock_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            pool_size: 4,
            pool_timeout: Duration::from_secs(5),
            lock_timeout: Duration::from_secs(5),
        }
    }
}

/// Aggregate counts used by diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub tables: Vec<String>,
    pub account_count: i64,
    pub session_count: i64,
    pub expired_session_count: i64,
    pub negative_balance_count: i64,
    pub orphaned_session_count: i64,
    pub total_balance: Decimal,
}

/// DuckDB-backed account and session store.
///
/// Owns a bounded connection pool and the account row lock table. Opened once
/// at startup, shared behind an `Arc`, and closed with [`DuckDbRepository::close`].
pub struct DuckDbRepository {
    pool: ConnectionPool,
    row_locks: RowLocks,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a database file.
    ///
    /// Retries with exponential backoff while another process holds the file.
    pub fn open(db_path: &Path, options: &StoreOptions) -> Result<Self> {
        let mut attempt = 0;
        let conn = loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => break conn,
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES - 1 => {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    tracing::warn!(
                        attempt = attempt + 1,
                        max = MAX_RETRIES,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "database busy, retrying open"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        tracing::info!(path = %db_path.display(), pool_size = options.pool_size, "opened store");
        Self::from_connection(conn, Some(db_path.to_path_buf()), options)
    }

    /// Open a private in-memory database (tests, demos)
    pub fn open_in_memory(options: &StoreOptions) -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Self::from_connection(conn, None, options)
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs one
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn from_connection(
        conn: Connection,
        db_path: Option<PathBuf>,
        options: &StoreOptions,
    ) -> Result<Self> {
        Ok(Self {
            pool: ConnectionPool::new(conn, options.pool_size, options.pool_timeout)?,
            row_locks: RowLocks::new(options.lock_timeout),
            db_path,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Run pending migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.pool.get()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Flush the write-ahead log and release every connection
    pub fn close(self) -> Result<()> {
        let connections = self.pool.drain();
        if self.db_path.is_some() {
            if let Some(conn) = connections.first() {
                conn.execute_batch("CHECKPOINT")?;
            }
        }
        drop(connections);
        tracing::info!("store closed");
        Ok(())
    }

    /// Run an idempotent read, retrying once on a transient failure
    fn read<T>(&self, op: impl Fn(&mut Connection) -> Result<T>) -> Result<T> {
        let first = self.pool.get().and_then(|mut conn| op(&mut conn));
        match first {
            Err(e) if e.is_retryable() => {
                tracing::warn!(error = %e, "store read failed, retrying once");
                let mut conn = self.pool.get()?;
                op(&mut conn)
            }
            other => other,
        }
    }

    // === Account operations ===

    /// Insert a new account; a taken email is `DuplicateIdentity`
    pub fn insert_account(&self, account: &NewAccount, now: DateTime<Utc>) -> Result<Account> {
        let conn = self.pool.get()?;
        let sql = format!(
            "INSERT INTO accounts (name, email, password_hash, balance, created_at)
             VALUES (?, ?, ?, CAST(? AS DECIMAL(15, 2)), CAST(? AS TIMESTAMP))
             RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let row = conn
            .query_row(
                &sql,
                params![
                    account.name,
                    account.email,
                    account.password_hash,
                    account.balance.to_string(),
                    format_timestamp(now),
                ],
                |row| AccountRow::read(row, 0),
            )
            .map_err(|e| {
                if is_unique_violation(&e.to_string()) {
                    Error::DuplicateIdentity(account.email.clone())
                } else {
                    e.into()
                }
            })?;
        row.into_account()
    }

    pub fn get_account_by_id(&self, id: i64) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE account_id = ?", ACCOUNT_COLUMNS);
        self.read(|conn| {
            conn.query_row(&sql, params![id], |row| AccountRow::read(row, 0))
                .optional()?
                .map(AccountRow::into_account)
                .transpose()
        })
    }

    /// Look up by email; the caller passes an already normalized address
    pub fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE email = ?", ACCOUNT_COLUMNS);
        self.read(|conn| {
            conn.query_row(&sql, params![email], |row| AccountRow::read(row, 0))
                .optional()?
                .map(AccountRow::into_account)
                .transpose()
        })
    }

    /// All accounts ordered by id ascending
    pub fn get_accounts(&self) -> Result<Vec<Account>> {
        self.read(|conn| query_accounts(conn))
    }

    /// Delete an account and its sessions.
    ///
    /// Sessions go first so no session row ever points at a missing account.
    /// Returns whether the account existed.
    pub fn delete_account(&self, id: i64) -> Result<bool> {
        let _locks = self.row_locks.acquire(&[id])?;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM sessions WHERE account_id = ?", params![id])?;
        let deleted = tx.execute("DELETE FROM accounts WHERE account_id = ?", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Run `body` inside one store transaction while holding exclusive row
    /// locks on every account in `ids`.
    ///
    /// Locks are taken in ascending id order before the transaction begins and
    /// released after it ends. The transaction commits only if `body` returns
    /// `Ok`; any error (or panic) rolls it back when it goes out of scope.
    pub fn with_locked_accounts<T>(
        &self,
        ids: &[i64],
        body: impl FnOnce(&mut LockedAccounts<'_>) -> Result<T>,
    ) -> Result<T> {
        let locks = self.row_locks.acquire(ids)?;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let mut accounts = LockedAccounts {
            conn: &tx,
            locked: locks.ids(),
        };
        let value = body(&mut accounts)?;

        tx.commit()?;
        Ok(value)
    }

    // === Session operations ===

    /// Insert a session row for an existing account
    pub fn insert_session(
        &self,
        token: &str,
        account_id: i64,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Session> {
        let conn = self.pool.get()?;
        // INSERT ... SELECT so the row only exists if the account does
        let sql = format!(
            "INSERT INTO sessions (token_value, account_id, expires_at, created_at)
             SELECT CAST(? AS VARCHAR), account_id, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP)
             FROM accounts WHERE account_id = ?
             RETURNING {}",
            SESSION_COLUMNS
        );
        let row = conn
            .query_row(
                &sql,
                params![token, format_timestamp(expires_at), format_timestamp(now), account_id],
                |row| SessionRow::read(row, 0),
            )
            .optional()?;

        match row {
            Some(row) => row.into_session(),
            None => Err(Error::not_found(format!("account {}", account_id))),
        }
    }

    /// Find a session by token value together with its (still existing) account
    pub fn find_session_with_account(&self, token: &str) -> Result<Option<(Session, Account)>> {
        let sql = "SELECT s.token_id, s.token_value, s.account_id,
                          CAST(s.expires_at AS VARCHAR), CAST(s.created_at AS VARCHAR),
                          a.account_id, a.name, a.email, a.password_hash,
                          CAST(a.balance AS VARCHAR), CAST(a.created_at AS VARCHAR)
                   FROM sessions s
                   JOIN accounts a ON a.account_id = s.account_id
                   WHERE s.token_value = ?";
        self.read(|conn| {
            let rows = conn
                .query_row(sql, params![token], |row| {
                    Ok((SessionRow::read(row, 0)?, AccountRow::read(row, 5)?))
                })
                .optional()?;
            match rows {
                Some((session, account)) => {
                    Ok(Some((session.into_session()?, account.into_account()?)))
                }
                None => Ok(None),
            }
        })
    }

    /// Delete the session with this token value. Returns whether one existed.
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let deleted = conn.execute("DELETE FROM sessions WHERE token_value = ?", params![token])?;
        Ok(deleted > 0)
    }

    /// Delete every session that expired at or before `now`
    pub fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= CAST(? AS TIMESTAMP)",
            params![format_timestamp(now)],
        )?;
        Ok(deleted)
    }

    pub fn count_sessions_for_account(&self, account_id: i64) -> Result<i64> {
        self.read(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE account_id = ?",
                params![account_id],
                |row| row.get(0),
            )?)
        })
    }

    // === Snapshot and diagnostics ===

    /// All accounts (id ascending) and sessions (newest first), read in one transaction
    pub fn read_snapshot(&self) -> Result<(Vec<Account>, Vec<Session>)> {
        self.read(|conn| {
            let tx = conn.transaction()?;
            let accounts = query_accounts(&tx)?;
            let sessions = query_sessions(&tx)?;
            tx.commit()?;
            Ok((accounts, sessions))
        })
    }

    /// Counts for health checks, read in one transaction
    pub fn store_stats(&self, now: DateTime<Utc>) -> Result<StoreStats> {
        let now = format_timestamp(now);
        self.read(|conn| {
            let tx = conn.transaction()?;

            let mut stmt = tx.prepare(
                "SELECT table_name FROM information_schema.tables
                 WHERE table_schema = 'main' ORDER BY table_name",
            )?;
            let tables = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            drop(stmt);

            let count = |sql: &str| -> Result<i64> { Ok(tx.query_row(sql, [], |row| row.get(0))?) };
            let account_count = count("SELECT COUNT(*) FROM accounts")?;
            let session_count = count("SELECT COUNT(*) FROM sessions")?;
            let negative_balance_count = count("SELECT COUNT(*) FROM accounts WHERE balance < 0")?;
            let orphaned_session_count = count(
                "SELECT COUNT(*) FROM sessions s
                 WHERE NOT EXISTS (SELECT 1 FROM accounts a WHERE a.account_id = s.account_id)",
            )?;
            let expired_session_count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM sessions WHERE expires_at <= CAST(? AS TIMESTAMP)",
                params![now],
                |row| row.get(0),
            )?;
            let total: String = tx.query_row(
                "SELECT CAST(COALESCE(SUM(balance), 0) AS VARCHAR) FROM accounts",
                [],
                |row| row.get(0),
            )?;

            tx.commit()?;
            Ok(StoreStats {
                tables,
                account_count,
                session_count,
                expired_session_count,
                negative_balance_count,
                orphaned_session_count,
                total_balance: amount::to_cents_scale(parse_decimal(&total)?),
            })
        })
    }
}

/// Accounts locked for the duration of one store transaction.
///
/// Only the ids passed to [`DuckDbRepository::with_locked_accounts`] may be
/// read or written through this handle.
pub struct LockedAccounts<'a> {
    conn: &'a Connection,
    locked: &'a [i64],
}

impl LockedAccounts<'_> {
    /// Current row, read under lock
    pub fn account(&self, id: i64) -> Result<Account> {
        self.ensure_locked(id)?;
        let sql = format!("SELECT {} FROM accounts WHERE account_id = ?", ACCOUNT_COLUMNS);
        self.conn
            .query_row(&sql, params![id], |row| AccountRow::read(row, 0))
            .optional()?
            .ok_or_else(|| Error::not_found(format!("account {}", id)))?
            .into_account()
    }

    pub fn balance(&self, id: i64) -> Result<Decimal> {
        Ok(self.account(id)?.balance)
    }

    /// Add `delta` (possibly negative) to the balance and return the new balance.
    ///
    /// Fails with `InsufficientFunds` before writing anything if the result
    /// would be negative.
    pub fn adjust(&mut self, id: i64, delta: Decimal) -> Result<Decimal> {
        let current = self.balance(id)?;
        let updated = amount::apply_delta(current, delta)?;
        let changed = self.conn.execute(
            "UPDATE accounts SET balance = CAST(? AS DECIMAL(15, 2)) WHERE account_id = ?",
            params![updated.to_string(), id],
        )?;
        if changed != 1 {
            return Err(Error::not_found(format!("account {}", id)));
        }
        Ok(updated)
    }

    fn ensure_locked(&self, id: i64) -> Result<()> {
        if self.locked.contains(&id) {
            Ok(())
        } else {
            Err(Error::database(format!(
                "account {} is not locked by this transaction",
                id
            )))
        }
    }
}

fn query_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let sql = format!("SELECT {} FROM accounts ORDER BY account_id", ACCOUNT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| AccountRow::read(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(AccountRow::into_account).collect()
}

fn query_sessions(conn: &Connection) -> Result<Vec<Session>> {
    let sql = format!("SELECT {} FROM sessions ORDER BY token_id DESC", SESSION_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| SessionRow::read(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(SessionRow::into_session).collect()
}

/// Raw account columns; decimals and timestamps arrive as text
struct AccountRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    balance: String,
    created_at: String,
}

impl AccountRow {
    fn read(row: &duckdb::Row, offset: usize) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            name: row.get(offset + 1)?,
            email: row.get(offset + 2)?,
            password_hash: row.get(offset + 3)?,
            balance: row.get(offset + 4)?,
            created_at: row.get(offset + 5)?,
        })
    }

    fn into_account(self) -> Result<Account> {
        Ok(Account {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            balance: amount::to_cents_scale(parse_decimal(&self.balance)?),
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct SessionRow {
    id: i64,
    token: String,
    account_id: i64,
    expires_at: String,
    created_at: String,
}

impl SessionRow {
    fn read(row: &duckdb::Row, offset: usize) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            token: row.get(offset + 1)?,
            account_id: row.get(offset + 2)?,
            expires_at: row.get(offset + 3)?,
            created_at: row.get(offset + 4)?,
        })
    }

    fn into_session(self) -> Result<Session> {
        Ok(Session {
            id: self.id,
            token: self.token,
            account_id: self.account_id,
            expires_at: parse_timestamp(&self.expires_at)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Timestamps are stored as naive UTC
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| Error::database(format!("unreadable timestamp {:?}: {}", s, e)))
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|e| Error::database(format!("unreadable amount {:?}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory(&StoreOptions::default()).unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    fn new_account(email: &str, balance: &str) -> NewAccount {
        NewAccount {
            name: email.split('@').next().unwrap().to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$test".to_string(),
            balance: balance.parse().unwrap(),
        }
    }

    #[test]
    fn test_timestamp_round_trip_keeps_microseconds() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
            + ChronoDuration::microseconds(250);
        assert_eq!(parse_timestamp(&format_timestamp(ts)).unwrap(), ts);
        // DuckDB drops a zero fraction when casting to text
        assert_eq!(
            parse_timestamp("2026-10-16 09:30:00").unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_insert_assigns_ascending_ids_and_exact_balances() {
        let repo = repo();
        let now = Utc::now();
        let a = repo.insert_account(&new_account("a@x.io", "100.00"), now).unwrap();
        let b = repo.insert_account(&new_account("b@x.io", "50.5"), now).unwrap();

        assert!(b.id > a.id);
        assert_eq!(a.balance.to_string(), "100.00");
        assert_eq!(b.balance.to_string(), "50.50");

        let fetched = repo.get_account_by_email("b@x.io").unwrap().unwrap();
        assert_eq!(fetched.id, b.id);
        assert_eq!(fetched.password_hash, "$argon2id$test");
        assert!(repo.get_account_by_id(9_999).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_maps_to_duplicate_identity() {
        let repo = repo();
        let now = Utc::now();
        repo.insert_account(&new_account("a@x.io", "0"), now).unwrap();
        let err = repo.insert_account(&new_account("a@x.io", "0"), now).unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentity(email) if email == "a@x.io"));
    }

    #[test]
    fn test_locked_adjust_rolls_back_on_error() {
        let repo = repo();
        let now = Utc::now();
        let a = repo.insert_account(&new_account("a@x.io", "10.00"), now).unwrap();
        let b = repo.insert_account(&new_account("b@x.io", "0"), now).unwrap();

        let result: Result<()> = repo.with_locked_accounts(&[a.id, b.id], |locked| {
            locked.adjust(b.id, "5.00".parse().unwrap())?;
            // Fails after the first write; the whole transaction must roll back
            locked.adjust(a.id, "-50.00".parse().unwrap())?;
            Ok(())
        });
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));

        assert_eq!(repo.get_account_by_id(b.id).unwrap().unwrap().balance.to_string(), "0.00");
        assert_eq!(repo.get_account_by_id(a.id).unwrap().unwrap().balance.to_string(), "10.00");
    }

    #[test]
    fn test_locked_accounts_refuses_unlocked_ids() {
        let repo = repo();
        let now = Utc::now();
        let a = repo.insert_account(&new_account("a@x.io", "10.00"), now).unwrap();
        let b = repo.insert_account(&new_account("b@x.io", "0"), now).unwrap();

        let result = repo.with_locked_accounts(&[a.id], |locked| locked.balance(b.id));
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[test]
    fn test_session_requires_existing_account() {
        let repo = repo();
        let now = Utc::now();
        let err = repo
            .insert_session("tok", 42, now + ChronoDuration::hours(1), now)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_session_lifecycle_and_account_delete() {
        let repo = repo();
        let now = Utc::now();
        let a = repo.insert_account(&new_account("a@x.io", "1.00"), now).unwrap();
        let session = repo
            .insert_session("tok-1", a.id, now + ChronoDuration::hours(1), now)
            .unwrap();
        assert_eq!(session.account_id, a.id);

        let (found, owner) = repo.find_session_with_account("tok-1").unwrap().unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(owner.email, "a@x.io");

        assert!(repo.delete_account(a.id).unwrap());
        assert!(repo.find_session_with_account("tok-1").unwrap().is_none());
        assert_eq!(repo.count_sessions_for_account(a.id).unwrap(), 0);
        assert!(!repo.delete_account(a.id).unwrap());
    }

    #[test]
    fn test_delete_expired_sessions() {
        let repo = repo();
        let now = Utc::now();
        let a = repo.insert_account(&new_account("a@x.io", "0"), now).unwrap();
        repo.insert_session("old", a.id, now - ChronoDuration::seconds(1), now).unwrap();
        repo.insert_session("new", a.id, now + ChronoDuration::hours(1), now).unwrap();

        assert_eq!(repo.delete_expired_sessions(now).unwrap(), 1);
        assert!(repo.find_session_with_account("old").unwrap().is_none());
        assert!(repo.find_session_with_account("new").unwrap().is_some());
        assert!(repo.delete_session("new").unwrap());
        assert!(!repo.delete_session("new").unwrap());
    }

    #[test]
    fn test_snapshot_ordering_and_stats() {
        let repo = repo();
        let now = Utc::now();
        let a = repo.insert_account(&new_account("a@x.io", "100.00"), now).unwrap();
        let b = repo.insert_account(&new_account("b@x.io", "50.00"), now).unwrap();
        repo.insert_session("s1", a.id, now + ChronoDuration::hours(1), now).unwrap();
        repo.insert_session("s2", b.id, now + ChronoDuration::hours(1), now).unwrap();

        let (accounts, sessions) = repo.read_snapshot().unwrap();
        assert_eq!(accounts.iter().map(|a| a.id).collect::<Vec<_>>(), vec![a.id, b.id]);
        assert_eq!(sessions[0].token, "s2");
        assert_eq!(sessions[1].token, "s1");

        let stats = repo.store_stats(now).unwrap();
        assert!(stats.tables.contains(&"accounts".to_string()));
        assert!(stats.tables.contains(&"sessions".to_string()));
        assert_eq!(stats.account_count, 2);
        assert_eq!(stats.session_count, 2);
        assert_eq!(stats.expired_session_count, 0);
        assert_eq!(stats.orphaned_session_count, 0);
        assert_eq!(stats.total_balance.to_string(), "150.00");
    }
}
