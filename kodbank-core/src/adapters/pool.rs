//! Bounded pool of DuckDB connections to one database instance

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use duckdb::Connection;
use parking_lot::{Condvar, Mutex};

use crate::domain::result::{Error, Result};

/// Connections cloned from a single opened database.
///
/// Checkout blocks for at most `checkout_timeout`, then fails with a
/// retryable `StoreUnavailable`.
pub struct ConnectionPool {
    idle: Mutex<Vec<Connection>>,
    returned: Condvar,
    size: usize,
    checkout_timeout: Duration,
}

impl ConnectionPool {
    /// Build a pool of `size` connections sharing `root`'s database
    pub fn new(root: Connection, size: usize, checkout_timeout: Duration) -> Result<Self> {
        let size = size.max(1);
        let mut idle = Vec::with_capacity(size);
        for _ in 1..size {
            idle.push(root.try_clone()?);
        }
        idle.push(root);

        Ok(Self {
            idle: Mutex::new(idle),
            returned: Condvar::new(),
            size,
            checkout_timeout,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of connections not currently checked out
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Check out a connection, waiting until one is returned or the timeout passes
    pub fn get(&self) -> Result<PooledConnection<'_>> {
        let deadline = Instant::now() + self.checkout_timeout;
        let mut idle = self.idle.lock();
        loop {
            if let Some(conn) = idle.pop() {
                return Ok(PooledConnection {
                    pool: self,
                    conn: Some(conn),
                });
            }
            tracing::debug!("connection pool exhausted, waiting");
            if self.returned.wait_until(&mut idle, deadline).timed_out() && idle.is_empty() {
                return Err(Error::unavailable(format!(
                    "no database connection available after {}ms",
                    self.checkout_timeout.as_millis()
                )));
            }
        }
    }

    /// Take every idle connection out of the pool (used on shutdown)
    pub(crate) fn drain(&self) -> Vec<Connection> {
        std::mem::take(&mut *self.idle.lock())
    }

    fn put_back(&self, conn: Connection) {
        self.idle.lock().push(conn);
        self.returned.notify_one();
    }
}

/// A checked-out connection; returns itself to the pool on drop
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_back(conn);
        }
    }
}
