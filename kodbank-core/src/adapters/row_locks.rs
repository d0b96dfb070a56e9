//! Exclusive per-account row locks
//!
//! DuckDB has no `SELECT ... FOR UPDATE`, so writers serialize on account rows
//! here. Locks are always taken in ascending id order, which rules out
//! deadlock between two transfers touching the same pair in opposite directions.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::domain::result::{Error, Result};

/// Table of currently locked account ids
pub struct RowLocks {
    held: Mutex<HashSet<i64>>,
    released: Condvar,
    timeout: Duration,
}

impl RowLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            timeout,
        }
    }

    /// Lock every id in `ids` (duplicates ignored), lowest id first.
    ///
    /// Fails with `StoreUnavailable` if any row stays locked past the timeout;
    /// rows already taken by this call are released before returning.
    pub fn acquire(&self, ids: &[i64]) -> Result<RowLockGuard<'_>> {
        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let deadline = Instant::now() + self.timeout;
        let mut guard = RowLockGuard {
            locks: self,
            ids: Vec::with_capacity(ordered.len()),
        };

        let mut held = self.held.lock();
        for id in ordered {
            while held.contains(&id) {
                tracing::debug!(account_id = id, "waiting for row lock");
                if self.released.wait_until(&mut held, deadline).timed_out()
                    && held.contains(&id)
                {
                    drop(held);
                    return Err(Error::unavailable(format!(
                        "timed out after {}ms waiting for account {}",
                        self.timeout.as_millis(),
                        id
                    )));
                }
            }
            held.insert(id);
            guard.ids.push(id);
        }

        Ok(guard)
    }

    #[cfg(test)]
    fn is_locked(&self, id: i64) -> bool {
        self.held.lock().contains(&id)
    }
}

/// Held row locks; released on drop
pub struct RowLockGuard<'a> {
    locks: &'a RowLocks,
    ids: Vec<i64>,
}

impl RowLockGuard<'_> {
    /// Locked ids in acquisition (ascending) order
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }
}

impl Drop for RowLockGuard<'_> {
    fn drop(&mut self) {
        if self.ids.is_empty() {
            return;
        }
        let mut held = self.locks.held.lock();
        for id in &self.ids {
            held.remove(id);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
