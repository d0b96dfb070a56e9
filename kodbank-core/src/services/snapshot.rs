//! Snapshot service - consistent read-only view of the ledger

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::amount;
use crate::domain::result::Result;
use crate::domain::{Account, Snapshot};
use crate::ports::Clock;

pub struct SnapshotService {
    repository: Arc<DuckDbRepository>,
    clock: Arc<dyn Clock>,
}

impl SnapshotService {
    pub fn new(repository: Arc<DuckDbRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// All accounts and sessions as of one store transaction
    pub fn read(&self) -> Result<Snapshot> {
        let (accounts, sessions) = self.repository.read_snapshot()?;
        let now = self.clock.now();

        let total_balance: Decimal = accounts.iter().map(|a| a.balance).sum();
        Ok(Snapshot {
            accounts: accounts.iter().map(Account::summary).collect(),
            sessions: sessions.iter().map(|s| s.summary(now)).collect(),
            total_balance: amount::to_cents_scale(total_balance),
            taken_at: now,
        })
    }
}
