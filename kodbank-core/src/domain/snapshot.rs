//! Snapshot domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountSummary;
use super::session::SessionSummary;

/// Consistent read-only view of the whole ledger at one instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ordered by account id ascending
    pub accounts: Vec<AccountSummary>,
    /// Most recently issued first
    pub sessions: Vec<SessionSummary>,
    pub total_balance: Decimal,
    pub taken_at: DateTime<Utc>,
}
