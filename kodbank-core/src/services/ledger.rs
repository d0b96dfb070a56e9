//! Ledger service - account lookup and balance mutation

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::amount;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountSummary};

pub struct LedgerService {
    repository: Arc<DuckDbRepository>,
}

impl LedgerService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn get_by_id(&self, id: i64) -> Result<Account> {
        self.repository
            .get_account_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("account {}", id)))
    }

    pub fn get_by_email(&self, email: &str) -> Result<Account> {
        let email = Account::normalize_email(email);
        self.repository
            .get_account_by_email(&email)?
            .ok_or_else(|| Error::not_found(format!("account {}", email)))
    }

    /// Add `delta` to the balance under the account's row lock.
    ///
    /// A negative delta that would overdraw fails with `InsufficientFunds`
    /// and leaves the balance untouched. A zero delta just reads.
    pub fn adjust_balance(&self, id: i64, delta: Decimal) -> Result<Account> {
        let delta = amount::validate_delta(delta)?;
        let account = self.repository.with_locked_accounts(&[id], |locked| {
            if !delta.is_zero() {
                locked.adjust(id, delta)?;
            }
            locked.account(id)
        })?;

        if !delta.is_zero() {
            tracing::info!(account_id = id, %delta, balance = %account.balance, "adjusted balance");
        }
        Ok(account)
    }

    /// Every account, id ascending
    pub fn snapshot_all(&self) -> Result<Vec<AccountSummary>> {
        Ok(self
            .repository
            .get_accounts()?
            .iter()
            .map(Account::summary)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_lookup() {
        let repository = test_support::repository();
        let alice = test_support::account(&repository, "alice@example.com", "10.00");
        let ledger = LedgerService::new(repository);

        assert_eq!(ledger.get_by_id(alice.id).unwrap().email, "alice@example.com");
        assert_eq!(ledger.get_by_email("ALICE@example.com").unwrap().id, alice.id);
        assert!(matches!(ledger.get_by_id(alice.id + 100), Err(Error::NotFound(_))));
        assert!(matches!(ledger.get_by_email("nobody@example.com"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_adjust_balance() {
        let repository = test_support::repository();
        let alice = test_support::account(&repository, "alice@example.com", "10.00");
        let ledger = LedgerService::new(repository);

        assert_eq!(ledger.adjust_balance(alice.id, dec("5.25")).unwrap().balance, dec("15.25"));
        assert_eq!(ledger.adjust_balance(alice.id, dec("-15.25")).unwrap().balance, Decimal::ZERO);
        assert_eq!(ledger.adjust_balance(alice.id, Decimal::ZERO).unwrap().balance, Decimal::ZERO);

        assert!(matches!(
            ledger.adjust_balance(alice.id, dec("-0.01")),
            Err(Error::InsufficientFunds { .. })
        ));
        assert!(matches!(
            ledger.adjust_balance(alice.id, dec("0.001")),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.adjust_balance(alice.id + 100, dec("1")),
            Err(Error::NotFound(_))
        ));
        assert_eq!(ledger.get_by_id(alice.id).unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_all_is_ordered_by_id() {
        let repository = test_support::repository();
        let b = test_support::account(&repository, "b@example.com", "2.00");
        let a = test_support::account(&repository, "a@example.com", "1.00");
        let ledger = LedgerService::new(repository);

        let ids: Vec<i64> = ledger.snapshot_all().unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
        assert!(b.id < a.id);
    }
}
