//! Transfer service - atomic moves between two accounts

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::amount;
use crate::domain::result::{Error, Result};
use crate::domain::Account;

/// Moves funds from an initiator to a recipient addressed by email.
///
/// Checks run in a fixed order: amount, recipient lookup, self-transfer, then
/// (under both row locks, inside one store transaction) sufficient funds.
/// Either both balances change or neither does.
pub struct TransferService {
    repository: Arc<DuckDbRepository>,
}

impl TransferService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Returns the sender's balance after the transfer
    pub fn transfer(&self, initiator_id: i64, recipient_email: &str, amount: Decimal) -> Result<Decimal> {
        let amount = amount::validate_transfer_amount(amount).map_err(|e| {
            tracing::warn!(initiator_id, %amount, "transfer rejected: invalid amount");
            e
        })?;

        let email = Account::normalize_email(recipient_email);
        let recipient = match self.repository.get_account_by_email(&email)? {
            Some(recipient) => recipient,
            None => {
                tracing::warn!(initiator_id, "transfer rejected: unknown recipient");
                return Err(Error::RecipientNotFound(email));
            }
        };

        if recipient.id == initiator_id {
            tracing::warn!(initiator_id, "transfer rejected: self transfer");
            return Err(Error::SelfTransferNotAllowed);
        }

        let recipient_id = recipient.id;
        let result = self
            .repository
            .with_locked_accounts(&[initiator_id, recipient_id], |locked| {
                let available = locked.balance(initiator_id)?;
                locked.balance(recipient_id).map_err(|e| match e {
                    Error::NotFound(_) => Error::RecipientNotFound(email.clone()),
                    other => other,
                })?;

                if available < amount {
                    return Err(Error::InsufficientFunds {
                        available,
                        requested: amount,
                    });
                }

                let sender_balance = locked.adjust(initiator_id, -amount)?;
                locked.adjust(recipient_id, amount)?;
                Ok(sender_balance)
            });

        match &result {
            Ok(balance) => tracing::info!(
                from = initiator_id,
                to = recipient_id,
                %amount,
                sender_balance = %balance,
                "transfer committed"
            ),
            Err(e) => tracing::warn!(
                from = initiator_id,
                to = recipient_id,
                %amount,
                error = %e,
                "transfer rolled back"
            ),
        }
        result
    }
}
