//! Account domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amount;
use super::result::{Error, Result};

/// A ledger account: one holder's identity, credentials and balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Auto-assigned by the store, immutable
    pub id: i64,
    pub name: String,
    /// Normalized (trimmed, lower-case); doubles as the transfer address
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Public view of the account, without the password hash
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            balance: self.balance,
        }
    }

    /// Normalize an email address for storage and lookup
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

/// Account row as exposed to callers and snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub balance: Decimal,
}

/// Validated registration input
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub balance: Decimal,
}

/// Registration request before hashing and validation
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub password: &'a str,
    pub email: &'a str,
    pub initial_balance: Option<Decimal>,
}

impl<'a> Registration<'a> {
    pub fn new(name: &'a str, password: &'a str, email: &'a str) -> Self {
        Self {
            name,
            password,
            email,
            initial_balance: None,
        }
    }

    pub fn with_initial_balance(mut self, balance: Decimal) -> Self {
        self.initial_balance = Some(balance);
        self
    }

    /// Check required fields and the initial balance policy.
    ///
    /// Returns the normalized email and the initial balance to store.
    pub fn validate(&self, max_initial_balance: Decimal) -> Result<(String, Decimal)> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_input("name cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(Error::invalid_input("password cannot be empty"));
        }

        let email = Account::normalize_email(self.email);
        if email.is_empty() {
            return Err(Error::invalid_input("email cannot be empty"));
        }
        if !is_plausible_email(&email) {
            return Err(Error::invalid_input(format!("not an email address: {}", email)));
        }

        let balance = self.initial_balance.unwrap_or(Decimal::ZERO);
        if balance < Decimal::ZERO {
            return Err(Error::invalid_input("initial balance cannot be negative"));
        }
        if balance.normalize().scale() > amount::SCALE {
            return Err(Error::invalid_input(
                "initial balance cannot have more than two decimal places",
            ));
        }
        if balance > max_initial_balance {
            return Err(Error::invalid_input(format!(
                "initial balance cannot exceed {}",
                max_initial_balance
            )));
        }

        Ok((email, amount::to_cents_scale(balance)))
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
