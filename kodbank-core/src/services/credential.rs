//! Credential service - registration and login verification

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, NewAccount, Registration};
use crate::ports::{Clock, PasswordHasher};

/// Holds hashed passwords and checks login attempts against them
pub struct CredentialService {
    repository: Arc<DuckDbRepository>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    max_initial_balance: Decimal,
    /// Verified against when the email is unknown, so both failures cost one hash check
    dummy_hash: String,
}

impl CredentialService {
    pub fn new(
        repository: Arc<DuckDbRepository>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
        max_initial_balance: Decimal,
    ) -> Result<Self> {
        let dummy_hash = hasher.hash("kodbank-dummy-password")?;
        Ok(Self {
            repository,
            hasher,
            clock,
            max_initial_balance,
            dummy_hash,
        })
    }

    /// Create an account. Only a salted hash of the password is stored.
    pub fn register(&self, registration: &Registration<'_>) -> Result<Account> {
        let (email, balance) = registration.validate(self.max_initial_balance)?;

        if self.repository.get_account_by_email(&email)?.is_some() {
            tracing::warn!("registration rejected: email already registered");
            return Err(Error::DuplicateIdentity(email));
        }

        let new_account = NewAccount {
            name: registration.name.trim().to_string(),
            email,
            password_hash: self.hasher.hash(registration.password)?,
            balance,
        };
        // The unique index still catches a concurrent registration of the same email
        let account = self.repository.insert_account(&new_account, self.clock.now())?;

        tracing::info!(account_id = account.id, balance = %account.balance, "registered account");
        Ok(account)
    }

    /// Check a login attempt. Unknown email and wrong password are indistinguishable.
    pub fn verify(&self, email: &str, password: &str) -> Result<Account> {
        let email = Account::normalize_email(email);
        match self.repository.get_account_by_email(&email)? {
            Some(account) if self.hasher.verify(password, &account.password_hash) => Ok(account),
            Some(account) => {
                tracing::warn!(account_id = account.id, "login rejected: wrong password");
                Err(Error::InvalidCredentials)
            }
            None => {
                let _ = self.hasher.verify(password, &self.dummy_hash);
                tracing::warn!("login rejected: unknown email");
                Err(Error::InvalidCredentials)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support;

    fn service() -> CredentialService {
        let (repository, hasher, clock) = test_support::parts();
        CredentialService::new(repository, hasher, clock, "10000.00".parse().unwrap()).unwrap()
    }

    #[test]
    fn test_register_and_verify() {
        let service = service();
        let account = service
            .register(&Registration::new("Alice", "s3cret", "Alice@Example.com"))
            .unwrap();
        assert_eq!(account.email, "alice@example.com");
        assert_eq!(account.balance.to_string(), "0.00");
        assert!(account.password_hash.starts_with("$argon2id$"));

        let verified = service.verify(" ALICE@example.com", "s3cret").unwrap();
        assert_eq!(verified.id, account.id);
    }

    #[test]
    fn test_verify_failures_look_the_same() {
        let service = service();
        service
            .register(&Registration::new("Alice", "s3cret", "alice@example.com"))
            .unwrap();

        let wrong_password = service.verify("alice@example.com", "nope").unwrap_err();
        let unknown_email = service.verify("bob@example.com", "s3cret").unwrap_err();
        assert!(matches!(wrong_password, Error::InvalidCredentials));
        assert!(matches!(unknown_email, Error::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let service = service();
        service
            .register(&Registration::new("Alice", "pw", "alice@example.com"))
            .unwrap();
        let err = service
            .register(&Registration::new("Other Alice", "pw2", "ALICE@example.com"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentity(_)));
    }

    #[test]
    fn test_initial_balance_ceiling() {
        let service = service();
        let ok = service
            .register(
                &Registration::new("Rich", "pw", "rich@example.com")
                    .with_initial_balance("10000".parse().unwrap()),
            )
            .unwrap();
        assert_eq!(ok.balance.to_string(), "10000.00");

        let err = service
            .register(
                &Registration::new("Richer", "pw", "richer@example.com")
                    .with_initial_balance("10000.01".parse().unwrap()),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
