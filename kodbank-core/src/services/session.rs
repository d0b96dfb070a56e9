//! Session service - issue, validate and revoke bearer tokens
//!
//! A token is only accepted when both checks pass: the HS256 signature
//! verifies, and a live server-side row with the same value exists for an
//! account that still exists. Expired rows are removed when validation
//! finds them.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::adapters::duckdb::DuckDbRepository;
use crate::adapters::jwt::JwtSigner;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, Identity, IssuedSession, SessionClaims};
use crate::ports::Clock;

pub struct SessionService {
    repository: Arc<DuckDbRepository>,
    signer: JwtSigner,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(
        repository: Arc<DuckDbRepository>,
        signer: JwtSigner,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            repository,
            signer,
            clock,
            ttl,
        }
    }

    /// Issue a signed token for `account_id` and record it server-side
    pub fn issue(&self, account_id: i64) -> Result<IssuedSession> {
        let account = self
            .repository
            .get_account_by_id(account_id)?
            .ok_or_else(|| Error::not_found(format!("account {}", account_id)))?;

        let now = self.clock.now();
        // JWT times are whole seconds; the row must agree with the token
        let issued_at = whole_seconds(now);
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::Config(format!("session ttl {} overflows expiry", self.ttl)))?;

        let claims = SessionClaims::new(&account, issued_at, expires_at);
        let token = self.signer.sign(&claims)?;
        let session = self
            .repository
            .insert_session(&token, account.id, expires_at, now)?;

        tracing::info!(account_id = account.id, session_id = session.id, %expires_at, "issued session");
        Ok(IssuedSession {
            token,
            identity: claims.identity(),
            expires_at,
        })
    }

    /// Resolve a presented token to its account
    pub fn validate(&self, token: Option<&str>) -> Result<Account> {
        self.authenticate(token).map(|(_, account)| account)
    }

    /// Identity carried by a valid token
    pub fn identity(&self, token: Option<&str>) -> Result<Identity> {
        self.authenticate(token).map(|(claims, _)| claims.identity())
    }

    /// Delete the row for `token`. Revoking an unknown token is not an error.
    pub fn revoke(&self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Ok(());
        }
        if self.repository.delete_session(token)? {
            tracing::info!("revoked session");
        } else {
            tracing::debug!("revoke: no such session");
        }
        Ok(())
    }

    /// Delete every expired session row
    pub fn purge_expired(&self) -> Result<usize> {
        let purged = self.repository.delete_expired_sessions(self.clock.now())?;
        tracing::info!(purged, "purged expired sessions");
        Ok(purged)
    }

    fn authenticate(&self, token: Option<&str>) -> Result<(SessionClaims, Account)> {
        let token = match token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(Error::Unauthenticated),
        };

        let claims = self.signer.verify(token)?;
        let now = self.clock.now();

        let (session, account) = match self.repository.find_session_with_account(token)? {
            Some(found) => found,
            None => {
                tracing::debug!(account_id = claims.sub, "no live session row for token");
                return Err(Error::SessionExpiredOrRevoked);
            }
        };

        if session.is_expired(now) {
            self.repository.delete_session(token)?;
            tracing::info!(session_id = session.id, "removed expired session");
            return Err(Error::SessionExpiredOrRevoked);
        }
        if claims.exp <= now.timestamp() || claims.sub != session.account_id {
            tracing::warn!(session_id = session.id, "token claims disagree with session row");
            return Err(Error::SessionExpiredOrRevoked);
        }

        Ok((claims, account))
    }
}

fn whole_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewAccount;
    use crate::ports::ManualClock;
    use crate::services::test_support;

    const SECRET: &[u8] = b"test-secret-test-secret-test-secret";

    struct Fixture {
        repository: Arc<DuckDbRepository>,
        clock: Arc<ManualClock>,
        service: SessionService,
        account_id: i64,
    }

    fn fixture() -> Fixture {
        let repository = test_support::repository();
        let clock = Arc::new(ManualClock::default());
        let account = repository
            .insert_account(
                &NewAccount {
                    name: "Alice".to_string(),
                    email: "alice@example.com".to_string(),
                    password_hash: "$argon2id$x".to_string(),
                    balance: Default::default(),
                },
                clock.now(),
            )
            .unwrap();
        let service = SessionService::new(
            Arc::clone(&repository),
            JwtSigner::new(SECRET).unwrap(),
            clock.clone(),
            Duration::hours(1),
        );
        Fixture {
            repository,
            clock,
            service,
            account_id: account.id,
        }
    }

    #[test]
    fn test_issue_then_validate() {
        let f = fixture();
        let issued = f.service.issue(f.account_id).unwrap();
        assert_eq!(issued.identity.email, "alice@example.com");

        let account = f.service.validate(Some(&issued.token)).unwrap();
        assert_eq!(account.id, f.account_id);
        let identity = f.service.identity(Some(&issued.token)).unwrap();
        assert_eq!(identity, issued.identity);
    }

    #[test]
    fn test_issue_for_missing_account() {
        let f = fixture();
        assert!(matches!(f.service.issue(9_999), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_missing_or_garbage_token() {
        let f = fixture();
        assert!(matches!(f.service.validate(None), Err(Error::Unauthenticated)));
        assert!(matches!(f.service.validate(Some("")), Err(Error::Unauthenticated)));
        assert!(matches!(f.service.validate(Some("garbage")), Err(Error::InvalidToken)));
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let f = fixture();
        let issued = f.service.issue(f.account_id).unwrap();
        f.service.revoke(&issued.token).unwrap();
        f.service.revoke(&issued.token).unwrap();
        f.service.revoke("never-issued").unwrap();
        assert!(matches!(
            f.service.validate(Some(&issued.token)),
            Err(Error::SessionExpiredOrRevoked)
        ));
    }

    #[test]
    fn test_expired_session_is_removed_on_validate() {
        let f = fixture();
        let issued = f.service.issue(f.account_id).unwrap();
        f.clock.advance(Duration::hours(1) + Duration::seconds(1));

        assert!(matches!(
            f.service.validate(Some(&issued.token)),
            Err(Error::SessionExpiredOrRevoked)
        ));
        assert!(f.repository.find_session_with_account(&issued.token).unwrap().is_none());
    }

    #[test]
    fn test_deleted_account_invalidates_session() {
        let f = fixture();
        let issued = f.service.issue(f.account_id).unwrap();
        f.repository.delete_account(f.account_id).unwrap();
        assert!(matches!(
            f.service.validate(Some(&issued.token)),
            Err(Error::SessionExpiredOrRevoked)
        ));
    }

    #[test]
    fn test_multiple_sessions_and_purge() {
        let f = fixture();
        let first = f.service.issue(f.account_id).unwrap();
        f.clock.advance(Duration::minutes(30));
        let second = f.service.issue(f.account_id).unwrap();
        assert_ne!(first.token, second.token);
        assert_eq!(f.repository.count_sessions_for_account(f.account_id).unwrap(), 2);

        f.clock.advance(Duration::minutes(31));
        assert_eq!(f.service.purge_expired().unwrap(), 1);
        assert!(f.service.validate(Some(&second.token)).is_ok());
    }
}
