//! Session domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::account::Account;

/// Server-side session row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: i64,
    pub token: String,
    pub account_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            id: self.id,
            account_id: self.account_id,
            token_fingerprint: token_fingerprint(&self.token),
            expires_at: self.expires_at,
            expired: self.is_expired(now),
        }
    }
}

/// Snapshot view of a session. Carries a fingerprint, never the bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: i64,
    pub account_id: i64,
    pub token_fingerprint: String,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
}

/// Claims embedded in a signed session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account identifier
    pub sub: i64,
    pub name: String,
    pub email: String,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
    /// Random token id so two tokens issued in the same second differ
    pub jti: String,
}

impl SessionClaims {
    pub fn new(account: &Account, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Who the presented session belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Result of a successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedSession {
    pub token: String,
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

/// Short, stable, non-reversible label for a token (first 12 hex chars of SHA-256)
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(digest)[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: DateTime<Utc>) -> Session {
        Session {
            id: 7,
            token: "header.payload.signature".to_string(),
            account_id: 3,
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        assert!(!session(now + Duration::seconds(1)).is_expired(now));
        assert!(session(now).is_expired(now));
    }

    #[test]
    fn test_summary_never_exposes_token() {
        let now = Utc::now();
        let summary = session(now + Duration::hours(1)).summary(now);
        assert_eq!(summary.token_fingerprint.len(), 12);
        assert!(!summary.token_fingerprint.contains("payload"));
        assert_eq!(summary.token_fingerprint, token_fingerprint("header.payload.signature"));
        assert!(!summary.expired);
    }

    #[test]
    fn test_claims_identity() {
        let account = Account {
            id: 42,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            balance: Default::default(),
            created_at: Utc::now(),
        };
        let now = Utc::now();
        let a = SessionClaims::new(&account, now, now + Duration::hours(1));
        let b = SessionClaims::new(&account, now, now + Duration::hours(1));
        assert_ne!(a.jti, b.jti);
        assert_eq!(a.identity().id, 42);
        assert_eq!(a.exp - a.iat, 3600);
    }
}
