//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod amount;
mod credential;
pub mod result;
mod session;
mod snapshot;

pub use account::{Account, AccountSummary, NewAccount, Registration};
pub use credential::Argon2Params;
pub use session::{
    token_fingerprint, Identity, IssuedSession, Session, SessionClaims, SessionSummary,
};
pub use snapshot::Snapshot;
