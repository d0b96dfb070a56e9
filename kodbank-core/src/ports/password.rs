//! Password hashing port
//!
//! The credential store treats hashing as an opaque one-way function:
//! it only ever hashes a new password or verifies one against a stored hash.

use crate::domain::result::Result;

/// One-way salted password hashing
pub trait PasswordHasher: Send + Sync {
    /// Produce a self-describing salted hash of `password`
    fn hash(&self, password: &str) -> Result<String>;

    /// Check `password` against a hash produced by `hash`.
    ///
    /// A malformed stored hash verifies as `false`, never as an error.
    fn verify(&self, password: &str, hash: &str) -> bool;
}
