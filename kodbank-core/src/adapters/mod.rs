//! Adapter implementations
//!
//! Adapters implement the port traits and storage with concrete technologies:
//! - DuckDB for accounts and sessions (with its connection pool and row locks)
//! - Argon2 for the PasswordHasher port
//! - HS256 JWTs for session tokens

pub mod duckdb;
pub mod jwt;
pub mod password;
pub mod pool;
pub mod row_locks;
