//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Services depend
//! only on these traits, not on concrete implementations.

mod clock;
mod password;

pub use clock::{Clock, ManualClock, SystemClock};
pub use password::PasswordHasher;
