//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod credential;
mod doctor;
mod ledger;
pub mod migration;
mod session;
mod snapshot;
mod transfer;

pub use credential::CredentialService;
pub use doctor::{CheckResult, DiagnosticReport, DoctorService, DoctorSummary};
pub use ledger::LedgerService;
pub use migration::{MigrationResult, MigrationService};
pub use session::SessionService;
pub use snapshot::SnapshotService;
pub use transfer::TransferService;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::adapters::duckdb::{DuckDbRepository, StoreOptions};
    use crate::adapters::password::Argon2Hasher;
    use crate::domain::{Account, Argon2Params, NewAccount};
    use crate::ports::{Clock, ManualClock, PasswordHasher};

    pub fn repository() -> Arc<DuckDbRepository> {
        let repository = DuckDbRepository::open_in_memory(&StoreOptions::default()).unwrap();
        repository.ensure_schema().unwrap();
        Arc::new(repository)
    }

    pub fn parts() -> (Arc<DuckDbRepository>, Arc<dyn PasswordHasher>, Arc<dyn Clock>) {
        let hasher = Argon2Hasher::new(&Argon2Params::insecure_fast()).unwrap();
        (repository(), Arc::new(hasher), Arc::new(ManualClock::default()))
    }

    pub fn account(repository: &DuckDbRepository, email: &str, balance: &str) -> Account {
        repository
            .insert_account(
                &NewAccount {
                    name: email.to_string(),
                    email: email.to_string(),
                    password_hash: "$argon2id$unused".to_string(),
                    balance: balance.parse().unwrap(),
                },
                chrono::Utc::now(),
            )
            .unwrap()
    }
}
