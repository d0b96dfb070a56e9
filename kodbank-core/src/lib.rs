//! KodBank Core - custodial ledger with session-gated transfers
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, Session, Snapshot) and errors
//! - **ports**: Trait definitions for external dependencies (PasswordHasher, Clock)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, Argon2, JWT)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use rust_decimal::Decimal;

use adapters::duckdb::DuckDbRepository;
use adapters::jwt::JwtSigner;
use adapters::password::Argon2Hasher;
use config::Config;
use domain::result::Result;
use ports::{Clock, PasswordHasher, SystemClock};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    Account, AccountSummary, Identity, IssuedSession, Registration, SessionSummary, Snapshot,
};
pub use services::{CheckResult, DiagnosticReport};

/// Main context for KodBank operations
///
/// This is the primary entry point for all business logic. It holds
/// the store handle, configuration, and all services. Every operation
/// that acts on behalf of an account takes the presented session token.
pub struct KodbankContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub credential_service: CredentialService,
    pub session_service: SessionService,
    pub ledger_service: LedgerService,
    pub transfer_service: TransferService,
    pub snapshot_service: SnapshotService,
    pub doctor_service: DoctorService,
}

impl KodbankContext {
    /// Create a context backed by the database in `data_dir`
    pub fn new(data_dir: &Path) -> anyhow::Result<Self> {
        let config = Config::load(data_dir)?;
        let repository = DuckDbRepository::open(&config.db_path(data_dir), &config.store_options())?;
        Ok(Self::with_parts(config, Arc::new(repository), Arc::new(SystemClock))?)
    }

    /// Assemble a context from an already opened store and a clock
    pub fn with_parts(
        config: Config,
        repository: Arc<DuckDbRepository>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        // Initialize schema
        repository.ensure_schema()?;

        let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::new(&config.password_hashing)?);
        let signer = JwtSigner::new(config.token_secret.as_bytes())?;

        let credential_service = CredentialService::new(
            Arc::clone(&repository),
            hasher,
            Arc::clone(&clock),
            config.max_initial_balance,
        )?;
        let session_service = SessionService::new(
            Arc::clone(&repository),
            signer,
            Arc::clone(&clock),
            config.session_ttl()?,
        );
        let ledger_service = LedgerService::new(Arc::clone(&repository));
        let transfer_service = TransferService::new(Arc::clone(&repository));
        let snapshot_service = SnapshotService::new(Arc::clone(&repository), Arc::clone(&clock));
        let doctor_service = DoctorService::new(Arc::clone(&repository), clock);

        Ok(Self {
            config,
            repository,
            credential_service,
            session_service,
            ledger_service,
            transfer_service,
            snapshot_service,
            doctor_service,
        })
    }

    /// Create an account
    pub fn register(
        &self,
        name: &str,
        password: &str,
        email: &str,
        initial_balance: Option<Decimal>,
    ) -> Result<AccountSummary> {
        let mut registration = Registration::new(name, password, email);
        if let Some(balance) = initial_balance {
            registration = registration.with_initial_balance(balance);
        }
        Ok(self.credential_service.register(&registration)?.summary())
    }

    /// Verify credentials and issue a session
    pub fn login(&self, email: &str, password: &str) -> Result<IssuedSession> {
        let account = self.credential_service.verify(email, password)?;
        self.session_service.issue(account.id)
    }

    /// Revoke the presented session. Logging out twice is fine.
    pub fn logout(&self, token: Option<&str>) -> Result<()> {
        match token {
            Some(token) => self.session_service.revoke(token),
            None => Ok(()),
        }
    }

    /// Current balance of the session's account
    pub fn get_balance(&self, token: Option<&str>) -> Result<Decimal> {
        let account = self.session_service.validate(token)?;
        Ok(self.ledger_service.get_by_id(account.id)?.balance)
    }

    /// Send `amount` to `recipient_email`; returns the sender's new balance
    pub fn transfer(&self, token: Option<&str>, recipient_email: &str, amount: Decimal) -> Result<Decimal> {
        let account = self.session_service.validate(token)?;
        self.transfer_service.transfer(account.id, recipient_email, amount)
    }

    pub fn current_identity(&self, token: Option<&str>) -> Result<Identity> {
        self.session_service.identity(token)
    }

    /// Ledger-wide snapshot, for any authenticated caller
    pub fn snapshot(&self, token: Option<&str>) -> Result<Snapshot> {
        self.session_service.validate(token)?;
        self.snapshot_service.read()
    }

    pub fn diagnose(&self) -> Result<DiagnosticReport> {
        self.doctor_service.diagnose()
    }

    pub fn purge_expired_sessions(&self) -> Result<usize> {
        self.session_service.purge_expired()
    }

    /// Checkpoint and release the store.
    ///
    /// If other handles to the repository are still alive the store is
    /// released when the last one drops instead.
    pub fn close(self) -> Result<()> {
        let repository = self.repository;
        drop((
            self.credential_service,
            self.session_service,
            self.ledger_service,
            self.transfer_service,
            self.snapshot_service,
            self.doctor_service,
        ));
        match Arc::try_unwrap(repository) {
            Ok(repository) => repository.close(),
            Err(_) => {
                tracing::debug!("store still shared, skipping explicit close");
                Ok(())
            }
        }
    }
}
