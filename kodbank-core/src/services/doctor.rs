//! Doctor service - store health checks

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;
use crate::ports::Clock;

const REQUIRED_TABLES: [&str; 3] = ["accounts", "sessions", "sys_migrations"];

/// Doctor service for health checks
pub struct DoctorService {
    repository: Arc<DuckDbRepository>,
    clock: Arc<dyn Clock>,
}

impl DoctorService {
    pub fn new(repository: Arc<DuckDbRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Run all health checks
    pub fn diagnose(&self) -> Result<DiagnosticReport> {
        let stats = self.repository.store_stats(self.clock.now())?;
        let mut checks = Vec::new();

        // Schema
        let missing: Vec<&str> = REQUIRED_TABLES
            .iter()
            .copied()
            .filter(|t| !stats.tables.iter().any(|have| have == t))
            .collect();
        checks.push(CheckResult {
            name: "schema".to_string(),
            status: if missing.is_empty() { "pass" } else { "error" }.to_string(),
            message: if missing.is_empty() {
                "All tables present".to_string()
            } else {
                format!("Missing table(s): {}", missing.join(", "))
            },
            details: if missing.is_empty() { None } else { Some(json!({ "missing": missing })) },
        });

        // Non-negative balances
        let negative = stats.negative_balance_count;
        checks.push(CheckResult {
            name: "negative_balances".to_string(),
            status: if negative == 0 { "pass" } else { "error" }.to_string(),
            message: if negative == 0 {
                "No negative balances".to_string()
            } else {
                format!("{} account(s) have a negative balance", negative)
            },
            details: None,
        });

        // Sessions whose account is gone
        let orphaned = stats.orphaned_session_count;
        checks.push(CheckResult {
            name: "orphaned_sessions".to_string(),
            status: if orphaned == 0 { "pass" } else { "error" }.to_string(),
            message: if orphaned == 0 {
                "No orphaned sessions found".to_string()
            } else {
                format!("{} session(s) reference missing accounts", orphaned)
            },
            details: None,
        });

        // Expired sessions are harmless until purged
        let expired = stats.expired_session_count;
        checks.push(CheckResult {
            name: "expired_sessions".to_string(),
            status: if expired == 0 { "pass" } else { "warning" }.to_string(),
            message: if expired == 0 {
                "No expired sessions".to_string()
            } else {
                format!("{} expired session(s) can be purged", expired)
            },
            details: None,
        });

        let passed = checks.iter().filter(|c| c.status == "pass").count() as i64;
        let warnings = checks.iter().filter(|c| c.status == "warning").count() as i64;
        let errors = checks.iter().filter(|c| c.status == "error").count() as i64;

        Ok(DiagnosticReport {
            tables: stats.tables,
            account_count: stats.account_count,
            session_count: stats.session_count,
            expired_session_count: stats.expired_session_count,
            total_balance: stats.total_balance,
            checks,
            summary: DoctorSummary { passed, warnings, errors },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DiagnosticReport {
    pub tables: Vec<String>,
    pub account_count: i64,
    pub session_count: i64,
    pub expired_session_count: i64,
    pub total_balance: Decimal,
    pub checks: Vec<CheckResult>,
    pub summary: DoctorSummary,
}

impl DiagnosticReport {
    pub fn is_healthy(&self) -> bool {
        self.summary.errors == 0
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::ports::ManualClock;
    use crate::services::test_support;

    #[test]
    fn test_healthy_store() {
        let repository = test_support::repository();
        test_support::account(&repository, "a@example.com", "100.00");
        test_support::account(&repository, "b@example.com", "50.00");

        let report = DoctorService::new(repository, Arc::new(ManualClock::default()))
            .diagnose()
            .unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.account_count, 2);
        assert_eq!(report.total_balance.to_string(), "150.00");
        assert_eq!(report.summary.passed, 4);
    }

    #[test]
    fn test_expired_sessions_warn() {
        let repository = test_support::repository();
        let clock = Arc::new(ManualClock::default());
        let a = test_support::account(&repository, "a@example.com", "1.00");
        let now = clock.now();
        repository
            .insert_session("t", a.id, now + Duration::seconds(30), now)
            .unwrap();
        clock.advance(Duration::minutes(1));

        let report = DoctorService::new(repository, clock.clone()).diagnose().unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.expired_session_count, 1);
        assert_eq!(report.summary.warnings, 1);
    }
}
