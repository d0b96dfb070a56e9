//! CLI command implementations

pub mod balance;
pub mod doctor;
pub mod login;
pub mod logout;
pub mod register;
pub mod sessions;
pub mod snapshot;
pub mod transfer;
pub mod whoami;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use dialoguer::Password;
use kodbank_core::KodbankContext;
use rust_decimal::Decimal;

use crate::output::Status;

const TOKEN_FILE: &str = "session.token";

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("KODBANK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".kodbank"))
        .ok_or_else(|| anyhow!("Could not find home directory; set KODBANK_DIR"))
}

/// Get or create the KodBank context
pub fn get_context() -> Result<KodbankContext> {
    let data_dir = get_data_dir()?;

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
    tracing::debug!(data_dir = %data_dir.display(), "opening context");

    KodbankContext::new(&data_dir).context("Failed to initialize kodbank context")
}

/// Checkpoint and close the store, then hand back the command's outcome
pub fn finish(ctx: KodbankContext, outcome: Result<Status>) -> Result<Status> {
    let closed = ctx.close();
    let status = outcome?;
    closed.context("Failed to close store")?;
    Ok(status)
}

/// Session token saved by the last `kb login`, if any
pub fn read_token() -> Result<Option<String>> {
    let path = get_data_dir()?.join(TOKEN_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let token = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    let token = token.trim();
    Ok((!token.is_empty()).then(|| token.to_string()))
}

pub fn write_token(token: &str) -> Result<()> {
    let path = get_data_dir()?.join(TOKEN_FILE);
    std::fs::write(&path, token).with_context(|| format!("Failed to write {:?}", path))
}

pub fn clear_token() -> Result<()> {
    let path = get_data_dir()?.join(TOKEN_FILE);
    if path.exists() {
        std::fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
    }
    Ok(())
}

/// Get password from --password flag, KODBANK_PASSWORD env var, or prompt
pub fn get_password_or_prompt(password_flag: Option<String>, confirm: bool) -> Result<String> {
    if let Some(p) = password_flag {
        return Ok(p);
    }
    if let Ok(p) = std::env::var("KODBANK_PASSWORD") {
        return Ok(p);
    }

    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}

/// Parse a user supplied amount like `30`, `30.5` or `30.00`
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|_| anyhow!("Not an amount: {}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> KodbankContext {
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"tokenSecret": "cli-test-secret-0123456789", "passwordHashing": {"timeCost": 1, "memoryCost": 8, "parallelism": 1}}"#,
        )
        .unwrap();
        KodbankContext::new(dir.path()).unwrap()
    }

    #[test]
    fn test_finish_closes_store_and_keeps_status() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.register("Alice", "pw", "alice@example.com", Some(Decimal::new(500, 2)))
            .unwrap();
        assert_eq!(finish(ctx, Ok(Status::Failed)).unwrap(), Status::Failed);

        // The store was released, so it opens again with the data intact
        let ctx = context(&dir);
        let alice = ctx.ledger_service.get_by_email("alice@example.com").unwrap();
        assert_eq!(alice.balance, Decimal::new(500, 2));
        assert!(finish(ctx, Err(anyhow!("boom"))).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 30.5 ").unwrap(), Decimal::new(305, 1));
        assert!(parse_amount("thirty").is_err());
    }
}
