//! Output formatting utilities

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use kodbank_core::OperationResult;
use rust_decimal::Decimal;
use serde::Serialize;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// How a command finished once its output has been printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failed,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Failed => ExitCode::FAILURE,
        }
    }
}

/// Print `result` either as an `OperationResult` JSON document or through `render`.
///
/// In JSON mode a failure is still printed as JSON and reported as `Status::Failed`.
pub fn emit<T: Serialize>(
    result: kodbank_core::domain::result::Result<T>,
    json: bool,
    render: impl FnOnce(&T),
) -> Result<Status> {
    if json {
        let failed = result.is_err();
        println!("{}", serde_json::to_string_pretty(&OperationResult::from(result))?);
        return Ok(if failed { Status::Failed } else { Status::Success });
    }

    let value = result?;
    render(&value);
    Ok(Status::Success)
}
