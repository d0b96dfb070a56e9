//! Doctor command - run store health checks

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use kodbank_core::DiagnosticReport;

use super::{finish, get_context};
use crate::output::{self, Status};

pub fn run(verbose: bool, json: bool) -> Result<Status> {
    let ctx = get_context()?;
    let outcome = ctx
        .diagnose()
        .map_err(anyhow::Error::from)
        .and_then(|report| render(&report, verbose, json));
    finish(ctx, outcome)
}

fn render(result: &DiagnosticReport, verbose: bool, json: bool) -> Result<Status> {
    let status = if result.is_healthy() { Status::Success } else { Status::Failed };

    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(status);
    }

    println!("{}", "Store Health Check".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Check", "Status", "Message"]);

    for check in &result.checks {
        let status_cell = match check.status.as_str() {
            "pass" => Cell::new("PASS").fg(Color::Green),
            "warning" => Cell::new("WARN").fg(Color::Yellow),
            "error" => Cell::new("ERROR").fg(Color::Red),
            _ => Cell::new(&check.status),
        };

        table.add_row(vec![Cell::new(&check.name), status_cell, Cell::new(&check.message)]);

        if verbose {
            if let Some(details) = &check.details {
                table.add_row(vec![
                    Cell::new(""),
                    Cell::new(""),
                    Cell::new(format!("  - {}", details)),
                ]);
            }
        }
    }

    println!("{}", table);
    println!();

    if verbose {
        println!("Tables: {}", result.tables.join(", "));
    }
    println!(
        "Accounts: {}  Sessions: {} ({} expired)  Total balance: {}",
        result.account_count,
        result.session_count,
        result.expired_session_count,
        output::format_money(result.total_balance),
    );
    println!(
        "Summary: {} passed, {} warnings, {} errors",
        result.summary.passed.to_string().green(),
        result.summary.warnings.to_string().yellow(),
        result.summary.errors.to_string().red(),
    );

    Ok(status)
}
