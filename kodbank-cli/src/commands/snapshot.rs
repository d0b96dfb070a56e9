//! Snapshot command - every account and session at one instant

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color};

use super::{finish, get_context, read_token};
use crate::output::{self, Status};

pub fn run(json: bool) -> Result<Status> {
    let token = read_token()?;
    let ctx = get_context()?;

    let outcome = output::emit(ctx.snapshot(token.as_deref()), json, |snapshot| {
        println!("{}", "Accounts".bold());
        let mut accounts = output::create_table();
        accounts.set_header(vec!["ID", "Name", "Email", "Balance"]);
        for account in &snapshot.accounts {
            accounts.add_row(vec![
                Cell::new(account.id),
                Cell::new(&account.name),
                Cell::new(&account.email),
                Cell::new(output::format_money(account.balance)),
            ]);
        }
        println!("{}", accounts);
        println!("Total balance: {}", output::format_money(snapshot.total_balance));
        println!();

        println!("{}", "Sessions".bold());
        if snapshot.sessions.is_empty() {
            println!("  (none)");
            return;
        }
        let mut sessions = output::create_table();
        sessions.set_header(vec!["ID", "Account", "Token", "Expires"]);
        for session in &snapshot.sessions {
            let expires = session.expires_at.format("%Y-%m-%d %H:%M:%S").to_string();
            sessions.add_row(vec![
                Cell::new(session.id),
                Cell::new(session.account_id),
                Cell::new(&session.token_fingerprint),
                if session.expired {
                    Cell::new(format!("{} (expired)", expires)).fg(Color::Yellow)
                } else {
                    Cell::new(expires)
                },
            ]);
        }
        println!("{}", sessions);
    });
    finish(ctx, outcome)
}
