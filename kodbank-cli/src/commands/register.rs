//! Register command - create a new account

use anyhow::Result;

use super::{finish, get_context, get_password_or_prompt, parse_amount};
use crate::output::{self, Status};

pub fn run(
    name: &str,
    email: &str,
    initial_balance: Option<&str>,
    password: Option<String>,
    json: bool,
) -> Result<Status> {
    let initial_balance = initial_balance.map(parse_amount).transpose()?;
    let password = get_password_or_prompt(password, true)?;

    let ctx = get_context()?;
    let result = ctx.register(name, &password, email, initial_balance);

    let outcome = output::emit(result, json, |account| {
        output::success(&format!(
            "Registered {} <{}> (account {}) with balance {}",
            account.name,
            account.email,
            account.id,
            output::format_money(account.balance)
        ));
    });
    finish(ctx, outcome)
}
