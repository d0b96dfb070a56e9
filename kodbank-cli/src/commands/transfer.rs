//! Transfer command - send money to another account

use anyhow::Result;

use super::balance::BalanceView;
use super::{finish, get_context, parse_amount, read_token};
use crate::output::{self, Status};

pub fn run(recipient: &str, amount: &str, json: bool) -> Result<Status> {
    let amount = parse_amount(amount)?;
    let token = read_token()?;
    let ctx = get_context()?;

    let result = ctx
        .transfer(token.as_deref(), recipient, amount)
        .map(|balance| BalanceView { balance });

    let outcome = output::emit(result, json, |view| {
        output::success(&format!("Sent {} to {}", output::format_money(amount), recipient.trim()));
        println!("Balance: {}", output::format_money(view.balance));
    });
    finish(ctx, outcome)
}
