//! Balance command

use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{finish, get_context, read_token};
use crate::output::{self, Status};

#[derive(Serialize)]
pub struct BalanceView {
    pub balance: Decimal,
}

pub fn run(json: bool) -> Result<Status> {
    let token = read_token()?;
    let ctx = get_context()?;

    let result = ctx
        .get_balance(token.as_deref())
        .map(|balance| BalanceView { balance });

    let outcome = output::emit(result, json, |view| {
        println!("Balance: {}", output::format_money(view.balance));
    });
    finish(ctx, outcome)
}
