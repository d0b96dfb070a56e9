//! Whoami command - show the identity behind the stored session

use anyhow::Result;

use super::{finish, get_context, read_token};
use crate::output::{self, Status};

pub fn run(json: bool) -> Result<Status> {
    let token = read_token()?;
    let ctx = get_context()?;

    let outcome = output::emit(ctx.current_identity(token.as_deref()), json, |identity| {
        let mut table = output::create_table();
        table.add_row(vec!["Account", &identity.id.to_string()]);
        table.add_row(vec!["Name", &identity.name]);
        table.add_row(vec!["Email", &identity.email]);
        println!("{}", table);
    });
    finish(ctx, outcome)
}
