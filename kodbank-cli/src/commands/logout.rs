//! Logout command

use anyhow::Result;

use super::{clear_token, finish, get_context, read_token};
use crate::output::{self, Status};

pub fn run() -> Result<Status> {
    let token = read_token()?;
    if token.is_none() {
        output::info("Not logged in");
        return Ok(Status::Success);
    }

    let ctx = get_context()?;
    let outcome = ctx
        .logout(token.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(|()| clear_token())
        .map(|()| {
            output::success("Logged out");
            Status::Success
        });
    finish(ctx, outcome)
}
