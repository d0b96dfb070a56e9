//! Login command - verify credentials and store the session token

use anyhow::Result;

use super::{finish, get_context, get_password_or_prompt, write_token};
use crate::output::{self, Status};

pub fn run(email: &str, password: Option<String>, json: bool) -> Result<Status> {
    let password = get_password_or_prompt(password, false)?;
    let ctx = get_context()?;

    let result = ctx.login(email, &password);
    let saved = match &result {
        Ok(session) => write_token(&session.token),
        Err(_) => Ok(()),
    };

    let outcome = saved.and_then(|()| {
        output::emit(result, json, |session| {
            output::success(&format!("Logged in as {}", session.identity.name));
            output::info(&format!(
                "Session expires at {}",
                session.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        })
    });
    finish(ctx, outcome)
}
