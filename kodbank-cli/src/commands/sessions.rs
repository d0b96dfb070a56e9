//! Sessions command - session maintenance

use anyhow::Result;
use clap::Subcommand;

use super::{finish, get_context};
use crate::output::{self, Status};

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Delete every expired session
    Purge {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: SessionCommands) -> Result<Status> {
    match command {
        SessionCommands::Purge { json } => {
            let ctx = get_context()?;
            let outcome = output::emit(ctx.purge_expired_sessions(), json, |purged| match purged {
                0 => output::info("No expired sessions"),
                n => output::success(&format!("Purged {} expired session(s)", n)),
            });
            finish(ctx, outcome)
        }
    }
}
