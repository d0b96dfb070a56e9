//! KodBank CLI - a small custodial ledger in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{balance, doctor, login, logout, register, sessions, snapshot, transfer, whoami};

/// KodBank - accounts, sessions and transfers
#[derive(Parser)]
#[command(name = "kb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Register {
        /// Display name
        #[arg(long)]
        name: String,
        /// Email address (also your transfer address)
        #[arg(long)]
        email: String,
        /// Opening balance
        #[arg(long)]
        initial_balance: Option<String>,
        /// Password (otherwise KODBANK_PASSWORD or a prompt)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log in and store the session token
    Login {
        /// Email address
        #[arg(long)]
        email: String,
        /// Password (otherwise KODBANK_PASSWORD or a prompt)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Revoke the stored session
    Logout,

    /// Show your balance
    Balance {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send money to another account
    Transfer {
        /// Recipient email
        recipient: String,
        /// Amount, e.g. 30.00
        amount: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show who the stored session belongs to
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show every account and session
    Snapshot {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run store health checks
    Doctor {
        /// Show verbose output
        #[arg(long, short)]
        verbose: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage sessions
    Sessions {
        #[command(subcommand)]
        command: sessions::SessionCommands,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(status) => status.into(),
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<output::Status> {
    match cli.command {
        Commands::Register { name, email, initial_balance, password, json } => {
            register::run(&name, &email, initial_balance.as_deref(), password, json)
        }
        Commands::Login { email, password, json } => login::run(&email, password, json),
        Commands::Logout => logout::run(),
        Commands::Balance { json } => balance::run(json),
        Commands::Transfer { recipient, amount, json } => transfer::run(&recipient, &amount, json),
        Commands::Whoami { json } => whoami::run(json),
        Commands::Snapshot { json } => snapshot::run(json),
        Commands::Doctor { verbose, json } => doctor::run(verbose, json),
        Commands::Sessions { command } => sessions::run(command),
    }
}
