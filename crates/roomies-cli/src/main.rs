//! Roomies CLI - manage a shared household from the terminal.
//!
//! Thin front end over `roomies-core`: every command restores the saved
//! session, performs one or two API calls and prints the result.

mod commands;
mod format;

use std::io;
use std::sync::Arc;

use anyhow::{bail, Result};
use roomies_core::auth::{FileStore, KeyringStore, SessionStore};
use roomies_core::config::SessionStorage;
use roomies_core::{ApiClient, AuthService, Config};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: roomies <command> [args]

Account:
  login                           Sign in and remember the session
  logout                          Forget the saved session
  register                        Create a new account
  whoami                          Show the signed-in user and room

Room:
  room                            Show your room and invite code
  room create <name>              Create a room
  room join <invite code>         Join a room
  room leave                      Leave your room
  roommates                       List roommates

Chores:
  chores                          List chores (* = assigned to you)
  chore add <description> <start> <end> [--task] [--recurrence <r>]
  chore done <id>                 Mark a chore completed
  chore delete <id>               Delete a chore

Expenses:
  expenses                        Show the current period and balances
  expense add <title> <cost> [--description <text>]
  expense delete <id>
  expense close                   Close the current period

  notifications                   Show notifications addressed to you

Set RUST_LOG=debug for request logging, ROOMIES_API_URL to pick the backend.";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn session_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    Ok(match config.session_storage {
        SessionStorage::Keyring => Arc::new(KeyringStore::new()),
        SessionStorage::File => Arc::new(FileStore::new(Config::config_dir()?)),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };
    if matches!(command, "help" | "--help" | "-h") {
        println!("{}", USAGE);
        return Ok(());
    }
    let rest = &args[1..];

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });

    let api = ApiClient::from_config(&config)?;
    debug!(api_url = api.base_url(), "Roomies CLI starting");

    let auth = AuthService::new(api, session_store(&config)?);
    auth.restore();

    match command {
        "login" => commands::login(&auth, &mut config).await,
        "logout" => commands::logout(&auth),
        "register" => commands::register(&auth).await,
        "whoami" => commands::whoami(&auth).await,
        "room" => commands::room(&auth, rest).await,
        "roommates" => commands::roommates(&auth).await,
        "chores" => commands::chores(&auth).await,
        "chore" => commands::chore(&auth, rest).await,
        "expenses" => commands::expenses(&auth).await,
        "expense" => commands::expense(&auth, rest).await,
        "notifications" => commands::notifications(&auth).await,
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}
