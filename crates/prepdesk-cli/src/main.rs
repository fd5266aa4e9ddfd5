//! prepdesk - command-line front end for the local session store.
//!
//! Each invocation restores the stored session, runs one lifecycle command
//! against it and prints the resulting state.

mod cli;

use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use prepdesk_core::{Config, FileStore, KeyValueStore, SessionPatch, SessionState, SessionStore};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command, ConfigArgs, UpdateArgs};

// ============================================================================
// Constants
// ============================================================================

/// Environment variable holding the password for sign-in/sign-up.
/// Prompted for without echo when unset.
const PASSWORD_ENV: &str = "PREPDESK_PASSWORD";

/// File name prefix for rolled log files
const LOG_FILE_PREFIX: &str = "prepdesk.log";

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
/// The returned guard must be held until exit so buffered file logs flush.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = log_dir.and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .build(dir)
            .map_err(|e| eprintln!("Log directory {} unusable: {}", dir.display(), e))
            .ok()
    });

    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let _log_guard = init_tracing(config.log_dir.as_deref());
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    debug!(?config, "Config loaded");

    if let Command::Config(args) = cli.command {
        return run_config(config, args);
    }

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => config.data_dir()?,
    };
    let store = FileStore::open(&data_dir)
        .await
        .with_context(|| format!("Failed to open session storage at {}", data_dir.display()))?;

    let mut sessions = SessionStore::new(store);
    sessions.restore_session().await;

    run_command(&mut sessions, cli.command).await?;
    print_state(&sessions.state(), cli.json)
}

async fn run_command<S: KeyValueStore>(
    sessions: &mut SessionStore<S>,
    command: Command,
) -> Result<()> {
    match command {
        Command::Status => {}
        Command::Guest { name } => {
            sessions
                .sign_in_as_guest(name.as_deref())
                .await
                .context("Failed to start guest session")?;
        }
        Command::SignIn { email } => {
            let password = read_password()?;
            sessions
                .sign_in_with_email(&email, &password)
                .await
                .context("Failed to sign in")?;
        }
        Command::SignUp { email, name } => {
            let password = read_password()?;
            sessions
                .sign_up_with_email(&email, &password, name.as_deref())
                .await
                .context("Failed to sign up")?;
        }
        Command::SignOut => sessions.sign_out().await,
        Command::Update(args) => {
            let patch = build_patch(args);
            if patch.is_empty() {
                bail!("Nothing to update. Pass at least one field.");
            }
            sessions
                .update_user(patch)
                .await
                .context("Failed to update profile")?;
        }
        Command::DeleteAccount { yes } => {
            if !yes {
                bail!("Refusing to delete account data without --yes");
            }
            sessions
                .delete_account()
                .await
                .context("Failed to delete account")?;
            info!("Account data deleted");
        }
        Command::Onboard => sessions.complete_onboarding().await,
        // Handled before storage is opened
        Command::Config(_) => {}
    }
    Ok(())
}

fn build_patch(args: UpdateArgs) -> SessionPatch {
    let mut patch = SessionPatch::new();
    for (key, value) in args.fields {
        patch = patch.field(key, value);
    }
    if let Some(name) = args.name {
        patch = patch.name(name);
    }
    if args.clear_email {
        patch = patch.email(None);
    } else if let Some(email) = args.email {
        patch = patch.email(Some(email));
    }
    if args.clear_picture {
        patch = patch.picture(None);
    } else if let Some(picture) = args.picture {
        patch = patch.picture(Some(picture));
    }
    patch
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

fn run_config(mut config: Config, args: ConfigArgs) -> Result<()> {
    let mut changed = false;
    if let Some(dir) = args.set_data_dir {
        config.data_dir = Some(dir);
        changed = true;
    }
    if let Some(dir) = args.set_log_dir {
        config.log_dir = Some(dir);
        changed = true;
    }
    if changed {
        config.save().context("Failed to save config")?;
        info!("Config saved");
    }

    println!("Config file: {}", Config::config_path()?.display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn print_state(state: &SessionState, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }

    match &state.session {
        Some(session) => {
            let kind = if state.is_guest_mode() { "guest" } else { "signed in" };
            println!("{} ({})", session.name, kind);
            println!("  id:        {}", session.id);
            if let Some(ref email) = session.email {
                println!("  email:     {}", email);
            }
            println!("  provider:  {}", session.provider);
            println!("  since:     {}", session.signed_in_at.format("%b %d, %Y %H:%M UTC"));
        }
        None => println!("Not signed in"),
    }
    if state.is_first_launch {
        println!("Onboarding not completed");
    }
    Ok(())
}
