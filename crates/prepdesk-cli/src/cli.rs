//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "prepdesk", version, about = "Manage the local prepdesk session")]
pub struct Cli {
    /// Session storage directory (overrides config and PREPDESK_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print the resulting state as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the current session
    Status,

    /// Continue as a guest
    Guest {
        /// Display name (defaults to "Guest User")
        #[arg(long)]
        name: Option<String>,
    },

    /// Sign in with a local email account
    SignIn {
        #[arg(long)]
        email: String,
    },

    /// Create a local email account and sign in
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
    },

    /// Sign out and forget the stored session
    SignOut,

    /// Update the signed-in profile
    Update(UpdateArgs),

    /// Delete the session and all locally stored study data
    DeleteAccount {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Mark onboarding as completed
    Onboard,

    /// Show or change the configuration file
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, conflicts_with = "clear_email")]
    pub email: Option<String>,

    #[arg(long)]
    pub clear_email: bool,

    #[arg(long, conflicts_with = "clear_picture")]
    pub picture: Option<String>,

    #[arg(long)]
    pub clear_picture: bool,

    /// Extra profile field as KEY=VALUE; VALUE is parsed as JSON, falling
    /// back to a plain string
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, Value)>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Persist a session storage directory
    #[arg(long)]
    pub set_data_dir: Option<PathBuf>,

    /// Persist a log directory
    #[arg(long)]
    pub set_log_dir: Option<PathBuf>,
}

fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err("field name must not be empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(parse_field("year=2026").unwrap(), ("year".to_string(), json!(2026)));
        assert_eq!(
            parse_field("city=Pune").unwrap(),
            ("city".to_string(), json!("Pune"))
        );
        assert_eq!(
            parse_field("tags=[\"gs1\"]").unwrap(),
            ("tags".to_string(), json!(["gs1"]))
        );
        assert_eq!(parse_field("note=a=b").unwrap(), ("note".to_string(), json!("a=b")));
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn test_parse_update_args() {
        let cli = Cli::parse_from([
            "prepdesk",
            "update",
            "--name",
            "Asha",
            "--clear-picture",
            "--set",
            "year=2026",
            "--json",
        ]);
        assert!(cli.json);
        match cli.command {
            Command::Update(args) => {
                assert_eq!(args.name.as_deref(), Some("Asha"));
                assert!(args.clear_picture);
                assert_eq!(args.fields.len(), 1);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_email_conflicts_with_clear_email() {
        let result = Cli::try_parse_from([
            "prepdesk",
            "update",
            "--email",
            "a@b.com",
            "--clear-email",
        ]);
        assert!(result.is_err());
    }
}
