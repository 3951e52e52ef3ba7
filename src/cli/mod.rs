//! CLI routing and command dispatch.
//!
//! A thin operator surface over the file-backed vault. Every command maps to
//! one item store operation.

use crate::core::config;
use crate::core::identity::ItemIdentity;
use crate::core::keychain::Keychain;
use crate::core::paths::VaultPaths;
use crate::vault::FileVault;
use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub mod doctor;
pub mod init;
pub mod item;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub paths: VaultPaths,
    pub non_interactive: bool,
}

impl CliContext {
    /// Open the file vault under the resolved root.
    pub fn keychain(&self) -> Result<Keychain<FileVault>> {
        let vault = config::open_file_vault(&self.paths)?;
        Ok(Keychain::new(vault))
    }
}

/// Which identity a command addresses.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Item identifier (service)
    #[arg(value_parser = parse_identifier)]
    pub identifier: String,

    /// Explicit access group
    #[arg(long, value_name = "GROUP", conflicts_with = "shared")]
    pub group: Option<String>,

    /// Access group suffix under the discovered sharing prefix
    #[arg(long, value_name = "SUFFIX")]
    pub shared: Option<String>,
}

impl TargetArgs {
    pub fn resolve(&self, keychain: &Keychain<FileVault>) -> Result<ItemIdentity> {
        let identity = match &self.shared {
            Some(suffix) => keychain
                .shared_identity(&self.identifier, suffix)
                .with_context(|| format!("resolve shared group '{}'", suffix))?,
            None => keychain.identity(&self.identifier, self.group.as_deref())?,
        };
        Ok(identity)
    }
}

fn parse_identifier(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("identifier cannot be empty".into());
    }
    if s.chars().any(char::is_control) {
        return Err("control characters not allowed".into());
    }
    Ok(s.to_string())
}

#[derive(Parser, Debug)]
#[command(name = "vault-keychain", version, about = "Typed credential items over a file-backed vault")]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Run in non-interactive mode (no prompts, suitable for automation)
    #[arg(long, global = true, env = "VAULT_KEYCHAIN_NON_INTERACTIVE")]
    pub non_interactive: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        init_tracing(self.verbose);
        let paths = VaultPaths::resolve(self.root)?;
        tracing::debug!(vault = %paths, command = self.command.name(), "dispatch");

        let ctx = CliContext {
            paths,
            non_interactive: self.non_interactive,
        };

        match self.command {
            Commands::Init(args) => init::run(&ctx, args),
            Commands::Insert(args) => item::run_insert(&ctx, args),
            Commands::Update(args) => item::run_update(&ctx, args),
            Commands::Upsert(args) => item::run_upsert(&ctx, args),
            Commands::Get(args) => item::run_get(&ctx, args),
            Commands::Field(args) => item::run_field(&ctx, args),
            Commands::SetField(args) => item::run_set_field(&ctx, args),
            Commands::Describe(args) => item::run_describe(&ctx, args),
            Commands::Remove(args) => item::run_remove(&ctx, args),
            Commands::Prefix => item::run_prefix(&ctx),
            Commands::Doctor(args) => doctor::run(&ctx, args),
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the vault directory and config
    Init(init::InitArgs),
    /// Insert a new item (fails if it exists)
    Insert(item::WriteArgs),
    /// Update an existing item (fails if it is missing)
    Update(item::WriteArgs),
    /// Insert or update an item
    Upsert(item::WriteArgs),
    /// Output an item's password
    Get(item::GetArgs),
    /// Output a single field of an item
    Field(item::FieldArgs),
    /// Overwrite a single field of an item
    SetField(item::SetFieldArgs),
    /// Show an item's fields (secret redacted)
    Describe(item::DescribeArgs),
    /// Remove an item, or every item under an identifier
    Remove(item::RemoveArgs),
    /// Discover the sharing group prefix
    Prefix,
    /// Diagnose vault layout and configuration (safe, read-only)
    Doctor(doctor::DoctorArgs),
}

impl Commands {
    /// Command name for logs and error messages.
    pub fn name(&self) -> &str {
        match self {
            Commands::Init(_) => "init",
            Commands::Insert(_) => "insert",
            Commands::Update(_) => "update",
            Commands::Upsert(_) => "upsert",
            Commands::Get(_) => "get",
            Commands::Field(_) => "field",
            Commands::SetField(_) => "set-field",
            Commands::Describe(_) => "describe",
            Commands::Remove(_) => "remove",
            Commands::Prefix => "prefix",
            Commands::Doctor(_) => "doctor",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_identifier() {
        assert!(parse_identifier("myapp.auth").is_ok());
        assert!(parse_identifier("").is_err());
        assert!(parse_identifier("  ").is_err());
        assert!(parse_identifier("bad\nname").is_err());
    }

    #[test]
    fn test_group_and_shared_conflict() {
        let parsed = Cli::try_parse_from([
            "vault-keychain",
            "get",
            "myapp.auth",
            "--group",
            "TEAM1.app",
            "--shared",
            "app",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_parse_upsert() {
        let cli = Cli::try_parse_from([
            "vault-keychain",
            "--root",
            "/tmp/v",
            "upsert",
            "myapp.auth",
            "alice",
            "--from-stdin",
            "--label",
            "Work",
        ])
        .unwrap();
        assert_eq!(cli.command.name(), "upsert");
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/v")));
    }
}
