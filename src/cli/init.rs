use crate::cli::CliContext;
use crate::constants;
use crate::core::config;
use crate::util::fs as vault_fs;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Entitled access group (repeatable; the first becomes the default)
    #[arg(long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,
}

pub fn run(ctx: &CliContext, args: InitArgs) -> Result<()> {
    let paths = &ctx.paths;
    let mut vault = config::load(&paths.vault_toml)?;
    for group in args.groups {
        if !vault.access.groups.contains(&group) {
            vault.access.groups.push(group);
        }
    }

    let effective = config::effective_paths(paths, &vault);
    vault_fs::ensure_dir(&effective.items, constants::ITEMS_DIR_MODE)
        .with_context(|| format!("create items directory {}", effective.items.display()))?;
    config::save(&paths.vault_toml, &vault)?;

    println!("vault initialized at {}", paths.root.display());
    match vault.access.groups.first() {
        Some(default) => println!("access groups: {} (default {})", vault.access.groups.len(), default),
        None => println!("access groups: none (sharing unavailable)"),
    }
    Ok(())
}
