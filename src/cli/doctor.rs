//! Diagnostics for vault layout and configuration.

use crate::cli::CliContext;
use crate::constants;
use crate::core::config;
use crate::core::file_lock::VaultLock;
use crate::core::sharing;
use crate::util::fs as vault_fs;
use crate::vault::{AccessGroups, FileVault};
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Also discover the vault's default group (writes and deletes one item)
    #[arg(long)]
    pub discover: bool,
}

pub fn run(ctx: &CliContext, args: DoctorArgs) -> Result<()> {
    let paths = &ctx.paths;
    let mut ok = 0u32;
    let mut warn = 0u32;
    let mut fail = 0u32;

    println!("Doctor: {}", paths);

    if paths.root.is_dir() {
        println!("  [PASS] vault root exists: {}", paths.root.display());
        ok += 1;
    } else {
        println!("  [FAIL] vault root missing: {} (run: vault-keychain init)", paths.root.display());
        fail += 1;
    }

    let vault_config = match config::load(&paths.vault_toml) {
        Ok(cfg) => {
            if paths.vault_toml.exists() {
                println!("  [PASS] vault.toml parsed");
                ok += 1;
            } else {
                println!("  [WARN] vault.toml missing; using defaults");
                warn += 1;
            }
            cfg
        }
        Err(e) => {
            println!("  [FAIL] vault.toml unreadable: {:#}", e);
            fail += 1;
            Default::default()
        }
    };
    let effective = config::effective_paths(paths, &vault_config);

    if effective.items.is_dir() {
        println!("  [PASS] items directory exists: {}", effective.items.display());
        ok += 1;
        match vault_fs::mode_of(&effective.items) {
            Ok(Some(mode)) if mode == constants::ITEMS_DIR_MODE => {
                println!("  [PASS] items directory mode ok: {:04o}", mode);
                ok += 1;
            }
            Ok(Some(mode)) => {
                println!(
                    "  [WARN] items directory mode: {:04o} (expected {:04o})",
                    mode,
                    constants::ITEMS_DIR_MODE
                );
                warn += 1;
            }
            Ok(None) => {}
            Err(e) => {
                println!("  [WARN] cannot stat items directory: {}", e);
                warn += 1;
            }
        }
    } else {
        println!("  [FAIL] items directory missing: {}", effective.items.display());
        fail += 1;
    }

    if paths.root.is_dir() {
        match VaultLock::try_exclusive(&paths.vault_lock) {
            Ok(Some(_)) => {
                println!("  [PASS] vault lock available");
                ok += 1;
            }
            Ok(None) => {
                println!("  [WARN] vault lock held by another process");
                warn += 1;
            }
            Err(e) => {
                println!("  [FAIL] cannot open vault lock {}: {}", paths.vault_lock.display(), e);
                fail += 1;
            }
        }
    }

    let groups = AccessGroups::new(vault_config.access.groups.iter().cloned());
    match groups.default_group() {
        Some(default) => {
            println!("  [PASS] access groups configured (default {})", default);
            ok += 1;
        }
        None => {
            println!("  [INFO] no access groups configured; sharing unavailable");
        }
    }

    if args.discover && effective.items.is_dir() {
        match FileVault::open(&effective, groups) {
            Ok(vault) => match sharing::discover_default_group(&vault) {
                Ok(group) => {
                    match sharing::prefix_of(&group) {
                        Some(prefix) => println!("  [PASS] default group {} (sharing prefix {})", group, prefix),
                        None => println!("  [PASS] default group {} (no sharing prefix)", group),
                    }
                    ok += 1;
                }
                Err(e) => {
                    println!("  [WARN] default group: {}", e);
                    warn += 1;
                }
            },
            Err(status) => {
                println!("  [FAIL] cannot open file vault: {}", status);
                fail += 1;
            }
        }
    }

    println!();
    println!("Doctor summary: {} pass, {} warn, {} fail", ok, warn, fail);
    if fail > 0 {
        std::process::exit(1);
    }
    Ok(())
}
