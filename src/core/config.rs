//! Loading and saving `vault.toml`, and opening the file vault it describes.

use crate::constants;
use crate::core::paths::VaultPaths;
use crate::models::vault_config::VaultFile;
use crate::util::fs as vault_fs;
use crate::vault::{AccessGroups, FileVault};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub fn load(path: &Path) -> Result<VaultFile> {
    if !path.exists() {
        return Ok(VaultFile::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("read vault config {}", path.display()))?;
    let mut config: VaultFile = toml::from_str(&content)
        .with_context(|| format!("parse vault config {}", path.display()))?;
    if config.vault.version == 0 {
        config.vault.version = constants::VAULT_FORMAT_VERSION;
    }
    if config.vault.version > constants::VAULT_FORMAT_VERSION {
        bail!(
            "unsupported vault config version {} in {} (max {})",
            config.vault.version,
            path.display(),
            constants::VAULT_FORMAT_VERSION
        );
    }
    Ok(config)
}

pub fn save(path: &Path, config: &VaultFile) -> Result<()> {
    let content = toml::to_string_pretty(config).context("serialize vault config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    vault_fs::write_atomic(path, content.as_bytes(), constants::VAULT_TOML_MODE)
        .with_context(|| format!("write vault config {}", path.display()))?;
    Ok(())
}

/// Apply the config's items-path override to `paths`.
pub fn effective_paths(paths: &VaultPaths, config: &VaultFile) -> VaultPaths {
    match &config.vault.items_path {
        Some(items) => paths.clone().with_items_dir(PathBuf::from(items)),
        None => paths.clone(),
    }
}

/// Open the file vault rooted at `paths`, honoring `vault.toml`.
pub fn open_file_vault(paths: &VaultPaths) -> Result<FileVault> {
    let config = load(&paths.vault_toml)?;
    let paths = effective_paths(paths, &config);
    let groups = AccessGroups::new(config.access.groups.iter().cloned());
    tracing::debug!(vault = %paths, groups = groups.groups().len(), "opening file vault");
    FileVault::open(&paths, groups)
        .map_err(|status| anyhow::anyhow!("open items directory {}: {}", paths.items.display(), status))
}
