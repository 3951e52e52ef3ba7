//! Vault path resolution and directory structure.

use crate::constants;
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    pub root: PathBuf,
    pub items: PathBuf,
    pub vault_toml: PathBuf,
    pub vault_lock: PathBuf,
}

impl VaultPaths {
    /// Resolve vault paths from CLI arg, env var, or auto-detection.
    pub fn resolve(root_arg: Option<PathBuf>) -> Result<Self> {
        if let Some(root) = root_arg {
            return Ok(Self::from_root(root));
        }
        if let Ok(root) = env::var(constants::VAULT_ROOT_ENV) {
            if !root.trim().is_empty() {
                return Ok(Self::from_root(PathBuf::from(root)));
            }
        }
        if let Some(found) = find_vault_root()? {
            return Ok(Self::from_root(found));
        }
        Ok(Self::from_root(PathBuf::from(constants::DEFAULT_VAULT_ROOT)))
    }

    /// Create vault paths from a root directory.
    pub fn from_root(root: PathBuf) -> Self {
        let items = root.join("items");
        let vault_toml = root.join("vault.toml");
        let vault_lock = root.join("vault.lock");
        Self {
            root,
            items,
            vault_toml,
            vault_lock,
        }
    }

    /// Point the items directory somewhere other than `<root>/items`.
    pub fn with_items_dir(mut self, items: PathBuf) -> Self {
        self.items = if items.is_absolute() {
            items
        } else {
            self.root.join(items)
        };
        self
    }
}

fn find_vault_root() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir().context("resolve current directory")?;
    for ancestor in cwd.ancestors() {
        if looks_like_root(ancestor) {
            return Ok(Some(ancestor.to_path_buf()));
        }
    }
    Ok(None)
}

fn looks_like_root(path: &Path) -> bool {
    path.join("items").is_dir() && path.join("vault.toml").is_file()
}

impl std::fmt::Display for VaultPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vault@{}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_root() {
        let paths = VaultPaths::from_root(PathBuf::from("/test"));
        assert_eq!(paths.root, PathBuf::from("/test"));
        assert_eq!(paths.items, PathBuf::from("/test/items"));
        assert_eq!(paths.vault_toml, PathBuf::from("/test/vault.toml"));
        assert_eq!(paths.vault_lock, PathBuf::from("/test/vault.lock"));
    }

    #[test]
    fn test_items_override_relative_to_root() {
        let paths = VaultPaths::from_root(PathBuf::from("/test"))
            .with_items_dir(PathBuf::from("secrets"));
        assert_eq!(paths.items, PathBuf::from("/test/secrets"));

        let paths = VaultPaths::from_root(PathBuf::from("/test"))
            .with_items_dir(PathBuf::from("/srv/items"));
        assert_eq!(paths.items, PathBuf::from("/srv/items"));
    }

    #[test]
    fn test_explicit_root_wins() {
        let paths = VaultPaths::resolve(Some(PathBuf::from("/explicit"))).unwrap();
        assert_eq!(paths.root, PathBuf::from("/explicit"));
    }

    #[test]
    fn test_display() {
        let paths = VaultPaths::from_root(PathBuf::from("/test"));
        assert_eq!(paths.to_string(), "vault@/test");
    }
}
