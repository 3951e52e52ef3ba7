//! Vault configuration file model (`vault.toml`).

use crate::constants;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultFile {
    #[serde(default)]
    pub vault: VaultSection,
    #[serde(default)]
    pub access: AccessSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSection {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Override for the items directory (defaults to `<root>/items`).
    #[serde(default)]
    pub items_path: Option<String>,
}

impl Default for VaultSection {
    fn default() -> Self {
        Self {
            version: default_version(),
            items_path: None,
        }
    }
}

/// Access groups this installation is entitled to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessSection {
    /// Full group names, e.g. `ABCDE12345.com.example.shared`. The first one
    /// is assigned to items written without an explicit group. Empty means
    /// the vault does not prefix groups and sharing is unavailable.
    #[serde(default)]
    pub groups: Vec<String>,
}

fn default_version() -> u32 {
    constants::VAULT_FORMAT_VERSION
}
