//! Long-lived context owning a vault and its default-group cache.

use crate::constants;
use crate::core::identity::ItemIdentity;
use crate::core::sharing::DefaultGroup;
use crate::core::store::ItemStore;
use crate::error::Result;
use crate::vault::SecureVault;

/// Entry point for callers: builds identities and item stores over one vault.
///
/// The vault's default group, and with it the sharing prefix, is discovered
/// at most once per `Keychain`, on first use.
#[derive(Debug)]
pub struct Keychain<V> {
    vault: V,
    default_group: DefaultGroup,
}

impl<V: SecureVault> Keychain<V> {
    pub fn new(vault: V) -> Self {
        Self {
            vault,
            default_group: DefaultGroup::new(),
        }
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    pub fn identity(&self, identifier: &str, access_group: Option<&str>) -> Result<ItemIdentity> {
        ItemIdentity::new(identifier, access_group)
    }

    /// Identity in the group `<prefix>.<group_suffix>`, where the prefix is
    /// discovered from the vault. Fails with `Unavailable` when the vault
    /// does not prefix groups.
    pub fn shared_identity(&self, identifier: &str, group_suffix: &str) -> Result<ItemIdentity> {
        let group = self.shared_group(group_suffix)?;
        ItemIdentity::new(identifier, Some(&group))
    }

    /// Full access-group name for `group_suffix` under the discovered prefix.
    pub fn shared_group(&self, group_suffix: &str) -> Result<String> {
        let prefix = self.sharing_prefix()?;
        Ok(format!("{}{}{}", prefix, constants::GROUP_SEPARATOR, group_suffix))
    }

    pub fn sharing_prefix(&self) -> Result<&str> {
        self.default_group.prefix_or_discover(&self.vault)
    }

    /// Group the vault assigns to items stored without one.
    pub fn default_group(&self) -> Result<&str> {
        self.default_group.get_or_discover(&self.vault)
    }

    /// Store for `identity`. An identity without a group is bound to the
    /// vault's default group, so it addresses the same single slot the vault
    /// writes to; on a vault without groups it stays ungrouped.
    pub fn store(&self, identity: ItemIdentity) -> ItemStore<'_, V> {
        let identity = if identity.access_group().is_none() {
            match self.default_group() {
                Ok(group) => identity.with_default_group(group),
                Err(_) => identity,
            }
        } else {
            identity
        };
        ItemStore::new(&self.vault, identity)
    }
}
