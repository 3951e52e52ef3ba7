//! The secure vault capability and its backends.
//!
//! A vault is an opaque attribute-keyed item store. The item store only ever
//! talks to it through the four primitives of [`SecureVault`]; anything that
//! provides them (a platform keychain binding, the file backend, the
//! in-memory backend) can sit underneath.

use crate::constants;
use crate::error::VaultStatus;
use crate::models::attributes::{Attribute, Attributes};

pub mod file;
pub mod memory;

pub use file::FileVault;
pub use memory::MemoryVault;

/// Primitive operations every vault backend provides.
///
/// Each call is atomic for a single item. `query` returns the first matching
/// item; `update` and `delete` act on every item matching the query.
pub trait SecureVault: Send + Sync {
    fn add(&self, attributes: &Attributes) -> Result<(), VaultStatus>;

    fn query(&self, query: &Attributes) -> Result<Attributes, VaultStatus>;

    fn update(&self, query: &Attributes, changes: &Attributes) -> Result<(), VaultStatus>;

    fn delete(&self, query: &Attributes) -> Result<(), VaultStatus>;
}

impl<V: SecureVault + ?Sized> SecureVault for &V {
    fn add(&self, attributes: &Attributes) -> Result<(), VaultStatus> {
        (**self).add(attributes)
    }

    fn query(&self, query: &Attributes) -> Result<Attributes, VaultStatus> {
        (**self).query(query)
    }

    fn update(&self, query: &Attributes, changes: &Attributes) -> Result<(), VaultStatus> {
        (**self).update(query, changes)
    }

    fn delete(&self, query: &Attributes) -> Result<(), VaultStatus> {
        (**self).delete(query)
    }
}

impl<V: SecureVault + ?Sized> SecureVault for std::sync::Arc<V> {
    fn add(&self, attributes: &Attributes) -> Result<(), VaultStatus> {
        (**self).add(attributes)
    }

    fn query(&self, query: &Attributes) -> Result<Attributes, VaultStatus> {
        (**self).query(query)
    }

    fn update(&self, query: &Attributes, changes: &Attributes) -> Result<(), VaultStatus> {
        (**self).update(query, changes)
    }

    fn delete(&self, query: &Attributes) -> Result<(), VaultStatus> {
        (**self).delete(query)
    }
}

/// Access groups a backend is entitled to, emulating platform group-prefixing.
///
/// The first group is the default assigned to items added without one. With
/// no groups, items carry no group and explicit groups are refused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessGroups {
    groups: Vec<String>,
}

impl AccessGroups {
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups
                .into_iter()
                .map(Into::into)
                .filter(|g: &String| !g.is_empty())
                .collect(),
        }
    }

    /// No group-prefixing; sharing is unavailable on such a vault.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn default_group(&self) -> Option<&str> {
        self.groups.first().map(String::as_str)
    }

    pub fn is_entitled(&self, group: &[u8]) -> bool {
        self.groups.iter().any(|g| g.as_bytes() == group)
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Fill in the default group, or reject a group this vault may not use.
    pub fn assign(&self, attributes: &mut Attributes) -> Result<(), VaultStatus> {
        match attributes.get(Attribute::AccessGroup) {
            Some(group) if !self.is_entitled(group) => Err(VaultStatus::MISSING_ENTITLEMENT),
            Some(_) => Ok(()),
            None => {
                if let Some(default) = self.default_group() {
                    attributes.set(Attribute::AccessGroup, default.as_bytes());
                }
                Ok(())
            }
        }
    }
}

/// Checks shared by all backends before an item is written.
pub fn validate_item(attributes: &Attributes) -> Result<(), VaultStatus> {
    match attributes.get(Attribute::Service) {
        Some(service) if !service.is_empty() => {}
        _ => return Err(VaultStatus::PARAM),
    }
    validate_changes(attributes)
}

/// Checks applied to the attribute changes of an update.
pub fn validate_changes(changes: &Attributes) -> Result<(), VaultStatus> {
    if let Some(secret) = changes.get(Attribute::SecretData) {
        if secret.len() > constants::MAX_SECRET_SIZE {
            return Err(VaultStatus::PARAM);
        }
    }
    if let Some(service) = changes.get(Attribute::Service) {
        if service.is_empty() {
            return Err(VaultStatus::PARAM);
        }
    }
    Ok(())
}
