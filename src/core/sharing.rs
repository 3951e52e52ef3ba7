//! Sharing-group discovery.
//!
//! Platforms that prefix access groups with a signing team identifier echo
//! that prefix back on every item they store. Writing a throwaway item and
//! reading its assigned group is the only portable way to learn it. Vaults
//! without group-prefixing simply never report a group, and sharing is then
//! unavailable.

use crate::constants;
use crate::error::{KeychainError, Result, VaultStatus};
use crate::models::attributes::{Attribute, Attributes};
use crate::vault::SecureVault;
use std::sync::{Mutex, OnceLock, PoisonError};

/// Write/read rounds before giving up on a marker item that keeps vanishing.
const DISCOVERY_ATTEMPTS: usize = 2;

/// Outcome of one discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Discovery {
    Group(String),
    /// The vault refused the write or assigns no group; this does not change.
    NoGroup,
    /// The marker item could not be read back, e.g. because another context
    /// removed it mid-run.
    Inconclusive,
}

fn marker() -> Attributes {
    Attributes::new()
        .with(Attribute::Service, constants::DISCOVERY_SERVICE)
        .with(Attribute::Account, constants::DISCOVERY_ACCOUNT)
}

fn discover<V: SecureVault + ?Sized>(vault: &V) -> Discovery {
    let marker = marker();
    for attempt in 1..=DISCOVERY_ATTEMPTS {
        match vault.add(&marker.clone().with(Attribute::SecretData, Vec::<u8>::new())) {
            Ok(()) => {}
            // Left behind by an interrupted run, or owned by a concurrent one.
            Err(VaultStatus::DUPLICATE_ITEM) => {}
            Err(status) => {
                tracing::warn!(%status, "sharing group discovery write refused");
                return Discovery::NoGroup;
            }
        }

        let read_back = vault.query(&marker);

        match vault.delete(&marker) {
            Ok(()) | Err(VaultStatus::ITEM_NOT_FOUND) => {}
            Err(status) => tracing::warn!(%status, "could not delete sharing group marker item"),
        }

        match read_back {
            Ok(item) => {
                return match item.text(Attribute::AccessGroup) {
                    Some(group) => Discovery::Group(group.to_string()),
                    None => {
                        tracing::info!("vault reports no access group; sharing unavailable");
                        Discovery::NoGroup
                    }
                };
            }
            Err(VaultStatus::ITEM_NOT_FOUND) if attempt < DISCOVERY_ATTEMPTS => {
                tracing::debug!(attempt, "sharing group marker item vanished; retrying");
            }
            Err(status) => {
                tracing::warn!(%status, "sharing group discovery read failed");
                return Discovery::Inconclusive;
            }
        }
    }
    Discovery::Inconclusive
}

/// Write, read back, and delete a marker item to learn the group the vault
/// assigns to items stored without one.
///
/// Returns [`KeychainError::Unavailable`] whenever no group can be learned,
/// including when the marker write itself is refused.
pub fn discover_default_group<V: SecureVault + ?Sized>(vault: &V) -> Result<String> {
    match discover(vault) {
        Discovery::Group(group) => {
            tracing::info!(group = %group, "resolved default access group");
            Ok(group)
        }
        Discovery::NoGroup | Discovery::Inconclusive => Err(KeychainError::Unavailable),
    }
}

/// The team prefix of the vault's default group.
pub fn discover_sharing_prefix<V: SecureVault + ?Sized>(vault: &V) -> Result<String> {
    let group = discover_default_group(vault)?;
    prefix_of(&group)
        .map(str::to_string)
        .ok_or(KeychainError::Unavailable)
}

/// Leading component of a platform-assigned group such as
/// `ABCDE12345.com.example.app`.
pub fn prefix_of(group: &str) -> Option<&str> {
    let (prefix, rest) = group.split_once(constants::GROUP_SEPARATOR)?;
    if prefix.is_empty() || rest.is_empty() {
        return None;
    }
    Some(prefix)
}

/// Once-per-owner cache of the vault's default group.
///
/// A group, or the definite lack of one, is kept for the owner's lifetime.
/// An inconclusive run is not kept, so the next caller tries again.
#[derive(Debug, Default)]
pub struct DefaultGroup {
    resolved: OnceLock<Option<String>>,
    running: Mutex<()>,
}

impl DefaultGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached group, discovering it on first use. Concurrent first callers
    /// wait for a single run.
    pub fn get_or_discover<V: SecureVault + ?Sized>(&self, vault: &V) -> Result<&str> {
        if let Some(settled) = self.settled() {
            return settled;
        }
        let _running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(settled) = self.settled() {
            return settled;
        }
        match discover(vault) {
            Discovery::Group(group) => {
                tracing::info!(group = %group, "resolved default access group");
                self.resolved
                    .get_or_init(|| Some(group))
                    .as_deref()
                    .ok_or(KeychainError::Unavailable)
            }
            Discovery::NoGroup => {
                self.resolved.get_or_init(|| None);
                Err(KeychainError::Unavailable)
            }
            Discovery::Inconclusive => Err(KeychainError::Unavailable),
        }
    }

    /// Team prefix of the cached group.
    pub fn prefix_or_discover<V: SecureVault + ?Sized>(&self, vault: &V) -> Result<&str> {
        self.get_or_discover(vault)
            .and_then(|group| prefix_of(group).ok_or(KeychainError::Unavailable))
    }

    /// Cached result without running discovery; `None` if not settled yet.
    pub fn settled(&self) -> Option<Result<&str>> {
        self.resolved
            .get()
            .map(|group| group.as_deref().ok_or(KeychainError::Unavailable))
    }
}
