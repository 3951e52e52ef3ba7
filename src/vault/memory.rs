//! Process-local vault backend.

use crate::error::VaultStatus;
use crate::models::attributes::{Attribute, Attributes};
use crate::vault::{validate_changes, validate_item, AccessGroups, SecureVault};
use std::sync::{Mutex, MutexGuard};

/// Vault held entirely in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryVault {
    groups: AccessGroups,
    items: Mutex<Vec<Attributes>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_access_groups(groups: AccessGroups) -> Self {
        Self {
            groups,
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.items().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn items(&self) -> Result<MutexGuard<'_, Vec<Attributes>>, VaultStatus> {
        self.items.lock().map_err(|_| VaultStatus::IO)
    }
}

impl SecureVault for MemoryVault {
    fn add(&self, attributes: &Attributes) -> Result<(), VaultStatus> {
        validate_item(attributes)?;
        let mut item = attributes.clone();
        self.groups.assign(&mut item)?;

        let mut items = self.items()?;
        let key = item.key();
        // Without a group the key is also taken by the same item in any group.
        let requested = (!attributes.contains(Attribute::AccessGroup)).then(|| attributes.key());
        let taken = items.iter().any(|existing| {
            existing.key() == key || requested.as_ref().is_some_and(|query| existing.matches(query))
        });
        if taken {
            return Err(VaultStatus::DUPLICATE_ITEM);
        }
        items.push(item);
        Ok(())
    }

    fn query(&self, query: &Attributes) -> Result<Attributes, VaultStatus> {
        let items = self.items()?;
        items
            .iter()
            .find(|item| item.matches(query))
            .cloned()
            .ok_or(VaultStatus::ITEM_NOT_FOUND)
    }

    fn update(&self, query: &Attributes, changes: &Attributes) -> Result<(), VaultStatus> {
        validate_changes(changes)?;
        if let Some(group) = changes.get(Attribute::AccessGroup) {
            if !self.groups.is_entitled(group) {
                return Err(VaultStatus::MISSING_ENTITLEMENT);
            }
        }

        let mut items = self.items()?;
        let targets: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.matches(query))
            .map(|(idx, _)| idx)
            .collect();
        if targets.is_empty() {
            return Err(VaultStatus::ITEM_NOT_FOUND);
        }

        let mut updated: Vec<(usize, Attributes)> = Vec::with_capacity(targets.len());
        for &idx in &targets {
            let mut item = items[idx].clone();
            item.merge(changes);
            let key = item.key();
            let collides = items
                .iter()
                .enumerate()
                .any(|(other, existing)| other != idx && existing.key() == key);
            let merged = updated.iter().any(|(_, planned)| planned.key() == key);
            if collides || merged {
                return Err(VaultStatus::DUPLICATE_ITEM);
            }
            updated.push((idx, item));
        }
        for (idx, item) in updated {
            items[idx] = item;
        }
        Ok(())
    }

    fn delete(&self, query: &Attributes) -> Result<(), VaultStatus> {
        let mut items = self.items()?;
        let before = items.len();
        items.retain(|item| !item.matches(query));
        if items.len() == before {
            return Err(VaultStatus::ITEM_NOT_FOUND);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(account: &str, secret: &str) -> Attributes {
        Attributes::new()
            .with(Attribute::Service, "svc")
            .with(Attribute::Account, account)
            .with(Attribute::SecretData, secret)
    }

    fn key(account: &str) -> Attributes {
        Attributes::new()
            .with(Attribute::Service, "svc")
            .with(Attribute::Account, account)
    }

    #[test]
    fn test_add_then_query() {
        let vault = MemoryVault::new();
        vault.add(&item("alice", "pw")).unwrap();
        let found = vault.query(&key("alice")).unwrap();
        assert_eq!(found.get(Attribute::SecretData), Some(&b"pw"[..]));
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let vault = MemoryVault::new();
        vault.add(&item("alice", "pw")).unwrap();
        assert_eq!(
            vault.add(&item("alice", "other")),
            Err(VaultStatus::DUPLICATE_ITEM)
        );
        assert_eq!(vault.len(), 1);
    }

    #[test]
    fn test_update_missing() {
        let vault = MemoryVault::new();
        let changes = Attributes::new().with(Attribute::Label, "x");
        assert_eq!(
            vault.update(&key("alice"), &changes),
            Err(VaultStatus::ITEM_NOT_FOUND)
        );
    }

    #[test]
    fn test_update_rekey_collision() {
        let vault = MemoryVault::new();
        vault.add(&item("alice", "a")).unwrap();
        vault.add(&item("bob", "b")).unwrap();
        let changes = Attributes::new().with(Attribute::Account, "bob");
        assert_eq!(
            vault.update(&key("alice"), &changes),
            Err(VaultStatus::DUPLICATE_ITEM)
        );
        assert!(vault.query(&key("alice")).is_ok());
    }

    #[test]
    fn test_update_two_items_onto_one_key() {
        let vault = MemoryVault::new();
        vault.add(&item("alice", "a")).unwrap();
        vault.add(&item("bob", "b")).unwrap();
        let changes = Attributes::new().with(Attribute::Account, "carol");
        assert_eq!(
            vault.update(&Attributes::new().with(Attribute::Service, "svc"), &changes),
            Err(VaultStatus::DUPLICATE_ITEM)
        );
        assert!(vault.query(&key("alice")).is_ok());
        assert!(vault.query(&key("bob")).is_ok());
    }

    #[test]
    fn test_add_without_group_sees_other_groups() {
        let vault = MemoryVault::with_access_groups(AccessGroups::new(["TEAM1.app", "TEAM1.shared"]));
        vault
            .add(&item("alice", "pw").with(Attribute::AccessGroup, "TEAM1.shared"))
            .unwrap();
        assert_eq!(
            vault.add(&item("alice", "mine")),
            Err(VaultStatus::DUPLICATE_ITEM)
        );
        vault
            .add(&item("alice", "mine").with(Attribute::AccessGroup, "TEAM1.app"))
            .unwrap();
        assert_eq!(vault.len(), 2);
    }

    #[test]
    fn test_delete_missing() {
        let vault = MemoryVault::new();
        assert_eq!(vault.delete(&key("alice")), Err(VaultStatus::ITEM_NOT_FOUND));
    }

    #[test]
    fn test_delete_all_under_service() {
        let vault = MemoryVault::new();
        vault.add(&item("alice", "a")).unwrap();
        vault.add(&item("bob", "b")).unwrap();
        vault
            .delete(&Attributes::new().with(Attribute::Service, "svc"))
            .unwrap();
        assert!(vault.is_empty());
    }

    #[test]
    fn test_default_group_assigned() {
        let vault = MemoryVault::with_access_groups(AccessGroups::new(["TEAM1.com.example.app"]));
        vault.add(&item("alice", "pw")).unwrap();
        let found = vault.query(&key("alice")).unwrap();
        assert_eq!(found.text(Attribute::AccessGroup), Some("TEAM1.com.example.app"));
    }
}
