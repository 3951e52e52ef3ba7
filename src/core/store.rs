//! Insert / update / upsert / fetch / remove over one identity.
//!
//! Two record shapes share the same vault item: the account+password
//! convenience calls write the account key and the secret data attribute, and
//! the typed-field calls address the same attributes individually. Whichever
//! shape wrote an item, the other reads it back unchanged, because both go
//! through the one key `(identifier, group, account)`.

use crate::core::identity::ItemIdentity;
use crate::error::{KeychainError, Result, VaultStatus};
use crate::models::attributes::{Attribute, Attributes};
use crate::models::field::{FieldKind, ItemFields};
use crate::vault::SecureVault;
use std::fmt;
use zeroize::Zeroizing;

/// Outcome of an insert-or-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Outcome of a remove. Removing an absent item is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    AlreadyAbsent,
}

impl Removal {
    pub fn was_present(self) -> bool {
        matches!(self, Removal::Removed)
    }
}

/// An account and its password as read from the vault.
#[derive(Clone)]
pub struct Credential {
    pub account: String,
    pub password: Zeroizing<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Item operations bound to one vault and one identity.
pub struct ItemStore<'v, V: SecureVault + ?Sized> {
    vault: &'v V,
    identity: ItemIdentity,
}

impl<'v, V: SecureVault + ?Sized> ItemStore<'v, V> {
    /// Store addressing exactly `identity`. Prefer
    /// [`Keychain::store`](crate::Keychain::store), which binds an ungrouped
    /// identity to the vault's default group.
    pub fn new(vault: &'v V, identity: ItemIdentity) -> Self {
        Self { vault, identity }
    }

    pub fn identity(&self) -> &ItemIdentity {
        &self.identity
    }

    // ----- account + password -----

    /// Store a new password. Fails with `AlreadyExists` if the account is
    /// already present; the stored value is left untouched.
    pub fn insert(&self, account: &str, password: &str) -> Result<()> {
        self.insert_fields(account, &ItemFields::new().data(password.as_bytes()))
    }

    /// Replace the password of an existing account. Fails with `NotFound`
    /// rather than creating the item.
    pub fn update(&self, account: &str, password: &str) -> Result<()> {
        self.update_fields(account, &ItemFields::new().data(password.as_bytes()))
    }

    /// Insert, or update when the account already exists.
    pub fn insert_or_update(&self, account: &str, password: &str) -> Result<Upsert> {
        self.insert_or_update_fields(account, &ItemFields::new().data(password.as_bytes()))
    }

    /// Account and password of the item for `account`, or of the first item
    /// under this identity when no account is given.
    pub fn fetch(&self, account: Option<&str>) -> Result<Credential> {
        let item = self.fetch_item(account)?;
        let account = item.text(Attribute::Account).unwrap_or_default().to_string();
        let password = match item.get(Attribute::SecretData) {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map_err(|_| KeychainError::Underlying(VaultStatus::DECODE.code()))?,
            None => String::new(),
        };
        Ok(Credential {
            account,
            password: Zeroizing::new(password),
        })
    }

    pub fn password(&self, account: Option<&str>) -> Result<Zeroizing<String>> {
        Ok(self.fetch(account)?.password)
    }

    /// Account name of the item stored under this identity.
    pub fn account(&self) -> Result<Option<String>> {
        self.text_field(None, FieldKind::Account)
    }

    /// Delete the item for `account`, or every item under this identity when
    /// no account is given.
    pub fn remove(&self, account: Option<&str>) -> Result<Removal> {
        let query = self.identity.query(account);
        tracing::debug!(identity = %self.identity, account, "remove");
        match self.vault.delete(&query) {
            Ok(()) => Ok(Removal::Removed),
            Err(VaultStatus::ITEM_NOT_FOUND) => Ok(Removal::AlreadyAbsent),
            Err(status) => Err(status.into()),
        }
    }

    pub fn exists(&self, account: Option<&str>) -> Result<bool> {
        match self.fetch_item(account) {
            Ok(_) => Ok(true),
            Err(KeychainError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    // ----- typed fields -----

    /// Create the item for `account` with the supplied fields, in one write.
    pub fn insert_fields(&self, account: &str, fields: &ItemFields) -> Result<()> {
        let mut item = self.identity.key(account);
        item.merge(&fields.to_attributes());
        tracing::debug!(identity = %self.identity, account, "insert");
        self.vault.add(&item)?;
        Ok(())
    }

    /// Overwrite the supplied fields of an existing item, in one write.
    /// Fields not supplied keep their stored values.
    pub fn update_fields(&self, account: &str, fields: &ItemFields) -> Result<()> {
        tracing::debug!(identity = %self.identity, account, "update");
        self.vault
            .update(&self.identity.key(account), &fields.to_attributes())?;
        Ok(())
    }

    /// Insert, falling back to update only when the insert reports
    /// `AlreadyExists`. If the item vanishes between the two calls the
    /// update's `NotFound` is returned as is; there is no further retry.
    pub fn insert_or_update_fields(&self, account: &str, fields: &ItemFields) -> Result<Upsert> {
        match self.insert_fields(account, fields) {
            Ok(()) => Ok(Upsert::Inserted),
            Err(KeychainError::AlreadyExists) => {
                self.update_fields(account, fields)?;
                Ok(Upsert::Updated)
            }
            Err(err) => Err(err),
        }
    }

    /// Read exactly one field. `Err(NotFound)` when there is no item,
    /// `Ok(None)` when the item exists but the field was never set.
    pub fn field(&self, account: Option<&str>, kind: FieldKind) -> Result<Option<Zeroizing<Vec<u8>>>> {
        let item = self.fetch_item(account)?;
        Ok(item
            .get(kind.attribute())
            .map(|value| Zeroizing::new(value.to_vec())))
    }

    /// Overwrite exactly one field of an existing item. Setting
    /// [`FieldKind::Account`] moves the item to the new account key.
    pub fn set_field(&self, account: &str, kind: FieldKind, value: impl Into<Vec<u8>>) -> Result<()> {
        let changes = Attributes::new().with(kind.attribute(), value);
        tracing::debug!(identity = %self.identity, account, field = %kind, "set field");
        self.vault.update(&self.identity.key(account), &changes)?;
        Ok(())
    }

    pub fn label(&self, account: Option<&str>) -> Result<Option<String>> {
        self.text_field(account, FieldKind::Label)
    }

    pub fn set_label(&self, account: &str, label: &str) -> Result<()> {
        self.set_field(account, FieldKind::Label, label.as_bytes())
    }

    pub fn description(&self, account: Option<&str>) -> Result<Option<String>> {
        self.text_field(account, FieldKind::Description)
    }

    pub fn set_description(&self, account: &str, description: &str) -> Result<()> {
        self.set_field(account, FieldKind::Description, description.as_bytes())
    }

    fn text_field(&self, account: Option<&str>, kind: FieldKind) -> Result<Option<String>> {
        match self.field(account, kind)? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|_| KeychainError::Underlying(VaultStatus::DECODE.code())),
            None => Ok(None),
        }
    }

    fn fetch_item(&self, account: Option<&str>) -> Result<Attributes> {
        tracing::debug!(identity = %self.identity, account, "fetch");
        Ok(self.vault.query(&self.identity.query(account))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::MemoryVault;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store(vault: &MemoryVault) -> ItemStore<'_, MemoryVault> {
        ItemStore::new(vault, ItemIdentity::new("myapp.auth", None).unwrap())
    }

    #[test]
    fn test_insert_never_overwrites() {
        let vault = MemoryVault::new();
        let store = store(&vault);
        store.insert("alice", "pw1").unwrap();
        assert_eq!(store.insert("alice", "pw2"), Err(KeychainError::AlreadyExists));
        assert_eq!(store.password(Some("alice")).unwrap().as_str(), "pw1");
    }

    #[test]
    fn test_update_never_creates() {
        let vault = MemoryVault::new();
        let store = store(&vault);
        assert_eq!(store.update("alice", "pw"), Err(KeychainError::NotFound));
        assert!(vault.is_empty());
    }

    #[test]
    fn test_upsert_idempotent() {
        let vault = MemoryVault::new();
        let store = store(&vault);
        assert_eq!(store.insert_or_update("alice", "pw").unwrap(), Upsert::Inserted);
        assert_eq!(store.insert_or_update("alice", "pw").unwrap(), Upsert::Updated);
        assert_eq!(vault.len(), 1);
        assert_eq!(store.password(Some("alice")).unwrap().as_str(), "pw");
    }

    #[test]
    fn test_remove_twice() {
        let vault = MemoryVault::new();
        let store = store(&vault);
        store.insert("alice", "pw").unwrap();
        assert_eq!(store.remove(Some("alice")).unwrap(), Removal::Removed);
        assert_eq!(store.remove(Some("alice")).unwrap(), Removal::AlreadyAbsent);
        assert!(!store.exists(Some("alice")).unwrap());
    }

    #[test]
    fn test_remove_without_account_clears_identity() {
        let vault = MemoryVault::new();
        let store = store(&vault);
        store.insert("alice", "a").unwrap();
        store.insert("bob", "b").unwrap();
        let other = ItemStore::new(&vault, ItemIdentity::new("other", None).unwrap());
        other.insert("alice", "x").unwrap();

        assert_eq!(store.remove(None).unwrap(), Removal::Removed);
        assert_eq!(vault.len(), 1);
        assert!(other.exists(Some("alice")).unwrap());
    }

    #[test]
    fn test_label_update_keeps_secret() {
        let vault = MemoryVault::new();
        let store = store(&vault);
        store.insert("alice", "pw").unwrap();
        store.set_label("alice", "Work login").unwrap();
        assert_eq!(store.label(Some("alice")).unwrap().as_deref(), Some("Work login"));
        assert_eq!(store.password(Some("alice")).unwrap().as_str(), "pw");
    }

    #[test]
    fn test_field_unset_vs_missing_item() {
        let vault = MemoryVault::new();
        let store = store(&vault);
        assert_eq!(
            store.field(Some("alice"), FieldKind::Generic).unwrap_err(),
            KeychainError::NotFound
        );
        store.insert("alice", "pw").unwrap();
        assert!(store.field(Some("alice"), FieldKind::Generic).unwrap().is_none());
        assert!(store.description(Some("alice")).unwrap().is_none());
    }

    #[test]
    fn test_typed_insert_read_as_password() {
        let vault = MemoryVault::new();
        let store = store(&vault);
        store
            .insert_fields(
                "svc-account",
                &ItemFields::new()
                    .data("token")
                    .label("API token")
                    .generic(vec![1, 2, 3]),
            )
            .unwrap();
        let cred = store.fetch(None).unwrap();
        assert_eq!(cred.account, "svc-account");
        assert_eq!(cred.password.as_str(), "token");
        assert_eq!(store.account().unwrap().as_deref(), Some("svc-account"));
        let generic = store.field(None, FieldKind::Generic).unwrap().unwrap();
        assert_eq!(generic.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_update_fields_leaves_unsupplied() {
        let vault = MemoryVault::new();
        let store = store(&vault);
        store
            .insert_fields("alice", &ItemFields::new().data("pw").description("desc"))
            .unwrap();
        store
            .update_fields("alice", &ItemFields::new().label("label"))
            .unwrap();
        assert_eq!(store.description(Some("alice")).unwrap().as_deref(), Some("desc"));
        assert_eq!(store.label(Some("alice")).unwrap().as_deref(), Some("label"));
        assert_eq!(store.password(Some("alice")).unwrap().as_str(), "pw");
    }

    #[test]
    fn test_set_account_rekeys() {
        let vault = MemoryVault::new();
        let store = store(&vault);
        store.insert("alice", "pw").unwrap();
        store.set_field("alice", FieldKind::Account, "alicia").unwrap();
        assert!(!store.exists(Some("alice")).unwrap());
        assert_eq!(store.password(Some("alicia")).unwrap().as_str(), "pw");

        store.insert("bob", "pw").unwrap();
        assert_eq!(
            store.set_field("bob", FieldKind::Account, "alicia"),
            Err(KeychainError::AlreadyExists)
        );
    }

    #[test]
    fn test_credential_debug_redacts() {
        let cred = Credential {
            account: "alice".into(),
            password: Zeroizing::new("hunter2".into()),
        };
        let out = format!("{:?}", cred);
        assert!(out.contains("alice"));
        assert!(!out.contains("hunter2"));
    }

    /// Simulates another process removing the item between the failed
    /// insert and the fallback update.
    #[derive(Default)]
    struct RacingVault {
        adds: AtomicUsize,
        updates: AtomicUsize,
    }

    impl SecureVault for RacingVault {
        fn add(&self, _attributes: &Attributes) -> std::result::Result<(), VaultStatus> {
            self.adds.fetch_add(1, Ordering::SeqCst);
            Err(VaultStatus::DUPLICATE_ITEM)
        }

        fn query(&self, _query: &Attributes) -> std::result::Result<Attributes, VaultStatus> {
            Err(VaultStatus::ITEM_NOT_FOUND)
        }

        fn update(&self, _query: &Attributes, _changes: &Attributes) -> std::result::Result<(), VaultStatus> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Err(VaultStatus::ITEM_NOT_FOUND)
        }

        fn delete(&self, _query: &Attributes) -> std::result::Result<(), VaultStatus> {
            Err(VaultStatus::ITEM_NOT_FOUND)
        }
    }

    #[test]
    fn test_upsert_race_is_terminal_not_found() {
        let vault = RacingVault::default();
        let store = ItemStore::new(&vault, ItemIdentity::new("myapp.auth", None).unwrap());
        assert_eq!(
            store.insert_or_update("alice", "pw"),
            Err(KeychainError::NotFound)
        );
        assert_eq!(vault.adds.load(Ordering::SeqCst), 1);
        assert_eq!(vault.updates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_propagates_real_errors() {
        struct DeniedVault;
        impl SecureVault for DeniedVault {
            fn add(&self, _: &Attributes) -> std::result::Result<(), VaultStatus> {
                Err(VaultStatus::AUTH_FAILED)
            }
            fn query(&self, _: &Attributes) -> std::result::Result<Attributes, VaultStatus> {
                Err(VaultStatus::AUTH_FAILED)
            }
            fn update(&self, _: &Attributes, _: &Attributes) -> std::result::Result<(), VaultStatus> {
                Err(VaultStatus::AUTH_FAILED)
            }
            fn delete(&self, _: &Attributes) -> std::result::Result<(), VaultStatus> {
                Err(VaultStatus::IO)
            }
        }
        let store = ItemStore::new(&DeniedVault, ItemIdentity::new("myapp.auth", None).unwrap());
        assert_eq!(store.remove(None), Err(KeychainError::Underlying(-36)));
        assert_eq!(store.exists(None), Err(KeychainError::PermissionDenied));
    }
}
