//! Typed credential items over an attribute-keyed secure vault.
//!
//! Items are addressed by an identifier, an optional sharing group, and an
//! account. On top of the vault's add/query/update/delete primitives this
//! crate provides never-overwriting insert, never-creating update, idempotent
//! upsert, benign remove, and per-field reads and writes.
//!
//! ## Modules
//! - `core` — Identities, item store, sharing-group discovery, config
//! - `vault` — Vault capability trait and the memory/file backends
//! - `models` — Attribute vocabulary, field selector, config model
//! - `error` — Error kinds and the vault status code table
//! - `cli` — Command-line handlers
//! - `util` — Filesystem helpers

pub mod cli;
pub mod constants;
pub mod core;
pub mod error;
pub mod models;
pub mod util;
pub mod vault;

pub use crate::core::identity::ItemIdentity;
pub use crate::core::keychain::Keychain;
pub use crate::core::store::{Credential, ItemStore, Removal, Upsert};
pub use crate::error::{KeychainError, Result, VaultStatus};
pub use crate::models::field::{FieldKind, ItemFields};
pub use crate::vault::{AccessGroups, FileVault, MemoryVault, SecureVault};
