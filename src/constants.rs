//! Centralized constants for attribute names, the discovery marker, paths, and limits.

/// Default vault root directory.
pub const DEFAULT_VAULT_ROOT: &str = "/var/lib/vault-keychain";

/// Environment variable overriding the vault root.
pub const VAULT_ROOT_ENV: &str = "VAULT_KEYCHAIN_ROOT";

/// Vault attribute names, one per [`crate::models::attributes::Attribute`].
pub const ATTR_SERVICE: &str = "svce";
pub const ATTR_ACCESS_GROUP: &str = "agrp";
pub const ATTR_ACCOUNT: &str = "acct";
pub const ATTR_SECRET_DATA: &str = "v_Data";
pub const ATTR_LABEL: &str = "labl";
pub const ATTR_DESCRIPTION: &str = "desc";
pub const ATTR_GENERIC: &str = "gena";

/// Service and account of the throwaway item written by sharing-group discovery.
pub const DISCOVERY_SERVICE: &str = "bundleSeedID";
pub const DISCOVERY_ACCOUNT: &str = "bundleSeedID";

/// Separator between the sharing prefix and the rest of an access group.
pub const GROUP_SEPARATOR: char = '.';

/// Permission mode for the items directory.
pub const ITEMS_DIR_MODE: u32 = 0o700;

/// Permission mode for individual item files.
pub const ITEM_FILE_MODE: u32 = 0o600;

/// Permission mode for vault.toml.
pub const VAULT_TOML_MODE: u32 = 0o640;

/// Maximum secret size in bytes (1 MiB).
pub const MAX_SECRET_SIZE: usize = 1_048_576;

/// File extension for stored items.
pub const ITEM_EXTENSION: &str = ".item";

/// Current vault.toml format version.
pub const VAULT_FORMAT_VERSION: u32 = 1;
