//! Error taxonomy surfaced to callers and the vault status code table.

use std::fmt;
use std::io;

/// Status code returned by a failing vault primitive.
///
/// Codes follow the keychain status numbering so that diagnostics read the
/// same regardless of which backend produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VaultStatus(i32);

impl VaultStatus {
    pub const IO: Self = Self(-36);
    pub const PARAM: Self = Self(-50);
    pub const NOT_AVAILABLE: Self = Self(-25291);
    pub const AUTH_FAILED: Self = Self(-25293);
    pub const DUPLICATE_ITEM: Self = Self(-25299);
    pub const ITEM_NOT_FOUND: Self = Self(-25300);
    pub const INTERACTION_NOT_ALLOWED: Self = Self(-25308);
    pub const DECODE: Self = Self(-26275);
    pub const MISSING_ENTITLEMENT: Self = Self(-34018);

    pub const fn from_code(code: i32) -> Self {
        Self(code)
    }

    pub const fn code(self) -> i32 {
        self.0
    }

    fn describe(self) -> &'static str {
        match self {
            Self::IO => "I/O error",
            Self::PARAM => "invalid parameter",
            Self::NOT_AVAILABLE => "no vault available",
            Self::AUTH_FAILED => "authorization failed",
            Self::DUPLICATE_ITEM => "duplicate item",
            Self::ITEM_NOT_FOUND => "item not found",
            Self::INTERACTION_NOT_ALLOWED => "interaction not allowed",
            Self::DECODE => "unable to decode item",
            Self::MISSING_ENTITLEMENT => "missing entitlement",
            _ => "unknown status",
        }
    }
}

impl fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.describe(), self.0)
    }
}

impl From<io::Error> for VaultStatus {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::ITEM_NOT_FOUND,
            io::ErrorKind::PermissionDenied => Self::AUTH_FAILED,
            io::ErrorKind::AlreadyExists => Self::DUPLICATE_ITEM,
            io::ErrorKind::InvalidData => Self::DECODE,
            _ => Self::IO,
        }
    }
}

/// Errors returned by identity construction and item store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeychainError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("item already exists")]
    AlreadyExists,

    #[error("item not found")]
    NotFound,

    #[error("permission denied for vault item or access group")]
    PermissionDenied,

    #[error("sharing group prefix unavailable")]
    Unavailable,

    #[error("vault error: {}", VaultStatus::from_code(*.0))]
    Underlying(i32),
}

impl From<VaultStatus> for KeychainError {
    fn from(status: VaultStatus) -> Self {
        match status {
            VaultStatus::DUPLICATE_ITEM => Self::AlreadyExists,
            VaultStatus::ITEM_NOT_FOUND => Self::NotFound,
            VaultStatus::AUTH_FAILED
            | VaultStatus::INTERACTION_NOT_ALLOWED
            | VaultStatus::MISSING_ENTITLEMENT => Self::PermissionDenied,
            other => Self::Underlying(other.code()),
        }
    }
}

pub type Result<T> = std::result::Result<T, KeychainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_table() {
        assert_eq!(
            KeychainError::from(VaultStatus::DUPLICATE_ITEM),
            KeychainError::AlreadyExists
        );
        assert_eq!(
            KeychainError::from(VaultStatus::ITEM_NOT_FOUND),
            KeychainError::NotFound
        );
        assert_eq!(
            KeychainError::from(VaultStatus::MISSING_ENTITLEMENT),
            KeychainError::PermissionDenied
        );
        assert_eq!(
            KeychainError::from(VaultStatus::AUTH_FAILED),
            KeychainError::PermissionDenied
        );
        assert_eq!(
            KeychainError::from(VaultStatus::INTERACTION_NOT_ALLOWED),
            KeychainError::PermissionDenied
        );
    }

    #[test]
    fn test_unmapped_status_passes_through() {
        assert_eq!(
            KeychainError::from(VaultStatus::from_code(-12345)),
            KeychainError::Underlying(-12345)
        );
        assert_eq!(
            KeychainError::from(VaultStatus::IO),
            KeychainError::Underlying(-36)
        );
    }

    #[test]
    fn test_io_error_mapping() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(VaultStatus::from(denied), VaultStatus::AUTH_FAILED);
        let other = io::Error::new(io::ErrorKind::Other, "boom");
        assert_eq!(VaultStatus::from(other), VaultStatus::IO);
    }

    #[test]
    fn test_underlying_display_names_status() {
        let msg = KeychainError::Underlying(-50).to_string();
        assert!(msg.contains("invalid parameter"));
        assert!(msg.contains("-50"));
    }
}
