//! Composite key addressing items in the vault.

use crate::error::{KeychainError, Result};
use crate::models::attributes::{Attribute, Attributes};
use std::fmt;

/// Identifier plus optional sharing group; together with an account this
/// names exactly one vault item.
///
/// Immutable once built. Two identities that compare equal address the same
/// vault slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemIdentity {
    identifier: String,
    access_group: Option<String>,
}

impl ItemIdentity {
    /// An empty access group is treated as no group.
    pub fn new(identifier: &str, access_group: Option<&str>) -> Result<Self> {
        if identifier.is_empty() {
            return Err(KeychainError::InvalidIdentifier(
                "identifier cannot be empty".into(),
            ));
        }
        Ok(Self {
            identifier: identifier.to_string(),
            access_group: access_group
                .filter(|group| !group.is_empty())
                .map(str::to_string),
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn access_group(&self) -> Option<&str> {
        self.access_group.as_deref()
    }

    /// This identity in `group` if it has none yet; an explicit group wins.
    pub fn with_default_group(mut self, group: &str) -> Self {
        if self.access_group.is_none() && !group.is_empty() {
            self.access_group = Some(group.to_string());
        }
        self
    }

    /// Match query for every item under this identity, across accounts.
    pub fn base_query(&self) -> Attributes {
        let mut query = Attributes::new().with(Attribute::Service, self.identifier.as_bytes());
        if let Some(group) = &self.access_group {
            query.set(Attribute::AccessGroup, group.as_bytes());
        }
        query
    }

    /// Full key of the item for `account`.
    pub fn key(&self, account: &str) -> Attributes {
        self.base_query().with(Attribute::Account, account.as_bytes())
    }

    /// Key when the account is given, otherwise the identity-wide query.
    pub fn query(&self, account: Option<&str>) -> Attributes {
        match account {
            Some(account) => self.key(account),
            None => self.base_query(),
        }
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.access_group {
            Some(group) => write!(f, "{}@{}", self.identifier, group),
            None => f.write_str(&self.identifier),
        }
    }
}
