//! Attribute vocabulary understood by every vault backend.

use crate::constants;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Logical namespace of the item; the identity's identifier.
    Service,
    AccessGroup,
    /// Per-item discriminator within a service.
    Account,
    SecretData,
    Label,
    Description,
    Generic,
}

impl Attribute {
    pub const ALL: [Attribute; 7] = [
        Attribute::Service,
        Attribute::AccessGroup,
        Attribute::Account,
        Attribute::SecretData,
        Attribute::Label,
        Attribute::Description,
        Attribute::Generic,
    ];

    /// Stable vault attribute name.
    pub const fn name(self) -> &'static str {
        match self {
            Attribute::Service => constants::ATTR_SERVICE,
            Attribute::AccessGroup => constants::ATTR_ACCESS_GROUP,
            Attribute::Account => constants::ATTR_ACCOUNT,
            Attribute::SecretData => constants::ATTR_SECRET_DATA,
            Attribute::Label => constants::ATTR_LABEL,
            Attribute::Description => constants::ATTR_DESCRIPTION,
            Attribute::Generic => constants::ATTR_GENERIC,
        }
    }

    /// Attributes that together form an item's primary key.
    pub const fn is_key(self) -> bool {
        matches!(
            self,
            Attribute::Service | Attribute::AccessGroup | Attribute::Account
        )
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attribute set used both as a match query and as item contents.
///
/// Text attributes hold UTF-8. All values are wiped on drop.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    values: BTreeMap<Attribute, Vec<u8>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attr: Attribute, value: impl Into<Vec<u8>>) -> Self {
        self.set(attr, value);
        self
    }

    pub fn set(&mut self, attr: Attribute, value: impl Into<Vec<u8>>) {
        if let Some(mut old) = self.values.insert(attr, value.into()) {
            old.zeroize();
        }
    }

    pub fn get(&self, attr: Attribute) -> Option<&[u8]> {
        self.values.get(&attr).map(Vec::as_slice)
    }

    /// Text value of an attribute; `None` if unset or not UTF-8.
    pub fn text(&self, attr: Attribute) -> Option<&str> {
        self.get(attr).and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn contains(&self, attr: Attribute) -> bool {
        self.values.contains_key(&attr)
    }

    pub fn remove(&mut self, attr: Attribute) -> Option<Vec<u8>> {
        self.values.remove(&attr)
    }

    /// Overwrite this set's values with every attribute present in `other`.
    pub fn merge(&mut self, other: &Attributes) {
        for (attr, value) in other.iter() {
            self.set(attr, value.to_vec());
        }
    }

    /// True when every attribute in `query` is present here with the same value.
    pub fn matches(&self, query: &Attributes) -> bool {
        query
            .iter()
            .all(|(attr, value)| self.get(attr) == Some(value))
    }

    /// Key attributes only, in a form usable as a match query.
    pub fn key(&self) -> Attributes {
        let mut key = Attributes::new();
        for (attr, value) in self.iter().filter(|(attr, _)| attr.is_key()) {
            key.set(attr, value.to_vec());
        }
        key
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &[u8])> {
        self.values.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl Drop for Attributes {
    fn drop(&mut self) {
        for value in self.values.values_mut() {
            value.zeroize();
        }
    }
}

// Never print secret bytes, even in debug output.
impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (attr, value) in self.iter() {
            match attr {
                Attribute::SecretData | Attribute::Generic => {
                    map.entry(&attr.name(), &format_args!("<{} bytes>", value.len()))
                }
                _ => map.entry(&attr.name(), &String::from_utf8_lossy(value)),
            };
        }
        map.finish()
    }
}
