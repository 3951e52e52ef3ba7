//! Typed-field selector and field sets for the generic item shape.

use crate::models::attributes::{Attribute, Attributes};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// One independently addressable sub-value of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Account,
    Data,
    Label,
    Description,
    Generic,
}

impl FieldKind {
    pub const ALL: [FieldKind; 5] = [
        FieldKind::Account,
        FieldKind::Data,
        FieldKind::Label,
        FieldKind::Description,
        FieldKind::Generic,
    ];

    /// Vault attribute backing this field.
    pub const fn attribute(self) -> Attribute {
        match self {
            FieldKind::Account => Attribute::Account,
            FieldKind::Data => Attribute::SecretData,
            FieldKind::Label => Attribute::Label,
            FieldKind::Description => Attribute::Description,
            FieldKind::Generic => Attribute::Generic,
        }
    }

    /// Whether the field holds opaque bytes rather than text.
    pub const fn is_binary(self) -> bool {
        matches!(self, FieldKind::Data | FieldKind::Generic)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            FieldKind::Account => "account",
            FieldKind::Data => "data",
            FieldKind::Label => "label",
            FieldKind::Description => "description",
            FieldKind::Generic => "generic",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown field '{}', must be one of: account, data, label, description, generic",
                    s
                )
            })
    }
}

/// Non-key fields written together in a single vault call.
#[derive(Clone, Default)]
pub struct ItemFields {
    data: Option<Zeroizing<Vec<u8>>>,
    label: Option<String>,
    description: Option<String>,
    generic: Option<Vec<u8>>,
}

impl ItemFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(Zeroizing::new(data.into()));
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn generic(mut self, generic: impl Into<Vec<u8>>) -> Self {
        self.generic = Some(generic.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
            && self.label.is_none()
            && self.description.is_none()
            && self.generic.is_none()
    }

    /// Attribute set holding only the fields that were supplied.
    pub fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        if let Some(data) = &self.data {
            attrs.set(FieldKind::Data.attribute(), data.to_vec());
        }
        if let Some(label) = &self.label {
            attrs.set(FieldKind::Label.attribute(), label.as_bytes());
        }
        if let Some(description) = &self.description {
            attrs.set(FieldKind::Description.attribute(), description.as_bytes());
        }
        if let Some(generic) = &self.generic {
            attrs.set(FieldKind::Generic.attribute(), generic.clone());
        }
        attrs
    }
}

impl fmt::Debug for ItemFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemFields")
            .field("data", &self.data.as_ref().map(|d| d.len()))
            .field("label", &self.label)
            .field("description", &self.description)
            .field("generic", &self.generic.as_ref().map(Vec::len))
            .finish()
    }
}
