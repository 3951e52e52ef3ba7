//! Data structures shared by the vault backends and the item store.

pub mod attributes;
pub mod field;
pub mod vault_config;
