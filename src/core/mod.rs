//! Core logic: identities, the item store, prefix discovery, and vault plumbing.

pub mod config;
pub mod file_lock;
pub mod identity;
pub mod keychain;
pub mod paths;
pub mod sharing;
pub mod store;
