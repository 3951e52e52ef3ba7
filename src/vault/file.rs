//! Directory-backed vault: one JSON file per item.
//!
//! Items live in `<items>/<sha256-of-key>.item` with mode 0600. Every
//! primitive runs under the flock on `vault.lock` (shared for queries,
//! exclusive for writes), so each call is atomic with respect to other
//! processes using the same root. Files are replaced via temp file + rename.

use crate::constants;
use crate::core::file_lock::VaultLock;
use crate::core::paths::VaultPaths;
use crate::error::VaultStatus;
use crate::models::attributes::{Attribute, Attributes};
use crate::util::fs as vault_fs;
use crate::vault::{validate_changes, validate_item, AccessGroups, SecureVault};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, Zeroizing};

#[derive(Debug, Clone)]
pub struct FileVault {
    items_dir: PathBuf,
    lock_path: PathBuf,
    groups: AccessGroups,
}

/// On-disk item representation.
#[derive(Default, Serialize, Deserialize)]
struct StoredItem {
    service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generic: Option<Vec<u8>>,
}

impl Drop for StoredItem {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl StoredItem {
    /// Clear the caller-supplied opaque fields.
    fn wipe(&mut self) {
        for field in [&mut self.data, &mut self.generic] {
            if let Some(bytes) = field.as_mut() {
                bytes.zeroize();
            }
        }
    }

    fn from_attributes(attrs: &Attributes) -> Result<Self, VaultStatus> {
        let mut item = StoredItem::default();
        for (attr, value) in attrs.iter() {
            match attr {
                Attribute::Service => item.service = text(value)?,
                Attribute::AccessGroup => item.access_group = Some(text(value)?),
                Attribute::Account => item.account = Some(text(value)?),
                Attribute::SecretData => item.data = Some(value.to_vec()),
                Attribute::Label => item.label = Some(text(value)?),
                Attribute::Description => item.description = Some(text(value)?),
                Attribute::Generic => item.generic = Some(value.to_vec()),
            }
        }
        Ok(item)
    }

    fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new().with(Attribute::Service, self.service.as_bytes());
        if let Some(group) = &self.access_group {
            attrs.set(Attribute::AccessGroup, group.as_bytes());
        }
        if let Some(account) = &self.account {
            attrs.set(Attribute::Account, account.as_bytes());
        }
        if let Some(data) = &self.data {
            attrs.set(Attribute::SecretData, data.clone());
        }
        if let Some(label) = &self.label {
            attrs.set(Attribute::Label, label.as_bytes());
        }
        if let Some(description) = &self.description {
            attrs.set(Attribute::Description, description.as_bytes());
        }
        if let Some(generic) = &self.generic {
            attrs.set(Attribute::Generic, generic.clone());
        }
        attrs
    }
}

fn text(value: &[u8]) -> Result<String, VaultStatus> {
    String::from_utf8(value.to_vec()).map_err(|_| VaultStatus::PARAM)
}


/// An item loaded from disk together with the file it came from.
struct Entry {
    path: PathBuf,
    attributes: Attributes,
    raw: Zeroizing<Vec<u8>>,
}

/// Result of scanning the items directory for a query.
struct Scan {
    entries: Vec<Entry>,
    /// The file holding the exact key of the query, when it cannot be loaded.
    unreadable: Option<(PathBuf, VaultStatus)>,
}

impl Scan {
    /// Matching entries, or the load error of the queried key's own file.
    fn readable(self) -> Result<Vec<Entry>, VaultStatus> {
        match self.unreadable {
            Some((_, status)) => Err(status),
            None => Ok(self.entries),
        }
    }
}

/// One file replacement within an update: `contents` lands at `new_path`,
/// and `original` is what `old_path` held before.
struct Rewrite {
    old_path: PathBuf,
    new_path: PathBuf,
    contents: Zeroizing<Vec<u8>>,
    original: Zeroizing<Vec<u8>>,
}

impl FileVault {
    /// Open (creating if needed) the items directory described by `paths`.
    pub fn open(paths: &VaultPaths, groups: AccessGroups) -> Result<Self, VaultStatus> {
        vault_fs::ensure_dir(&paths.items, constants::ITEMS_DIR_MODE)?;
        Ok(Self {
            items_dir: paths.items.clone(),
            lock_path: paths.vault_lock.clone(),
            groups,
        })
    }

    pub fn items_dir(&self) -> &Path {
        &self.items_dir
    }

    pub fn access_groups(&self) -> &AccessGroups {
        &self.groups
    }

    fn item_path(&self, attributes: &Attributes) -> PathBuf {
        self.items_dir
            .join(format!("{}{}", item_file_stem(attributes), constants::ITEM_EXTENSION))
    }

    fn write_item(&self, path: &Path, attributes: &Attributes) -> Result<(), VaultStatus> {
        write_file(path, &encode(attributes)?)
    }

    /// Every item matching `query`, ordered by file name.
    ///
    /// Unreadable files are skipped, except the one named by the exact key
    /// in `query`: that item exists, so it is reported rather than hidden.
    fn matching(&self, query: &Attributes) -> Result<Scan, VaultStatus> {
        let exact = (query.key() == *query).then(|| self.item_path(query));
        let mut scan = Scan {
            entries: Vec::new(),
            unreadable: None,
        };
        for path in list_item_files(&self.items_dir)? {
            let (attributes, raw) = match load_item(&path) {
                Ok(loaded) => loaded,
                Err(status) if exact.as_ref() == Some(&path) => {
                    tracing::warn!(path = %path.display(), %status, "vault item unreadable");
                    scan.unreadable = Some((path, status));
                    continue;
                }
                Err(status) => {
                    tracing::warn!(path = %path.display(), %status, "skipping unreadable vault item");
                    continue;
                }
            };
            if attributes.matches(query) {
                scan.entries.push(Entry {
                    path,
                    attributes,
                    raw,
                });
            }
        }
        Ok(scan)
    }

    /// Encode every target's new contents and check its destination before
    /// any file is touched.
    fn plan_rewrites(
        &self,
        targets: &[Entry],
        changes: &Attributes,
    ) -> Result<Vec<Rewrite>, VaultStatus> {
        let mut plan: Vec<Rewrite> = Vec::with_capacity(targets.len());
        for entry in targets {
            let mut updated = entry.attributes.clone();
            updated.merge(changes);
            let new_path = self.item_path(&updated);
            let taken = new_path != entry.path && new_path.exists();
            if taken || plan.iter().any(|step| step.new_path == new_path) {
                return Err(VaultStatus::DUPLICATE_ITEM);
            }
            plan.push(Rewrite {
                old_path: entry.path.clone(),
                new_path,
                contents: encode(&updated)?,
                original: entry.raw.clone(),
            });
        }
        Ok(plan)
    }
}

impl SecureVault for FileVault {
    fn add(&self, attributes: &Attributes) -> Result<(), VaultStatus> {
        validate_item(attributes)?;
        let mut item = attributes.clone();
        self.groups.assign(&mut item)?;

        let _lock = VaultLock::exclusive(&self.lock_path)?;
        let path = self.item_path(&item);
        if path.exists() {
            return Err(VaultStatus::DUPLICATE_ITEM);
        }
        // Without a group the key is also taken by the same item in any group.
        if !attributes.contains(Attribute::AccessGroup)
            && !self.matching(&attributes.key())?.entries.is_empty()
        {
            return Err(VaultStatus::DUPLICATE_ITEM);
        }
        self.write_item(&path, &item)?;
        tracing::debug!(path = %path.display(), "vault item added");
        Ok(())
    }

    fn query(&self, query: &Attributes) -> Result<Attributes, VaultStatus> {
        let _lock = VaultLock::shared(&self.lock_path)?;
        self.matching(query)?
            .readable()?
            .into_iter()
            .next()
            .map(|entry| entry.attributes)
            .ok_or(VaultStatus::ITEM_NOT_FOUND)
    }

    fn update(&self, query: &Attributes, changes: &Attributes) -> Result<(), VaultStatus> {
        validate_changes(changes)?;
        if let Some(group) = changes.get(Attribute::AccessGroup) {
            if !self.groups.is_entitled(group) {
                return Err(VaultStatus::MISSING_ENTITLEMENT);
            }
        }

        let _lock = VaultLock::exclusive(&self.lock_path)?;
        let targets = self.matching(query)?.readable()?;
        if targets.is_empty() {
            return Err(VaultStatus::ITEM_NOT_FOUND);
        }

        let plan = self.plan_rewrites(&targets, changes)?;
        apply_rewrites(&plan, &mut write_file, &mut remove_file)?;
        tracing::debug!(items = plan.len(), "vault items updated");
        Ok(())
    }

    fn delete(&self, query: &Attributes) -> Result<(), VaultStatus> {
        let _lock = VaultLock::exclusive(&self.lock_path)?;
        let scan = self.matching(query)?;
        if scan.entries.is_empty() && scan.unreadable.is_none() {
            return Err(VaultStatus::ITEM_NOT_FOUND);
        }
        for entry in &scan.entries {
            fs::remove_file(&entry.path)?;
        }
        if let Some((path, _)) = &scan.unreadable {
            fs::remove_file(path)?;
            tracing::warn!(path = %path.display(), "removed unreadable vault item");
        }
        tracing::debug!(items = scan.entries.len(), "vault items deleted");
        Ok(())
    }
}

/// Apply `plan` in order. When a step fails, the steps already applied are
/// reverted so the directory holds what it held before the update.
fn apply_rewrites<W, R>(plan: &[Rewrite], write: &mut W, remove: &mut R) -> Result<(), VaultStatus>
where
    W: FnMut(&Path, &[u8]) -> Result<(), VaultStatus>,
    R: FnMut(&Path) -> Result<(), VaultStatus>,
{
    for (applied, step) in plan.iter().enumerate() {
        if let Err(status) = apply_rewrite(step, write, remove) {
            roll_back(&plan[..applied], write, remove);
            return Err(status);
        }
    }
    Ok(())
}

fn apply_rewrite<W, R>(step: &Rewrite, write: &mut W, remove: &mut R) -> Result<(), VaultStatus>
where
    W: FnMut(&Path, &[u8]) -> Result<(), VaultStatus>,
    R: FnMut(&Path) -> Result<(), VaultStatus>,
{
    write(&step.new_path, &step.contents)?;
    if step.new_path != step.old_path {
        if let Err(status) = remove(&step.old_path) {
            if let Err(undo) = remove(&step.new_path) {
                tracing::error!(path = %step.new_path.display(), status = %undo, "could not undo re-keyed vault item");
            }
            return Err(status);
        }
    }
    Ok(())
}

fn roll_back<W, R>(applied: &[Rewrite], write: &mut W, remove: &mut R)
where
    W: FnMut(&Path, &[u8]) -> Result<(), VaultStatus>,
    R: FnMut(&Path) -> Result<(), VaultStatus>,
{
    for step in applied.iter().rev() {
        if let Err(status) = write(&step.old_path, &step.original) {
            tracing::error!(path = %step.old_path.display(), %status, "could not restore vault item");
            continue;
        }
        if step.new_path != step.old_path {
            if let Err(status) = remove(&step.new_path) {
                tracing::error!(path = %step.new_path.display(), %status, "could not undo re-keyed vault item");
            }
        }
    }
}

fn encode(attributes: &Attributes) -> Result<Zeroizing<Vec<u8>>, VaultStatus> {
    let stored = StoredItem::from_attributes(attributes)?;
    serde_json::to_vec_pretty(&stored)
        .map(Zeroizing::new)
        .map_err(|_| VaultStatus::DECODE)
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), VaultStatus> {
    vault_fs::write_atomic(path, contents, constants::ITEM_FILE_MODE).map_err(VaultStatus::from)
}

fn remove_file(path: &Path) -> Result<(), VaultStatus> {
    fs::remove_file(path).map_err(VaultStatus::from)
}

/// Stable file name for an item, derived from its key attributes only.
fn item_file_stem(attributes: &Attributes) -> String {
    let mut hasher = Sha256::new();
    for attr in [Attribute::Service, Attribute::AccessGroup, Attribute::Account] {
        match attributes.get(attr) {
            Some(value) => {
                hasher.update([1u8]);
                hasher.update((value.len() as u64).to_be_bytes());
                hasher.update(value);
            }
            None => hasher.update([0u8]),
        }
    }
    format!("{:064x}", hasher.finalize())
}

fn list_item_files(dir: &Path) -> Result<Vec<PathBuf>, VaultStatus> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_item = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(|name| name.ends_with(constants::ITEM_EXTENSION))
            .unwrap_or(false);
        if is_item {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn load_item(path: &Path) -> Result<(Attributes, Zeroizing<Vec<u8>>), VaultStatus> {
    let raw = Zeroizing::new(fs::read(path)?);
    let stored = serde_json::from_slice::<StoredItem>(&raw).map_err(|_| VaultStatus::DECODE)?;
    Ok((stored.to_attributes(), raw))
}
