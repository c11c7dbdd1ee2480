//! Durable keystore backed by a single JSON file.
//!
//! The file holds one object mapping key name to a base64 encrypted blob.
//! Every successful [`CredentialStore::store`] rewrites the whole file by
//! writing a sibling temporary file and renaming it over the target, so a
//! crash mid-write leaves either the old or the new file, never a torn one.
//! A missing directory is created `0700` and the file is always `0600` on
//! Unix. Directories that already exist keep their permissions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{KeystoreError, Result};
use crate::types::EncryptedBlob;

/// In-memory mapping from key name to encrypted blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keystore {
    records: BTreeMap<String, EncryptedBlob>,
}

impl Keystore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key_name: &str) -> Option<&EncryptedBlob> {
        self.records.get(key_name)
    }

    /// Insert or replace a record, returning the previous blob.
    pub fn insert(
        &mut self,
        key_name: impl Into<String>,
        blob: EncryptedBlob,
    ) -> Option<EncryptedBlob> {
        self.records.insert(key_name.into(), blob)
    }

    pub fn remove(&mut self, key_name: &str) -> Option<EncryptedBlob> {
        self.records.remove(key_name)
    }

    pub fn contains(&self, key_name: &str) -> bool {
        self.records.contains_key(key_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Key names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Read a keystore file. A missing file is an empty keystore.
    pub async fn read_from(path: &Path) -> Result<Self> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no keystore file yet, starting empty");
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(KeystoreError::Persistence(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        let keystore: Self = serde_json::from_slice(&data)?;
        Ok(keystore)
    }

    /// Atomically replace the keystore file at `path` with this mapping.
    pub async fn write_to(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_private_dir(parent).await?;
        }

        let temp_path = temp_path_for(path);
        if let Err(e) = write_private_file(&temp_path, &data).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(KeystoreError::Persistence(format!(
                "failed to replace {}: {e}",
                path.display()
            )));
        }

        Ok(())
    }
}

/// The keystore mapping plus the file it is mirrored to.
///
/// A single write lock spans "mutate map" and "persist file", so concurrent
/// stores are serialized and readers never observe a record that has not
/// reached disk.
pub struct CredentialStore {
    path: PathBuf,
    keystore: RwLock<Keystore>,
}

impl CredentialStore {
    /// Load the keystore at `path`, treating a missing file as empty.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let keystore = Keystore::read_from(&path).await?;
        info!(path = %path.display(), keys = keystore.len(), "loaded keystore");

        Ok(Self {
            path,
            keystore: RwLock::new(keystore),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the encrypted blob for `key_name`.
    pub async fn get(&self, key_name: &str) -> Option<EncryptedBlob> {
        self.keystore.read().await.get(key_name).cloned()
    }

    pub async fn contains(&self, key_name: &str) -> bool {
        self.keystore.read().await.contains(key_name)
    }

    pub async fn len(&self) -> usize {
        self.keystore.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keystore.read().await.is_empty()
    }

    /// Sorted key names.
    pub async fn names(&self) -> Vec<String> {
        self.keystore.read().await.names().map(str::to_string).collect()
    }

    /// Upsert a record and persist the whole keystore.
    ///
    /// If persisting fails the in-memory mapping is rolled back, so memory
    /// and disk agree on whether the store happened.
    pub async fn store(&self, key_name: &str, blob: EncryptedBlob) -> Result<()> {
        let mut keystore = self.keystore.write().await;
        let previous = keystore.insert(key_name, blob);

        if let Err(e) = keystore.write_to(&self.path).await {
            warn!(
                key_name,
                path = %self.path.display(),
                "keystore write failed, rolling back: {e}"
            );
            match previous {
                Some(blob) => {
                    keystore.insert(key_name, blob);
                }
                None => {
                    keystore.remove(key_name);
                }
            }
            return Err(e);
        }

        debug!(key_name, path = %self.path.display(), keys = keystore.len(), "persisted keystore");
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Create `dir` owner-only if it does not exist yet. An existing directory is
/// left untouched.
async fn ensure_private_dir(dir: &Path) -> Result<()> {
    if tokio::fs::try_exists(dir).await? {
        return Ok(());
    }

    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);

    builder.create(dir).await.map_err(|e| {
        KeystoreError::Persistence(format!("failed to create {}: {e}", dir.display()))
    })?;

    // The creation mode is masked by the umask.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        tokio::fs::set_permissions(dir, perms).await?;
    }

    debug!(dir = %dir.display(), "created keystore directory");
    Ok(())
}

/// Write `data` to `path` with mode 0600 on Unix, flushing it to disk.
async fn write_private_file(path: &Path, data: &[u8]) -> Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    {
        let mut file = options.open(path).await.map_err(|e| {
            KeystoreError::Persistence(format!("failed to open {}: {e}", path.display()))
        })?;
        file.write_all(data).await?;
        file.sync_all().await?;
    }

    // The file may have pre-existed with looser permissions.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(path, perms).await?;
    }

    Ok(())
}
