//! File-backed store: one JSON document per keychain.
//!
//! Development backend for the CLI. Payloads are base64 in the document and
//! the file is kept at `0600`. Trust settings for the user domain live in the
//! user document, system-domain settings in the system document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    delete_from, insert_into, select, Item, Keychain, NewItem, Query, SecureStore, StoreError,
    TrustDomain, TrustResult, TrustSettings, TrustStore, STATUS_DECODE, STATUS_IO,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    trust: Vec<TrustRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TrustRecord {
    #[serde(with = "crate::encoding::base64_bytes")]
    certificate: Vec<u8>,
    result: TrustResult,
    modified_at: DateTime<Utc>,
}

/// JSON-file store.
///
/// Calls within one process are serialized by an internal lock; concurrent
/// processes are not coordinated.
pub struct FileStore {
    user_path: PathBuf,
    system_path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Create a store over the two keychain documents. Files are created on first write.
    pub fn new(user_path: impl Into<PathBuf>, system_path: impl Into<PathBuf>) -> Self {
        Self {
            user_path: user_path.into(),
            system_path: system_path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Document path for `keychain`.
    pub fn path(&self, keychain: Keychain) -> &Path {
        match keychain {
            Keychain::User => &self.user_path,
            Keychain::System => &self.system_path,
        }
    }

    fn domain_path(&self, domain: TrustDomain) -> &Path {
        match domain {
            TrustDomain::User => &self.user_path,
            TrustDomain::System => &self.system_path,
        }
    }

    fn update<T>(
        &self,
        path: &Path,
        change: impl FnOnce(&mut Document) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut document = load(path)?;
        let outcome = change(&mut document)?;
        save(path, &document)?;
        Ok(outcome)
    }

    fn read<T>(
        &self,
        path: &Path,
        view: impl FnOnce(&Document) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let document = load(path)?;
        view(&document)
    }
}

fn load(path: &Path) -> Result<Document, StoreError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "keychain document missing, starting empty");
            return Ok(Document::default());
        }
        Err(e) => {
            return Err(StoreError::other(
                STATUS_IO,
                format!("failed to read {}: {e}", path.display()),
            ))
        }
    };
    serde_json::from_slice(&contents).map_err(|e| {
        StoreError::other(
            STATUS_DECODE,
            format!("failed to parse {}: {e}", path.display()),
        )
    })
}

fn save(path: &Path, document: &Document) -> Result<(), StoreError> {
    let io_error =
        |e: std::io::Error| StoreError::other(STATUS_IO, format!("{}: {e}", path.display()));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let contents = serde_json::to_vec_pretty(document).map_err(|e| {
        StoreError::other(
            STATUS_DECODE,
            format!("failed to encode {}: {e}", path.display()),
        )
    })?;
    write_atomic(path, &contents).map_err(io_error)
}

/// Replace `path` with `contents` without ever leaving it truncated.
///
/// Writes an owner-only `.tmp` sibling, syncs it, then renames it into
/// place. The previous document survives any failure before the rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp_path = tmp_path(path);
    let written = write_private(&tmp_path, contents).and_then(|()| fs::rename(&tmp_path, path));
    if written.is_err() {
        if let Err(e) = fs::remove_file(&tmp_path) {
            debug!(path = %tmp_path.display(), error = %e, "temp file not removed");
        }
    }
    written
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    restrict_permissions(&file)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// A leftover temp file keeps its old mode through `open`.
#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

impl SecureStore for FileStore {
    fn insert(&self, item: NewItem) -> Result<(), StoreError> {
        let keychain = item.keychain;
        self.update(self.path(keychain), |document| {
            insert_into(&mut document.items, item)
        })
    }

    fn find(&self, query: &Query) -> Result<Vec<Item>, StoreError> {
        self.read(self.path(query.keychain), |document| {
            select(&document.items, query)
        })
    }

    fn delete(&self, query: &Query) -> Result<usize, StoreError> {
        query.validate()?;
        self.update(self.path(query.keychain), |document| {
            delete_from(&mut document.items, query)
        })
    }
}

impl TrustStore for FileStore {
    fn set_trust(
        &self,
        certificate: &[u8],
        domain: TrustDomain,
        result: TrustResult,
    ) -> Result<(), StoreError> {
        self.update(self.domain_path(domain), |document| {
            document
                .trust
                .retain(|record| record.certificate != certificate);
            document.trust.push(TrustRecord {
                certificate: certificate.to_vec(),
                result,
                modified_at: Utc::now(),
            });
            Ok(())
        })
    }

    fn trust_settings(
        &self,
        certificate: &[u8],
        domain: TrustDomain,
    ) -> Result<Option<TrustSettings>, StoreError> {
        self.read(self.domain_path(domain), |document| {
            Ok(document
                .trust
                .iter()
                .find(|record| record.certificate == certificate)
                .map(|record| TrustSettings {
                    result: record.result,
                    modified_at: record.modified_at,
                }))
        })
    }
}
