//! Profile controller capability and its in-memory and file backends.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::file::write_atomic;

/// Profile as the controller represents it: raw numeric codes, nullable lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProfile {
    /// Controller-assigned identifier.
    #[serde(default)]
    pub profile_id: Option<String>,
    /// Network identifier.
    #[serde(default)]
    pub ssid: Option<String>,
    /// Display name.
    #[serde(default)]
    pub user_defined_name: Option<String>,
    /// Domain name.
    #[serde(default)]
    pub domain_name: Option<String>,
    /// Outer (anonymous) identity.
    #[serde(default)]
    pub outer_identity: Option<String>,
    /// Accepted EAP method codes, in preference order.
    #[serde(default)]
    pub accept_eap_types: Option<Vec<i64>>,
    /// Security level code.
    #[serde(default)]
    pub security_type: i64,
    /// TTLS inner authentication code.
    #[serde(default)]
    pub ttls_inner_auth_type: i64,
    /// Trusted server names.
    #[serde(default)]
    pub trusted_server_name: Option<Vec<String>>,
    /// Trusted DER certificates.
    #[serde(with = "crate::encoding::base64_list", default)]
    pub trusted_certificate: Option<Vec<Vec<u8>>>,
}

/// Network profile controller.
pub trait ProfileController: Send + Sync {
    /// Every profile.
    fn list(&self) -> Vec<RawProfile>;

    /// Profile bound to `ssid`.
    fn get(&self, ssid: &str) -> Option<RawProfile>;

    /// Create a profile, replacing any profile with the same id or ssid.
    fn create(&self, profile: RawProfile) -> bool;

    /// Remove the profile with `profile_id`.
    fn remove_by_id(&self, profile_id: &str) -> bool;

    /// Remove the profile bound to `ssid`.
    fn remove_by_ssid(&self, ssid: &str) -> bool;
}

/// Profile collection shared by both backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProfileBook {
    #[serde(default)]
    profiles: Vec<RawProfile>,
}

impl ProfileBook {
    fn get(&self, ssid: &str) -> Option<RawProfile> {
        self.profiles
            .iter()
            .find(|p| p.ssid.as_deref() == Some(ssid))
            .cloned()
    }

    fn upsert(&mut self, mut profile: RawProfile) -> bool {
        let nonempty = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        if !nonempty(&profile.ssid) && !nonempty(&profile.user_defined_name) {
            warn!("refusing profile with neither ssid nor name");
            return false;
        }

        let same_id = |existing: &RawProfile| {
            nonempty(&profile.profile_id) && existing.profile_id == profile.profile_id
        };
        let same_ssid =
            |existing: &RawProfile| nonempty(&profile.ssid) && existing.ssid == profile.ssid;

        match self.profiles.iter().position(|p| same_id(p) || same_ssid(p)) {
            Some(index) => {
                let replaced = self.profiles.remove(index);
                if !nonempty(&profile.profile_id) {
                    profile.profile_id = replaced.profile_id;
                }
                debug!(profile_id = ?profile.profile_id, "replacing profile");
                self.profiles.insert(index, profile);
            }
            None => {
                if !nonempty(&profile.profile_id) {
                    profile.profile_id = Some(uuid::Uuid::new_v4().to_string());
                }
                debug!(profile_id = ?profile.profile_id, "creating profile");
                self.profiles.push(profile);
            }
        }
        true
    }

    fn remove(&mut self, matches: impl Fn(&RawProfile) -> bool) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| !matches(p));
        self.profiles.len() != before
    }
}

/// In-memory controller.
#[derive(Default)]
pub struct InMemoryProfileController {
    book: RwLock<ProfileBook>,
}

impl InMemoryProfileController {
    /// Empty controller.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileController for InMemoryProfileController {
    fn list(&self) -> Vec<RawProfile> {
        let book = self.book.read().unwrap_or_else(PoisonError::into_inner);
        book.profiles.clone()
    }

    fn get(&self, ssid: &str) -> Option<RawProfile> {
        let book = self.book.read().unwrap_or_else(PoisonError::into_inner);
        book.get(ssid)
    }

    fn create(&self, profile: RawProfile) -> bool {
        let mut book = self.book.write().unwrap_or_else(PoisonError::into_inner);
        book.upsert(profile)
    }

    fn remove_by_id(&self, profile_id: &str) -> bool {
        let mut book = self.book.write().unwrap_or_else(PoisonError::into_inner);
        book.remove(|p| p.profile_id.as_deref() == Some(profile_id))
    }

    fn remove_by_ssid(&self, ssid: &str) -> bool {
        let mut book = self.book.write().unwrap_or_else(PoisonError::into_inner);
        book.remove(|p| p.ssid.as_deref() == Some(ssid))
    }
}

/// Controller persisting profiles to a JSON document.
///
/// I/O failures are logged and reported as an empty result or `false`,
/// matching the controller contract.
pub struct FileProfileController {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileProfileController {
    /// Controller over the document at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> anyhow::Result<ProfileBook> {
        load_book(&self.path)
    }

    fn modify(&self, change: impl FnOnce(&mut ProfileBook) -> bool) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut book = match self.load() {
            Ok(book) => book,
            Err(e) => {
                warn!(error = %e, "failed to load profiles");
                return false;
            }
        };
        if !change(&mut book) {
            return false;
        }
        match save_book(&self.path, &book) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to save profiles");
                false
            }
        }
    }

    fn read(&self) -> ProfileBook {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load profiles");
            ProfileBook::default()
        })
    }
}

fn load_book(path: &Path) -> anyhow::Result<ProfileBook> {
    use anyhow::Context;

    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse profiles at {}", path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(ProfileBook::default()),
        Err(e) => Err(anyhow::anyhow!(
            "failed to read profiles at {}: {e}",
            path.display()
        )),
    }
}

fn save_book(path: &Path, book: &ProfileBook) -> anyhow::Result<()> {
    use anyhow::Context;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(book).context("failed to encode profiles")?;
    write_atomic(path, contents.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))
}

impl ProfileController for FileProfileController {
    fn list(&self) -> Vec<RawProfile> {
        self.read().profiles
    }

    fn get(&self, ssid: &str) -> Option<RawProfile> {
        self.read().get(ssid)
    }

    fn create(&self, profile: RawProfile) -> bool {
        self.modify(|book| book.upsert(profile))
    }

    fn remove_by_id(&self, profile_id: &str) -> bool {
        self.modify(|book| book.remove(|p| p.profile_id.as_deref() == Some(profile_id)))
    }

    fn remove_by_ssid(&self, ssid: &str) -> bool {
        self.modify(|book| book.remove(|p| p.ssid.as_deref() == Some(ssid)))
    }
}
