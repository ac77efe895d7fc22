//! Access objects restricting which callers may read a stored secret.
//!
//! Callers describe what they want with an [`AccessPolicy`]; [`assemble`]
//! turns it into a fully-formed [`Access`] attached to the item at write
//! time. An access object is a list of ACL entries, each granting a set of
//! [`Authorization`]s to a set of applications (or to everyone).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Application group the system Wi-Fi stack belongs to.
pub const AIRPORT_GROUP: &str = "AirPort";

/// System helpers that read 802.1x credentials on behalf of the user.
pub const SYSTEM_TRUSTED_APPS: [&str; 4] = [
    "/System/Library/SystemConfiguration/EAPOLController.bundle/Contents/Resources/eapolclient",
    "/usr/libexec/airportd",
    "/System/Library/CoreServices/SystemUIServer.app",
    "/System/Library/CoreServices/WiFiAgent.app",
];

/// Declarative description of who may decrypt a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessPolicy {
    /// Any application may decrypt.
    AllApplications,
    /// Only the listed applications and groups (and optionally the writer).
    Specific {
        /// Absolute paths of trusted applications.
        trusted_app_paths: BTreeSet<String>,
        /// Names of trusted application groups.
        trusted_app_groups: BTreeSet<String>,
        /// Whether the writing application itself is trusted.
        include_self: bool,
    },
}

impl AccessPolicy {
    /// The system Wi-Fi helpers, the `AirPort` group and the writer.
    pub fn system_default() -> Self {
        Self::Specific {
            trusted_app_paths: SYSTEM_TRUSTED_APPS.iter().map(|p| (*p).to_owned()).collect(),
            trusted_app_groups: BTreeSet::from([AIRPORT_GROUP.to_owned()]),
            include_self: true,
        }
    }
}

/// Operation an ACL entry can authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorization {
    /// Read the protected payload.
    Decrypt,
    /// Export the payload in the clear.
    ExportClear,
    /// Export the payload wrapped.
    ExportWrapped,
    /// Sign with the item.
    Sign,
    /// Encrypt with the item.
    Encrypt,
    /// Verify with the item.
    Verify,
    /// Modify the access object itself.
    ChangeAcl,
}

/// Reference to an application trusted by an ACL entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TrustedApplication {
    /// Application at an absolute path.
    Path(PathBuf),
    /// Named application group.
    Group(String),
    /// The application that wrote the item.
    Current,
}

impl TrustedApplication {
    fn matches(&self, caller: &Caller) -> bool {
        match self {
            Self::Path(path) => caller.path.as_deref() == Some(path.as_path()),
            Self::Group(group) => caller.groups.contains(group),
            Self::Current => caller.is_self,
        }
    }
}

/// Application asking for access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    /// Executable path.
    pub path: Option<PathBuf>,
    /// Groups the application belongs to.
    pub groups: BTreeSet<String>,
    /// Whether the caller is the application that wrote the item.
    pub is_self: bool,
}

impl Caller {
    /// The writing application.
    pub fn current() -> Self {
        Self {
            is_self: true,
            ..Self::default()
        }
    }

    /// Another application identified by its path.
    pub fn application(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Add a group membership.
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }
}

/// One rule of an access object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    /// Name shown when the rule prompts.
    pub description: String,
    /// Operations granted.
    pub authorizations: BTreeSet<Authorization>,
    /// Applications the grant is limited to; `None` means any application.
    pub applications: Option<BTreeSet<TrustedApplication>>,
}

impl AclEntry {
    fn allows(&self, caller: &Caller) -> bool {
        match &self.applications {
            None => true,
            Some(applications) => applications.iter().any(|app| app.matches(caller)),
        }
    }
}

/// Access object attached to a stored item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    descriptor: String,
    acls: Vec<AclEntry>,
}

impl Access {
    /// Access object with the store's three default rules: payload reads
    /// limited to `applications`, public-key style operations open to
    /// everyone, and ACL changes reserved to the writer.
    fn with_default_acls(descriptor: &str, applications: BTreeSet<TrustedApplication>) -> Self {
        let decrypt = AclEntry {
            description: descriptor.to_owned(),
            authorizations: BTreeSet::from([
                Authorization::Decrypt,
                Authorization::ExportClear,
                Authorization::ExportWrapped,
                Authorization::Sign,
            ]),
            applications: Some(applications),
        };
        let public = AclEntry {
            description: descriptor.to_owned(),
            authorizations: BTreeSet::from([Authorization::Encrypt, Authorization::Verify]),
            applications: None,
        };
        let owner = AclEntry {
            description: descriptor.to_owned(),
            authorizations: BTreeSet::from([Authorization::ChangeAcl]),
            applications: Some(BTreeSet::from([TrustedApplication::Current])),
        };
        Self {
            descriptor: descriptor.to_owned(),
            acls: vec![decrypt, public, owner],
        }
    }

    /// Descriptor the object was created with.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Every ACL entry, in evaluation order.
    pub fn acls(&self) -> &[AclEntry] {
        &self.acls
    }

    /// Entries granting `authorization`.
    pub fn matching_acls(&self, authorization: Authorization) -> impl Iterator<Item = &AclEntry> {
        self.acls
            .iter()
            .filter(move |acl| acl.authorizations.contains(&authorization))
    }

    /// Whether `caller` is granted `authorization` by any entry.
    pub fn permits(&self, caller: &Caller, authorization: Authorization) -> bool {
        self.matching_acls(authorization).any(|acl| acl.allows(caller))
    }
}

/// Access assembly failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The default object did not carry exactly one decrypt rule.
    #[error("expected exactly one decrypt ACL, found {0}")]
    InvalidAcl(usize),
}

/// Access object letting every application decrypt.
///
/// The default object always ships with a restrictive decrypt rule, so it is
/// retracted first and replaced by an unrestricted rule carrying the same
/// authorizations.
///
/// # Errors
///
/// Returns [`AccessError::InvalidAcl`] if the default object does not carry
/// exactly one decrypt rule.
pub fn build_all_applications_policy(descriptor: &str) -> Result<Access, AccessError> {
    let mut access = Access::with_default_acls(descriptor, BTreeSet::new());

    let decrypt: Vec<usize> = access
        .acls
        .iter()
        .enumerate()
        .filter(|(_, acl)| acl.authorizations.contains(&Authorization::Decrypt))
        .map(|(index, _)| index)
        .collect();
    let &[index] = decrypt.as_slice() else {
        return Err(AccessError::InvalidAcl(decrypt.len()));
    };

    let retracted = access.acls.remove(index);
    access.acls.push(AclEntry {
        description: descriptor.to_owned(),
        authorizations: retracted.authorizations,
        applications: None,
    });
    Ok(access)
}

/// Access object limited to the given applications and groups.
///
/// Paths that do not exist are skipped. An empty result denies every
/// caller, which is valid output.
pub fn build_specific_policy(
    descriptor: &str,
    paths: &BTreeSet<String>,
    groups: &BTreeSet<String>,
    include_self: bool,
) -> Access {
    let mut applications = BTreeSet::new();

    for group in groups.iter().filter(|g| !g.is_empty()) {
        applications.insert(TrustedApplication::Group(group.clone()));
    }
    if include_self {
        applications.insert(TrustedApplication::Current);
    }
    for path in paths {
        if Path::new(path).exists() {
            applications.insert(TrustedApplication::Path(PathBuf::from(path)));
        } else {
            debug!(path = %path, "trusted application not found, skipping");
        }
    }

    Access::with_default_acls(descriptor, applications)
}

/// Turn a declarative policy into an access object.
///
/// # Errors
///
/// Propagates [`build_all_applications_policy`] failures.
pub fn assemble(policy: &AccessPolicy, descriptor: &str) -> Result<Access, AccessError> {
    match policy {
        AccessPolicy::AllApplications => build_all_applications_policy(descriptor),
        AccessPolicy::Specific {
            trusted_app_paths,
            trusted_app_groups,
            include_self,
        } => Ok(build_specific_policy(
            descriptor,
            trusted_app_paths,
            trusted_app_groups,
            *include_self,
        )),
    }
}
