//! Credential vault: save, fetch and delete 802.1x secrets.
//!
//! Every operation builds its query with [`Query::filter`], so a field left
//! unset is a wildcard everywhere and a field that is set narrows the match
//! the same way for writes, reads and deletes.
//!
//! The vault holds no state between calls. `save` (delete then insert) and
//! `delete` (check then delete) are two store calls each and are not atomic
//! as a unit; a concurrent writer on the same key can interleave. Callers
//! that need more must serialize mutations per ssid/kind/username themselves.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::access::{self, AccessError};
use crate::credential::EapCredential;
use crate::store::{
    Attribute, Item, ItemClass, Keychain, MatchLimit, NewItem, Query, SecureStore, StoreError,
};

/// Vault error types.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A required field was missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The secure store failed; the original status is preserved.
    #[error("secure store failure: {0}")]
    Platform(#[from] StoreError),
    /// The access object could not be assembled.
    #[error("failed to assemble access control: {0}")]
    Access(#[from] AccessError),
}

impl VaultError {
    /// Platform status code, when the failure came from the store.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Platform(status) => Some(status.code()),
            _ => None,
        }
    }
}

/// Which credentials a lookup or delete targets.
///
/// Unset or empty fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialFilter {
    /// Item label.
    pub ssid: Option<String>,
    /// Account name.
    pub username: Option<String>,
    /// Item description.
    pub kind: Option<String>,
    /// Item comment.
    pub comment: Option<String>,
    /// Service name.
    pub service: Option<String>,
    /// Keychain to search.
    pub keychain: Keychain,
}

impl CredentialFilter {
    /// Filter matching every credential in the user keychain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on ssid.
    pub fn ssid(mut self, ssid: impl Into<String>) -> Self {
        self.ssid = Some(ssid.into());
        self
    }

    /// Filter on account name.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Filter on kind.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Filter on comment.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Filter on service.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Search the system keychain instead of the user's.
    pub fn system(mut self, use_system: bool) -> Self {
        self.keychain = Keychain::from_system_flag(use_system);
        self
    }

    /// Filter identifying exactly the slot `credential` is saved into.
    ///
    /// The comment is a note, not part of the identity, so it is left out.
    pub fn for_credential(credential: &EapCredential, keychain: Keychain) -> Self {
        Self {
            ssid: Some(credential.ssid.clone()),
            username: credential.username.clone(),
            kind: credential.kind.clone(),
            comment: None,
            service: credential.service.clone(),
            keychain,
        }
    }

    fn exact(item: &Item, keychain: Keychain) -> Self {
        let owned = |attribute| item.attribute(attribute).map(str::to_owned);
        Self {
            ssid: owned(Attribute::Label),
            username: owned(Attribute::Account),
            kind: owned(Attribute::Description),
            comment: owned(Attribute::Comment),
            service: owned(Attribute::Service),
            keychain,
        }
    }

    fn query(&self) -> Query {
        Query::new(ItemClass::GenericPassword, self.keychain)
            .filter(Attribute::Label, self.ssid.as_deref())
            .filter(Attribute::Account, self.username.as_deref())
            .filter(Attribute::Description, self.kind.as_deref())
            .filter(Attribute::Comment, self.comment.as_deref())
            .filter(Attribute::Service, self.service.as_deref())
    }

    fn has_ssid(&self) -> bool {
        self.ssid.as_deref().is_some_and(|ssid| !ssid.is_empty())
    }
}

/// Whether [`CredentialVault::get_all`] materializes passwords.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// Attributes only. One store call.
    #[default]
    AttributesOnly,
    /// Attributes and passwords. One extra store call per match.
    WithPayload,
}

/// Credential vault over a secure store.
#[derive(Clone)]
pub struct CredentialVault {
    store: Arc<dyn SecureStore>,
}

impl CredentialVault {
    /// Create a vault over `store`.
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self { store }
    }

    /// Save a credential, replacing whatever occupies its slot.
    ///
    /// The slot is the non-empty subset of ssid, username, kind and service.
    /// Any item matching it is deleted first, then a new item carrying the
    /// password, the comment and the assembled access object is inserted.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidArgument`] for an empty ssid,
    /// [`VaultError::Access`] if the access object cannot be built, and
    /// [`VaultError::Platform`] for store failures other than "nothing to
    /// delete".
    pub fn save(
        &self,
        credential: &EapCredential,
        use_system_store: bool,
    ) -> Result<(), VaultError> {
        if credential.ssid.is_empty() {
            return Err(VaultError::InvalidArgument("ssid must not be empty".to_owned()));
        }
        let keychain = Keychain::from_system_flag(use_system_store);
        let query = CredentialFilter::for_credential(credential, keychain).query();

        let access = credential
            .access_control
            .as_ref()
            .map(|policy| access::assemble(policy, &credential.ssid))
            .transpose()?;

        match self.store.delete(&query) {
            Ok(removed) => debug!(ssid = %credential.ssid, removed, "replaced existing credential"),
            Err(StoreError::NotFound) => {}
            Err(e) => {
                warn!(
                    ssid = %credential.ssid,
                    status = e.code(),
                    "failed to delete old credential"
                );
                return Err(e.into());
            }
        }

        let mut attributes = query.attributes;
        if let Some(comment) = credential.comment.as_deref().filter(|c| !c.is_empty()) {
            attributes.insert(Attribute::Comment, comment.to_owned());
        }
        let item = NewItem {
            class: ItemClass::GenericPassword,
            keychain,
            attributes,
            data: credential
                .password
                .as_ref()
                .map(|password| password.expose().as_bytes().to_vec()),
            access,
        };

        self.store.insert(item).map_err(|e| {
            warn!(ssid = %credential.ssid, status = e.code(), "failed to save credential");
            VaultError::from(e)
        })?;
        info!(ssid = %credential.ssid, keychain = ?keychain, "credential saved");
        Ok(())
    }

    /// First credential matching `filter`, or `None`.
    ///
    /// With `return_data = false` the password is always absent.
    ///
    /// # Errors
    ///
    /// [`VaultError::Platform`] for store failures other than "not found".
    pub fn get(
        &self,
        filter: &CredentialFilter,
        return_data: bool,
    ) -> Result<Option<EapCredential>, VaultError> {
        let query = filter.query().with_data(return_data);
        match self.store.find(&query) {
            Ok(items) => Ok(items.first().and_then(EapCredential::from_item)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Every credential matching `filter`.
    ///
    /// The store cannot return payloads from a multi-match query, so
    /// [`FetchMode::WithPayload`] re-reads each match with its own exact
    /// lookup: n matches cost n + 1 store calls. The default mode returns
    /// attributes only in a single call.
    ///
    /// # Errors
    ///
    /// [`VaultError::Platform`] for store failures other than "not found".
    pub fn get_all(
        &self,
        filter: &CredentialFilter,
        mode: FetchMode,
    ) -> Result<Vec<EapCredential>, VaultError> {
        let query = filter.query().with_limit(MatchLimit::All);
        let items = match self.store.find(&query) {
            Ok(items) => items,
            Err(StoreError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut credentials = Vec::with_capacity(items.len());
        for item in &items {
            let Some(attributes_only) = EapCredential::from_item(item) else {
                debug!(attributes = ?item.attributes, "skipping unlabelled item");
                continue;
            };
            let credential = match mode {
                FetchMode::AttributesOnly => attributes_only,
                FetchMode::WithPayload => self
                    .get(&CredentialFilter::exact(item, filter.keychain), true)?
                    .unwrap_or(attributes_only),
            };
            credentials.push(credential);
        }
        Ok(credentials)
    }

    /// Delete every credential matching `filter`. `Ok(false)` when none exists.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidArgument`] when the filter has no ssid,
    /// [`VaultError::Platform`] for other store failures.
    pub fn delete(&self, filter: &CredentialFilter) -> Result<bool, VaultError> {
        if !filter.has_ssid() {
            return Err(VaultError::InvalidArgument("ssid must not be empty".to_owned()));
        }
        let query = filter.query();

        match self.store.find(&query) {
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                debug!(ssid = ?filter.ssid, "no credential to delete");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        match self.store.delete(&query) {
            Ok(removed) => {
                info!(ssid = ?filter.ssid, removed, "credential deleted");
                Ok(true)
            }
            Err(StoreError::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
