//! Certificate import, trust assertion and verification.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::certificate::{Certificate, CertificateError, PemSource};
use crate::store::{
    Attribute, Attributes, Item, ItemClass, Keychain, NewItem, Query, SecureStore, StoreError,
    TrustDomain, TrustResult, TrustStore,
};

/// Access group suffix shared with the network extension.
pub const NETWORK_EXTENSION_SHARING: &str = "com.apple.networkextensionsharing";

/// Trust manager error types.
#[derive(Debug, Error)]
pub enum TrustError {
    /// A required argument was missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// No PEM content could be read.
    #[error("unable to parse pem file")]
    Parse,
    /// The PEM payload was not a decodable certificate.
    #[error("unable to decode certificate: {0}")]
    Decode(String),
    /// The secure store failed while storing or fetching the certificate.
    #[error("unable to store certificate {label}: {source}")]
    Platform {
        /// Label of the certificate involved.
        label: String,
        /// Original store status.
        #[source]
        source: StoreError,
    },
    /// The trust store rejected the assertion.
    #[error("unable to trust certificate {label}: {source}")]
    TrustRejected {
        /// Label of the certificate involved.
        label: String,
        /// Original store status.
        #[source]
        source: StoreError,
    },
}

impl TrustError {
    /// Platform status code, when the failure came from a store.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Platform { source, .. } | Self::TrustRejected { source, .. } => {
                Some(source.code())
            }
            _ => None,
        }
    }
}

impl From<CertificateError> for TrustError {
    fn from(error: CertificateError) -> Self {
        match error {
            CertificateError::Parse => Self::Parse,
            CertificateError::Decode(message) => Self::Decode(message),
        }
    }
}

/// Stored certificate, resolved from the store after import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateHandle {
    label: String,
    der: Vec<u8>,
    keychain: Keychain,
}

impl CertificateHandle {
    /// Deduplication label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// DER bytes as held by the store.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Keychain the certificate lives in.
    pub fn keychain(&self) -> Keychain {
        self.keychain
    }
}

/// Imports certificates into a secure store and manages their trust.
#[derive(Clone)]
pub struct CertificateTrustManager {
    store: Arc<dyn SecureStore>,
    trust: Arc<dyn TrustStore>,
    keychain: Keychain,
}

impl CertificateTrustManager {
    /// Manager writing certificates into the user keychain.
    pub fn new(store: Arc<dyn SecureStore>, trust: Arc<dyn TrustStore>) -> Self {
        Self {
            store,
            trust,
            keychain: Keychain::User,
        }
    }

    /// Write certificates into `keychain` instead.
    pub fn with_keychain(mut self, keychain: Keychain) -> Self {
        self.keychain = keychain;
        self
    }

    /// Import a PEM certificate and return its stored handle.
    ///
    /// Importing the same certificate twice is not an error: a duplicate
    /// insert counts as success and the existing item is returned. The item
    /// is always re-read by label afterwards, since a duplicate insert hands
    /// back nothing usable.
    ///
    /// With a `team_id`, the item joins the
    /// `<team_id>.com.apple.networkextensionsharing` access group.
    ///
    /// # Errors
    ///
    /// [`TrustError::Parse`] / [`TrustError::Decode`] for bad input,
    /// [`TrustError::Platform`] when the store refuses the insert or the
    /// follow-up lookup.
    pub fn import_certificate(
        &self,
        source: &PemSource,
        team_id: Option<&str>,
    ) -> Result<CertificateHandle, TrustError> {
        let certificate = Certificate::from_source(source)?;
        let label = certificate.label().to_owned();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::Label, label.clone());
        if let Some(team_id) = team_id.filter(|t| !t.is_empty()) {
            attributes.insert(
                Attribute::AccessGroup,
                format!("{team_id}.{NETWORK_EXTENSION_SHARING}"),
            );
        }

        let insert = self.store.insert(NewItem {
            class: ItemClass::Certificate,
            keychain: self.keychain,
            attributes,
            data: Some(certificate.der().to_vec()),
            access: None,
        });
        match insert {
            Ok(()) => info!(label = %label, "certificate added"),
            Err(StoreError::DuplicateItem) => debug!(label = %label, "certificate already present"),
            Err(source) => {
                warn!(label = %label, status = source.code(), "failed to add certificate");
                return Err(TrustError::Platform { label, source });
            }
        }

        let query = Query::new(ItemClass::Certificate, self.keychain)
            .filter(Attribute::Label, Some(label.as_str()))
            .with_data(true);
        let item = self
            .store
            .find(&query)
            .and_then(|items| items.into_iter().next().ok_or(StoreError::NotFound))
            .map_err(|source| TrustError::Platform {
                label: label.clone(),
                source,
            })?;

        Ok(CertificateHandle {
            der: item.data.unwrap_or_else(|| certificate.der().to_vec()),
            label,
            keychain: self.keychain,
        })
    }

    /// Record a trust assertion for an imported certificate.
    ///
    /// # Errors
    ///
    /// [`TrustError::TrustRejected`] when the trust store refuses it.
    pub fn trust(
        &self,
        handle: &CertificateHandle,
        domain: TrustDomain,
        result: TrustResult,
    ) -> Result<(), TrustError> {
        self.trust
            .set_trust(handle.der(), domain, result)
            .map_err(|source| {
                warn!(label = %handle.label(), status = source.code(), "trust assertion rejected");
                TrustError::TrustRejected {
                    label: handle.label().to_owned(),
                    source,
                }
            })?;
        info!(label = %handle.label(), ?domain, ?result, "certificate trusted");
        Ok(())
    }

    /// Whether the certificate is in the store and has a trust assertion in
    /// `domain`. Any failure along the way reads as `false`.
    pub fn verify(&self, source: &PemSource, domain: TrustDomain) -> bool {
        let certificate = match Certificate::from_source(source) {
            Ok(certificate) => certificate,
            Err(e) => {
                debug!(error = %e, "verification input not a certificate");
                return false;
            }
        };

        let query = Query::new(ItemClass::Certificate, self.keychain)
            .filter(Attribute::Label, Some(certificate.label()))
            .with_data(true);
        let Some(stored) = self
            .store
            .find(&query)
            .ok()
            .and_then(|items| items.into_iter().next())
            .and_then(|item| item.data)
        else {
            debug!(label = %certificate.label(), "certificate not in store");
            return false;
        };

        match self.trust.trust_settings(&stored, domain) {
            Ok(Some(_)) => true,
            Ok(None) => {
                debug!(label = %certificate.label(), ?domain, "no trust settings");
                false
            }
            Err(e) => {
                debug!(
                    label = %certificate.label(),
                    status = e.code(),
                    "trust settings unreadable"
                );
                false
            }
        }
    }

    /// Client identity with `label` (and `kind`, when given), or `None`.
    ///
    /// # Errors
    ///
    /// [`TrustError::InvalidArgument`] for an empty label,
    /// [`TrustError::Platform`] for store failures other than "not found".
    pub fn identity(&self, label: &str, kind: Option<&str>) -> Result<Option<Item>, TrustError> {
        if label.is_empty() {
            return Err(TrustError::InvalidArgument("label must not be empty".to_owned()));
        }
        let query = Query::new(ItemClass::Identity, self.keychain)
            .filter(Attribute::Label, Some(label))
            .filter(Attribute::Description, kind)
            .with_data(true);
        match self.store.find(&query) {
            Ok(items) => Ok(items.into_iter().next()),
            Err(StoreError::NotFound) => Ok(None),
            Err(source) => Err(TrustError::Platform {
                label: label.to_owned(),
                source,
            }),
        }
    }
}
