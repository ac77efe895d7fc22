//! PEM framing and certificate labels.
//!
//! Only as much parsing as it takes to give a certificate a stable identity:
//! strip the PEM markers, base64-decode to DER, and read the subject.

use std::fs;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tracing::debug;
use x509_parser::prelude::{FromDer, X509Certificate};

/// Opening PEM marker.
pub const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";

/// Closing PEM marker.
pub const PEM_END: &str = "-----END CERTIFICATE-----";

/// Certificate parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertificateError {
    /// Neither source yielded any PEM content.
    #[error("unable to parse pem: no certificate content")]
    Parse,
    /// The payload was not valid base64 or not a DER certificate.
    #[error("unable to decode certificate: {0}")]
    Decode(String),
}

/// Where to read a PEM certificate from.
///
/// Non-empty text wins over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PemSource {
    /// Inline PEM text.
    pub text: Option<String>,
    /// Path to a PEM file.
    pub path: Option<PathBuf>,
}

impl PemSource {
    /// Source from optional inline text and an optional file.
    pub fn new(text: Option<String>, path: Option<PathBuf>) -> Self {
        Self { text, path }
    }

    /// Inline PEM text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            path: None,
        }
    }

    /// PEM file on disk.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            text: None,
            path: Some(path.into()),
        }
    }

    fn resolve(&self) -> Option<String> {
        if let Some(text) = self.text.as_ref().filter(|t| !t.trim().is_empty()) {
            return Some(text.clone());
        }
        let path = self.path.as_ref()?;
        fs::read_to_string(path)
            .map_err(|e| debug!(path = %path.display(), error = %e, "pem file not readable"))
            .ok()
            .filter(|pem| !pem.trim().is_empty())
    }
}

/// Base64 payload of the PEM certificate, whitespace removed.
///
/// Takes the body after the last `BEGIN` marker and before the following
/// `END` marker. Text without markers is taken as the payload itself.
pub fn certificate_base64(source: &PemSource) -> Option<String> {
    let pem = source.resolve()?;
    let body = pem
        .rsplit_once(PEM_BEGIN)
        .map_or(pem.as_str(), |(_, rest)| rest);
    let body = body.split_once(PEM_END).map_or(body, |(inner, _)| inner);
    let payload: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    (!payload.is_empty()).then_some(payload)
}

/// DER bytes of the PEM certificate.
///
/// # Errors
///
/// [`CertificateError::Parse`] when there is no content,
/// [`CertificateError::Decode`] for malformed base64.
pub fn certificate_der(source: &PemSource) -> Result<Vec<u8>, CertificateError> {
    let payload = certificate_base64(source).ok_or(CertificateError::Parse)?;
    STANDARD
        .decode(payload)
        .map_err(|e| CertificateError::Decode(format!("invalid base64: {e}")))
}

/// Deduplication label for a DER certificate.
///
/// The subject common name when present and non-empty, otherwise the
/// base64 of the DER subject sequence. Signature bytes never contribute, so
/// certificates re-issued with the same subject share a label.
///
/// # Errors
///
/// [`CertificateError::Decode`] when `der` is not a certificate or its
/// subject is empty.
pub fn derive_label(der: &[u8]) -> Result<String, CertificateError> {
    let (_, certificate) = X509Certificate::from_der(der)
        .map_err(|e| CertificateError::Decode(format!("invalid certificate: {e}")))?;
    let subject = certificate.subject();

    let common_name = subject
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .filter(|cn| !cn.is_empty());
    if let Some(common_name) = common_name {
        return Ok(common_name.to_owned());
    }

    let raw = subject.as_raw();
    if raw.is_empty() {
        return Err(CertificateError::Decode(
            "certificate has neither common name nor subject".to_owned(),
        ));
    }
    Ok(STANDARD.encode(raw))
}

/// DER certificate with its derived label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    label: String,
}

impl Certificate {
    /// Parse DER bytes and derive the label.
    ///
    /// # Errors
    ///
    /// Propagates [`derive_label`] failures.
    pub fn from_der(der: Vec<u8>) -> Result<Self, CertificateError> {
        let label = derive_label(&der)?;
        Ok(Self { der, label })
    }

    /// Read, decode and label a PEM certificate.
    ///
    /// # Errors
    ///
    /// See [`certificate_der`] and [`derive_label`].
    pub fn from_source(source: &PemSource) -> Result<Self, CertificateError> {
        Self::from_der(certificate_der(source)?)
    }

    /// DER bytes.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Derived label.
    pub fn label(&self) -> &str {
        &self.label
    }
}
