//! 802.1x credentials as stored in the secure store.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::access::AccessPolicy;
use crate::store::{Attribute, Item};

/// Kind recorded for 802.1x passwords by the system Wi-Fi stack.
pub const DEFAULT_KIND: &str = "802.1x Password";

/// Service prefix the system Wi-Fi stack looks up per ssid.
pub const WLAN_SERVICE_PREFIX: &str = "com.apple.network.eap.user.item.wlan.ssid.";

/// Secret value that never appears in logs.
///
/// Debug and serialized output always show `[REDACTED]`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    /// Wrap a secret.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Serialize for SecretValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

/// Secret tied to a network identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EapCredential {
    /// Network identifier; doubles as the item label.
    pub ssid: String,
    /// Account name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Protected payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretValue>,
    /// Free-form discriminator recorded as the item description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Note recorded with the item. Not part of its identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Service name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Who may decrypt the password. Applied on write, never read back.
    #[serde(skip)]
    pub access_control: Option<AccessPolicy>,
}

impl EapCredential {
    /// Credential with only an ssid.
    pub fn new(ssid: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            username: None,
            password: None,
            kind: None,
            comment: None,
            service: None,
            access_control: None,
        }
    }

    /// Credential laid out the way the system Wi-Fi stack expects: kind
    /// [`DEFAULT_KIND`] and service [`wlan_service`] for the ssid.
    pub fn wlan(
        ssid: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let ssid = ssid.into();
        let service = wlan_service(WLAN_SERVICE_PREFIX, &ssid);
        Self::new(ssid)
            .with_username(username)
            .with_password(password)
            .with_kind(DEFAULT_KIND)
            .with_service(service)
    }

    /// Set the account name.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretValue::new(password));
        self
    }

    /// Set the kind.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the service.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Set the access policy applied when the credential is saved.
    pub fn with_access_control(mut self, policy: AccessPolicy) -> Self {
        self.access_control = Some(policy);
        self
    }

    /// Rebuild a credential from a stored item. `None` if the item has no label.
    ///
    /// The password is only present when the item was fetched with its
    /// payload and the payload is valid UTF-8.
    pub fn from_item(item: &Item) -> Option<Self> {
        let owned = |attribute| item.attribute(attribute).map(str::to_owned);
        let ssid = owned(Attribute::Label).filter(|ssid| !ssid.is_empty())?;
        let password = item
            .data
            .as_ref()
            .and_then(|data| String::from_utf8(data.clone()).ok())
            .map(SecretValue);
        Some(Self {
            ssid,
            username: owned(Attribute::Account),
            password,
            kind: owned(Attribute::Description),
            comment: owned(Attribute::Comment),
            service: owned(Attribute::Service),
            access_control: None,
        })
    }
}

/// Service name the system Wi-Fi stack uses for `ssid`.
pub fn wlan_service(prefix: &str, ssid: &str) -> String {
    format!("{prefix}{ssid}")
}
