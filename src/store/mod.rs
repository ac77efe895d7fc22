//! Secure store capability.
//!
//! The vault and the trust manager never talk to a storage engine directly.
//! They build a [`Query`] and hand it to a [`SecureStore`]; trust assertions
//! go through a [`TrustStore`]. Failures come back in the platform status
//! space ([`StoreError`]) so callers can surface the original code.
//!
//! Two backends ship with the crate: [`InMemoryStore`] for tests and
//! [`FileStore`], a JSON document per keychain used by the CLI.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::Access;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::InMemoryStore;

/// `errSecItemNotFound`.
pub const STATUS_ITEM_NOT_FOUND: i32 = -25300;
/// `errSecDuplicateItem`.
pub const STATUS_DUPLICATE_ITEM: i32 = -25299;
/// `errSecParam`.
pub const STATUS_PARAM: i32 = -50;
/// `errSecIO`.
pub const STATUS_IO: i32 = -36;
/// `errSecDecode`.
pub const STATUS_DECODE: i32 = -26275;
/// `errAuthorizationDenied`.
pub const STATUS_AUTHORIZATION_DENIED: i32 = -60005;

/// Failure status reported by a store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No item matched the query.
    #[error("item not found")]
    NotFound,
    /// An item with the same identity already exists.
    #[error("item already exists")]
    DuplicateItem,
    /// The query was rejected by the store.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    /// Any other platform status, passed through untouched.
    #[error("store status {code}: {message}")]
    Other {
        /// Platform status code.
        code: i32,
        /// Human-readable message from the store.
        message: String,
    },
}

impl StoreError {
    /// Build an opaque platform error.
    pub fn other(code: i32, message: impl Into<String>) -> Self {
        Self::Other {
            code,
            message: message.into(),
        }
    }

    /// Numeric platform status for diagnostics.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound => STATUS_ITEM_NOT_FOUND,
            Self::DuplicateItem => STATUS_DUPLICATE_ITEM,
            Self::InvalidParam(_) => STATUS_PARAM,
            Self::Other { code, .. } => *code,
        }
    }
}

/// Kind of item held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemClass {
    /// A password-like secret.
    GenericPassword,
    /// A DER certificate.
    Certificate,
    /// A certificate paired with its private key.
    Identity,
}

/// Which keychain an item lives in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Keychain {
    /// The calling user's keychain.
    #[default]
    User,
    /// The machine-wide keychain.
    System,
}

impl Keychain {
    /// `User` or `System` from the usual boolean flag.
    pub fn from_system_flag(use_system: bool) -> Self {
        if use_system {
            Self::System
        } else {
            Self::User
        }
    }
}

/// Searchable item attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Item label. Holds the ssid for credentials and the derived label for certificates.
    Label,
    /// Account name.
    Account,
    /// Free-form kind.
    Description,
    /// User comment.
    Comment,
    /// Service name.
    Service,
    /// Access group shared between applications.
    AccessGroup,
}

/// Attribute map carried by queries and items.
pub type Attributes = BTreeMap<Attribute, String>;

/// How many items a query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchLimit {
    /// First match only.
    One,
    /// Every match.
    All,
}

/// Attribute-filter query against a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Item class to search.
    pub class: ItemClass,
    /// Keychain to search.
    pub keychain: Keychain,
    /// Exact-match filters. Absent attributes are wildcards.
    pub attributes: Attributes,
    /// Result cardinality.
    pub limit: MatchLimit,
    /// Whether the protected payload should be returned.
    pub return_data: bool,
}

impl Query {
    /// Query matching every item of `class`, first match only, no payload.
    pub fn new(class: ItemClass, keychain: Keychain) -> Self {
        Self {
            class,
            keychain,
            attributes: Attributes::new(),
            limit: MatchLimit::One,
            return_data: false,
        }
    }

    /// Add an exact-match filter iff `value` is present and non-empty.
    ///
    /// This is the only place filters are added, so every operation built on
    /// top of it shares the same wildcard semantics.
    pub fn filter(mut self, attribute: Attribute, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.attributes.insert(attribute, value.to_owned());
        }
        self
    }

    /// Set the result cardinality.
    pub fn with_limit(mut self, limit: MatchLimit) -> Self {
        self.limit = limit;
        self
    }

    /// Request the protected payload.
    pub fn with_data(mut self, return_data: bool) -> Self {
        self.return_data = return_data;
        self
    }

    /// Whether an item of `class` with `attributes` satisfies every filter.
    pub fn matches(&self, class: ItemClass, attributes: &Attributes) -> bool {
        class == self.class
            && self
                .attributes
                .iter()
                .all(|(key, wanted)| attributes.get(key) == Some(wanted))
    }

    /// Reject query shapes the store does not support.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidParam`] for a multi-match query that also
    /// asks for payload data.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.limit == MatchLimit::All && self.return_data {
            return Err(StoreError::InvalidParam(
                "payload data cannot be returned from a multi-match query".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Item to be inserted.
#[derive(Clone)]
pub struct NewItem {
    /// Item class.
    pub class: ItemClass,
    /// Destination keychain.
    pub keychain: Keychain,
    /// Attributes to record.
    pub attributes: Attributes,
    /// Protected payload.
    pub data: Option<Vec<u8>>,
    /// Access object restricting who may decrypt the payload.
    pub access: Option<Access>,
}

impl fmt::Debug for NewItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewItem")
            .field("class", &self.class)
            .field("keychain", &self.keychain)
            .field("attributes", &self.attributes)
            .field("data", &self.data.as_ref().map(|_| "[REDACTED]"))
            .field("access", &self.access)
            .finish()
    }
}

/// Item as held by (and returned from) a store.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Item class.
    pub class: ItemClass,
    /// Recorded attributes.
    pub attributes: Attributes,
    /// Protected payload; `None` when not requested or never set.
    #[serde(with = "crate::encoding::base64_option", default)]
    pub data: Option<Vec<u8>>,
    /// Access object attached at write time.
    #[serde(default)]
    pub access: Option<Access>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("class", &self.class)
            .field("attributes", &self.attributes)
            .field("data", &self.data.as_ref().map(|_| "[REDACTED]"))
            .field("access", &self.access)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Attributes that together identify a password slot.
const PASSWORD_IDENTITY: [Attribute; 4] = [
    Attribute::Label,
    Attribute::Account,
    Attribute::Description,
    Attribute::Service,
];

impl Item {
    /// Materialize an insert request.
    pub fn from_new(item: NewItem) -> Self {
        Self {
            class: item.class,
            attributes: item.attributes,
            data: item.data,
            access: item.access,
            created_at: Utc::now(),
        }
    }

    /// Attribute value, if recorded.
    pub fn attribute(&self, attribute: Attribute) -> Option<&str> {
        self.attributes.get(&attribute).map(String::as_str)
    }

    /// Whether `self` and `other` would occupy the same slot.
    ///
    /// Passwords are unique by label, account, description and service
    /// together, an absent value being a value of its own. Certificates and
    /// identities are unique by their DER bytes.
    pub fn collides_with(&self, other: &Item) -> bool {
        if self.class != other.class {
            return false;
        }
        match self.class {
            ItemClass::GenericPassword => PASSWORD_IDENTITY
                .iter()
                .all(|&attribute| self.attribute(attribute) == other.attribute(attribute)),
            ItemClass::Certificate | ItemClass::Identity => self.data == other.data,
        }
    }

    fn project(&self, return_data: bool) -> Self {
        let mut item = self.clone();
        if !return_data {
            item.data = None;
        }
        item
    }
}

/// Secure storage engine.
///
/// Each call is atomic on its own. Nothing spans calls.
pub trait SecureStore: Send + Sync {
    /// Insert a new item.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateItem`] when the item's slot is taken, or any
    /// platform failure.
    fn insert(&self, item: NewItem) -> Result<(), StoreError>;

    /// Find items matching `query`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when nothing matches,
    /// [`StoreError::InvalidParam`] for unsupported query shapes.
    fn find(&self, query: &Query) -> Result<Vec<Item>, StoreError>;

    /// Delete every item matching `query`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when nothing matches.
    fn delete(&self, query: &Query) -> Result<usize, StoreError>;
}

/// Scope of a trust assertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustDomain {
    /// Current user only.
    #[default]
    User,
    /// Every user of the machine.
    System,
}

/// Outcome recorded by a trust assertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustResult {
    /// Trusted as a root certificate.
    TrustRoot,
    /// Trusted as a root even though it is not self-signed.
    #[default]
    TrustAsRoot,
    /// Explicitly distrusted.
    Deny,
    /// Neither trusted nor distrusted; evaluation proceeds normally.
    Unspecified,
}

impl TrustResult {
    /// Numeric code in the platform registry.
    pub fn code(self) -> i32 {
        match self {
            Self::TrustRoot => 1,
            Self::TrustAsRoot => 2,
            Self::Deny => 3,
            Self::Unspecified => 4,
        }
    }
}

/// Trust settings stored for one certificate in one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSettings {
    /// Recorded outcome.
    pub result: TrustResult,
    /// When the assertion was last written.
    pub modified_at: DateTime<Utc>,
}

/// Trust-settings store.
pub trait TrustStore: Send + Sync {
    /// Assert trust for a DER certificate in `domain`.
    ///
    /// # Errors
    ///
    /// Any platform rejection of the assertion.
    fn set_trust(
        &self,
        certificate: &[u8],
        domain: TrustDomain,
        result: TrustResult,
    ) -> Result<(), StoreError>;

    /// Trust settings for a DER certificate, `None` when none were asserted.
    ///
    /// # Errors
    ///
    /// Any platform failure reading the settings.
    fn trust_settings(
        &self,
        certificate: &[u8],
        domain: TrustDomain,
    ) -> Result<Option<TrustSettings>, StoreError>;
}

/// Append `item` to `items` unless its slot is taken.
pub(crate) fn insert_into(items: &mut Vec<Item>, item: NewItem) -> Result<(), StoreError> {
    let item = Item::from_new(item);
    if items.iter().any(|existing| existing.collides_with(&item)) {
        return Err(StoreError::DuplicateItem);
    }
    items.push(item);
    Ok(())
}

/// Items matching `query`, honouring its limit and payload flag.
pub(crate) fn select(items: &[Item], query: &Query) -> Result<Vec<Item>, StoreError> {
    query.validate()?;
    let mut matched = items
        .iter()
        .filter(|item| query.matches(item.class, &item.attributes))
        .map(|item| item.project(query.return_data));
    let found: Vec<Item> = match query.limit {
        MatchLimit::One => matched.next().into_iter().collect(),
        MatchLimit::All => matched.collect(),
    };
    if found.is_empty() {
        return Err(StoreError::NotFound);
    }
    Ok(found)
}

/// Remove every item matching `query`'s filters.
pub(crate) fn delete_from(items: &mut Vec<Item>, query: &Query) -> Result<usize, StoreError> {
    let before = items.len();
    items.retain(|item| !query.matches(item.class, &item.attributes));
    let removed = before.saturating_sub(items.len());
    if removed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(removed)
}
