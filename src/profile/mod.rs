//! EAP 802.1x network profiles.
//!
//! [`Eap8021xProfile`] is the typed domain model; [`RawProfile`] is the
//! controller's numeric representation. [`ProfileAdapter`] translates between
//! the two and otherwise delegates to a [`ProfileController`].

mod controller;
mod types;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use controller::{
    FileProfileController, InMemoryProfileController, ProfileController, RawProfile,
};
pub use types::{EapType, InnerAuthType, ParseEnumError, SecurityType};

/// EAP 802.1x profile bound to a network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eap8021xProfile {
    /// Controller-assigned identifier; absent until created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    /// Network identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_defined_name: Option<String>,
    /// Domain name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    /// Outer (anonymous) identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_identity: Option<String>,
    /// Accepted EAP methods, in preference order.
    #[serde(default)]
    pub accept_eap_types: Vec<EapType>,
    /// Security level.
    #[serde(default)]
    pub security_type: SecurityType,
    /// TTLS inner authentication.
    #[serde(default)]
    pub ttls_inner_auth_type: InnerAuthType,
    /// Trusted server names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_server_name: Option<Vec<String>>,
    /// Trusted DER certificates.
    #[serde(
        with = "crate::encoding::base64_list",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub trusted_certificate: Option<Vec<Vec<u8>>>,
}

impl From<RawProfile> for Eap8021xProfile {
    fn from(raw: RawProfile) -> Self {
        Self {
            profile_id: raw.profile_id,
            ssid: raw.ssid,
            user_defined_name: raw.user_defined_name,
            domain_name: raw.domain_name,
            outer_identity: raw.outer_identity,
            accept_eap_types: raw
                .accept_eap_types
                .unwrap_or_default()
                .into_iter()
                .map(EapType::from_raw)
                .collect(),
            security_type: SecurityType::from_raw(raw.security_type),
            ttls_inner_auth_type: InnerAuthType::from_raw(raw.ttls_inner_auth_type),
            trusted_server_name: raw.trusted_server_name,
            trusted_certificate: raw.trusted_certificate,
        }
    }
}

impl From<Eap8021xProfile> for RawProfile {
    fn from(profile: Eap8021xProfile) -> Self {
        let accept_eap_types = (!profile.accept_eap_types.is_empty()).then(|| {
            profile
                .accept_eap_types
                .iter()
                .map(|eap| eap.code())
                .collect()
        });
        Self {
            profile_id: profile.profile_id,
            ssid: profile.ssid,
            user_defined_name: profile.user_defined_name,
            domain_name: profile.domain_name,
            outer_identity: profile.outer_identity,
            accept_eap_types,
            security_type: profile.security_type.code(),
            ttls_inner_auth_type: profile.ttls_inner_auth_type.code(),
            trusted_server_name: profile.trusted_server_name,
            trusted_certificate: profile.trusted_certificate,
        }
    }
}

/// How to pick the profile to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSelector<'a> {
    /// By controller-assigned identifier.
    Id(&'a str),
    /// By network identifier.
    Ssid(&'a str),
}

/// Typed facade over a [`ProfileController`].
#[derive(Clone)]
pub struct ProfileAdapter {
    controller: Arc<dyn ProfileController>,
}

impl ProfileAdapter {
    /// Adapter over `controller`.
    pub fn new(controller: Arc<dyn ProfileController>) -> Self {
        Self { controller }
    }

    /// Hand the profile to the controller. Returns the controller's verdict.
    pub fn create_profile(&self, profile: Eap8021xProfile) -> bool {
        debug!(ssid = ?profile.ssid, "creating profile");
        self.controller.create(profile.into())
    }

    /// Every profile the controller knows.
    pub fn list_profiles(&self) -> Vec<Eap8021xProfile> {
        self.controller.list().into_iter().map(Into::into).collect()
    }

    /// Profile bound to `ssid`.
    pub fn profile(&self, ssid: &str) -> Option<Eap8021xProfile> {
        self.controller.get(ssid).map(Into::into)
    }

    /// Remove a profile by id or ssid.
    pub fn remove_profile(&self, selector: ProfileSelector<'_>) -> bool {
        debug!(?selector, "removing profile");
        match selector {
            ProfileSelector::Id(id) => self.controller.remove_by_id(id),
            ProfileSelector::Ssid(ssid) => self.controller.remove_by_ssid(ssid),
        }
    }

    /// Remove `profile`, by id when it has one and otherwise by ssid.
    pub fn remove(&self, profile: &Eap8021xProfile) -> bool {
        let nonempty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        if let Some(id) = nonempty(&profile.profile_id) {
            return self.remove_profile(ProfileSelector::Id(&id));
        }
        match nonempty(&profile.ssid) {
            Some(ssid) => self.remove_profile(ProfileSelector::Ssid(&ssid)),
            None => false,
        }
    }
}
