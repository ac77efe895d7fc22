//! eap8021x: 802.1x credentials, certificate trust and EAP profiles.
//!
//! The crate keeps no durable state of its own. Secrets and certificates live
//! in a [`store::SecureStore`], trust assertions in a [`store::TrustStore`]
//! and profiles behind a [`profile::ProfileController`]; the vault, trust
//! manager and profile adapter translate typed requests into calls on those
//! capabilities.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod certificate;
pub mod config;
pub mod credential;
pub mod encoding;
pub mod logging;
pub mod profile;
pub mod store;
pub mod trust;
pub mod vault;
