//! EAP method, security and inner-authentication enumerations.
//!
//! Codes mirror external registries (the IANA EAP method registry and the
//! profile controller's security levels), which keep growing. Conversion from
//! a raw code is total: unknown codes land in `Unrecognized` with the code
//! preserved, so a newer controller never breaks an older client.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A name that matched no variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    /// Enumeration being parsed.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}

/// Lowercase with separators dropped, so `EAP-FAST`, `eap_fast` and `eapfast` agree.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '\'')
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_named<T: Copy + fmt::Display>(
    known: &[T],
    from_raw: fn(i64) -> T,
    kind: &'static str,
    value: &str,
) -> Result<T, ParseEnumError> {
    if let Ok(code) = value.trim().parse::<i64>() {
        return Ok(from_raw(code));
    }
    let wanted = normalize(value);
    known
        .iter()
        .copied()
        .find(|variant| normalize(&variant.to_string()) == wanted)
        .ok_or_else(|| ParseEnumError {
            kind,
            value: value.to_owned(),
        })
}

/// EAP method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum EapType {
    /// Code 0.
    #[default]
    Invalid,
    /// Code 1.
    Identity,
    /// Code 2.
    Notification,
    /// Code 3.
    Nak,
    /// Code 4.
    Md5Challenge,
    /// Code 5.
    OneTimePassword,
    /// Code 6.
    GenericTokenCard,
    /// Code 13.
    Tls,
    /// Code 17.
    CiscoLeap,
    /// Code 18.
    EapSim,
    /// Code 19.
    SrpSha1,
    /// Code 21.
    Ttls,
    /// Code 23.
    EapAka,
    /// Code 25.
    Peap,
    /// Code 26.
    MsChapV2,
    /// Code 33.
    Extensions,
    /// Code 43.
    EapFast,
    /// Code 50.
    EapAkaPrime,
    /// Any code not listed above.
    Unrecognized(i64),
}

impl EapType {
    /// Every named variant.
    pub const KNOWN: [Self; 18] = [
        Self::Invalid,
        Self::Identity,
        Self::Notification,
        Self::Nak,
        Self::Md5Challenge,
        Self::OneTimePassword,
        Self::GenericTokenCard,
        Self::Tls,
        Self::CiscoLeap,
        Self::EapSim,
        Self::SrpSha1,
        Self::Ttls,
        Self::EapAka,
        Self::Peap,
        Self::MsChapV2,
        Self::Extensions,
        Self::EapFast,
        Self::EapAkaPrime,
    ];

    /// Variant for a raw registry code. Never fails.
    pub fn from_raw(code: i64) -> Self {
        match code {
            0 => Self::Invalid,
            1 => Self::Identity,
            2 => Self::Notification,
            3 => Self::Nak,
            4 => Self::Md5Challenge,
            5 => Self::OneTimePassword,
            6 => Self::GenericTokenCard,
            13 => Self::Tls,
            17 => Self::CiscoLeap,
            18 => Self::EapSim,
            19 => Self::SrpSha1,
            21 => Self::Ttls,
            23 => Self::EapAka,
            25 => Self::Peap,
            26 => Self::MsChapV2,
            33 => Self::Extensions,
            43 => Self::EapFast,
            50 => Self::EapAkaPrime,
            other => Self::Unrecognized(other),
        }
    }

    /// Raw registry code.
    pub fn code(self) -> i64 {
        match self {
            Self::Invalid => 0,
            Self::Identity => 1,
            Self::Notification => 2,
            Self::Nak => 3,
            Self::Md5Challenge => 4,
            Self::OneTimePassword => 5,
            Self::GenericTokenCard => 6,
            Self::Tls => 13,
            Self::CiscoLeap => 17,
            Self::EapSim => 18,
            Self::SrpSha1 => 19,
            Self::Ttls => 21,
            Self::EapAka => 23,
            Self::Peap => 25,
            Self::MsChapV2 => 26,
            Self::Extensions => 33,
            Self::EapFast => 43,
            Self::EapAkaPrime => 50,
            Self::Unrecognized(code) => code,
        }
    }
}

impl fmt::Display for EapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invalid => "Invalid",
            Self::Identity => "Identity",
            Self::Notification => "Notification",
            Self::Nak => "Nak",
            Self::Md5Challenge => "MD5-Challenge",
            Self::OneTimePassword => "One-Time Password",
            Self::GenericTokenCard => "Generic Token Card",
            Self::Tls => "TLS",
            Self::CiscoLeap => "Cisco LEAP",
            Self::EapSim => "EAP-SIM",
            Self::SrpSha1 => "SRP-SHA1",
            Self::Ttls => "TTLS",
            Self::EapAka => "EAP-AKA",
            Self::Peap => "PEAP",
            Self::MsChapV2 => "MSCHAPv2",
            Self::Extensions => "Extensions",
            Self::EapFast => "EAP-FAST",
            Self::EapAkaPrime => "EAP-AKA'",
            Self::Unrecognized(code) => return write!(f, "Unrecognized({code})"),
        };
        f.write_str(name)
    }
}

impl FromStr for EapType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_named(&Self::KNOWN, Self::from_raw, "EAP type", s)
    }
}

impl From<i64> for EapType {
    fn from(code: i64) -> Self {
        Self::from_raw(code)
    }
}

impl From<EapType> for i64 {
    fn from(value: EapType) -> Self {
        value.code()
    }
}

/// Wireless security level a profile applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum SecurityType {
    /// Code 0.
    #[default]
    Unknown,
    /// Code 1.
    Wep,
    /// Code 2.
    Wpa,
    /// Code 3.
    Wpa2,
    /// Code 4.
    Any,
    /// Any code not listed above.
    Unrecognized(i64),
}

impl SecurityType {
    /// Every named variant.
    pub const KNOWN: [Self; 5] = [Self::Unknown, Self::Wep, Self::Wpa, Self::Wpa2, Self::Any];

    /// Variant for a raw code. Never fails.
    pub fn from_raw(code: i64) -> Self {
        match code {
            0 => Self::Unknown,
            1 => Self::Wep,
            2 => Self::Wpa,
            3 => Self::Wpa2,
            4 => Self::Any,
            other => Self::Unrecognized(other),
        }
    }

    /// Raw code.
    pub fn code(self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Wep => 1,
            Self::Wpa => 2,
            Self::Wpa2 => 3,
            Self::Any => 4,
            Self::Unrecognized(code) => code,
        }
    }
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("Unknown"),
            Self::Wep => f.write_str("WEP"),
            Self::Wpa => f.write_str("WPA"),
            Self::Wpa2 => f.write_str("WPA2"),
            Self::Any => f.write_str("Any"),
            Self::Unrecognized(code) => write!(f, "Unrecognized({code})"),
        }
    }
}

impl FromStr for SecurityType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_named(&Self::KNOWN, Self::from_raw, "security type", s)
    }
}

impl From<i64> for SecurityType {
    fn from(code: i64) -> Self {
        Self::from_raw(code)
    }
}

impl From<SecurityType> for i64 {
    fn from(value: SecurityType) -> Self {
        value.code()
    }
}

/// Inner authentication used inside a TTLS tunnel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum InnerAuthType {
    /// Code 0.
    #[default]
    Unknown,
    /// Code 1.
    Pap,
    /// Code 2.
    Chap,
    /// Code 3.
    MsChap,
    /// Code 4.
    MsChapV2,
    /// Any code not listed above.
    Unrecognized(i64),
}

impl InnerAuthType {
    /// Every named variant.
    pub const KNOWN: [Self; 5] = [
        Self::Unknown,
        Self::Pap,
        Self::Chap,
        Self::MsChap,
        Self::MsChapV2,
    ];

    /// Variant for a raw code. Never fails.
    pub fn from_raw(code: i64) -> Self {
        match code {
            0 => Self::Unknown,
            1 => Self::Pap,
            2 => Self::Chap,
            3 => Self::MsChap,
            4 => Self::MsChapV2,
            other => Self::Unrecognized(other),
        }
    }

    /// Raw code.
    pub fn code(self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Pap => 1,
            Self::Chap => 2,
            Self::MsChap => 3,
            Self::MsChapV2 => 4,
            Self::Unrecognized(code) => code,
        }
    }
}

impl fmt::Display for InnerAuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("Unknown"),
            Self::Pap => f.write_str("PAP"),
            Self::Chap => f.write_str("CHAP"),
            Self::MsChap => f.write_str("MSCHAP"),
            Self::MsChapV2 => f.write_str("MSCHAPv2"),
            Self::Unrecognized(code) => write!(f, "Unrecognized({code})"),
        }
    }
}

impl FromStr for InnerAuthType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_named(&Self::KNOWN, Self::from_raw, "inner authentication type", s)
    }
}

impl From<i64> for InnerAuthType {
    fn from(code: i64) -> Self {
        Self::from_raw(code)
    }
}

impl From<InnerAuthType> for i64 {
    fn from(value: InnerAuthType) -> Self {
        value.code()
    }
}
