//! Serde helpers that encode binary blobs as standard base64 strings.
//!
//! Used wherever DER certificates or secret payloads land in a JSON document.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// `Option<Vec<u8>>` as an optional base64 string.
pub mod base64_option {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Engine, STANDARD};

    /// Serialize an optional blob.
    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional blob.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// `Vec<u8>` as a base64 string.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Engine, STANDARD};

    /// Serialize a blob.
    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    /// Deserialize a blob.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// `Option<Vec<Vec<u8>>>` as an optional list of base64 strings.
pub mod base64_list {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Engine, STANDARD};

    /// Serialize an optional list of blobs.
    pub fn serialize<S: Serializer>(
        value: &Option<Vec<Vec<u8>>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(blobs) => {
                let encoded: Vec<String> = blobs.iter().map(|blob| STANDARD.encode(blob)).collect();
                serializer.serialize_some(&encoded)
            }
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional list of blobs.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<Vec<u8>>>, D::Error> {
        let encoded: Option<Vec<String>> = Option::deserialize(deserializer)?;
        encoded
            .map(|list| {
                list.into_iter()
                    .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
                    .collect()
            })
            .transpose()
    }
}
