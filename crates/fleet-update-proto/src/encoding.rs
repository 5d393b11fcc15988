//! Payload encodings understood by subscribers.

use crate::messages::MessageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Byte encoding used for message payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// UTF-8 JSON with camelCase field names
    #[default]
    Json,
    /// CBOR with the same field names as JSON
    Cbor,
}

impl PayloadEncoding {
    /// Serialize a value.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>, MessageError> {
        match self {
            Self::Json => {
                serde_json::to_vec(value).map_err(|e| MessageError::Serialize(e.to_string()))
            }
            Self::Cbor => {
                let mut bytes = Vec::new();
                ciborium::into_writer(value, &mut bytes)
                    .map_err(|e| MessageError::Serialize(e.to_string()))?;
                Ok(bytes)
            }
        }
    }

    /// Deserialize a value.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, MessageError> {
        match self {
            Self::Json => {
                serde_json::from_slice(bytes).map_err(|e| MessageError::Deserialize(e.to_string()))
            }
            Self::Cbor => {
                ciborium::from_reader(bytes).map_err(|e| MessageError::Deserialize(e.to_string()))
            }
        }
    }

    /// Content type advertised for this encoding.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Cbor => "application/cbor",
        }
    }
}

impl FromStr for PayloadEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "cbor" => Ok(Self::Cbor),
            other => Err(format!("unknown payload encoding '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_encoding_names() {
        assert_eq!("json".parse::<PayloadEncoding>(), Ok(PayloadEncoding::Json));
        assert_eq!(" CBOR ".parse::<PayloadEncoding>(), Ok(PayloadEncoding::Cbor));
        assert!("protobuf".parse::<PayloadEncoding>().is_err());
    }

    #[test]
    fn cbor_and_json_differ_on_the_wire() {
        let value = serde_json::json!({ "version": "2.5.0" });
        let json = PayloadEncoding::Json.encode(&value).unwrap();
        let cbor = PayloadEncoding::Cbor.encode(&value).unwrap();

        assert_ne!(json, cbor);
        let back: serde_json::Value = PayloadEncoding::Cbor.decode(&cbor).unwrap();
        assert_eq!(back, value);
    }
}
