//! Payload codec helpers.
//!
//! Control payloads always travel as JSON. Broadcast events use the
//! simulator's configured [`WireFormat`]: JSON for browser dashboards, or
//! MessagePack for compact backend consumers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NetError;

/// Encoding used for broadcast event payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireFormat {
    #[default]
    Json,
    MessagePack,
}

impl WireFormat {
    /// Encode `value` in this format.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if serialisation fails.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, NetError> {
        match self {
            Self::Json => encode_json(value),
            Self::MessagePack => encode(value),
        }
    }

    /// Decode `bytes` in this format.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if deserialisation fails.
    pub fn decode<'a, T: Deserialize<'a>>(self, bytes: &'a [u8]) -> Result<T, NetError> {
        match self {
            Self::Json => decode_json(bytes),
            Self::MessagePack => decode(bytes),
        }
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "msgpack" | "messagepack" => Ok(Self::MessagePack),
            other => Err(format!("unknown wire format: {other}")),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::MessagePack => "msgpack",
        })
    }
}

/// Encode a value to MessagePack bytes.
///
/// # Errors
///
/// Returns [`NetError::Encode`] if serialisation fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, NetError> {
    rmp_serde::to_vec_named(value).map_err(NetError::Encode)
}

/// Decode a value from MessagePack bytes.
///
/// # Errors
///
/// Returns [`NetError::Decode`] if deserialisation fails.
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, NetError> {
    rmp_serde::from_slice(bytes).map_err(NetError::Decode)
}

/// Encode a value to JSON bytes.
///
/// # Errors
///
/// Returns [`NetError::Json`] if serialisation fails.
pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>, NetError> {
    serde_json::to_vec(value).map_err(NetError::Json)
}

/// Decode a value from JSON bytes. An empty payload decodes as `null`, so
/// requests without a body can target types with all-default fields.
///
/// # Errors
///
/// Returns [`NetError::Json`] if deserialisation fails.
pub fn decode_json<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, NetError> {
    let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        bytes
    };
    serde_json::from_slice(bytes).map_err(NetError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct TestMsg {
        value: u32,
        name: String,
    }

    #[test]
    fn test_wire_format_parse() {
        assert_eq!("json".parse::<WireFormat>().unwrap(), WireFormat::Json);
        assert_eq!("MsgPack".parse::<WireFormat>().unwrap(), WireFormat::MessagePack);
        assert!("xml".parse::<WireFormat>().is_err());
        assert_eq!(WireFormat::MessagePack.to_string(), "msgpack");
    }

    #[test]
    fn test_wire_format_encodings_differ() {
        let msg = TestMsg {
            value: 7,
            name: "bus".to_string(),
        };
        let json = WireFormat::Json.encode(&msg).unwrap();
        let packed = WireFormat::MessagePack.encode(&msg).unwrap();
        assert_eq!(json, br#"{"value":7,"name":"bus"}"#);
        assert_ne!(json, packed);
        let restored: TestMsg = WireFormat::MessagePack.decode(&packed).unwrap();
        assert_eq!(restored, msg);
    }

    #[test]
    fn test_msgpack_keeps_field_names() {
        let msg = TestMsg {
            value: 42,
            name: "hello".to_string(),
        };
        let bytes = encode(&msg).unwrap();
        let restored: TestMsg = decode(&bytes).unwrap();
        assert_eq!(msg, restored);
    }

    #[test]
    fn test_decode_invalid_bytes() {
        let result: Result<TestMsg, _> = decode(&[0xFF, 0xFF]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_json_payload_is_null() {
        let value: Option<TestMsg> = decode_json(b"").unwrap();
        assert!(value.is_none());
        let value: Option<TestMsg> = decode_json(b"  \n").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_decode_json_error() {
        let result: Result<TestMsg, _> = decode_json(b"{\"value\": \"nope\"}");
        assert!(matches!(result, Err(NetError::Json(_))));
    }
}
