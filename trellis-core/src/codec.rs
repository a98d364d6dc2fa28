//! Serialization codecs.
//!
//! The live-update handler persists its state as an opaque byte blob. The
//! codec decides the wire format; MessagePack is the default, JSON is there
//! for debugging and for hosts that store text.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Turns serializable values into bytes and back.
pub trait Codec {
    fn name(&self) -> &'static str;

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// MessagePack with named struct fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessagePackCodec;

impl Codec for MessagePackCodec {
    fn name(&self) -> &'static str {
        "messagepack"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Compact JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Codec selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    MessagePack,
    Json,
}

impl Codec for CodecKind {
    fn name(&self) -> &'static str {
        match self {
            CodecKind::MessagePack => MessagePackCodec.name(),
            CodecKind::Json => JsonCodec.name(),
        }
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            CodecKind::MessagePack => MessagePackCodec.encode(value),
            CodecKind::Json => JsonCodec.encode(value),
        }
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            CodecKind::MessagePack => MessagePackCodec.decode(bytes),
            CodecKind::Json => JsonCodec.decode(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    #[test]
    fn truncated_input_is_a_codec_error() {
        let bytes = MessagePackCodec.encode(&vec![1u32, 2, 3]).unwrap();
        let err = MessagePackCodec
            .decode::<Vec<u32>>(&bytes[..bytes.len() - 1])
            .unwrap_err();
        assert!(matches!(err, GraphError::Codec(_)));

        let err = JsonCodec.decode::<Vec<u32>>(b"[1, 2").unwrap_err();
        assert!(matches!(err, GraphError::Codec(_)));
    }

    #[test]
    fn codec_kind_delegates() {
        let json = CodecKind::Json.encode(&[1u8, 2]).unwrap();
        assert_eq!(json, b"[1,2]");
        assert_eq!(CodecKind::MessagePack.name(), "messagepack");
        assert_eq!(CodecKind::default(), CodecKind::MessagePack);
    }
}
