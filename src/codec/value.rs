//! Value serialization.
//!
//! Values are opaque to the store; a [`ValueCodec`] turns them into blob
//! content and back. YAML is the default, JSON is available for callers
//! that prefer it. Any codec works as long as `decode(encode(v)) == v`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::error::{CodecError, CodecResult};

/// Serializes values to blob content.
pub trait ValueCodec: Send + Sync {
    /// short format name used in error messages
    fn format(&self) -> &'static str;

    fn encode<V: Serialize + ?Sized>(&self, value: &V) -> CodecResult<Vec<u8>>;

    fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<V>;
}

/// YAML documents, one per entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl ValueCodec for YamlCodec {
    fn format(&self) -> &'static str {
        "yaml"
    }

    fn encode<V: Serialize + ?Sized>(&self, value: &V) -> CodecResult<Vec<u8>> {
        serde_yaml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| CodecError::encode(self.format(), e))
    }

    fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<V> {
        serde_yaml::from_slice(bytes).map_err(|e| CodecError::decode(self.format(), e))
    }
}

/// Pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn format(&self) -> &'static str {
        "json"
    }

    fn encode<V: Serialize + ?Sized>(&self, value: &V) -> CodecResult<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(value).map_err(|e| CodecError::encode(self.format(), e))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<V> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::decode(self.format(), e))
    }
}
