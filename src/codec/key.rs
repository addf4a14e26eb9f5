//! Key canonicalization.
//!
//! A key becomes the name of one blob entry in the root tree (its *path
//! token*). String keys are used verbatim. Structured keys are serialized
//! with bincode and hex-encoded, which keeps the token path-safe.
//!
//! The inverse is best effort: string keys and encoded keys share one
//! namespace, so a string key whose text happens to be the hex encoding of
//! a structured key comes back as that structured key. Tokens that do not
//! decode are returned as `Key::Str`.

use std::fmt::Debug;

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec::error::{CodecError, CodecResult};
use crate::storage::EntryName;

/// A key as supplied to, or recovered from, the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key<T = String> {
    /// a plain string key, stored under its own text
    Str(String),
    /// any serializable value, stored under its encoded form
    ///
    /// The value must encode to at least one byte: `()`, unit structs and
    /// empty tuples have no encoding and are rejected as an empty key.
    Structured(T),
}

impl Key<String> {
    pub fn str(key: impl Into<String>) -> Self {
        Key::Str(key.into())
    }
}

impl<T> Key<T> {
    pub fn structured(value: T) -> Self {
        Key::Structured(value)
    }

    /// the structured value, if this key decoded as one
    pub fn as_structured(&self) -> Option<&T> {
        match self {
            Key::Structured(value) => Some(value),
            Key::Str(_) => None,
        }
    }
}

/// Anything that can address an entry in the store.
pub trait StoreKey {
    /// the entry name this key is stored under
    fn path_token(&self) -> CodecResult<EntryName>;

    /// human readable form used in commit messages
    fn label(&self) -> String;
}

impl StoreKey for str {
    fn path_token(&self) -> CodecResult<EntryName> {
        Ok(EntryName::new(self)?)
    }

    fn label(&self) -> String {
        self.to_string()
    }
}

impl StoreKey for String {
    fn path_token(&self) -> CodecResult<EntryName> {
        self.as_str().path_token()
    }

    fn label(&self) -> String {
        self.clone()
    }
}

impl<T: Serialize + Debug> StoreKey for Key<T> {
    fn path_token(&self) -> CodecResult<EntryName> {
        match self {
            Key::Str(key) => key.path_token(),
            Key::Structured(value) => KeyCodec::encode_structured(value),
        }
    }

    fn label(&self) -> String {
        match self {
            Key::Str(key) => key.clone(),
            Key::Structured(value) => format!("{:?}", value),
        }
    }
}

impl<K: StoreKey + ?Sized> StoreKey for &K {
    fn path_token(&self) -> CodecResult<EntryName> {
        (**self).path_token()
    }

    fn label(&self) -> String {
        (**self).label()
    }
}

/// Maps keys to path tokens and back.
pub struct KeyCodec;

impl KeyCodec {
    /// canonical path token for `key`
    pub fn token_for<K: StoreKey + ?Sized>(key: &K) -> CodecResult<EntryName> {
        key.path_token()
    }

    /// encode a structured key as a hex token
    pub fn encode_structured<T: Serialize + ?Sized>(value: &T) -> CodecResult<EntryName> {
        let bytes = bincode_options()
            .serialize(value)
            .map_err(|e| CodecError::encode("bincode", e))?;
        Ok(EntryName::new(hex::encode(bytes))?)
    }

    /// recover the key stored under `token`
    ///
    /// falls back to `Key::Str(token)` when the token is not the encoding of a `T`.
    pub fn key_for<T: DeserializeOwned>(token: &str) -> Key<T> {
        let bytes = match hex::decode(token) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => return Key::Str(token.to_string()),
        };

        match bincode_options()
            .with_limit(bytes.len() as u64)
            .deserialize::<T>(&bytes)
        {
            Ok(value) => Key::Structured(value),
            Err(_) => Key::Str(token.to_string()),
        }
    }
}

fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::error::CodecError;
    use crate::storage::InvalidNameError;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct PageKey {
        page: u32,
        section: String,
    }

    #[test]
    fn test_string_keys_pass_through() {
        assert_eq!(KeyCodec::token_for("Page:27:main").unwrap().as_str(), "Page:27:main");
        assert_eq!(KeyCodec::token_for(&"a".to_string()).unwrap().as_str(), "a");
        assert_eq!(KeyCodec::token_for(&Key::str("a")).unwrap().as_str(), "a");
    }

    #[test]
    fn test_invalid_string_keys() {
        assert!(matches!(KeyCodec::token_for(""), Err(CodecError::InvalidKey(_))));
        assert!(matches!(KeyCodec::token_for("a/b"), Err(CodecError::InvalidKey(_))));
        assert!(matches!(KeyCodec::token_for(".."), Err(CodecError::InvalidKey(_))));
    }

    #[test]
    fn test_structured_key_round_trip() {
        let key = PageKey {
            page: 27,
            section: "main".to_string(),
        };
        let token = KeyCodec::token_for(&Key::structured(key.clone())).unwrap();
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));

        let recovered: Key<PageKey> = KeyCodec::key_for(token.as_str());
        assert_eq!(recovered, Key::Structured(key));
    }

    #[test]
    fn test_plain_token_falls_back_to_string() {
        let recovered: Key<PageKey> = KeyCodec::key_for("Page:27:main");
        assert_eq!(recovered, Key::Str("Page:27:main".to_string()));

        // valid hex, but not an encoded PageKey
        let recovered: Key<PageKey> = KeyCodec::key_for("beef");
        assert_eq!(recovered, Key::Str("beef".to_string()));
    }

    #[test]
    fn test_trailing_bytes_are_not_a_key() {
        let token = KeyCodec::encode_structured(&7u32).unwrap();
        let padded = format!("{}00", token);
        let recovered: Key<u32> = KeyCodec::key_for(&padded);
        assert_eq!(recovered, Key::Str(padded));
    }

    #[test]
    fn test_zero_sized_structured_key_is_empty() {
        #[derive(Debug, Serialize)]
        struct Marker;

        for result in [
            KeyCodec::token_for(&Key::structured(())),
            KeyCodec::token_for(&Key::structured(Marker)),
        ] {
            assert!(matches!(result, Err(CodecError::InvalidKey(InvalidNameError::Empty))));
        }
        assert!(KeyCodec::token_for(&Key::structured(0u8)).is_ok());
    }

    #[test]
    fn test_labels() {
        assert_eq!("a".label(), "a");
        assert_eq!(Key::structured(vec![1, 2]).label(), "[1, 2]");
    }
}
