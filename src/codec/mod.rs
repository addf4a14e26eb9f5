//! Key and value codecs.
//!
//! Keys become tree entry names through [`KeyCodec`]; values become blob
//! content through a pluggable [`ValueCodec`].

mod error;
mod key;
mod value;

pub use error::{CodecError, CodecResult};
pub use key::{Key, KeyCodec, StoreKey};
pub use value::{JsonCodec, ValueCodec, YamlCodec};
