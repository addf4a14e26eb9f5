//! Store façade.
//!
//! [`Store`] is the user-facing key-value API. It canonicalizes keys,
//! encodes values and turns every effective write into one commit on
//! its branch through the storage layer.

mod api;
mod config;
mod error;
mod options;
mod record;

pub use api::Store;
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use options::{CommitOptions, LogOptions, DEFAULT_LOG_LIMIT};
pub use record::{CommitRecord, Field, FieldName};
