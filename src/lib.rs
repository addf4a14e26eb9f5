//! gitkv - a versioned key-value store on top of git
//!
//! Keys map to blob entries in a single tree, values are serialized into
//! those blobs, and every write that changes the snapshot becomes a commit
//! on a branch. History per key, reads at any past commit and independent
//! branches all come from git itself.
//!
//! # Example
//!
//! ```no_run
//! use gitkv::{CommitOptions, LogOptions, Store};
//!
//! let store = Store::open("./settings.git").unwrap();
//! store.set("greeting", &"hello".to_string(), CommitOptions::default()).unwrap();
//!
//! let value: Option<String> = store.get("greeting").unwrap();
//! assert_eq!(value.as_deref(), Some("hello"));
//!
//! for entry in store.log::<_, String>("greeting", LogOptions::default()).unwrap() {
//!     println!("{} {}", entry.id(), entry.message());
//! }
//! ```

pub mod codec;
pub mod storage;
pub mod store;

pub use codec::{JsonCodec, Key, KeyCodec, StoreKey, ValueCodec, YamlCodec};
pub use storage::{BranchName, CommitId, GitSignature};
pub use store::{
    CommitOptions, CommitRecord, Field, FieldName, LogOptions, Store, StoreConfig, StoreError, StoreResult,
    DEFAULT_LOG_LIMIT,
};
