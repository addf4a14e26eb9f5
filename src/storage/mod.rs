//! storage layer for gitkv
//!
//! this module provides the whole abstraction over git the store needs.
//! The upper layers (codecs, store façade) use this API and never
//! touch git2 directly.
//!
//!  # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     GitRepository                           │
//! │   (open/init, read snapshot, stage + commit, history)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │    tree     │       │   commit    │       │    refs     │
//!  │  (staging)  │       │  (history)  │       │ (branches)  │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//!  ```
//!
//! # Usage
//!
//! ```ignore
//! use gitkv::storage::{BranchName, CommitMeta, EntryName, GitRepository};
//!
//! let repo = GitRepository::open_or_init("./store.git", None, &BranchName::default())?;
//! let key = EntryName::new("greeting")?;
//!
//! let commit = repo.stage_and_commit(&BranchName::default(), &meta, |staging| {
//!     staging.upsert(&key, b"hello").map(|_| ())
//! })?;
//!
//! let bytes = repo.read_entry(commit.unwrap(), &key)?;
//! ```

mod commit;
mod error;
mod refs;
mod repository;
mod tree;
mod types;

// Re-export public API
pub use commit::{CommitInfo, CommitMessage};
pub use error::{StorageError, StorageResult};
pub use repository::{CommitMeta, GitRepository};
pub use tree::{StagedTree, StagingTree, TreeHandle};
pub use types::{BlobId, BranchName, CommitId, EntryName, GitSignature, InvalidNameError, TreeId};
