//! Store configuration.

use std::path::PathBuf;

use crate::storage::{BranchName, GitSignature};

/// Store configuration options.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the repository.
    pub path: PathBuf,
    /// Create the repository if it doesn't exist.
    pub create_if_missing: bool,
    /// Repository form when creating; `None` infers it from the path
    /// (a final component ending in `.git` means bare).
    pub bare: Option<bool>,
    /// Branch used by reads and writes unless an operation names another.
    pub branch: String,
    /// Default commit author.
    pub author: Option<GitSignature>,
    /// Default committer; falls back to the effective author.
    pub committer: Option<GitSignature>,
    /// How many times a write is restaged after losing a race on the branch.
    /// Zero surfaces the first conflict to the caller.
    pub write_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".gitkv"),
            create_if_missing: true,
            bare: None,
            branch: BranchName::DEFAULT.to_string(),
            author: None,
            committer: None,
            write_retries: 0,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set create_if_missing flag.
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Force a bare or working-tree repository on creation.
    pub fn bare(mut self, value: bool) -> Self {
        self.bare = Some(value);
        self
    }

    /// Set the default branch.
    pub fn branch(mut self, name: impl Into<String>) -> Self {
        self.branch = name.into();
        self
    }

    /// Set the default author.
    pub fn author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author = Some(GitSignature::new(name, email));
        self
    }

    /// Set the default committer.
    pub fn committer(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.committer = Some(GitSignature::new(name, email));
        self
    }

    /// Set the number of optimistic write retries.
    pub fn write_retries(mut self, value: u32) -> Self {
        self.write_retries = value;
        self
    }
}
