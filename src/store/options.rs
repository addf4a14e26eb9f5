//! Per-call options for writes and history queries.

use crate::storage::GitSignature;

/// Default number of entries returned by [`Store::log`](crate::Store::log).
pub const DEFAULT_LOG_LIMIT: usize = 20;

/// Overrides for the commit a write creates.
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    pub author: Option<GitSignature>,
    pub committer: Option<GitSignature>,
    /// replaces the operation's default message
    pub message: Option<String>,
    /// branch to write to instead of the store's branch
    pub branch: Option<String>,
}

impl CommitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author = Some(GitSignature::new(name, email));
        self
    }

    pub fn committer(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.committer = Some(GitSignature::new(name, email));
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn branch(mut self, name: impl Into<String>) -> Self {
        self.branch = Some(name.into());
        self
    }
}

/// Options for [`Store::log`](crate::Store::log).
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// maximum number of entries; `None` returns the whole history
    pub limit: Option<usize>,
    /// resolve the key's value as of each returned commit
    pub include_values: bool,
    /// branch to read instead of the store's branch
    pub branch: Option<String>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_LOG_LIMIT),
            include_values: false,
            branch: None,
        }
    }
}

impl LogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// return every matching commit
    pub fn unbounded(mut self) -> Self {
        self.limit = None;
        self
    }

    pub fn include_values(mut self, value: bool) -> Self {
        self.include_values = value;
        self
    }

    pub fn branch(mut self, name: impl Into<String>) -> Self {
        self.branch = Some(name.into());
        self
    }
}
