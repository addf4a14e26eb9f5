//! Store API - the high-level key-value interface.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::{Key, KeyCodec, StoreKey, ValueCodec, YamlCodec};
use crate::storage::{
    BranchName, CommitId, CommitMessage, CommitMeta, EntryName, GitRepository, StagingTree,
    StorageError, StorageResult,
};
use crate::store::config::StoreConfig;
use crate::store::error::{StoreError, StoreResult};
use crate::store::options::{CommitOptions, LogOptions};
use crate::store::record::CommitRecord;

/// A versioned key-value store backed by one git branch.
///
/// Every effective write is a commit; writes that would not change the
/// snapshot create nothing. Cheap to clone (`Arc` internally).
pub struct Store<C: ValueCodec = YamlCodec> {
    repo: GitRepository,
    codec: Arc<C>,
    config: Arc<StoreConfig>,
    branch: BranchName,
}

impl<C: ValueCodec> Clone for Store<C> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            codec: Arc::clone(&self.codec),
            config: Arc::clone(&self.config),
            branch: self.branch.clone(),
        }
    }
}

impl Store<YamlCodec> {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_config(StoreConfig::new(path.as_ref()))
    }

    /// Open or create a store with custom configuration.
    pub fn open_with_config(config: StoreConfig) -> StoreResult<Self> {
        Self::with_codec(config, YamlCodec)
    }
}

impl<C: ValueCodec> Store<C> {
    /// Open or create a store that encodes values with `codec`.
    pub fn with_codec(config: StoreConfig, codec: C) -> StoreResult<Self> {
        let branch = parse_branch(&config.branch)?;

        let repo = if config.create_if_missing {
            GitRepository::open_or_init(&config.path, config.bare, &branch)?
        } else if config.path.exists() {
            GitRepository::open(&config.path)?
        } else {
            return Err(StoreError::NotFound(config.path.display().to_string()));
        };

        Ok(Self {
            repo,
            codec: Arc::new(codec),
            config: Arc::new(config),
            branch,
        })
    }

    /// The same store addressing another branch.
    pub fn branch(&self, name: &str) -> StoreResult<Self> {
        Ok(Self {
            branch: parse_branch(name)?,
            ..self.clone()
        })
    }

    /// The branch this handle reads and writes.
    pub fn branch_name(&self) -> &BranchName {
        &self.branch
    }

    /// Get the repository path.
    pub fn path(&self) -> &Path {
        self.repo.path()
    }

    /// Get the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Tip of the branch, `None` before the first write.
    pub fn head(&self) -> StoreResult<Option<CommitId>> {
        Ok(self.repo.tip(&self.branch)?)
    }

    // ==================== Reads ====================

    /// Value stored under `key` at the tip, `None` if absent.
    pub fn get<K, V>(&self, key: &K) -> StoreResult<Option<V>>
    where
        K: StoreKey + ?Sized,
        V: DeserializeOwned,
    {
        let token = KeyCodec::token_for(key)?;
        self.read_tip(&self.branch, &token)
    }

    /// Value stored under `key` as of `commit` (a hex commit id).
    pub fn get_at<K, V>(&self, key: &K, commit: &str) -> StoreResult<Option<V>>
    where
        K: StoreKey + ?Sized,
        V: DeserializeOwned,
    {
        let token = KeyCodec::token_for(key)?;
        let id = self.repo.find_commit(commit).map_err(|e| match e {
            StorageError::CommitNotFound(id) => StoreError::NotFound(format!("commit {}", id)),
            other => StoreError::Storage(other),
        })?;
        self.read_at(id, &token)
    }

    /// Whether `key` has an entry at the tip.
    pub fn contains_key<K: StoreKey + ?Sized>(&self, key: &K) -> StoreResult<bool> {
        let token = KeyCodec::token_for(key)?;
        match self.repo.tip(&self.branch)? {
            Some(tip) => Ok(self.repo.contains_entry(tip, &token)?),
            None => Ok(false),
        }
    }

    /// All keys at the tip, in tree order.
    ///
    /// Tokens that do not decode as a `T` come back as `Key::Str`.
    pub fn keys<T: DeserializeOwned>(&self) -> StoreResult<Vec<Key<T>>> {
        let tip = match self.repo.tip(&self.branch)? {
            Some(tip) => tip,
            None => return Ok(Vec::new()),
        };

        Ok(self
            .repo
            .entry_names(tip)?
            .iter()
            .map(|token| KeyCodec::key_for(token))
            .collect())
    }

    /// History of `key`: commits that changed it, newest first.
    pub fn log<K, V>(&self, key: &K, opts: LogOptions) -> StoreResult<Vec<CommitRecord<V>>>
    where
        K: StoreKey + ?Sized,
        V: DeserializeOwned,
    {
        let token = KeyCodec::token_for(key)?;
        let branch = self.target_branch(opts.branch.as_deref())?;
        let commits = self.repo.history(&branch, &token, opts.limit).map_err(|e| match e {
            StorageError::RefNotFound(name) => StoreError::NotFound(format!("branch {}", name)),
            other => StoreError::Storage(other),
        })?;

        commits
            .into_iter()
            .map(|info| -> StoreResult<CommitRecord<V>> {
                let value = if opts.include_values {
                    self.read_at(info.id, &token)?
                } else {
                    None
                };
                Ok(CommitRecord::from_info(info, value))
            })
            .collect()
    }

    // ==================== Writes ====================

    /// Store `value` under `key`.
    ///
    /// Returns the new commit, or `None` when the key already held an equal value.
    pub fn set<K, V>(&self, key: &K, value: &V, opts: CommitOptions) -> StoreResult<Option<CommitId>>
    where
        K: StoreKey + ?Sized,
        V: Serialize + DeserializeOwned + PartialEq,
    {
        let token = KeyCodec::token_for(key)?;
        let branch = self.target_branch(opts.branch.as_deref())?;

        match self.read_tip::<V>(&branch, &token) {
            Ok(Some(current)) if current == *value => {
                debug!(key = %token, branch = %branch, "value unchanged, skipping set");
                return Ok(None);
            }
            Ok(_) => {}
            Err(e) if e.is_encoding() => {
                debug!(key = %token, error = %e, "stored value unreadable, overwriting");
            }
            Err(e) => return Err(e),
        }

        let bytes = self.codec.encode(value)?;
        let meta = self.commit_meta(CommitMessage::set(&key.label()), &opts);
        self.write(&branch, &meta, |staging| staging.upsert(&token, &bytes).map(|_| ()))
    }

    /// Remove `key`, returning the value it held.
    ///
    /// Deleting an absent key creates no commit.
    pub fn delete<K, V>(&self, key: &K, opts: CommitOptions) -> StoreResult<Option<V>>
    where
        K: StoreKey + ?Sized,
        V: DeserializeOwned,
    {
        let token = KeyCodec::token_for(key)?;
        let branch = self.target_branch(opts.branch.as_deref())?;
        let previous = self.read_tip(&branch, &token)?;

        let meta = self.commit_meta(CommitMessage::delete(&key.label()), &opts);
        self.write(&branch, &meta, |staging| staging.remove(&token).map(|_| ()))?;
        Ok(previous)
    }

    /// Remove every key. Returns the new commit, `None` if already empty.
    pub fn clear(&self, opts: CommitOptions) -> StoreResult<Option<CommitId>> {
        let branch = self.target_branch(opts.branch.as_deref())?;
        let meta = self.commit_meta(CommitMessage::clear(), &opts);
        self.write(&branch, &meta, |staging| staging.clear())
    }

    // ==================== Internals ====================

    fn read_tip<V: DeserializeOwned>(&self, branch: &BranchName, token: &EntryName) -> StoreResult<Option<V>> {
        match self.repo.tip(branch)? {
            Some(tip) => self.read_at(tip, token),
            None => Ok(None),
        }
    }

    fn read_at<V: DeserializeOwned>(&self, commit: CommitId, token: &EntryName) -> StoreResult<Option<V>> {
        match self.repo.read_entry(commit, token)? {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Stage and commit, restaging up to `write_retries` times on a lost race.
    fn write<F>(&self, branch: &BranchName, meta: &CommitMeta, mutate: F) -> StoreResult<Option<CommitId>>
    where
        F: Fn(&mut StagingTree<'_>) -> StorageResult<()>,
    {
        let mut attempt = 0;
        loop {
            match self.repo.stage_and_commit(branch, meta, &mutate) {
                Err(e) if e.is_retriable() && attempt < self.config.write_retries => {
                    attempt += 1;
                    warn!(branch = %branch, attempt, "branch moved during write, restaging");
                    std::thread::yield_now();
                }
                result => return Ok(result?),
            }
        }
    }

    fn target_branch(&self, name: Option<&str>) -> StoreResult<BranchName> {
        match name {
            Some(name) => parse_branch(name),
            None => Ok(self.branch.clone()),
        }
    }

    fn commit_meta(&self, default_message: String, opts: &CommitOptions) -> CommitMeta {
        let author = opts
            .author
            .clone()
            .or_else(|| self.config.author.clone())
            .unwrap_or_default();
        let committer = opts
            .committer
            .clone()
            .or_else(|| self.config.committer.clone())
            .unwrap_or_else(|| author.clone());

        CommitMeta {
            message: opts.message.clone().unwrap_or(default_message),
            author,
            committer,
        }
    }
}

fn parse_branch(name: &str) -> StoreResult<BranchName> {
    BranchName::new(name).map_err(StoreError::InvalidBranch)
}
