//!   Core Git repository wrapper.
//!
//!  This is the central component of the storage layer.  It wraps `git2::Repository`
//!   with thread-safe access and provides the operations the store façade needs:
//!  resolving a branch, reading one snapshot, staging one delta and committing it.
//!
//! All other storage modules use this for Git access.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use git2::{ErrorCode, Repository, RepositoryInitOptions};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::storage::commit::{self, CommitBuilder, CommitInfo};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::refs::RefManager;
use crate::storage::tree::StagingTree;
use crate::storage::types::{BranchName, CommitId, EntryName, GitSignature};

/// The main Git repository wrapper.
///
/// Clone this to share across threads - it uses Arc internally.
/// `git2::Repository` is not `Sync`, so every access goes through one mutex.
#[derive(Clone)]
pub struct GitRepository {
    inner: Arc<GitRepositoryInner>,
}

struct GitRepositoryInner {
    repo: Mutex<Repository>,
    path: PathBuf,
    bare: bool,
}

/// Author, committer and message for one commit.
#[derive(Debug, Clone)]
pub struct CommitMeta {
    pub message: String,
    pub author: GitSignature,
    pub committer: GitSignature,
}

impl GitRepository {
    fn wrap(repo: Repository, path: &Path) -> Self {
        let bare = repo.is_bare();
        Self {
            inner: Arc::new(GitRepositoryInner {
                repo: Mutex::new(repo),
                path: path.to_path_buf(),
                bare,
            }),
        }
    }

    /// Open an existing repository.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|_| StorageError::NotInitialized(path.to_path_buf()))?;
        Ok(Self::wrap(repo, path))
    }

    /// Initialize a new repository whose HEAD names `branch`.
    ///
    /// No commit is created; the branch stays unborn until the first write.
    pub fn init(path: impl AsRef<Path>, bare: bool, branch: &BranchName) -> StorageResult<Self> {
        let path = path.as_ref();
        let mut opts = RepositoryInitOptions::new();
        opts.bare(bare).mkpath(true).initial_head(branch.as_str());

        let repo = Repository::init_opts(path, &opts)?;
        info!(path = %path.display(), bare, branch = %branch, "initialized repository");
        Ok(Self::wrap(repo, path))
    }

    /// Open or initialize a repository.
    ///
    /// `bare == None` infers the form from the path: a final component
    /// ending in `.git` is a bare repository.
    pub fn open_or_init(path: impl AsRef<Path>, bare: Option<bool>, branch: &BranchName) -> StorageResult<Self> {
        let path = path.as_ref();
        match Repository::open(path) {
            Ok(repo) => Ok(Self::wrap(repo, path)),
            Err(e) if e.code() == ErrorCode::NotFound => {
                let bare = bare.unwrap_or_else(|| looks_bare(path));
                Self::init(path, bare, branch)
            }
            Err(e) => Err(StorageError::Git(e)),
        }
    }

    /// Get the repository path.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Whether the repository has no working tree.
    pub fn is_bare(&self) -> bool {
        self.inner.bare
    }

    /// Execute a function with the repository locked.
    pub fn with_repo<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Repository) -> StorageResult<T>,
    {
        let repo = self.inner.repo.lock();
        f(&repo)
    }

    // ==================== Reads ====================

    /// Current tip of `branch`, `None` while the branch is unborn.
    pub fn tip(&self, branch: &BranchName) -> StorageResult<Option<CommitId>> {
        self.with_repo(|repo| RefManager::tip(repo, branch))
    }

    /// Resolve a hex commit id, failing with `CommitNotFound` if it names no commit.
    pub fn find_commit(&self, hex: &str) -> StorageResult<CommitId> {
        let id = CommitId::from_hex(hex).map_err(|_| StorageError::CommitNotFound(hex.to_string()))?;
        self.with_repo(|repo| {
            repo.find_commit(id.raw())
                .map_err(|_| StorageError::CommitNotFound(hex.to_string()))?;
            Ok(id)
        })
    }

    /// Get information about a commit.
    pub fn get_commit(&self, id: CommitId) -> StorageResult<CommitInfo> {
        self.with_repo(|repo| commit::get_commit(repo, id))
    }

    /// Read the content of entry `name` in the snapshot of commit `at`.
    pub fn read_entry(&self, at: CommitId, name: &EntryName) -> StorageResult<Option<Vec<u8>>> {
        self.with_repo(|repo| {
            let tree = commit::get_tree_at_commit(repo, at)?;
            tree.read(repo, name)
        })
    }

    /// Check if entry `name` exists in the snapshot of commit `at`.
    pub fn contains_entry(&self, at: CommitId, name: &EntryName) -> StorageResult<bool> {
        self.with_repo(|repo| {
            let tree = commit::get_tree_at_commit(repo, at)?;
            Ok(tree.contains(name))
        })
    }

    /// List entry names in the snapshot of commit `at`.
    pub fn entry_names(&self, at: CommitId) -> StorageResult<Vec<String>> {
        self.with_repo(|repo| {
            let tree = commit::get_tree_at_commit(repo, at)?;
            Ok(tree.entry_names())
        })
    }

    /// Commits on `branch` that touched `path`, newest first.
    pub fn history(
        &self,
        branch: &BranchName,
        path: &EntryName,
        limit: Option<usize>,
    ) -> StorageResult<Vec<CommitInfo>> {
        self.with_repo(|repo| {
            let tip = RefManager::resolve_branch(repo, branch)?;
            let iter = commit::history(repo, tip)?.touching(path.clone());
            match limit {
                Some(n) => iter.take(n).collect(),
                None => iter.collect(),
            }
        })
    }

    // ==================== Writes ====================

    /// Stage one delta on top of the tip of `branch` and commit it.
    ///
    /// The staging tree is seeded from the tip (or the empty tree on an unborn
    /// branch). If the written tree equals the seed, nothing is committed and
    /// `Ok(None)` is returned. Otherwise a commit whose sole parent is the old
    /// tip is created and the branch is advanced with compare-and-swap.
    pub fn stage_and_commit<F>(
        &self,
        branch: &BranchName,
        meta: &CommitMeta,
        mutate: F,
    ) -> StorageResult<Option<CommitId>>
    where
        F: FnOnce(&mut StagingTree<'_>) -> StorageResult<()>,
    {
        self.with_repo(|repo| {
            let parent = RefManager::tip(repo, branch)?;
            let seed = match parent {
                Some(id) => Some(commit::get_tree_at_commit(repo, id)?),
                None => None,
            };

            let mut staging = StagingTree::from_tree(repo, seed.as_ref())?;
            mutate(&mut staging)?;
            let staged = staging.write()?;

            if !staged.changed {
                debug!(branch = %branch, tree = %staged.tree_id, "tree unchanged, no commit");
                return Ok(None);
            }

            let id = CommitBuilder::new(repo)
                .tree(staged.tree_id)
                .parent(parent)
                .message(meta.message.clone())
                .author(meta.author.clone())
                .committer(meta.committer.clone())
                .commit()?;

            RefManager::advance_branch(repo, branch, parent, id)?;
            info!(branch = %branch, commit = %id.short(), message = %meta.message, "committed");
            Ok(Some(id))
        })
    }
}

fn looks_bare(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(".git"))
        .unwrap_or(false)
}
