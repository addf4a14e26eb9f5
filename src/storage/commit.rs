//!  Commit creation and history traversal
//!
//!  commits are the atomic units of change in Git. In gitkv:
//! - each effective write creates exactly one commit
//! - history is a single linear chain per branch (no merges)
//! - per-key history is the chain filtered to commits that touched the key
//!
//! this module handles commit creation and history walking

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use git2::{Repository, Revwalk, Sort};
use tracing::warn;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::tree::TreeHandle;
use crate::storage::types::{CommitId, EntryName, GitSignature, TreeId};

/// information about a commit
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: CommitId,
    pub tree_id: TreeId,
    pub parent_ids: Vec<CommitId>,
    pub message: String,
    pub author: GitSignature,
    pub committer: GitSignature,
    pub authored_at: DateTime<FixedOffset>,
    pub committed_at: DateTime<FixedOffset>,
}

impl CommitInfo {
    /// create CommitInfo from a git2::Commit
    pub(crate) fn from_git2(commit: &git2::Commit<'_>) -> Self {
        let author = commit.author();
        let committer = commit.committer();

        Self {
            id: CommitId::new(commit.id()),
            tree_id: TreeId::new(commit.tree_id()),
            parent_ids: commit.parent_ids().map(CommitId::new).collect(),
            message: commit.message().unwrap_or("").to_string(),
            author: signature_of(&author),
            committer: signature_of(&committer),
            authored_at: datetime_of(author.when()),
            committed_at: datetime_of(committer.when()),
        }
    }

    /// get the first (or only) parent
    pub fn first_parent(&self) -> Option<CommitId> {
        self.parent_ids.first().copied()
    }
}

fn signature_of(sig: &git2::Signature<'_>) -> GitSignature {
    GitSignature::new(
        sig.name().unwrap_or("Unknown"),
        sig.email().unwrap_or("unknown@unknown"),
    )
}

/// convert a git timestamp, keeping the recorded utc offset
///
/// a timestamp chrono cannot represent maps to the unix epoch
fn datetime_of(time: git2::Time) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());
    offset
        .timestamp_opt(time.seconds(), 0)
        .single()
        .unwrap_or_else(|| {
            warn!(seconds = time.seconds(), "commit timestamp out of range, using epoch");
            DateTime::<Utc>::default().with_timezone(&offset)
        })
}

/// builder for creating commits with a fluent interface
///
/// the commit object is written without touching any ref; advancing the
/// branch is the caller's job (see `RefManager::advance_branch`).
pub struct CommitBuilder<'a> {
    repo: &'a Repository,
    tree_id: Option<TreeId>,
    parent: Option<CommitId>,
    message: String,
    author: GitSignature,
    committer: Option<GitSignature>,
}

impl<'a> CommitBuilder<'a> {
    /// create a new CommitBuilder
    pub fn new(repo: &'a Repository) -> Self {
        Self {
            repo,
            tree_id: None,
            parent: None,
            message: String::new(),
            author: GitSignature::gitkv(),
            committer: None,
        }
    }

    /// set the tree for this commit
    pub fn tree(mut self, tree_id: TreeId) -> Self {
        self.tree_id = Some(tree_id);
        self
    }

    /// set the sole parent; `None` makes a root commit
    pub fn parent(mut self, parent: Option<CommitId>) -> Self {
        self.parent = parent;
        self
    }

    /// set the commit message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// set the author signature
    pub fn author(mut self, author: GitSignature) -> Self {
        self.author = author;
        self
    }

    /// set the committer signature (defaults to the author)
    pub fn committer(mut self, committer: GitSignature) -> Self {
        self.committer = Some(committer);
        self
    }

    /// create the commit and return its ID
    pub fn commit(self) -> StorageResult<CommitId> {
        let tree_id = self
            .tree_id
            .ok_or_else(|| StorageError::Internal("commit requires a tree".to_string()))?;

        let tree = self.repo.find_tree(tree_id.raw())?;
        let author = self.author.to_git2_signature()?;
        let committer = match &self.committer {
            Some(sig) => sig.to_git2_signature()?,
            None => author.clone(),
        };

        let parent = match self.parent {
            Some(id) => Some(
                self.repo
                    .find_commit(id.raw())
                    .map_err(|_| StorageError::CommitNotFound(id.to_string()))?,
            ),
            None => None,
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(None, &author, &committer, &self.message, &tree, &parents)?;

        Ok(CommitId::new(oid))
    }
}

/// get information about a commit
pub fn get_commit(repo: &Repository, id: CommitId) -> StorageResult<CommitInfo> {
    let commit = repo
        .find_commit(id.raw())
        .map_err(|_| StorageError::CommitNotFound(id.to_string()))?;

    Ok(CommitInfo::from_git2(&commit))
}

/// get the tree snapshot at a specific commit
pub fn get_tree_at_commit(repo: &Repository, commit_id: CommitId) -> StorageResult<TreeHandle<'_>> {
    let commit = repo
        .find_commit(commit_id.raw())
        .map_err(|_| StorageError::CommitNotFound(commit_id.to_string()))?;

    let tree = commit.tree()?;
    Ok(TreeHandle::new(tree))
}

/// iterate over commit history starting from a commit, newest first
pub struct HistoryIterator<'repo> {
    repo: &'repo Repository,
    revwalk: Revwalk<'repo>,
    path: Option<EntryName>,
}

impl<'repo> HistoryIterator<'repo> {
    /// create a new history iterator
    pub fn new(repo: &'repo Repository, start: CommitId) -> StorageResult<Self> {
        let mut revwalk = repo.revwalk()?;
        revwalk.push(start.raw())?;
        revwalk.set_sorting(Sort::TOPOLOGICAL)?;
        revwalk.simplify_first_parent()?;

        Ok(Self {
            repo,
            revwalk,
            path: None,
        })
    }

    /// only yield commits whose entry at `path` differs from their parent's
    pub fn touching(mut self, path: EntryName) -> Self {
        self.path = Some(path);
        self
    }

    fn touches(&self, commit: &git2::Commit<'_>, path: &EntryName) -> StorageResult<bool> {
        let current = entry_oid(&commit.tree()?, path);
        let previous = match commit.parents().next() {
            Some(parent) => entry_oid(&parent.tree()?, path),
            None => None,
        };
        Ok(current != previous)
    }
}

fn entry_oid(tree: &git2::Tree<'_>, path: &EntryName) -> Option<git2::Oid> {
    tree.get_name(path.as_str()).map(|entry| entry.id())
}

impl<'repo> Iterator for HistoryIterator<'repo> {
    type Item = StorageResult<CommitInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let oid = match self.revwalk.next()? {
                Ok(oid) => oid,
                Err(e) => return Some(Err(StorageError::Git(e))),
            };
            let commit = match self.repo.find_commit(oid) {
                Ok(commit) => commit,
                Err(e) => return Some(Err(StorageError::Git(e))),
            };

            if let Some(path) = &self.path {
                match self.touches(&commit, path) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => return Some(Err(e)),
                }
            }

            return Some(Ok(CommitInfo::from_git2(&commit)));
        }
    }
}

/// get history for a commit
pub fn history(repo: &Repository, start: CommitId) -> StorageResult<HistoryIterator<'_>> {
    HistoryIterator::new(repo, start)
}

/// message formatting for store operations
pub struct CommitMessage;

impl CommitMessage {
    /// message for a set
    pub fn set(key: &str) -> String {
        format!("set '{}'", key)
    }

    /// message for a delete
    pub fn delete(key: &str) -> String {
        format!("deleted {}", key)
    }

    /// message for a clear
    pub fn clear() -> String {
        "all clear".to_string()
    }
}
