//!  Branch and reference management.
//!
//!  Git refs are pointers to commits.  A gitkv branch is the only mutable
//!  state in the store; this module resolves it and moves it forward.
//!
//!  Advancing is a compare-and-swap against the tip the writer staged on,
//!  so a writer that lost a race gets `ConcurrentModification` instead of
//!  silently overwriting the other writer's commit. A ref held locked by
//!  another writer is reported the same way.

use git2::{ErrorCode, Repository};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{BranchName, CommitId};

/// Manages Git references (branches).
pub struct RefManager;

impl RefManager {
    /// Resolve a branch to its tip, `None` if the branch has no history yet.
    pub fn tip(repo: &Repository, branch: &BranchName) -> StorageResult<Option<CommitId>> {
        let reference = match repo.find_reference(&branch.as_ref_path()) {
            Ok(reference) => reference,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Git(e)),
        };

        let commit = reference
            .peel_to_commit()
            .map_err(|_| StorageError::RefNotFound(branch.to_string()))?;

        Ok(Some(CommitId::new(commit.id())))
    }

    /// Resolve a branch name to its current commit ID, failing if unborn.
    pub fn resolve_branch(repo: &Repository, branch: &BranchName) -> StorageResult<CommitId> {
        Self::tip(repo, branch)?.ok_or_else(|| StorageError::RefNotFound(branch.to_string()))
    }

    /// Point `branch` at `new_target`, provided it still points at `expected`.
    ///
    /// `expected == None` means the branch must not exist yet.
    pub fn advance_branch(
        repo: &Repository,
        branch: &BranchName,
        expected: Option<CommitId>,
        new_target: CommitId,
    ) -> StorageResult<()> {
        let refname = branch.as_ref_path();
        let log_message = format!("gitkv: advance {} to {}", branch, new_target.short());

        let result = match expected {
            Some(current) => repo
                .reference_matching(&refname, new_target.raw(), true, current.raw(), &log_message)
                .map(|_| ()),
            None => repo
                .reference(&refname, new_target.raw(), false, &log_message)
                .map(|_| ()),
        };

        match result {
            Ok(()) => Ok(()),
            // Locked: another handle or process is mid-update on the same ref
            Err(e)
                if matches!(
                    e.code(),
                    ErrorCode::Modified | ErrorCode::Exists | ErrorCode::NotFound | ErrorCode::Locked
                ) =>
            {
                Err(StorageError::ConcurrentModification {
                    branch: branch.to_string(),
                })
            }
            Err(e) => Err(StorageError::Git(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::commit::CommitBuilder;
    use crate::storage::tree::create_empty_tree;
    use tempfile::TempDir;

    fn setup_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init_bare(dir.path()).unwrap();
        (dir, repo)
    }

    fn make_commit(repo: &Repository, parent: Option<CommitId>, message: &str) -> CommitId {
        let tree_id = create_empty_tree(repo).unwrap();
        CommitBuilder::new(repo)
            .tree(tree_id)
            .parent(parent)
            .message(message)
            .commit()
            .unwrap()
    }

    #[test]
    fn test_unborn_branch() {
        let (_dir, repo) = setup_repo();
        let branch = BranchName::default();

        assert_eq!(RefManager::tip(&repo, &branch).unwrap(), None);
        assert!(matches!(
            RefManager::resolve_branch(&repo, &branch),
            Err(StorageError::RefNotFound(_))
        ));
    }

    #[test]
    fn test_advance_lifecycle() {
        let (_dir, repo) = setup_repo();
        let branch = BranchName::default();

        let c1 = make_commit(&repo, None, "first");
        RefManager::advance_branch(&repo, &branch, None, c1).unwrap();
        assert_eq!(RefManager::tip(&repo, &branch).unwrap(), Some(c1));

        let c2 = make_commit(&repo, Some(c1), "second");
        RefManager::advance_branch(&repo, &branch, Some(c1), c2).unwrap();
        assert_eq!(RefManager::resolve_branch(&repo, &branch).unwrap(), c2);
    }

    #[test]
    fn test_advance_with_stale_tip_fails() {
        let (_dir, repo) = setup_repo();
        let branch = BranchName::new("feature").unwrap();

        let c1 = make_commit(&repo, None, "first");
        RefManager::advance_branch(&repo, &branch, None, c1).unwrap();

        let c2 = make_commit(&repo, Some(c1), "second");
        RefManager::advance_branch(&repo, &branch, Some(c1), c2).unwrap();

        // a writer that staged on c1 lost the race
        let c3 = make_commit(&repo, Some(c1), "stale");
        let result = RefManager::advance_branch(&repo, &branch, Some(c1), c3);
        assert!(matches!(result, Err(StorageError::ConcurrentModification { .. })));
        assert_eq!(RefManager::tip(&repo, &branch).unwrap(), Some(c2));
    }

    #[test]
    fn test_create_over_existing_branch_fails() {
        let (_dir, repo) = setup_repo();
        let branch = BranchName::default();

        let c1 = make_commit(&repo, None, "first");
        RefManager::advance_branch(&repo, &branch, None, c1).unwrap();

        let other = make_commit(&repo, None, "other root");
        let result = RefManager::advance_branch(&repo, &branch, None, other);
        assert!(matches!(result, Err(StorageError::ConcurrentModification { .. })));
    }

    #[test]
    fn test_locked_ref_is_a_concurrent_modification() {
        let (dir, repo) = setup_repo();
        let branch = BranchName::default();

        let c1 = make_commit(&repo, None, "first");
        RefManager::advance_branch(&repo, &branch, None, c1).unwrap();

        // another writer holds the ref lock
        let lock = dir.path().join("refs").join("heads").join("master.lock");
        std::fs::write(&lock, b"").unwrap();

        let c2 = make_commit(&repo, Some(c1), "second");
        let result = RefManager::advance_branch(&repo, &branch, Some(c1), c2);
        assert!(matches!(result, Err(StorageError::ConcurrentModification { .. })));

        std::fs::remove_file(&lock).unwrap();
        RefManager::advance_branch(&repo, &branch, Some(c1), c2).unwrap();
        assert_eq!(RefManager::tip(&repo, &branch).unwrap(), Some(c2));
    }
}
