//!  tree operations for the key space.
//!
//! in Git, a tree is a directory.  In gitkv the root tree *is* the store:
//! - every key is one blob entry directly under the root
//! - there are no subdirectories; anything that isn't a blob is ignored
//!
//! reads go through [`TreeHandle`], writes go through [`StagingTree`], which
//! seeds a builder from the current snapshot, applies one delta and reports
//! whether the result differs from the seed.

use git2::{FileMode, ObjectType, Repository, Tree, TreeBuilder as Git2TreeBuilder};

use crate::storage::error::StorageResult;
use crate::storage::types::{BlobId, EntryName, TreeId};

/// A read only handle to a git tree at a specific commit
///
/// think of it as a snapshot - it won't change even if new commits are made.
pub struct TreeHandle<'repo> {
    tree: Tree<'repo>,
}

impl<'repo> TreeHandle<'repo> {
    /// create a TreeHandle from a git2::Tree
    pub(crate) fn new(tree: Tree<'repo>) -> Self {
        Self { tree }
    }

    /// get the tree ID
    pub fn id(&self) -> TreeId {
        TreeId::new(self.tree.id())
    }

    pub(crate) fn inner(&self) -> &Tree<'repo> {
        &self.tree
    }

    /// names of all blob entries, in git's tree order
    pub fn entry_names(&self) -> Vec<String> {
        self.tree
            .iter()
            .filter(|entry| entry.kind() == Some(ObjectType::Blob))
            .filter_map(|entry| entry.name().map(str::to_string))
            .collect()
    }

    /// number of blob entries
    pub fn len(&self) -> usize {
        self.tree
            .iter()
            .filter(|entry| entry.kind() == Some(ObjectType::Blob))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// get the blob ID stored under `name`, if any
    pub fn blob_id(&self, name: &EntryName) -> Option<BlobId> {
        self.tree
            .get_name(name.as_str())
            .filter(|entry| entry.kind() == Some(ObjectType::Blob))
            .map(|entry| BlobId::new(entry.id()))
    }

    /// check if an entry exists
    pub fn contains(&self, name: &EntryName) -> bool {
        self.blob_id(name).is_some()
    }

    /// read the content stored under `name`, if any
    pub fn read(&self, repo: &Repository, name: &EntryName) -> StorageResult<Option<Vec<u8>>> {
        match self.blob_id(name) {
            Some(id) => Ok(Some(read_blob(repo, id)?)),
            None => Ok(None),
        }
    }
}

/// The outcome of finishing a [`StagingTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagedTree {
    pub tree_id: TreeId,
    /// false when the written tree is identical to the seed
    pub changed: bool,
}

/// a mutable staging area seeded from one snapshot
///
/// the original tree is not modified; `write` produces a new tree object
/// and tells the caller whether anything actually changed.
///
/// # Usage Pattern
///
/// ```ignore
/// let mut staging = StagingTree::from_tree(repo, Some(&tree))?;
/// staging.upsert(&name, b"value")?;
/// let staged = staging.write()?;
/// if staged.changed { /* commit */ }
/// ```
pub struct StagingTree<'repo> {
    repo: &'repo Repository,
    builder: Git2TreeBuilder<'repo>,
    seed: TreeId,
}

impl<'repo> StagingTree<'repo> {
    /// seed from an existing tree, or from the empty tree when there is none
    pub fn from_tree(repo: &'repo Repository, tree: Option<&TreeHandle<'_>>) -> StorageResult<Self> {
        let (builder, seed) = match tree {
            Some(tree) => (repo.treebuilder(Some(tree.inner()))?, tree.id()),
            None => (repo.treebuilder(None)?, create_empty_tree(repo)?),
        };

        Ok(Self { repo, builder, seed })
    }

    /// id of the tree this session was seeded from
    pub fn seed(&self) -> TreeId {
        self.seed
    }

    /// write `content` as a blob and add or replace the entry `name`
    pub fn upsert(&mut self, name: &EntryName, content: &[u8]) -> StorageResult<BlobId> {
        let blob_id = BlobId::new(self.repo.blob(content)?);
        self.builder
            .insert(name.as_str(), blob_id.raw(), FileMode::Blob.into())?;
        Ok(blob_id)
    }

    /// remove the entry `name`; returns whether it was present
    pub fn remove(&mut self, name: &EntryName) -> StorageResult<bool> {
        // git2 errors on removing a missing entry, absence is not an error here
        if self.builder.get(name.as_str())?.is_none() {
            return Ok(false);
        }
        self.builder.remove(name.as_str())?;
        Ok(true)
    }

    /// remove every entry
    pub fn clear(&mut self) -> StorageResult<()> {
        self.builder.clear()?;
        Ok(())
    }

    /// number of entries currently staged
    pub fn len(&self) -> usize {
        self.builder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builder.len() == 0
    }

    /// write the staged tree and compare it with the seed
    pub fn write(self) -> StorageResult<StagedTree> {
        let tree_id = TreeId::new(self.builder.write()?);
        Ok(StagedTree {
            tree_id,
            changed: tree_id != self.seed,
        })
    }
}

/// write the empty tree and return its id
pub fn create_empty_tree(repo: &Repository) -> StorageResult<TreeId> {
    let builder = repo.treebuilder(None)?;
    Ok(TreeId::new(builder.write()?))
}

/// read a blob's content from the repository
pub fn read_blob(repo: &Repository, blob_id: BlobId) -> StorageResult<Vec<u8>> {
    let blob = repo.find_blob(blob_id.raw())?;
    Ok(blob.content().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init_bare(dir.path()).unwrap();
        (dir, repo)
    }

    fn name(s: &str) -> EntryName {
        EntryName::new(s).unwrap()
    }

    fn handle(repo: &Repository, id: TreeId) -> TreeHandle<'_> {
        TreeHandle::new(repo.find_tree(id.raw()).unwrap())
    }

    #[test]
    fn test_seed_empty() {
        let (_dir, repo) = setup_repo();
        let staging = StagingTree::from_tree(&repo, None).unwrap();
        assert!(staging.is_empty());

        let staged = staging.write().unwrap();
        assert!(!staged.changed);
        assert_eq!(staged.tree_id, create_empty_tree(&repo).unwrap());
    }

    #[test]
    fn test_upsert_and_read() {
        let (_dir, repo) = setup_repo();
        let mut staging = StagingTree::from_tree(&repo, None).unwrap();
        staging.upsert(&name("a"), b"1").unwrap();
        staging.upsert(&name("b"), b"2").unwrap();
        let staged = staging.write().unwrap();
        assert!(staged.changed);

        let tree = handle(&repo, staged.tree_id);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.entry_names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(tree.read(&repo, &name("a")).unwrap(), Some(b"1".to_vec()));
        assert_eq!(tree.read(&repo, &name("missing")).unwrap(), None);
        assert!(tree.contains(&name("b")));
    }

    #[test]
    fn test_same_content_is_unchanged() {
        let (_dir, repo) = setup_repo();
        let mut staging = StagingTree::from_tree(&repo, None).unwrap();
        staging.upsert(&name("a"), b"1").unwrap();
        let first = staging.write().unwrap();

        let tree = handle(&repo, first.tree_id);
        let mut staging = StagingTree::from_tree(&repo, Some(&tree)).unwrap();
        assert_eq!(staging.seed(), first.tree_id);
        staging.upsert(&name("a"), b"1").unwrap();
        let second = staging.write().unwrap();

        assert!(!second.changed);
        assert_eq!(second.tree_id, first.tree_id);
    }

    #[test]
    fn test_remove_missing_is_unchanged() {
        let (_dir, repo) = setup_repo();
        let mut staging = StagingTree::from_tree(&repo, None).unwrap();
        staging.upsert(&name("a"), b"1").unwrap();
        let staged = staging.write().unwrap();

        let tree = handle(&repo, staged.tree_id);
        let mut staging = StagingTree::from_tree(&repo, Some(&tree)).unwrap();
        assert!(!staging.remove(&name("nope")).unwrap());
        assert!(!staging.write().unwrap().changed);

        let mut staging = StagingTree::from_tree(&repo, Some(&tree)).unwrap();
        assert!(staging.remove(&name("a")).unwrap());
        let staged = staging.write().unwrap();
        assert!(staged.changed);
        assert!(handle(&repo, staged.tree_id).is_empty());
    }

    #[test]
    fn test_clear() {
        let (_dir, repo) = setup_repo();
        let mut staging = StagingTree::from_tree(&repo, None).unwrap();
        staging.upsert(&name("a"), b"1").unwrap();
        staging.upsert(&name("b"), b"2").unwrap();
        let staged = staging.write().unwrap();

        let tree = handle(&repo, staged.tree_id);
        let mut staging = StagingTree::from_tree(&repo, Some(&tree)).unwrap();
        staging.clear().unwrap();
        let cleared = staging.write().unwrap();
        assert!(cleared.changed);
        assert_eq!(cleared.tree_id, create_empty_tree(&repo).unwrap());
    }

    #[test]
    fn test_subtrees_are_not_entries() {
        let (_dir, repo) = setup_repo();
        let empty = create_empty_tree(&repo).unwrap();
        let mut builder = repo.treebuilder(None).unwrap();
        builder.insert("dir", empty.raw(), FileMode::Tree.into()).unwrap();
        let blob = repo.blob(b"x").unwrap();
        builder.insert("leaf", blob, FileMode::Blob.into()).unwrap();
        let id = TreeId::new(builder.write().unwrap());

        let tree = handle(&repo, id);
        assert_eq!(tree.entry_names(), vec!["leaf".to_string()]);
        assert!(!tree.contains(&name("dir")));
    }
}
