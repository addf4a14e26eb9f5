//! core type-safe wrappers around git primitives for the storage layer.

use std::fmt;

use git2::Oid;
use serde::{Deserialize, Serialize};

/// This makes sure we don't accidentally pass a blob ID where a commit ID
/// is expected. The inner Oid is only accessible within the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommitId(pub(crate) Oid);

impl CommitId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    /// raw Oid (for internal use only)
    pub(crate) fn raw(&self) -> Oid {
        self.0
    }

    /// parse CommitId from a hex string
    pub fn from_hex(hex: &str) -> Result<Self, git2::Error> {
        Oid::from_str(hex).map(CommitId)
    }

    /// short form of the commit ID
    pub fn short(&self) -> String {
        self.0.to_string()[..7].to_string()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Git blob identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobId(pub(crate) Oid);

impl BlobId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    pub(crate) fn raw(&self) -> Oid {
        self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Git tree identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(pub(crate) Oid);

impl TreeId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    pub(crate) fn raw(&self) -> Oid {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated tree entry name.
///
/// Every key lives as a single leaf directly under the root tree, so an
/// entry name must be usable as one path component:
/// - non-empty
/// - no `/` and no NUL byte
/// - not `.`, `..`, `.git`, or a name NTFS or HFS+ would resolve to `.git`
///   (`GIT~1`, `.git.`, `.git` with zero-width characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryName(String);

impl EntryName {
    /// names git refuses to store as a tree entry
    const RESERVED: &'static [&'static str] = &[".", ".."];

    /// `.git` and its 8.3 short name, as NTFS matches them
    const NTFS_DOTGIT: &'static [&'static str] = &[".git", "git~1"];

    /// create a new EntryName, validating the input
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), InvalidNameError> {
        if name.is_empty() {
            return Err(InvalidNameError::Empty);
        }

        for (i, c) in name.chars().enumerate() {
            if c == '/' || c == '\0' {
                return Err(InvalidNameError::InvalidCharacter { char: c, position: i });
            }
        }

        if Self::RESERVED.contains(&name) || Self::is_dotgit_alias(name) {
            return Err(InvalidNameError::Reserved(name.to_string()));
        }

        Ok(())
    }

    /// same rules libgit2 applies before accepting a tree entry
    fn is_dotgit_alias(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();

        // NTFS strips trailing dots and spaces
        let ntfs = Self::NTFS_DOTGIT.iter().any(|reserved| {
            lower.strip_prefix(*reserved).is_some_and(|rest| {
                rest.starts_with('\\') || rest.chars().all(|c| c == '.' || c == ' ')
            })
        });

        // HFS+ ignores some zero-width code points when comparing names
        let hfs = lower.chars().filter(|c| !is_hfs_ignorable(*c)).eq(".git".chars());

        ntfs || hfs
    }

    /// get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_hfs_ignorable(c: char) -> bool {
    matches!(c, '\u{200c}'..='\u{200f}' | '\u{202a}'..='\u{202e}' | '\u{206a}'..='\u{206f}' | '\u{feff}')
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EntryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// a branch name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// the default branch name
    pub const DEFAULT: &'static str = "master";

    /// create a new BranchName
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        // git is more permissive, we only reject what would escape refs/heads/
        if name.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        if name.contains("..") || name.ends_with('/') || name.starts_with('/') {
            return Err(InvalidNameError::InvalidPath(name));
        }
        if !git2::Reference::is_valid_name(&format!("refs/heads/{}", name)) {
            return Err(InvalidNameError::InvalidPath(name));
        }
        Ok(Self(name))
    }

    /// get the full ref path (e.g., "refs/heads/master")
    pub fn as_ref_path(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// get the short name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BranchName {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// git signature (author/committer info)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitSignature {
    pub name: String,
    pub email: String,
}

impl GitSignature {
    /// create a new signature
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// default signature for gitkv commits
    pub fn gitkv() -> Self {
        Self::new("gitkv", "gitkv@localhost")
    }

    /// convert to git2::Signature stamped with the current time
    pub(crate) fn to_git2_signature(&self) -> Result<git2::Signature<'static>, git2::Error> {
        git2::Signature::now(&self.name, &self.email)
    }
}

impl Default for GitSignature {
    fn default() -> Self {
        Self::gitkv()
    }
}

/// error type for invalid names (entries, branches)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    InvalidCharacter { char: char, position: usize },
    Reserved(String),
    InvalidPath(String),
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::InvalidCharacter { char, position } => {
                write!(f, "invalid character {:?} at position {}", char, position)
            }
            Self::Reserved(name) => write!(f, "'{}' is a reserved name", name),
            Self::InvalidPath(path) => write!(f, "invalid path: '{}'", path),
        }
    }
}

impl std::error::Error for InvalidNameError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_valid() {
        assert!(EntryName::new("a").is_ok());
        assert!(EntryName::new("Page:27:main").is_ok());
        assert!(EntryName::new("with space").is_ok());
        assert!(EntryName::new(".hidden").is_ok());
    }

    #[test]
    fn test_entry_name_invalid() {
        assert_eq!(EntryName::new(""), Err(InvalidNameError::Empty));
        assert!(matches!(
            EntryName::new("users/admin"),
            Err(InvalidNameError::InvalidCharacter { char: '/', position: 5 })
        ));
        assert!(EntryName::new("nul\0byte").is_err());
        assert!(matches!(EntryName::new(".."), Err(InvalidNameError::Reserved(_))));
        assert!(matches!(EntryName::new(".GIT"), Err(InvalidNameError::Reserved(_))));
    }

    #[test]
    fn test_entry_name_rejects_dotgit_aliases() {
        for alias in ["GIT~1", "git~1", ".git.", ".git ", ".Git. .", ".git\\x", ".g\u{200c}it", "\u{feff}.GIT"] {
            assert!(
                matches!(EntryName::new(alias), Err(InvalidNameError::Reserved(_))),
                "{:?} should be rejected",
                alias
            );
        }

        // only exact aliases are reserved
        assert!(EntryName::new(".gitignore").is_ok());
        assert!(EntryName::new("git~2").is_ok());
        assert!(EntryName::new("GIT~1x").is_ok());
        assert!(EntryName::new("...").is_ok());
    }

    #[test]
    fn test_branch_name() {
        let branch = BranchName::default();
        assert_eq!(branch.as_str(), "master");
        assert_eq!(branch.as_ref_path(), "refs/heads/master");

        assert!(BranchName::new("feature/x").is_ok());
        assert!(BranchName::new("").is_err());
        assert!(BranchName::new("../escape").is_err());
        assert!(BranchName::new("trailing/").is_err());
        assert!(BranchName::new("bad name").is_err());
    }

    #[test]
    fn test_commit_id_hex() {
        let hex = "ce859b3eb91e205e3eb4e5afd08a89cb829a5033";
        let id = CommitId::from_hex(hex).unwrap();
        assert_eq!(id.to_string(), hex);
        assert_eq!(id.short(), "ce859b3");
        assert!(CommitId::from_hex("not-a-sha").is_err());
    }
}
