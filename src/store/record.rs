//! Read-only view of one history entry.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::storage::{CommitInfo, GitSignature};
use crate::store::error::{StoreError, StoreResult};

/// The fixed set of fields a [`CommitRecord`] exposes by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    Id,
    Parents,
    Tree,
    Message,
    Author,
    Committer,
    AuthoredDate,
    CommittedDate,
    Value,
}

impl FieldName {
    pub const ALL: [FieldName; 9] = [
        FieldName::Id,
        FieldName::Parents,
        FieldName::Tree,
        FieldName::Message,
        FieldName::Author,
        FieldName::Committer,
        FieldName::AuthoredDate,
        FieldName::CommittedDate,
        FieldName::Value,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Id => "id",
            FieldName::Parents => "parents",
            FieldName::Tree => "tree",
            FieldName::Message => "message",
            FieldName::Author => "author",
            FieldName::Committer => "committer",
            FieldName::AuthoredDate => "authored_date",
            FieldName::CommittedDate => "committed_date",
            FieldName::Value => "value",
        }
    }
}

impl FromStr for FieldName {
    type Err = StoreError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .into_iter()
            .find(|field| field.as_str() == name)
            .ok_or_else(|| StoreError::UnknownField(name.to_string()))
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A borrowed field value returned by name-based access.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a, V> {
    Text(&'a str),
    Ids(&'a [String]),
    Signature(&'a GitSignature),
    Value(Option<&'a V>),
}

/// One entry of a key's history.
///
/// Dates are kept as the ISO-8601 strings they were recorded with and
/// parsed on first access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord<V = serde_json::Value> {
    id: String,
    parents: Vec<String>,
    tree: String,
    message: String,
    author: GitSignature,
    committer: GitSignature,
    authored_date: String,
    committed_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<V>,
    #[serde(skip)]
    authored_cache: OnceLock<DateTime<FixedOffset>>,
    #[serde(skip)]
    committed_cache: OnceLock<DateTime<FixedOffset>>,
}

impl<V> CommitRecord<V> {
    pub(crate) fn from_info(info: CommitInfo, value: Option<V>) -> Self {
        Self {
            id: info.id.to_string(),
            parents: info.parent_ids.iter().map(ToString::to_string).collect(),
            tree: info.tree_id.to_string(),
            message: info.message,
            author: info.author,
            committer: info.committer,
            authored_date: info.authored_at.to_rfc3339(),
            committed_date: info.committed_at.to_rfc3339(),
            value,
            authored_cache: OnceLock::from(info.authored_at),
            committed_cache: OnceLock::from(info.committed_at),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn tree(&self) -> &str {
        &self.tree
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn author(&self) -> &GitSignature {
        &self.author
    }

    pub fn committer(&self) -> &GitSignature {
        &self.committer
    }

    /// the key's value as of this commit; `None` if not requested or absent then
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn authored_date(&self) -> StoreResult<DateTime<FixedOffset>> {
        parse_cached(&self.authored_cache, &self.authored_date, "authored_date")
    }

    pub fn committed_date(&self) -> StoreResult<DateTime<FixedOffset>> {
        parse_cached(&self.committed_cache, &self.committed_date, "committed_date")
    }

    /// field access by schema name; unknown names are an error
    pub fn field(&self, name: &str) -> StoreResult<Field<'_, V>> {
        Ok(self.get(name.parse()?))
    }

    pub fn get(&self, name: FieldName) -> Field<'_, V> {
        match name {
            FieldName::Id => Field::Text(&self.id),
            FieldName::Parents => Field::Ids(&self.parents),
            FieldName::Tree => Field::Text(&self.tree),
            FieldName::Message => Field::Text(&self.message),
            FieldName::Author => Field::Signature(&self.author),
            FieldName::Committer => Field::Signature(&self.committer),
            FieldName::AuthoredDate => Field::Text(&self.authored_date),
            FieldName::CommittedDate => Field::Text(&self.committed_date),
            FieldName::Value => Field::Value(self.value.as_ref()),
        }
    }
}

fn parse_cached(
    cache: &OnceLock<DateTime<FixedOffset>>,
    raw: &str,
    field: &'static str,
) -> StoreResult<DateTime<FixedOffset>> {
    if let Some(date) = cache.get() {
        return Ok(*date);
    }
    let date = DateTime::parse_from_rfc3339(raw).map_err(|e| StoreError::InvalidTimestamp {
        field,
        reason: e.to_string(),
    })?;
    Ok(*cache.get_or_init(|| date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> serde_json::Value {
        json!({
            "id": "ce859b3eb91e205e3eb4e5afd08a89cb829a5033",
            "parents": ["c4ed9fbb6a9f4f28d8c735f95ddd4350a910b8f5"],
            "tree": "34d6127bea6e7d56c272b719a70081be1d944282",
            "message": "set 'Page:27:main'",
            "author": {"name": "admin", "email": "admin@local.host"},
            "committer": {"name": "admin", "email": "admin@local.host"},
            "authored_date": "2011-12-08T13:01:08-05:00",
            "committed_date": "2011-12-08T13:01:08-05:00"
        })
    }

    fn entry() -> CommitRecord {
        serde_json::from_value(record()).unwrap()
    }

    #[test]
    fn test_dates_parse() {
        let entry = entry();
        let expected = DateTime::parse_from_rfc3339("2011-12-08T13:01:08-05:00").unwrap();
        assert_eq!(entry.committed_date().unwrap(), expected);
        assert_eq!(entry.authored_date().unwrap(), expected);
        // second access comes from the cache
        assert_eq!(entry.committed_date().unwrap(), expected);
        assert_eq!(entry.committed_date().unwrap().offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_invalid_date() {
        let mut raw = record();
        raw["authored_date"] = json!("yesterday");
        let entry: CommitRecord = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            entry.authored_date(),
            Err(StoreError::InvalidTimestamp { field: "authored_date", .. })
        ));
    }

    #[test]
    fn test_accessors() {
        let entry = entry();
        assert_eq!(entry.id(), "ce859b3eb91e205e3eb4e5afd08a89cb829a5033");
        assert_eq!(entry.parents(), ["c4ed9fbb6a9f4f28d8c735f95ddd4350a910b8f5".to_string()]);
        assert_eq!(entry.tree(), "34d6127bea6e7d56c272b719a70081be1d944282");
        assert_eq!(entry.message(), "set 'Page:27:main'");
        assert_eq!(entry.author(), &GitSignature::new("admin", "admin@local.host"));
        assert_eq!(entry.committer().email, "admin@local.host");
        assert!(entry.value().is_none());
    }

    #[test]
    fn test_field_by_name() {
        let entry = entry();
        let raw = record();

        for name in ["id", "tree", "message", "authored_date", "committed_date"] {
            assert_eq!(entry.field(name).unwrap(), Field::Text(raw[name].as_str().unwrap()));
        }
        assert!(matches!(entry.field("parents").unwrap(), Field::Ids(ids) if ids.len() == 1));
        assert!(matches!(entry.field("author").unwrap(), Field::Signature(sig) if sig.name == "admin"));
        assert_eq!(entry.field("value").unwrap(), Field::Value(None));
        assert_eq!(entry.get(FieldName::Message), Field::Text("set 'Page:27:main'"));
    }

    #[test]
    fn test_unknown_field_fails() {
        let entry = entry();
        assert!(matches!(entry.field("branch"), Err(StoreError::UnknownField(name)) if name == "branch"));
        assert!(entry.field("Id").is_err());
    }

    #[test]
    fn test_serializes_to_mapping() {
        let entry = entry();
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value, record());

        let with_value: CommitRecord<u32> = serde_json::from_value({
            let mut raw = record();
            raw["value"] = json!(7);
            raw
        })
        .unwrap();
        assert_eq!(with_value.value(), Some(&7));
        assert_eq!(with_value.field("value").unwrap(), Field::Value(Some(&7)));
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in FieldName::ALL {
            assert_eq!(field.as_str().parse::<FieldName>().unwrap(), field);
        }
    }
}
