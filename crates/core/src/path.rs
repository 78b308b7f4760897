//! Slash-delimited resource paths.
//!
//! A relative path such as `cities/NYC/neighborhoods` is a list of segments.
//! The segment count decides what the path names: an odd count is a
//! collection, an even count is a document. Every check here happens before
//! any request is built.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Id used when no database id is configured
pub const DEFAULT_DATABASE_ID: &str = "(default)";

/// What a [`ResourcePath`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    /// Even segment count
    Document,
    /// Odd segment count
    Collection,
}

/// A relative path below the database's `documents` root.
///
/// Serialized as its slash-delimited string; deserializing parses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    /// Parses a slash-delimited path.
    ///
    /// Leading and trailing slashes are ignored. An empty path or an empty
    /// segment (`a//b`) is rejected.
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(Error::invalid_argument("path must not be empty"));
        }

        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(Error::invalid_argument(format!(
                "path {path:?} contains an empty segment"
            )));
        }

        Ok(Self { segments })
    }

    /// Builds a path from already split segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty() || s.contains('/')) {
            return Err(Error::invalid_argument(
                "path segments must be non-empty and must not contain '/'",
            ));
        }
        Ok(Self { segments })
    }

    /// The individual segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; parsed paths have at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether this names a document or a collection.
    pub fn kind(&self) -> PathKind {
        if self.segments.len() % 2 == 0 {
            PathKind::Document
        } else {
            PathKind::Collection
        }
    }

    /// The final segment.
    pub fn last_segment(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Appends segments parsed from `path`.
    pub fn join(&self, path: &str) -> Result<Self> {
        let tail = Self::parse(path)?;
        let mut segments = self.segments.clone();
        segments.extend(tail.segments);
        Ok(Self { segments })
    }

    /// The path without its last segment, `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl FromStr for ResourcePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A path with an even number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentPath(ResourcePath);

impl DocumentPath {
    /// Parses `path`, failing unless it names a document.
    pub fn parse(path: &str) -> Result<Self> {
        Self::try_from(ResourcePath::parse(path)?)
    }

    /// The document id (last segment).
    pub fn document_id(&self) -> &str {
        self.0.last_segment()
    }

    /// The collection holding this document.
    pub fn parent(&self) -> CollectionPath {
        // A document path has at least two segments, so the parent exists and is odd.
        CollectionPath(self.0.parent().unwrap_or_else(|| self.0.clone()))
    }

    /// A sub-collection of this document.
    pub fn collection(&self, path: &str) -> Result<CollectionPath> {
        CollectionPath::try_from(self.0.join(path)?)
    }

    /// The underlying path.
    pub fn as_resource_path(&self) -> &ResourcePath {
        &self.0
    }
}

impl TryFrom<ResourcePath> for DocumentPath {
    type Error = Error;

    fn try_from(path: ResourcePath) -> Result<Self> {
        match path.kind() {
            PathKind::Document => Ok(Self(path)),
            PathKind::Collection => Err(Error::invalid_argument(format!(
                "document_path must refer to a document, got {path:?}",
                path = path.to_string()
            ))),
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A path with an odd number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionPath(ResourcePath);

impl CollectionPath {
    /// Parses `path`, failing unless it names a collection.
    pub fn parse(path: &str) -> Result<Self> {
        Self::try_from(ResourcePath::parse(path)?)
    }

    /// The collection id (last segment).
    pub fn collection_id(&self) -> &str {
        self.0.last_segment()
    }

    /// The document holding this collection, `None` for root collections.
    pub fn parent(&self) -> Option<DocumentPath> {
        self.0.parent().map(DocumentPath)
    }

    /// A document inside this collection.
    pub fn document(&self, path: &str) -> Result<DocumentPath> {
        DocumentPath::try_from(self.0.join(path)?)
    }

    /// The underlying path.
    pub fn as_resource_path(&self) -> &ResourcePath {
        &self.0
    }
}

impl TryFrom<ResourcePath> for CollectionPath {
    type Error = Error;

    fn try_from(path: ResourcePath) -> Result<Self> {
        match path.kind() {
            PathKind::Collection => Ok(Self(path)),
            PathKind::Document => Err(Error::invalid_argument(format!(
                "collection_path must refer to a collection, got {path:?}",
                path = path.to_string()
            ))),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// `projects/{project_id}/databases/{database_id}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseName {
    project_id: String,
    database_id: String,
}

impl DatabaseName {
    /// Creates a database name. An empty `database_id` selects `(default)`.
    pub fn new(project_id: impl Into<String>, database_id: impl Into<String>) -> Result<Self> {
        let project_id = project_id.into();
        let mut database_id = database_id.into();
        if project_id.is_empty() || project_id.contains('/') {
            return Err(Error::invalid_argument(format!(
                "invalid project id {project_id:?}"
            )));
        }
        if database_id.is_empty() {
            database_id = DEFAULT_DATABASE_ID.to_string();
        }
        if database_id.contains('/') {
            return Err(Error::invalid_argument(format!(
                "invalid database id {database_id:?}"
            )));
        }
        Ok(Self {
            project_id,
            database_id,
        })
    }

    /// Parses `projects/{p}/databases/{d}`.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim_matches('/').split('/').collect::<Vec<_>>().as_slice() {
            ["projects", project_id, "databases", database_id] if !database_id.is_empty() => {
                Self::new(*project_id, *database_id)
            }
            _ => Err(Error::invalid_argument(format!(
                "database name {name:?} must look like projects/{{project}}/databases/{{database}}"
            ))),
        }
    }

    /// The project id.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// The database id.
    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    /// `projects/{p}/databases/{d}`
    pub fn path(&self) -> String {
        format!(
            "projects/{}/databases/{}",
            self.project_id, self.database_id
        )
    }

    /// `projects/{p}/databases/{d}/documents`, the root all relative paths hang off.
    pub fn documents_path(&self) -> String {
        format!("{}/documents", self.path())
    }

    /// Full resource name of a relative path.
    pub fn resource_name(&self, path: &ResourcePath) -> String {
        format!("{}/{}", self.documents_path(), path)
    }

    /// Strips the documents root from a full resource name.
    ///
    /// Names outside this database's documents root are rejected.
    pub fn relative_path(&self, name: &str) -> Result<ResourcePath> {
        let root = format!("{}/", self.documents_path());
        let relative = name.strip_prefix(root.as_str()).ok_or_else(|| {
            Error::invalid_argument(format!(
                "{name:?} is not a document of database {}",
                self.path()
            ))
        })?;
        ResourcePath::parse(relative)
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

macro_rules! string_conversions {
    ($($ty:ty),+) => {$(
        impl TryFrom<String> for $ty {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                Self::parse(&value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.to_string()
            }
        }
    )+};
}

string_conversions!(ResourcePath, DocumentPath, CollectionPath, DatabaseName);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_slashes() {
        let path = ResourcePath::parse("/cities/NYC/").unwrap();
        assert_eq!(path.segments(), &["cities".to_string(), "NYC".to_string()]);
        assert_eq!(path.kind(), PathKind::Document);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(ResourcePath::parse("").is_err());
        assert!(ResourcePath::parse("///").is_err());
        assert!(ResourcePath::parse("cities//NYC").is_err());
    }

    #[test]
    fn test_document_and_collection_parity() {
        assert!(DocumentPath::parse("cities/NYC").is_ok());
        assert!(DocumentPath::parse("cities").is_err());
        assert!(CollectionPath::parse("cities").is_ok());
        assert!(CollectionPath::parse("cities/NYC").is_err());
        assert!(CollectionPath::parse("cities/NYC/neighborhoods").is_ok());
    }

    #[test]
    fn test_parent_and_child() {
        let doc = DocumentPath::parse("cities/NYC").unwrap();
        assert_eq!(doc.parent().to_string(), "cities");
        assert_eq!(doc.document_id(), "NYC");

        let sub = doc.collection("neighborhoods").unwrap();
        assert_eq!(sub.to_string(), "cities/NYC/neighborhoods");
        assert_eq!(sub.parent(), Some(doc));
        assert!(CollectionPath::parse("cities").unwrap().parent().is_none());
    }

    #[test]
    fn test_database_name() {
        let name = DatabaseName::new("my-project", "").unwrap();
        assert_eq!(name.database_id(), DEFAULT_DATABASE_ID);
        assert_eq!(name.path(), "projects/my-project/databases/(default)");

        let path = ResourcePath::parse("cities/NYC").unwrap();
        let full = name.resource_name(&path);
        assert_eq!(
            full,
            "projects/my-project/databases/(default)/documents/cities/NYC"
        );
        assert_eq!(name.relative_path(&full).unwrap(), path);
        assert!(name.relative_path("cities/NYC").is_err());
    }

    #[test]
    fn test_relative_path_requires_own_root() {
        let name = DatabaseName::new("p", "orders").unwrap();
        let other = "projects/p/databases/orders-archive/documents/cities/NYC";
        assert!(matches!(
            name.relative_path(other),
            Err(Error::InvalidArgument(_))
        ));
        assert!(name
            .relative_path("projects/p/databases/orders/documents")
            .is_err());
        assert_eq!(
            name.relative_path("projects/p/databases/orders/documents/cities/NYC")
                .unwrap()
                .to_string(),
            "cities/NYC"
        );
    }

    #[test]
    fn test_deserialize_checks_parity() {
        let doc: DocumentPath = serde_json::from_str(r#""cities/NYC""#).unwrap();
        assert_eq!(doc.document_id(), "NYC");
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#""cities/NYC""#);

        assert!(serde_json::from_str::<DocumentPath>(r#""cities""#).is_err());
        assert!(serde_json::from_str::<DocumentPath>(r#"{"segments":["cities"]}"#).is_err());
        assert!(serde_json::from_str::<DocumentPath>(r#"{"segments":[]}"#).is_err());
        assert!(serde_json::from_str::<CollectionPath>(r#""cities/NYC""#).is_err());
        assert!(serde_json::from_str::<ResourcePath>(r#""""#).is_err());
    }

    #[test]
    fn test_database_name_round_trips_as_string() {
        let name = DatabaseName::new("p", "").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, r#""projects/p/databases/(default)""#);
        assert_eq!(serde_json::from_str::<DatabaseName>(&json).unwrap(), name);
        assert!(serde_json::from_str::<DatabaseName>(r#""projects/p""#).is_err());
        assert!(serde_json::from_str::<DatabaseName>(r#""projects//databases/d""#).is_err());
    }

    #[test]
    fn test_database_name_rejects_bad_project() {
        assert!(DatabaseName::new("", "db").is_err());
        assert!(DatabaseName::new("a/b", "db").is_err());
    }
}
