//! The narrow interface to the remote database.
//!
//! Everything that touches the network goes through [`FirestoreService`].
//! Transport, authentication, retries and timeouts belong to the
//! implementation; the client only ever calls these four methods.

use crate::query::StructuredQuery;
use firestore_core::{CommitResponse, Document, FieldPath, Result, Timestamp, Write};

/// Lazy sequence of read results.
pub type ReadStream = Box<dyn Iterator<Item = Result<ReadResult>> + Send>;

/// One element of a batched read or query response.
///
/// A batched read reports every requested document as either found or
/// missing. A query response may carry only a read time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadResult {
    /// The document, when it exists
    pub document: Option<Document>,
    /// Full resource name of a requested document that does not exist
    pub missing: Option<String>,
    /// Time at which the read was served
    pub read_time: Option<Timestamp>,
}

impl ReadResult {
    /// A found document.
    pub fn found(document: Document, read_time: Option<Timestamp>) -> Self {
        Self {
            document: Some(document),
            missing: None,
            read_time,
        }
    }

    /// A requested document that does not exist.
    pub fn missing(name: impl Into<String>, read_time: Option<Timestamp>) -> Self {
        Self {
            document: None,
            missing: Some(name.into()),
            read_time,
        }
    }

    /// Full resource name this result refers to, if any.
    pub fn name(&self) -> Option<&str> {
        self.document
            .as_ref()
            .map(|document| document.name.as_str())
            .or(self.missing.as_deref())
    }
}

/// Remote database operations.
#[cfg_attr(test, mockall::automock)]
pub trait FirestoreService: Send + Sync {
    /// Lists the ids of the collections directly below `parent`.
    ///
    /// `parent` is a full resource name: a document, or the database's
    /// documents root for top-level collections.
    fn list_collections(&self, parent: &str) -> Result<Vec<String>>;

    /// Reads the given documents (full resource names) in one request.
    fn get_documents(&self, paths: Vec<String>, mask: Option<Vec<FieldPath>>)
        -> Result<ReadStream>;

    /// Runs a query below `parent`.
    fn run_query(&self, parent: &str, query: &StructuredQuery) -> Result<ReadStream>;

    /// Applies all writes atomically.
    fn commit(&self, writes: Vec<Write>) -> Result<CommitResponse>;
}
