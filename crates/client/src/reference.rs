//! Document and collection references.
//!
//! References are path identities bound to a database name. They carry no
//! connection; reads and writes go through a [`Batch`](crate::Batch) or the
//! [`Database`](crate::Database).

use crate::query::Query;
use firestore_core::{CollectionPath, DatabaseName, DocumentPath, Result};
use std::fmt;

/// A reference to a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentReference {
    database: DatabaseName,
    path: DocumentPath,
}

impl DocumentReference {
    /// Creates a reference from a parsed path.
    pub fn new(database: DatabaseName, path: DocumentPath) -> Self {
        Self { database, path }
    }

    /// The document id.
    pub fn document_id(&self) -> &str {
        self.path.document_id()
    }

    /// Path relative to the documents root, e.g. `cities/NYC`.
    pub fn document_path(&self) -> &DocumentPath {
        &self.path
    }

    /// Full resource name.
    pub fn path(&self) -> String {
        self.database.resource_name(self.path.as_resource_path())
    }

    /// The database this reference belongs to.
    pub fn database_name(&self) -> &DatabaseName {
        &self.database
    }

    /// The collection holding this document.
    pub fn parent(&self) -> CollectionReference {
        CollectionReference::new(self.database.clone(), self.path.parent())
    }

    /// A sub-collection of this document.
    pub fn col(&self, collection_path: &str) -> Result<CollectionReference> {
        Ok(CollectionReference::new(
            self.database.clone(),
            self.path.collection(collection_path)?,
        ))
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// A reference to a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionReference {
    database: DatabaseName,
    path: CollectionPath,
}

impl CollectionReference {
    /// Creates a reference from a parsed path.
    pub fn new(database: DatabaseName, path: CollectionPath) -> Self {
        Self { database, path }
    }

    /// The collection id.
    pub fn collection_id(&self) -> &str {
        self.path.collection_id()
    }

    /// Path relative to the documents root, e.g. `cities`.
    pub fn collection_path(&self) -> &CollectionPath {
        &self.path
    }

    /// Full resource name.
    pub fn path(&self) -> String {
        self.database.resource_name(self.path.as_resource_path())
    }

    /// The database this reference belongs to.
    pub fn database_name(&self) -> &DatabaseName {
        &self.database
    }

    /// Full resource name of the parent: the owning document, or the
    /// documents root for top-level collections. Queries run below it.
    pub fn parent_path(&self) -> String {
        match self.path.parent() {
            Some(parent) => self.database.resource_name(parent.as_resource_path()),
            None => self.database.documents_path(),
        }
    }

    /// The document holding this collection, `None` at the root.
    pub fn parent(&self) -> Option<DocumentReference> {
        self.path
            .parent()
            .map(|path| DocumentReference::new(self.database.clone(), path))
    }

    /// A document in this collection.
    pub fn doc(&self, document_path: &str) -> Result<DocumentReference> {
        Ok(DocumentReference::new(
            self.database.clone(),
            self.path.document(document_path)?,
        ))
    }

    /// A query over every document in this collection.
    pub fn query(&self) -> Query {
        Query::new(self.parent_path(), self.collection_id(), false)
    }
}

impl From<CollectionReference> for Query {
    fn from(collection: CollectionReference) -> Self {
        collection.query()
    }
}

impl fmt::Display for CollectionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}
