//! Write batches.
//!
//! A [`Batch`] collects writes in memory and sends them to the service in a
//! single atomic commit. It moves from open to closed exactly once, on
//! [`Batch::commit`]; every mutation afterwards fails with [`Error::Closed`].

use crate::convert::{Convert, Merge};
use crate::database::Database;
use crate::query::Query;
use crate::reference::{CollectionReference, DocumentReference};
use crate::snapshot::{DocumentSnapshot, DocumentStream, GetAllStream};
use chrono::{DateTime, Utc};
use firestore_core::{
    DocumentData, DocumentPath, Error, FieldPath, PathKind, ResourcePath, Result, Value, Write,
};
use indexmap::IndexMap;
use tracing::{debug, trace};

/// A document named by path, reference or snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentTarget {
    /// Path relative to the documents root, e.g. `cities/NYC`
    Path(String),
    /// A document reference
    Reference(DocumentReference),
    /// A previously read snapshot
    Snapshot(DocumentSnapshot),
}

impl From<&str> for DocumentTarget {
    fn from(path: &str) -> Self {
        DocumentTarget::Path(path.to_string())
    }
}

impl From<String> for DocumentTarget {
    fn from(path: String) -> Self {
        DocumentTarget::Path(path)
    }
}

impl From<DocumentReference> for DocumentTarget {
    fn from(reference: DocumentReference) -> Self {
        DocumentTarget::Reference(reference)
    }
}

impl From<&DocumentReference> for DocumentTarget {
    fn from(reference: &DocumentReference) -> Self {
        DocumentTarget::Reference(reference.clone())
    }
}

impl From<DocumentSnapshot> for DocumentTarget {
    fn from(snapshot: DocumentSnapshot) -> Self {
        DocumentTarget::Snapshot(snapshot)
    }
}

impl From<&DocumentSnapshot> for DocumentTarget {
    fn from(snapshot: &DocumentSnapshot) -> Self {
        DocumentTarget::Reference(snapshot.reference().clone())
    }
}

/// Anything [`Batch::get`] can read.
#[derive(Debug, Clone, PartialEq)]
pub enum GetTarget {
    /// A document or collection path; parity decides which
    Path(String),
    /// A single document
    Document(DocumentReference),
    /// Every document of a collection
    Collection(CollectionReference),
    /// The document a snapshot was read from
    Snapshot(DocumentSnapshot),
    /// A composed query
    Query(Query),
}

impl From<&str> for GetTarget {
    fn from(path: &str) -> Self {
        GetTarget::Path(path.to_string())
    }
}

impl From<String> for GetTarget {
    fn from(path: String) -> Self {
        GetTarget::Path(path)
    }
}

impl From<DocumentReference> for GetTarget {
    fn from(reference: DocumentReference) -> Self {
        GetTarget::Document(reference)
    }
}

impl From<&DocumentReference> for GetTarget {
    fn from(reference: &DocumentReference) -> Self {
        GetTarget::Document(reference.clone())
    }
}

impl From<CollectionReference> for GetTarget {
    fn from(reference: CollectionReference) -> Self {
        GetTarget::Collection(reference)
    }
}

impl From<&CollectionReference> for GetTarget {
    fn from(reference: &CollectionReference) -> Self {
        GetTarget::Collection(reference.clone())
    }
}

impl From<DocumentSnapshot> for GetTarget {
    fn from(snapshot: DocumentSnapshot) -> Self {
        GetTarget::Snapshot(snapshot)
    }
}

impl From<Query> for GetTarget {
    fn from(query: Query) -> Self {
        GetTarget::Query(query)
    }
}

/// Result of [`Batch::get`].
#[derive(Debug)]
pub enum GetResult {
    /// A document-shaped target; may not exist
    Document(DocumentSnapshot),
    /// A collection or query target
    Documents(DocumentStream),
}

impl GetResult {
    /// The snapshot, if the target was a document.
    pub fn into_document(self) -> Option<DocumentSnapshot> {
        match self {
            GetResult::Document(snapshot) => Some(snapshot),
            GetResult::Documents(_) => None,
        }
    }

    /// The stream, if the target was a collection or query.
    pub fn into_documents(self) -> Option<DocumentStream> {
        match self {
            GetResult::Document(_) => None,
            GetResult::Documents(stream) => Some(stream),
        }
    }
}

/// Pending writes against one database, committed atomically.
#[derive(Debug)]
pub struct Batch<'db> {
    database: &'db Database,
    writes: Vec<Write>,
    closed: bool,
}

impl<'db> Batch<'db> {
    pub(crate) fn new(database: &'db Database) -> Self {
        Self {
            database,
            writes: Vec::new(),
            closed: false,
        }
    }

    /// Project id of the owning database.
    pub fn project_id(&self) -> &str {
        self.database.project_id()
    }

    /// Database id of the owning database.
    pub fn database_id(&self) -> &str {
        self.database.database_id()
    }

    /// The owning database.
    pub fn database(&self) -> &'db Database {
        self.database
    }

    /// A reference to the collection at `path`.
    pub fn col(&self, path: &str) -> Result<CollectionReference> {
        self.database.col(path)
    }

    /// A reference to the document at `path`.
    pub fn doc(&self, path: &str) -> Result<DocumentReference> {
        self.database.doc(path)
    }

    /// The top-level collections.
    pub fn collections(&self) -> Result<Vec<CollectionReference>> {
        self.database.collections()
    }

    /// Alias of [`Batch::collections`].
    pub fn cols(&self) -> Result<Vec<CollectionReference>> {
        self.collections()
    }

    /// Reads several documents in one request.
    ///
    /// Snapshots come back in the order the targets were given. Documents
    /// that do not exist are left out. `field_mask` limits the returned
    /// fields.
    pub fn get_all<I, T>(&self, targets: I, field_mask: Option<&[&str]>) -> Result<GetAllStream>
    where
        I: IntoIterator<Item = T>,
        T: Into<DocumentTarget>,
    {
        let paths = targets
            .into_iter()
            .map(|target| self.resolve(target.into()).map(|doc| doc.path()))
            .collect::<Result<Vec<_>>>()?;
        let mask = field_mask
            .map(|fields| {
                fields
                    .iter()
                    .map(|field| FieldPath::parse(field))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        debug!(target: "firestore", documents = paths.len(), "batched read");
        let stream = self
            .database
            .service()?
            .get_documents(paths.clone(), mask)?;
        Ok(GetAllStream::new(
            self.database.name().clone(),
            paths,
            stream,
        ))
    }

    /// Reads a document, a collection or a query.
    pub fn get(&self, target: impl Into<GetTarget>) -> Result<GetResult> {
        match target.into() {
            GetTarget::Path(path) => match ResourcePath::parse(&path)?.kind() {
                PathKind::Document => self.get_document(self.doc(&path)?),
                PathKind::Collection => self.run_query(&self.col(&path)?.query()),
            },
            GetTarget::Document(reference) => self.get_document(self.check_database(reference)?),
            GetTarget::Snapshot(snapshot) => {
                self.get_document(self.check_database(snapshot.reference().clone())?)
            }
            GetTarget::Collection(collection) => {
                if collection.database_name() != self.database.name() {
                    return Err(foreign_database(&collection.path()));
                }
                self.run_query(&collection.query())
            }
            GetTarget::Query(query) => self.run_query(&query),
        }
    }

    fn get_document(&self, reference: DocumentReference) -> Result<GetResult> {
        let path = reference.path();
        trace!(target: "firestore", path = %path, "single document read");
        let stream = self.database.service()?.get_documents(vec![path], None)?;

        let mut read_time = None;
        for result in stream {
            let result = result?;
            read_time = Convert::timestamp_to_time(result.read_time)?;
            if let Some(document) = result.document {
                let snapshot =
                    DocumentSnapshot::from_document(self.database.name(), document, read_time)?;
                return Ok(GetResult::Document(snapshot));
            }
        }
        Ok(GetResult::Document(DocumentSnapshot::missing(
            reference, read_time,
        )))
    }

    fn run_query(&self, query: &Query) -> Result<GetResult> {
        self.database.run_query(query).map(GetResult::Documents)
    }

    /// Creates a document. The commit fails if it already exists.
    pub fn create(&mut self, doc: impl Into<DocumentTarget>, data: DocumentData) -> Result<()> {
        let path = self.writable_path(doc.into())?;
        let writes = Convert::create_writes(&path, data)?;
        self.push(writes);
        Ok(())
    }

    /// Writes a document, replacing it unless `merge` is given.
    pub fn set(
        &mut self,
        doc: impl Into<DocumentTarget>,
        data: DocumentData,
        merge: Option<Merge>,
    ) -> Result<()> {
        let path = self.writable_path(doc.into())?;
        let writes = Convert::set_writes(&path, data, merge)?;
        self.push(writes);
        Ok(())
    }

    /// Updates fields of an existing document.
    ///
    /// Keys are dotted field paths. With `update_time` the commit fails
    /// unless the document was last written at exactly that time.
    pub fn update(
        &mut self,
        doc: impl Into<DocumentTarget>,
        data: IndexMap<String, Value>,
        update_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let path = self.writable_path(doc.into())?;
        let writes = Convert::update_writes(&path, data, update_time)?;
        self.push(writes);
        Ok(())
    }

    /// Deletes a document, optionally guarded by a precondition.
    pub fn delete(
        &mut self,
        doc: impl Into<DocumentTarget>,
        exists: Option<bool>,
        update_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let path = self.writable_path(doc.into())?;
        let write = Convert::delete_write(&path, exists, update_time)?;
        self.push(vec![write]);
        Ok(())
    }

    /// Closes the batch and sends every pending write in one request.
    ///
    /// Returns the commit time, or `None` for an empty batch, in which case
    /// nothing is sent. Service errors are returned unchanged; the batch
    /// stays closed either way.
    pub fn commit(&mut self) -> Result<Option<DateTime<Utc>>> {
        self.ensure_open()?;
        self.closed = true;

        if self.writes.is_empty() {
            debug!(target: "firestore", "empty batch, nothing to commit");
            return Ok(None);
        }

        let service = self.database.service()?;
        debug!(target: "firestore", writes = self.writes.len(), "committing batch");
        let response = service.commit(self.writes.clone())?;
        let commit_time = Convert::timestamp_to_time(response.commit_time)?;
        debug!(target: "firestore", commit_time = ?commit_time, "batch committed");
        Ok(commit_time)
    }

    /// Whether the batch has been committed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Writes in the order they will be committed.
    pub fn pending_writes(&self) -> &[Write] {
        &self.writes
    }

    /// Number of pending writes.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether no writes are pending.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Checks batch state and resolves the target's full resource name.
    fn writable_path(&self, target: DocumentTarget) -> Result<String> {
        self.ensure_open()?;
        self.database.service()?;
        Ok(self.resolve(target)?.path())
    }

    fn resolve(&self, target: DocumentTarget) -> Result<DocumentReference> {
        match target {
            DocumentTarget::Path(path) => Ok(DocumentReference::new(
                self.database.name().clone(),
                DocumentPath::parse(&path)?,
            )),
            DocumentTarget::Reference(reference) => self.check_database(reference),
            DocumentTarget::Snapshot(snapshot) => {
                self.check_database(snapshot.reference().clone())
            }
        }
    }

    fn check_database(&self, reference: DocumentReference) -> Result<DocumentReference> {
        if reference.database_name() != self.database.name() {
            return Err(foreign_database(&reference.path()));
        }
        Ok(reference)
    }

    fn push(&mut self, writes: Vec<Write>) {
        for write in &writes {
            trace!(
                target: "firestore",
                document = %write.document_name(),
                kind = ?write.kind(),
                "queued write"
            );
        }
        self.writes.extend(writes);
    }
}

fn foreign_database(path: &str) -> Error {
    Error::invalid_argument(format!("{path} belongs to a different database"))
}
