//! Document snapshots and the lazy sequences that produce them.

use crate::convert::Convert;
use crate::reference::DocumentReference;
use crate::service::{ReadResult, ReadStream};
use chrono::{DateTime, Utc};
use firestore_core::{
    get_field, DatabaseName, Document, DocumentData, DocumentPath, FieldPath, Result, Value,
};
use std::collections::{HashMap, VecDeque};
use tracing::trace;

/// The contents of a document at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    reference: DocumentReference,
    data: Option<DocumentData>,
    create_time: Option<DateTime<Utc>>,
    update_time: Option<DateTime<Utc>>,
    read_time: Option<DateTime<Utc>>,
}

impl DocumentSnapshot {
    /// Builds a snapshot from a service document.
    pub fn from_document(
        database: &DatabaseName,
        document: Document,
        read_time: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        let path = DocumentPath::try_from(database.relative_path(&document.name)?)?;
        Ok(Self {
            reference: DocumentReference::new(database.clone(), path),
            data: Some(document.fields),
            create_time: Convert::timestamp_to_time(document.create_time)?,
            update_time: Convert::timestamp_to_time(document.update_time)?,
            read_time,
        })
    }

    /// A snapshot of a document that does not exist.
    pub fn missing(reference: DocumentReference, read_time: Option<DateTime<Utc>>) -> Self {
        Self {
            reference,
            data: None,
            create_time: None,
            update_time: None,
            read_time,
        }
    }

    /// The document's reference.
    pub fn reference(&self) -> &DocumentReference {
        &self.reference
    }

    /// The document id.
    pub fn document_id(&self) -> &str {
        self.reference.document_id()
    }

    /// Full resource name.
    pub fn path(&self) -> String {
        self.reference.path()
    }

    /// Whether the document existed when read.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// The fields, `None` when the document does not exist.
    pub fn data(&self) -> Option<&DocumentData> {
        self.data.as_ref()
    }

    /// Consumes the snapshot, returning its fields.
    pub fn into_data(self) -> Option<DocumentData> {
        self.data
    }

    /// Looks up a dotted field path.
    pub fn get(&self, field: &str) -> Result<Option<&Value>> {
        let path = FieldPath::parse(field)?;
        Ok(self.get_path(&path))
    }

    /// Looks up a parsed field path.
    pub fn get_path(&self, path: &FieldPath) -> Option<&Value> {
        self.data.as_ref().and_then(|data| get_field(data, path))
    }

    /// Creation time, for existing documents.
    pub fn create_time(&self) -> Option<DateTime<Utc>> {
        self.create_time
    }

    /// Last update time, for existing documents.
    pub fn update_time(&self) -> Option<DateTime<Utc>> {
        self.update_time
    }

    /// Time the snapshot was read.
    pub fn read_time(&self) -> Option<DateTime<Utc>> {
        self.read_time
    }
}

fn snapshot_from_result(
    database: &DatabaseName,
    result: ReadResult,
) -> Option<Result<DocumentSnapshot>> {
    let read_time = match Convert::timestamp_to_time(result.read_time) {
        Ok(read_time) => read_time,
        Err(e) => return Some(Err(e)),
    };
    result
        .document
        .map(|document| DocumentSnapshot::from_document(database, document, read_time))
}

/// Snapshots of the documents a query matched.
///
/// Results without a document (progress-only responses) are skipped.
pub struct DocumentStream {
    database: DatabaseName,
    inner: ReadStream,
}

impl DocumentStream {
    pub(crate) fn new(database: DatabaseName, inner: ReadStream) -> Self {
        Self { database, inner }
    }
}

impl Iterator for DocumentStream {
    type Item = Result<DocumentSnapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(result) => {
                    if let Some(snapshot) = snapshot_from_result(&self.database, result) {
                        return Some(snapshot);
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl std::fmt::Debug for DocumentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStream")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

/// Snapshots of a batched read, in the order the paths were requested.
///
/// Missing documents are skipped. Results that arrive ahead of their turn
/// are held back until every earlier path has been seen, so ordering does not
/// depend on the service. A path requested more than once is buffered once
/// per result received for it.
pub struct GetAllStream {
    database: DatabaseName,
    inner: ReadStream,
    requested: Vec<String>,
    next_index: usize,
    pending: HashMap<String, VecDeque<ReadResult>>,
    exhausted: bool,
}

impl GetAllStream {
    pub(crate) fn new(database: DatabaseName, requested: Vec<String>, inner: ReadStream) -> Self {
        Self {
            database,
            inner,
            requested,
            next_index: 0,
            pending: HashMap::new(),
            exhausted: false,
        }
    }

    /// Pops the next requested result that is ready, if any.
    fn take_ready(&mut self) -> Option<ReadResult> {
        while self.next_index < self.requested.len() {
            let name = &self.requested[self.next_index];
            match self.pending.get_mut(name).and_then(VecDeque::pop_front) {
                Some(result) => {
                    self.next_index += 1;
                    return Some(result);
                }
                None if self.exhausted => {
                    trace!(target: "firestore", path = %name, "no result for requested document");
                    self.next_index += 1;
                }
                None => return None,
            }
        }
        None
    }
}

impl Iterator for GetAllStream {
    type Item = Result<DocumentSnapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(result) = self.take_ready() {
                match snapshot_from_result(&self.database, result) {
                    Some(snapshot) => return Some(snapshot),
                    None => continue,
                }
            }
            if self.exhausted {
                return None;
            }
            match self.inner.next() {
                Some(Ok(result)) => {
                    let name = result.name().map(str::to_string);
                    match name {
                        Some(name) => self.pending.entry(name).or_default().push_back(result),
                        None => trace!(target: "firestore", "skipping read result without a name"),
                    }
                }
                Some(Err(e)) => return Some(Err(e)),
                None => self.exhausted = true,
            }
        }
    }
}

impl std::fmt::Debug for GetAllStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetAllStream")
            .field("database", &self.database)
            .field("requested", &self.requested)
            .field("next_index", &self.next_index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firestore_core::{data_from_json, Timestamp};
    use serde_json::json;

    fn db() -> DatabaseName {
        DatabaseName::new("p", "(default)").unwrap()
    }

    fn name(path: &str) -> String {
        format!("projects/p/databases/(default)/documents/{path}")
    }

    fn found(path: &str) -> ReadResult {
        let fields = data_from_json(json!({"id": path})).unwrap();
        ReadResult::found(Document::new(name(path), fields), Some(Timestamp::new(10, 0)))
    }

    #[test]
    fn test_snapshot_accessors() {
        let mut document = Document::new(
            name("cities/NYC"),
            data_from_json(json!({"address": {"state": "NY"}})).unwrap(),
        );
        document.update_time = Some(Timestamp::new(100, 0));

        let snapshot = DocumentSnapshot::from_document(&db(), document, None).unwrap();
        assert!(snapshot.exists());
        assert_eq!(snapshot.document_id(), "NYC");
        assert_eq!(
            snapshot.get("address.state").unwrap(),
            Some(&Value::from("NY"))
        );
        assert_eq!(snapshot.update_time().unwrap().timestamp(), 100);
        assert!(snapshot.get("address..state").is_err());
    }

    #[test]
    fn test_get_all_reorders_and_skips_missing() {
        let requested = vec![name("a/1"), name("a/2"), name("a/3")];
        let results: Vec<Result<ReadResult>> = vec![
            Ok(found("a/3")),
            Ok(ReadResult::missing(name("a/2"), None)),
            Ok(found("a/1")),
        ];
        let stream = GetAllStream::new(db(), requested, Box::new(results.into_iter()));
        let ids: Vec<String> = stream
            .map(|s| s.unwrap().document_id().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_get_all_keeps_duplicate_requests() {
        let requested = vec![name("a/B"), name("a/A"), name("a/A")];
        for arrival in [["a/B", "a/A", "a/A"], ["a/A", "a/A", "a/B"], ["a/A", "a/B", "a/A"]] {
            let results: Vec<Result<ReadResult>> =
                arrival.iter().map(|path| Ok(found(path))).collect();
            let stream =
                GetAllStream::new(db(), requested.clone(), Box::new(results.into_iter()));
            let ids: Vec<String> = stream
                .map(|s| s.unwrap().document_id().to_string())
                .collect();
            assert_eq!(ids, vec!["B", "A", "A"], "arrival order {arrival:?}");
        }
    }

    #[test]
    fn test_document_stream_skips_empty_results() {
        let results: Vec<Result<ReadResult>> = vec![
            Ok(ReadResult {
                read_time: Some(Timestamp::new(1, 0)),
                ..ReadResult::default()
            }),
            Ok(found("a/1")),
        ];
        let stream = DocumentStream::new(db(), Box::new(results.into_iter()));
        let snapshots: Vec<DocumentSnapshot> = stream.map(|s| s.unwrap()).collect();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].read_time().unwrap().timestamp(), 10);
    }
}
