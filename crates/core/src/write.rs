//! Write-operation records.
//!
//! A [`Write`] is one create/set/update/delete instruction. Records are built
//! by the client's converter and shipped to the service unchanged, in the
//! order they were added to a batch.

use crate::field_path::FieldPath;
use crate::timestamp::Timestamp;
use crate::value::DocumentData;
use serde::{Deserialize, Serialize};

/// Server-enforced condition attached to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Precondition {
    /// The document must (`true`) or must not (`false`) exist
    Exists(bool),
    /// The document must have been last modified at exactly this time
    UpdateTime(Timestamp),
}

/// A document as sent to or received from the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    pub name: String,
    /// Field values
    #[serde(default)]
    pub fields: DocumentData,
    /// Creation time, set by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<Timestamp>,
    /// Last modification time, set by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<Timestamp>,
}

impl Document {
    /// A document with no service timestamps.
    pub fn new(name: impl Into<String>, fields: DocumentData) -> Self {
        Self {
            name: name.into(),
            fields,
            create_time: None,
            update_time: None,
        }
    }
}

/// Server-side value a transform writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerValue {
    /// The commit time of the request
    RequestTime,
}

/// A transform applied to one field after the write's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTransform {
    /// Field the transform writes
    pub field_path: FieldPath,
    /// Value written
    pub set_to_server_value: ServerValue,
}

/// The payload of a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteOperation {
    /// Write the given fields
    Update(Document),
    /// Delete the named document
    Delete(String),
}

/// What a write does, for callers that only care about the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// Create
    Create,
    /// Full overwrite
    Set,
    /// Merge set
    Merge,
    /// Partial update
    Update,
    /// Delete
    Delete,
}

/// One write-operation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    /// Payload
    pub operation: WriteOperation,
    /// Fields to overwrite; `None` replaces the whole document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_mask: Option<Vec<FieldPath>>,
    /// Transforms applied after the payload
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update_transforms: Vec<FieldTransform>,
    /// Optional precondition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_document: Option<Precondition>,
}

impl Write {
    /// Full resource name of the target document.
    pub fn document_name(&self) -> &str {
        match &self.operation {
            WriteOperation::Update(document) => &document.name,
            WriteOperation::Delete(name) => name,
        }
    }

    /// Classifies the write.
    pub fn kind(&self) -> WriteKind {
        match (&self.operation, &self.update_mask, &self.current_document) {
            (WriteOperation::Delete(_), _, _) => WriteKind::Delete,
            (_, None, Some(Precondition::Exists(false))) => WriteKind::Create,
            (_, None, _) => WriteKind::Set,
            (_, Some(_), None) => WriteKind::Merge,
            (_, Some(_), Some(_)) => WriteKind::Update,
        }
    }

    /// The field payload, `None` for deletes.
    pub fn fields(&self) -> Option<&DocumentData> {
        match &self.operation {
            WriteOperation::Update(document) => Some(&document.fields),
            WriteOperation::Delete(_) => None,
        }
    }
}

/// Result of a single write within a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    /// Last update time of the document after the write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<Timestamp>,
}

/// Response of the commit RPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    /// Time at which the commit was applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_time: Option<Timestamp>,
    /// One entry per write, in request order
    #[serde(default)]
    pub write_results: Vec<WriteResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(mask: Option<Vec<FieldPath>>, pre: Option<Precondition>) -> Write {
        Write {
            operation: WriteOperation::Update(Document::new("d", DocumentData::new())),
            update_mask: mask,
            update_transforms: Vec::new(),
            current_document: pre,
        }
    }

    #[test]
    fn test_kind() {
        assert_eq!(
            update(None, Some(Precondition::Exists(false))).kind(),
            WriteKind::Create
        );
        assert_eq!(update(None, None).kind(), WriteKind::Set);
        assert_eq!(update(Some(vec![]), None).kind(), WriteKind::Merge);
        assert_eq!(
            update(Some(vec![]), Some(Precondition::Exists(true))).kind(),
            WriteKind::Update
        );
        let delete = Write {
            operation: WriteOperation::Delete("d".into()),
            update_mask: None,
            update_transforms: Vec::new(),
            current_document: None,
        };
        assert_eq!(delete.kind(), WriteKind::Delete);
        assert_eq!(delete.document_name(), "d");
        assert!(delete.fields().is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let write = update(None, Some(Precondition::Exists(false)));
        let json = serde_json::to_value(&write).unwrap();
        assert_eq!(json["currentDocument"]["exists"], serde_json::json!(false));
        assert!(json.get("updateMask").is_none());
        assert!(json.get("updateTransforms").is_none());
    }
}
