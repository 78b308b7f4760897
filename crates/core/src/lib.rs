//! # Firestore Core
//!
//! Plain data types shared by the firestore-kit crates.
//!
//! ## Modules
//!
//! - **path**: resource paths and the document/collection parity rule
//! - **field_path**: dotted field paths with back-quoted segments
//! - **value**: field values, including the `Delete` and `ServerTimestamp` sentinels
//! - **timestamp**: wire timestamps
//! - **write**: write-operation records, preconditions and commit responses
//! - **error**: the shared error enum
//!
//! ## Example
//!
//! ```rust
//! use firestore_core::{CollectionPath, DocumentPath};
//!
//! let doc = DocumentPath::parse("cities/NYC").unwrap();
//! assert_eq!(doc.parent(), CollectionPath::parse("cities").unwrap());
//! assert!(DocumentPath::parse("cities").is_err());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Error types
pub mod error;
/// Field paths
pub mod field_path;
/// Resource paths
pub mod path;
/// Wire timestamps
pub mod timestamp;
/// Field values
pub mod value;
/// Write-operation records
pub mod write;

pub use error::{Error, Result};
pub use field_path::{FieldPath, DOCUMENT_ID_FIELD};
pub use path::{
    CollectionPath, DatabaseName, DocumentPath, PathKind, ResourcePath, DEFAULT_DATABASE_ID,
};
pub use timestamp::Timestamp;
pub use value::{data_from_json, get_field, DocumentData, GeoPoint, Value};
pub use write::{
    CommitResponse, Document, FieldTransform, Precondition, ServerValue, Write, WriteKind,
    WriteOperation, WriteResult,
};
