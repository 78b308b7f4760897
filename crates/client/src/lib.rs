//! Firestore client layer.
//!
//! This crate turns path strings into references, builds queries, and
//! accumulates writes for a single atomic commit. All network access goes
//! through a caller-supplied [`FirestoreService`].
//!
//! ```no_run
//! use firestore_client::{Database, FirestoreService};
//! use firestore_core::{data_from_json, Result};
//! use std::sync::Arc;
//!
//! fn save(service: Arc<dyn FirestoreService>) -> Result<()> {
//!     let db = Database::from_name("my-project", "(default)", service)?;
//!     let mut batch = db.batch()?;
//!     batch.set(
//!         "cities/NYC",
//!         data_from_json(serde_json::json!({"name": "New York City"}))?,
//!         None,
//!     )?;
//!     batch.delete("cities/SF", Some(true), None)?;
//!     batch.commit()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod batch;
pub mod convert;
pub mod database;
pub mod query;
pub mod reference;
pub mod service;
pub mod snapshot;

pub use batch::{Batch, DocumentTarget, GetResult, GetTarget};
pub use convert::{Convert, Merge};
pub use database::Database;
pub use query::{
    CollectionSelector, Cursor, Direction, Filter, Operator, Order, Query, StructuredQuery,
    UnaryOperator,
};
pub use reference::{CollectionReference, DocumentReference};
pub use service::{FirestoreService, ReadResult, ReadStream};
pub use snapshot::{DocumentSnapshot, DocumentStream, GetAllStream};
