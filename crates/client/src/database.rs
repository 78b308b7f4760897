//! Database handle.

use crate::batch::Batch;
use crate::query::Query;
use crate::reference::{CollectionReference, DocumentReference};
use crate::service::FirestoreService;
use crate::snapshot::DocumentStream;
use chrono::{DateTime, Utc};
use firestore_config::ClientConfig;
use firestore_core::{CollectionPath, DatabaseName, DocumentPath, Error, Result};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// A connection to one Firestore database.
///
/// Batches borrow the database and look the service up on every call, so
/// closing the database makes open batches fail with
/// [`Error::NotConnected`].
pub struct Database {
    config: ClientConfig,
    name: DatabaseName,
    service: RwLock<Option<Arc<dyn FirestoreService>>>,
}

impl Database {
    /// Creates a database handle from validated configuration.
    pub fn new(config: ClientConfig, service: Arc<dyn FirestoreService>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::invalid_argument(e.to_string()))?;
        let name = config
            .database_name()
            .map_err(|e| Error::invalid_argument(e.to_string()))?;

        match config.emulator_host.as_deref() {
            Some(host) => info!(
                target: "firestore",
                database = %name.path(),
                emulator = host,
                "database opened against emulator"
            ),
            None => info!(target: "firestore", database = %name.path(), "database opened"),
        }
        Ok(Self {
            config,
            name,
            service: RwLock::new(Some(service)),
        })
    }

    /// Creates a database handle for `project_id` / `database_id`.
    pub fn from_name(
        project_id: &str,
        database_id: &str,
        service: Arc<dyn FirestoreService>,
    ) -> Result<Self> {
        Self::new(
            ClientConfig::new(project_id).with_database_id(database_id),
            service,
        )
    }

    /// Project id.
    pub fn project_id(&self) -> &str {
        self.name.project_id()
    }

    /// Database id.
    pub fn database_id(&self) -> &str {
        self.name.database_id()
    }

    /// Parsed database name.
    pub fn name(&self) -> &DatabaseName {
        &self.name
    }

    /// `projects/{project_id}/databases/{database_id}`.
    pub fn path(&self) -> String {
        self.name.path()
    }

    /// Root below which every document lives.
    pub fn documents_path(&self) -> String {
        self.name.documents_path()
    }

    /// Configuration the database was opened with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Emulator address (`host:port`) the service should target, if any.
    ///
    /// Service implementations read this to choose an endpoint.
    pub fn emulator_host(&self) -> Option<&str> {
        self.config.emulator_host.as_deref()
    }

    /// The active service.
    pub fn service(&self) -> Result<Arc<dyn FirestoreService>> {
        self.service.read().clone().ok_or(Error::NotConnected)
    }

    /// Whether the database still has a service.
    pub fn is_connected(&self) -> bool {
        self.service.read().is_some()
    }

    /// Drops the service. Later calls through this database or its batches
    /// fail with [`Error::NotConnected`].
    pub fn close(&self) {
        if self.service.write().take().is_some() {
            info!(target: "firestore", database = %self.name.path(), "database closed");
        }
    }

    /// Starts a write batch.
    pub fn batch(&self) -> Result<Batch<'_>> {
        self.service()?;
        Ok(Batch::new(self))
    }

    /// Runs `f` against a fresh batch and commits it if `f` succeeds.
    ///
    /// Returns the commit time, or `None` when nothing was written. When `f`
    /// fails the batch is dropped and nothing is sent.
    pub fn batch_with<F>(&self, f: F) -> Result<Option<DateTime<Utc>>>
    where
        F: FnOnce(&mut Batch<'_>) -> Result<()>,
    {
        let mut batch = self.batch()?;
        if let Err(e) = f(&mut batch) {
            debug!(
                target: "firestore",
                pending = batch.len(),
                error = %e,
                "batch closure failed, discarding writes"
            );
            return Err(e);
        }
        batch.commit()
    }

    /// A reference to the collection at `path`.
    pub fn col(&self, path: &str) -> Result<CollectionReference> {
        Ok(CollectionReference::new(
            self.name.clone(),
            CollectionPath::parse(path)?,
        ))
    }

    /// A reference to the document at `path`.
    pub fn doc(&self, path: &str) -> Result<DocumentReference> {
        Ok(DocumentReference::new(
            self.name.clone(),
            DocumentPath::parse(path)?,
        ))
    }

    /// A query over every collection with id `collection_id`, at any depth.
    pub fn collection_group(&self, collection_id: &str) -> Result<Query> {
        if collection_id.is_empty() || collection_id.contains('/') {
            return Err(Error::invalid_argument(format!(
                "invalid collection id {collection_id:?}: must be non-empty and contain no '/'"
            )));
        }
        Ok(Query::new(self.documents_path(), collection_id, true))
    }

    /// The top-level collections.
    pub fn collections(&self) -> Result<Vec<CollectionReference>> {
        let ids = self.service()?.list_collections(&self.documents_path())?;
        ids.iter().map(|id| self.col(id)).collect()
    }

    /// Runs a query outside of any batch.
    pub fn run_query(&self, query: &Query) -> Result<DocumentStream> {
        let structured = query.to_structured_query()?;
        debug!(target: "firestore", parent = %query.parent(), "running query");
        let stream = self.service()?.run_query(query.parent(), &structured)?;
        Ok(DocumentStream::new(self.name.clone(), stream))
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("connected", &self.is_connected())
            .finish()
    }
}
