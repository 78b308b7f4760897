//! # firestore-kit
//!
//! A client-side layer over a Firestore service: path parsing, query
//! building, and write batches committed atomically in one request.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use firestore_kit::prelude::*;
//! use std::sync::Arc;
//!
//! fn run(service: Arc<dyn FirestoreService>) -> anyhow::Result<()> {
//!     firestore_kit::init_tracing()?;
//!     let db = firestore_kit::open("firestore.toml", service)?;
//!
//!     let commit_time = db.batch_with(|batch| {
//!         batch.set("cities/NYC", data_from_json(serde_json::json!({"name": "New York City"}))?, None)?;
//!         batch.delete("cities/SF", Some(true), None)
//!     })?;
//!     println!("committed at {commit_time:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`core`] - paths, field paths, values and write records
//! - [`config`] - TOML configuration with environment overrides
//! - [`client`] - references, queries, snapshots, batches and the service trait

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub use firestore_client as client;
pub use firestore_config as config;
pub use firestore_core as core;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

/// Common imports
pub mod prelude {
    pub use crate::client::{
        Batch, CollectionReference, Database, Direction, DocumentReference, DocumentSnapshot,
        DocumentTarget, FirestoreService, GetResult, GetTarget, Merge, Query, ReadResult,
        ReadStream, StructuredQuery,
    };
    pub use crate::config::ClientConfig;
    pub use crate::core::{
        data_from_json, DocumentData, Error, FieldPath, Result, Timestamp, Value, Write,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,firestore=info";

/// Installs a global `tracing` subscriber filtered by `RUST_LOG`.
pub fn init_tracing() -> anyhow::Result<()> {
    init_tracing_with(DEFAULT_LOG_FILTER)
}

/// Installs a global `tracing` subscriber using the configured log level as
/// the fallback filter.
pub fn init_tracing_for(config: &config::ClientConfig) -> anyhow::Result<()> {
    init_tracing_with(&config.logging.level)
}

/// Installs a global `tracing` subscriber, falling back to `default_filter`
/// when `RUST_LOG` is unset or invalid.
pub fn init_tracing_with(default_filter: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    #[cfg(feature = "json-logs")]
    let result = fmt().json().with_env_filter(env_filter).try_init();
    #[cfg(not(feature = "json-logs"))]
    let result = fmt().with_env_filter(env_filter).try_init();

    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Loads configuration from `config_path` (plus environment overrides) and
/// opens a database over `service`.
pub fn open(
    config_path: impl AsRef<Path>,
    service: Arc<dyn client::FirestoreService>,
) -> anyhow::Result<client::Database> {
    let path = config_path.as_ref();
    let config = config::ClientConfig::load(path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    let database = client::Database::new(config, service).context("opening database")?;
    Ok(database)
}
