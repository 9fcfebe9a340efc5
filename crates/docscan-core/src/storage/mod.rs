//! Storage layer
//!
//! Schema management and typed storage errors for the SQLite store.
//!
//! ## Files
//!
//! - `<data_dir>/document_database` - the SQLite database (name configurable)
//! - `<data_dir>/captures/<session>/` - page images written by capture sessions

pub mod error;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use schema::{get_schema_version, init_schema, needs_init, SCHEMA_VERSION};
