//! docscan Core Library
//!
//! This crate provides the data core for docscan, a document scanner:
//! captured or imported page images are grouped into documents, documents
//! are tagged, and everything is stored in a local SQLite database.
//!
//! # Quick Start
//!
//! ```text
//! let db = Database::open(&Config::load()?)?;
//!
//! // Create a document from staged pages
//! let mut editor = DocumentEditor::new(db.clone());
//! editor.set_title("Lease")?;
//! editor.add_image(ContentRef::from("file:///scans/0.jpg"))?;
//! let id = editor.save().await?;
//!
//! // Browse by tag
//! let by_tag = db.tags_with_documents().await?;
//! ```
//!
//! # Modules
//!
//! - `database`: Shared database handle (main entry point)
//! - `dao`: Synchronous queries and commands over a connection
//! - `models`: Documents, tags, images and their relations
//! - `observe`: Change notification and live queries
//! - `editor`: State of a document being created
//! - `capture`: Capture/import collaborators and capture folders
//! - `storage`: Schema and storage errors
//! - `config`: Application configuration

pub mod capture;
pub mod config;
pub mod dao;
pub mod database;
pub mod editor;
pub mod models;
pub mod observe;
pub mod storage;

pub use capture::{
    CaptureService, CaptureSession, ContentRef, FileReferenceProvider, ImportService,
    LocalFileProvider,
};
pub use config::Config;
pub use dao::Dao;
pub use database::Database;
pub use editor::{DocumentEditor, EditorError, EditorState};
pub use models::{
    Document, DocumentDetails, DocumentDraft, DocumentImageRelation, DocumentTagRelation, Image,
    Tag, TagWithDocuments,
};
pub use observe::{LiveQuery, Table};
pub use storage::{StorageError, StorageResult};
