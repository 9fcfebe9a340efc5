//! Data models for docscan
//!
//! Defines the stored entities (Document, Tag, Image and the two join
//! relations) plus the read and write models built on top of them.
//!
//! Identifiers are assigned by SQLite and stay `None` until a row has been
//! persisted. Entities carry no validation: whatever is set is stored.

use serde::{Deserialize, Serialize};

/// A scanned document
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    /// Row id, `None` until persisted
    pub document_id: Option<i64>,
    /// Optional title
    pub title: Option<String>,
}

impl Document {
    /// Create an unsaved document with the given title
    pub fn new(title: Option<String>) -> Self {
        Self {
            document_id: None,
            title,
        }
    }

    /// Create a document with a known id (for updates and deletes)
    pub fn with_id(document_id: i64, title: Option<String>) -> Self {
        Self {
            document_id: Some(document_id),
            title,
        }
    }

    /// Replace the title
    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }
}

/// A user-defined label; names are not required to be unique
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Row id, `None` until persisted
    pub tag_id: Option<i64>,
    /// Display name
    pub name: Option<String>,
}

impl Tag {
    /// Create an unsaved tag
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            tag_id: None,
            name: Some(name.into()),
        }
    }

    /// Create a tag with a known id
    pub fn with_id(tag_id: i64, name: Option<String>) -> Self {
        Self {
            tag_id: Some(tag_id),
            name,
        }
    }
}

/// One captured or imported page
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Image {
    /// Row id, `None` until persisted
    pub image_id: Option<i64>,
    /// Reference to the image content (e.g. `file:///...`)
    pub uri: String,
}

impl Image {
    /// Create an unsaved image for the given content reference
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            image_id: None,
            uri: uri.into(),
        }
    }

    /// Create an image with a known id
    pub fn with_id(image_id: i64, uri: impl Into<String>) -> Self {
        Self {
            image_id: Some(image_id),
            uri: uri.into(),
        }
    }
}

/// Document-to-tag junction row, keyed by both ids
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentTagRelation {
    pub document_id: i64,
    pub tag_id: i64,
}

impl DocumentTagRelation {
    pub fn new(document_id: i64, tag_id: i64) -> Self {
        Self {
            document_id,
            tag_id,
        }
    }
}

/// Document-to-image junction row, keyed by both ids
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentImageRelation {
    pub document_id: i64,
    pub image_id: i64,
}

impl DocumentImageRelation {
    pub fn new(document_id: i64, image_id: i64) -> Self {
        Self {
            document_id,
            image_id,
        }
    }
}

/// A tag together with every document linked to it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagWithDocuments {
    pub tag: Tag,
    pub documents: Vec<Document>,
}

/// A document with its tags and its pages in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDetails {
    pub document: Document,
    pub tags: Vec<Tag>,
    pub images: Vec<Image>,
}

/// Everything a single document save writes
///
/// Persisted as one transaction: the document row, one relation per tag id,
/// and for each uri an image row plus its relation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDraft {
    pub title: Option<String>,
    pub tag_ids: Vec<i64>,
    pub image_uris: Vec<String>,
}

impl DocumentDraft {
    pub fn new(title: Option<String>) -> Self {
        Self {
            title,
            tag_ids: Vec::new(),
            image_uris: Vec::new(),
        }
    }

    /// Link a tag; adding the same id twice is a no-op
    pub fn add_tag(&mut self, tag_id: i64) {
        if !self.tag_ids.contains(&tag_id) {
            self.tag_ids.push(tag_id);
        }
    }

    /// Append a page
    pub fn add_image(&mut self, uri: impl Into<String>) {
        self.image_uris.push(uri.into());
    }
}
