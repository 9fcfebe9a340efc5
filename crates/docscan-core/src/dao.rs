//! Data access layer
//!
//! Synchronous query and command surface over a SQLite connection. A `Dao`
//! borrows a `Connection`, so it works the same on a plain connection and on
//! an open `Transaction` (which derefs to one).
//!
//! ## Conflict rules
//!
//! - Inserts use `INSERT OR IGNORE`: a duplicate key is dropped silently.
//! - Updates use `UPDATE OR REPLACE`: the row is replaced wholesale.
//! - Deletes cascade to junction rows through the schema's foreign keys.
//!
//! Nothing here is asynchronous; `Database` moves these calls onto a
//! blocking worker.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::models::{
    Document, DocumentDetails, DocumentDraft, DocumentImageRelation, DocumentTagRelation, Image,
    Tag, TagWithDocuments,
};
use crate::observe::Table;
use crate::storage::StorageResult;

/// Data access object borrowing a connection
pub struct Dao<'c> {
    conn: &'c Connection,
}

impl<'c> Dao<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        self.conn
    }

    // ==================== Documents ====================

    /// Get all documents in storage order
    pub fn find_all_documents(&self) -> StorageResult<Vec<Document>> {
        let mut stmt = self
            .conn
            .prepare("SELECT documentId, title FROM document ORDER BY documentId")?;
        let documents = stmt
            .query_map([], document_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }

    /// Get a document by id; `None` when no such row exists
    pub fn find_document_by_id(&self, document_id: i64) -> StorageResult<Option<Document>> {
        let document = self
            .conn
            .query_row(
                "SELECT documentId, title FROM document WHERE documentId = ?1",
                params![document_id],
                document_from_row,
            )
            .optional()?;
        Ok(document)
    }

    /// Insert a document, ignoring a duplicate id
    ///
    /// Returns the generated id, or the existing id when the insert was
    /// ignored.
    pub fn persist_document(&self, document: &Document) -> StorageResult<i64> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO document (documentId, title) VALUES (?1, ?2)",
            params![document.document_id, document.title],
        )?;
        Ok(self.generated_id("document", document.document_id, inserted))
    }

    /// Replace a document row; returns rows affected
    pub fn update_document(&self, document: &Document) -> StorageResult<usize> {
        let Some(document_id) = document.document_id else {
            return Ok(0);
        };
        let updated = self.conn.execute(
            "UPDATE OR REPLACE document SET title = ?1 WHERE documentId = ?2",
            params![document.title, document_id],
        )?;
        Ok(updated)
    }

    /// Delete a document and its junction rows; returns rows affected
    pub fn delete_document(&self, document: &Document) -> StorageResult<usize> {
        let Some(document_id) = document.document_id else {
            return Ok(0);
        };
        let deleted = self.conn.execute(
            "DELETE FROM document WHERE documentId = ?1",
            params![document_id],
        )?;
        Ok(deleted)
    }

    pub fn document_count(&self) -> StorageResult<i64> {
        self.count(Table::Document)
    }

    // ==================== Tags ====================

    /// Get all tags in storage order
    pub fn find_all_tags(&self) -> StorageResult<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tagId, name FROM tag ORDER BY tagId")?;
        let tags = stmt
            .query_map([], tag_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    pub fn find_tag_by_id(&self, tag_id: i64) -> StorageResult<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                "SELECT tagId, name FROM tag WHERE tagId = ?1",
                params![tag_id],
                tag_from_row,
            )
            .optional()?;
        Ok(tag)
    }

    pub fn persist_tag(&self, tag: &Tag) -> StorageResult<i64> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO tag (tagId, name) VALUES (?1, ?2)",
            params![tag.tag_id, tag.name],
        )?;
        Ok(self.generated_id("tag", tag.tag_id, inserted))
    }

    pub fn update_tag(&self, tag: &Tag) -> StorageResult<usize> {
        let Some(tag_id) = tag.tag_id else {
            return Ok(0);
        };
        let updated = self.conn.execute(
            "UPDATE OR REPLACE tag SET name = ?1 WHERE tagId = ?2",
            params![tag.name, tag_id],
        )?;
        Ok(updated)
    }

    /// Delete a tag; documents stay, their links to the tag go
    pub fn delete_tag(&self, tag: &Tag) -> StorageResult<usize> {
        let Some(tag_id) = tag.tag_id else {
            return Ok(0);
        };
        let deleted = self
            .conn
            .execute("DELETE FROM tag WHERE tagId = ?1", params![tag_id])?;
        Ok(deleted)
    }

    pub fn tag_count(&self) -> StorageResult<i64> {
        self.count(Table::Tag)
    }

    // ==================== Images ====================

    pub fn find_all_images(&self) -> StorageResult<Vec<Image>> {
        let mut stmt = self
            .conn
            .prepare("SELECT imageId, uri FROM image ORDER BY imageId")?;
        let images = stmt
            .query_map([], image_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(images)
    }

    pub fn find_image_by_id(&self, image_id: i64) -> StorageResult<Option<Image>> {
        let image = self
            .conn
            .query_row(
                "SELECT imageId, uri FROM image WHERE imageId = ?1",
                params![image_id],
                image_from_row,
            )
            .optional()?;
        Ok(image)
    }

    pub fn persist_image(&self, image: &Image) -> StorageResult<i64> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO image (imageId, uri) VALUES (?1, ?2)",
            params![image.image_id, image.uri],
        )?;
        Ok(self.generated_id("image", image.image_id, inserted))
    }

    pub fn update_image(&self, image: &Image) -> StorageResult<usize> {
        let Some(image_id) = image.image_id else {
            return Ok(0);
        };
        let updated = self.conn.execute(
            "UPDATE OR REPLACE image SET uri = ?1 WHERE imageId = ?2",
            params![image.uri, image_id],
        )?;
        Ok(updated)
    }

    pub fn delete_image(&self, image: &Image) -> StorageResult<usize> {
        let Some(image_id) = image.image_id else {
            return Ok(0);
        };
        let deleted = self
            .conn
            .execute("DELETE FROM image WHERE imageId = ?1", params![image_id])?;
        Ok(deleted)
    }

    pub fn image_count(&self) -> StorageResult<i64> {
        self.count(Table::Image)
    }

    // ==================== Relations ====================

    /// Link a document to a tag; returns whether a new row was written
    pub fn persist_document_tag(&self, document_id: i64, tag_id: i64) -> StorageResult<bool> {
        self.persist_document_tag_relation(&DocumentTagRelation::new(document_id, tag_id))
    }

    pub fn persist_document_tag_relation(
        &self,
        relation: &DocumentTagRelation,
    ) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO documentTagRelation (documentId, tagId) VALUES (?1, ?2)",
            params![relation.document_id, relation.tag_id],
        )?;
        Ok(inserted > 0)
    }

    pub fn find_all_document_tag_relations(&self) -> StorageResult<Vec<DocumentTagRelation>> {
        let mut stmt = self.conn.prepare(
            "SELECT documentId, tagId FROM documentTagRelation ORDER BY documentId, tagId",
        )?;
        let relations = stmt
            .query_map([], |row| {
                Ok(DocumentTagRelation::new(row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(relations)
    }

    pub fn delete_document_tag_relation(
        &self,
        relation: &DocumentTagRelation,
    ) -> StorageResult<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM documentTagRelation WHERE documentId = ?1 AND tagId = ?2",
            params![relation.document_id, relation.tag_id],
        )?;
        Ok(deleted)
    }

    /// Link a page to a document; returns whether a new row was written
    pub fn persist_document_image(&self, document_id: i64, image_id: i64) -> StorageResult<bool> {
        self.persist_document_image_relation(&DocumentImageRelation::new(document_id, image_id))
    }

    pub fn persist_document_image_relation(
        &self,
        relation: &DocumentImageRelation,
    ) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO documentImageRelation (documentId, imageId) VALUES (?1, ?2)",
            params![relation.document_id, relation.image_id],
        )?;
        Ok(inserted > 0)
    }

    pub fn find_all_document_image_relations(&self) -> StorageResult<Vec<DocumentImageRelation>> {
        let mut stmt = self.conn.prepare(
            "SELECT documentId, imageId FROM documentImageRelation ORDER BY documentId, imageId",
        )?;
        let relations = stmt
            .query_map([], |row| {
                Ok(DocumentImageRelation::new(row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(relations)
    }

    pub fn delete_document_image_relation(
        &self,
        relation: &DocumentImageRelation,
    ) -> StorageResult<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM documentImageRelation WHERE documentId = ?1 AND imageId = ?2",
            params![relation.document_id, relation.image_id],
        )?;
        Ok(deleted)
    }

    // ==================== Joins ====================

    /// Every tag with the documents linked to it
    ///
    /// A single statement, so tags and links come from one snapshot. Tags
    /// without documents are included with an empty list.
    pub fn tags_with_documents(&self) -> StorageResult<Vec<TagWithDocuments>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.tagId, t.name, d.documentId, d.title
            FROM tag t
            LEFT JOIN documentTagRelation r ON r.tagId = t.tagId
            LEFT JOIN document d ON d.documentId = r.documentId
            ORDER BY t.tagId, d.documentId
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut result: Vec<TagWithDocuments> = Vec::new();
        for row in rows {
            let (tag_id, name, document_id, title) = row?;
            if result.last().and_then(|entry| entry.tag.tag_id) != Some(tag_id) {
                result.push(TagWithDocuments {
                    tag: Tag::with_id(tag_id, name),
                    documents: Vec::new(),
                });
            }
            if let (Some(document_id), Some(entry)) = (document_id, result.last_mut()) {
                entry.documents.push(Document::with_id(document_id, title));
            }
        }

        Ok(result)
    }

    /// Tags linked to a document
    pub fn tags_for_document(&self, document_id: i64) -> StorageResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.tagId, t.name FROM tag t
            JOIN documentTagRelation r ON r.tagId = t.tagId
            WHERE r.documentId = ?1
            ORDER BY t.tagId
            "#,
        )?;
        let tags = stmt
            .query_map(params![document_id], tag_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    /// Pages of a document in insertion order
    pub fn images_for_document(&self, document_id: i64) -> StorageResult<Vec<Image>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT i.imageId, i.uri FROM image i
            JOIN documentImageRelation r ON r.imageId = i.imageId
            WHERE r.documentId = ?1
            ORDER BY i.imageId
            "#,
        )?;
        let images = stmt
            .query_map(params![document_id], image_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(images)
    }

    /// A document with its tags and pages, read from one snapshot
    pub fn document_details(&self, document_id: i64) -> StorageResult<Option<DocumentDetails>> {
        self.atomically(|dao| {
            let Some(document) = dao.find_document_by_id(document_id)? else {
                return Ok(None);
            };
            Ok(Some(DocumentDetails {
                document,
                tags: dao.tags_for_document(document_id)?,
                images: dao.images_for_document(document_id)?,
            }))
        })
    }

    // ==================== Composite writes ====================

    /// Write a whole draft: document, tag links, pages and page links
    ///
    /// All-or-nothing. Opens its own transaction unless the connection is
    /// already inside one, in which case the caller owns commit/rollback.
    pub fn save_document(&self, draft: &DocumentDraft) -> StorageResult<i64> {
        self.atomically(|dao| {
            let document_id = dao.persist_document(&Document::new(draft.title.clone()))?;

            for &tag_id in &draft.tag_ids {
                dao.persist_document_tag(document_id, tag_id)?;
            }

            for uri in &draft.image_uris {
                let image_id = dao.persist_image(&Image::new(uri.as_str()))?;
                dao.persist_document_image(document_id, image_id)?;
            }

            Ok(document_id)
        })
    }

    // ==================== Private helpers ====================

    /// Run `f` inside a transaction, reusing the caller's if one is open
    fn atomically<T>(&self, f: impl FnOnce(&Self) -> StorageResult<T>) -> StorageResult<T> {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    fn generated_id(&self, entity: &'static str, explicit: Option<i64>, inserted: usize) -> i64 {
        match explicit {
            Some(id) => {
                if inserted == 0 {
                    debug!(entity, id, "insert ignored, row already exists");
                }
                id
            }
            None => self.conn.last_insert_rowid(),
        }
    }

    fn count(&self, table: Table) -> StorageResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let count = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }
}

// ==================== Row mapping ====================

fn document_from_row(row: &Row) -> rusqlite::Result<Document> {
    Ok(Document {
        document_id: row.get(0)?,
        title: row.get(1)?,
    })
}

fn tag_from_row(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        tag_id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn image_from_row(row: &Row) -> rusqlite::Result<Image> {
    Ok(Image {
        image_id: row.get(0)?,
        uri: row.get(1)?,
    })
}
