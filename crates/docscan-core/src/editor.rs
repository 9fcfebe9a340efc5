//! Document editor state
//!
//! `DocumentEditor` holds what a "create document" screen edits before it
//! is saved: a title, the staged pages and the selected tags. It knows
//! nothing about rendering; a front end reads its fields and calls its
//! commands.
//!
//! ## States
//!
//! ```text
//! Editing --save--> Saving --ok--> Saved(id)
//!                     |
//!                     +--error--> Editing
//! ```
//!
//! Edits are only accepted while `Editing`. A save writes everything in one
//! transaction, so a failure leaves no partial document behind and the user
//! can retry or dismiss.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::capture::{
    CaptureService, CaptureSession, ContentRef, FileReferenceProvider, ImportService,
    IMAGE_CONTENT_TYPE,
};
use crate::database::Database;
use crate::models::{DocumentDraft, Tag};
use crate::storage::StorageError;

/// Where an editor is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorState {
    Editing,
    /// A save is in flight; if its future was dropped the outcome is unknown
    Saving,
    /// Terminal: the document was written with this id
    Saved(i64),
}

impl fmt::Display for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorState::Editing => write!(f, "editing"),
            EditorState::Saving => write!(f, "saving"),
            EditorState::Saved(id) => write!(f, "saved as document {}", id),
        }
    }
}

/// Errors returned by editor commands
#[derive(Error, Debug)]
pub enum EditorError {
    /// Command needs the `Editing` state
    #[error("Document cannot be changed while {0}")]
    NotEditing(EditorState),

    /// Only persisted tags can be linked
    #[error("Tag {0:?} has not been saved yet")]
    UnsavedTag(Option<String>),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EditorError {
    /// Whether the user can try the same command again
    ///
    /// Storage failures during a save return the editor to `Editing`, so
    /// the save can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EditorError::Storage(_))
    }
}

pub type EditorResult<T> = Result<T, EditorError>;

/// Draft state of a document being created
pub struct DocumentEditor {
    db: Database,
    title: String,
    images: Vec<ContentRef>,
    selected_tags: Vec<Tag>,
    state: EditorState,
}

impl DocumentEditor {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            title: String::new(),
            images: Vec::new(),
            selected_tags: Vec::new(),
            state: EditorState::Editing,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Staged pages in the order they were added
    pub fn images(&self) -> &[ContentRef] {
        &self.images
    }

    /// Selected tags in the order they were selected
    pub fn selected_tags(&self) -> &[Tag] {
        &self.selected_tags
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> EditorResult<()> {
        self.ensure_editing()?;
        self.title = title.into();
        Ok(())
    }

    /// Stage a page
    pub fn add_image(&mut self, image: ContentRef) -> EditorResult<()> {
        self.ensure_editing()?;
        self.images.push(image);
        Ok(())
    }

    /// Select or deselect a tag; returns whether it is selected afterwards
    pub fn toggle_tag(&mut self, tag: &Tag) -> EditorResult<bool> {
        self.ensure_editing()?;
        let Some(tag_id) = tag.tag_id else {
            return Err(EditorError::UnsavedTag(tag.name.clone()));
        };

        if let Some(pos) = self
            .selected_tags
            .iter()
            .position(|t| t.tag_id == Some(tag_id))
        {
            self.selected_tags.remove(pos);
            Ok(false)
        } else {
            self.selected_tags.push(tag.clone());
            Ok(true)
        }
    }

    pub fn is_selected(&self, tag: &Tag) -> bool {
        tag.tag_id.is_some()
            && self
                .selected_tags
                .iter()
                .any(|t| t.tag_id == tag.tag_id)
    }

    /// Selected tag names, sorted and comma separated
    pub fn tag_summary(&self) -> String {
        let mut names: Vec<&str> = self
            .selected_tags
            .iter()
            .filter_map(|t| t.name.as_deref())
            .collect();
        names.sort_unstable();
        names.join(", ")
    }

    /// Take a picture as the next page
    ///
    /// The page is written into `session` as `<n>.jpg`, `n` being the number
    /// of pages staged so far. Returns `false` when the capture was
    /// cancelled; nothing is staged then.
    pub fn capture_page(
        &mut self,
        session: &CaptureSession,
        capture: &impl CaptureService,
        files: &impl FileReferenceProvider,
    ) -> EditorResult<bool> {
        self.ensure_editing()?;
        let path = session.page_path(self.images.len())?;
        let target = files.reference_for(&path)?;

        match capture.capture(&target) {
            Some(image) => {
                self.images.push(image);
                Ok(true)
            }
            None => {
                debug!(reference = %target, "capture cancelled");
                Ok(false)
            }
        }
    }

    /// Pick an existing image as the next page
    ///
    /// Returns `false` when nothing was picked.
    pub fn import_page(&mut self, import: &impl ImportService) -> EditorResult<bool> {
        self.ensure_editing()?;

        match import.import(IMAGE_CONTENT_TYPE) {
            Some(image) => {
                self.images.push(image);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// What a save would write; an empty title is stored as unset
    pub fn draft(&self) -> DocumentDraft {
        let title = if self.title.is_empty() {
            None
        } else {
            Some(self.title.clone())
        };

        let mut draft = DocumentDraft::new(title);
        for tag_id in self.selected_tags.iter().filter_map(|t| t.tag_id) {
            draft.add_tag(tag_id);
        }
        for image in &self.images {
            draft.add_image(image.as_str());
        }
        draft
    }

    /// Write the document, its tag links and its pages in one transaction
    ///
    /// On success the editor is `Saved` and the new id is returned. On
    /// failure it is back in `Editing` with all edits intact.
    pub async fn save(&mut self) -> EditorResult<i64> {
        self.ensure_editing()?;
        self.state = EditorState::Saving;

        match self.db.save_document(self.draft()).await {
            Ok(document_id) => {
                self.state = EditorState::Saved(document_id);
                Ok(document_id)
            }
            Err(e) => {
                self.state = EditorState::Editing;
                Err(e.into())
            }
        }
    }

    fn ensure_editing(&self) -> EditorResult<()> {
        match self.state {
            EditorState::Editing => Ok(()),
            other => Err(EditorError::NotEditing(other)),
        }
    }
}
