//! Document command handlers

use std::path::Path;

use anyhow::{Context, Result};

use docscan_core::{
    ContentRef, Database, Document, DocumentEditor, FileReferenceProvider, LocalFileProvider,
};

use crate::output::Output;
use crate::prompt::confirm;

/// List all documents
pub async fn list(db: &Database, output: &Output) -> Result<()> {
    let documents = db.find_all_documents().await?;
    output.print_documents(&documents);
    Ok(())
}

/// Show a document with its tags and pages
pub async fn show(db: &Database, id: i64, output: &Output) -> Result<()> {
    let details = db
        .document_details(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Document not found: {}", id))?;
    output.print_document(&details);
    Ok(())
}

/// Create a document from local files or content references
pub async fn create(
    db: &Database,
    title: Option<String>,
    tag_ids: Vec<i64>,
    images: Vec<String>,
    output: &Output,
) -> Result<()> {
    let mut editor = DocumentEditor::new(db.clone());

    if let Some(title) = title {
        editor.set_title(title)?;
    }

    for tag_id in tag_ids {
        let tag = db.tag(tag_id).await?;
        // Repeated --tag must not toggle the tag back off
        if !editor.is_selected(&tag) {
            editor.toggle_tag(&tag)?;
        }
    }

    for image in images {
        editor.add_image(image_reference(&image)?)?;
    }

    let pages = editor.images().len();
    let tags = editor.tag_summary();
    let id = editor.save().await?;

    let mut message = format!("Created document {} ({} page(s))", id, pages);
    if !tags.is_empty() {
        message.push_str(&format!(" tagged {}", tags));
    }
    output.success(&message, Some(id));
    Ok(())
}

/// Set a document's title
pub async fn rename(db: &Database, id: i64, title: String, output: &Output) -> Result<()> {
    let mut document = db.document(id).await?;
    document.set_title(Some(title.clone()));
    db.update_document(document).await?;

    output.success(&format!("Renamed document {} to \"{}\"", id, title), Some(id));
    Ok(())
}

/// Delete a document; its tag and page links go with it
pub async fn delete(db: &Database, id: i64, yes: bool, output: &Output) -> Result<()> {
    let document = db.document(id).await?;

    if !yes && output.should_prompt() {
        println!("Deleting document {}: {}", id, describe(&document));
        if !confirm("Are you sure?")? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    db.delete_document(document).await?;
    output.success(&format!("Deleted document {}", id), Some(id));
    Ok(())
}

/// Turn a command-line argument into a page reference
///
/// Anything with a scheme is taken as-is; everything else is a local file.
fn image_reference(arg: &str) -> Result<ContentRef> {
    if arg.contains("://") {
        return Ok(ContentRef::from(arg));
    }

    let path = Path::new(arg)
        .canonicalize()
        .with_context(|| format!("Cannot read image: {}", arg))?;
    Ok(LocalFileProvider.reference_for(&path)?)
}

fn describe(document: &Document) -> &str {
    document.title.as_deref().unwrap_or("(untitled)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_uri_taken_as_is() {
        let reference = image_reference("content://media/external/images/3").unwrap();
        assert_eq!(reference.as_str(), "content://media/external/images/3");
    }

    #[test]
    fn test_local_file_becomes_file_reference() {
        let temp_dir = TempDir::new().unwrap();
        let page = temp_dir.path().join("0.jpg");
        std::fs::write(&page, b"jpeg").unwrap();

        let reference = image_reference(page.to_str().unwrap()).unwrap();

        assert!(reference.as_str().starts_with("file:///"));
        assert!(reference.as_str().ends_with("/0.jpg"));
    }

    #[test]
    fn test_missing_file_rejected() {
        assert!(image_reference("/definitely/not/here.jpg").is_err());
    }

    #[tokio::test]
    async fn test_create_links_tags_and_pages() {
        let db = Database::open_in_memory().unwrap();
        let tag_id = db.persist_tag(docscan_core::Tag::new("bills")).await.unwrap();
        let output = Output::new(crate::output::OutputFormat::Quiet);

        create(
            &db,
            Some("Power".to_string()),
            vec![tag_id],
            vec!["content://pages/1".to_string()],
            &output,
        )
        .await
        .unwrap();

        let documents = db.find_all_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        let details = db
            .document_details(documents[0].document_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.document.title.as_deref(), Some("Power"));
        assert_eq!(details.tags.len(), 1);
        assert_eq!(details.images[0].uri, "content://pages/1");
    }

    #[tokio::test]
    async fn test_repeated_tag_is_linked_once() {
        let db = Database::open_in_memory().unwrap();
        let tag_id = db.persist_tag(docscan_core::Tag::new("bills")).await.unwrap();
        let output = Output::new(crate::output::OutputFormat::Quiet);

        create(&db, None, vec![tag_id, tag_id, tag_id], vec![], &output)
            .await
            .unwrap();

        let relations = db.find_all_document_tag_relations().await.unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].tag_id, tag_id);
    }

    #[tokio::test]
    async fn test_create_with_unknown_tag_fails() {
        let db = Database::open_in_memory().unwrap();
        let output = Output::new(crate::output::OutputFormat::Quiet);

        let result = create(&db, None, vec![42], vec![], &output).await;

        assert!(result.is_err());
        assert!(db.find_all_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rename_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let id = db.persist_document(Document::new(None)).await.unwrap();
        let output = Output::new(crate::output::OutputFormat::Quiet);

        rename(&db, id, "Lease".to_string(), &output).await.unwrap();
        assert_eq!(db.document(id).await.unwrap().title.as_deref(), Some("Lease"));

        delete(&db, id, true, &output).await.unwrap();
        assert!(db.find_document_by_id(id).await.unwrap().is_none());
    }
}
