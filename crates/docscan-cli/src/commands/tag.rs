//! Tag command handlers

use anyhow::Result;

use docscan_core::{Database, Tag};

use crate::output::Output;
use crate::prompt::confirm;

/// List all tags with usage counts
pub async fn list(db: &Database, output: &Output) -> Result<()> {
    let tags = db.tags_with_documents().await?;
    output.print_tags(&tags);
    Ok(())
}

/// Create a tag
pub async fn create(db: &Database, name: String, output: &Output) -> Result<()> {
    let id = db.persist_tag(Tag::new(name.clone())).await?;
    output.success(&format!("Created tag {} \"{}\"", id, name), Some(id));
    Ok(())
}

/// Rename a tag
pub async fn rename(db: &Database, id: i64, name: String, output: &Output) -> Result<()> {
    let mut tag = db.tag(id).await?;
    tag.name = Some(name.clone());
    db.update_tag(tag).await?;

    output.success(&format!("Renamed tag {} to \"{}\"", id, name), Some(id));
    Ok(())
}

/// Delete a tag; documents keep everything but the link to it
pub async fn delete(db: &Database, id: i64, yes: bool, output: &Output) -> Result<()> {
    let tag = db.tag(id).await?;

    if !yes && output.should_prompt() {
        let name = tag.name.as_deref().unwrap_or("(untitled)");
        println!("Deleting tag {}: {}", id, name);
        if !confirm("Are you sure?")? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    db.delete_tag(tag).await?;
    output.success(&format!("Deleted tag {}", id), Some(id));
    Ok(())
}
