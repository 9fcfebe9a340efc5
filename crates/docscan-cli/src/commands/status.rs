//! Status command handler

use anyhow::Result;

use docscan_core::{Dao, Database};

use crate::output::{Output, OutputFormat};

/// Row counts shown by `status`
#[derive(Debug, Default, PartialEq, Eq)]
struct Counts {
    documents: i64,
    tags: i64,
    images: i64,
}

/// Show database location and contents
pub fn show(db: &Database, output: &Output) -> Result<()> {
    let counts = db.read_blocking(|dao: &Dao<'_>| {
        Ok(Counts {
            documents: dao.document_count()?,
            tags: dao.tag_count()?,
            images: dao.image_count()?,
        })
    })?;

    let location = db
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ":memory:".to_string());
    let size = db
        .path()
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "database": location,
                    "database_size": size,
                    "counts": {
                        "documents": counts.documents,
                        "tags": counts.tags,
                        "images": counts.images
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", location);
        }
        OutputFormat::Human => {
            println!("docscan Status");
            println!("==============");
            println!();
            println!("Storage:");
            println!("  Location: {}", location);
            println!("  Size:     {}", human_size(size));
            println!();
            println!("Contents:");
            println!("  Documents: {}", counts.documents);
            println!("  Tags:      {}", counts.tags);
            println!("  Pages:     {}", counts.images);
        }
    }

    Ok(())
}

fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
