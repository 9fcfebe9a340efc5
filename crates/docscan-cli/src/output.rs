//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use docscan_core::{Document, DocumentDetails, Tag, TagWithDocuments};
use serde::Serialize;

/// Placeholder for unset titles and names
const UNSET: &str = "(untitled)";

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print a document with its tags and pages
    pub fn print_document(&self, details: &DocumentDetails) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:     {}", id_or_dash(details.document.document_id));
                println!("Title:  {}", title_of(&details.document));
                if !details.tags.is_empty() {
                    let names: Vec<&str> = details.tags.iter().map(name_of).collect();
                    println!("Tags:   {}", names.join(", "));
                }
                println!();
                println!("── Pages ({}) ──", details.images.len());
                for (i, image) in details.images.iter().enumerate() {
                    println!("{:>3}  {}", i + 1, image.uri);
                }
            }
            OutputFormat::Json => print_json(details),
            OutputFormat::Quiet => {
                println!("{}", id_or_dash(details.document.document_id));
            }
        }
    }

    /// Print a list of documents
    pub fn print_documents(&self, documents: &[Document]) {
        match self.format {
            OutputFormat::Human => {
                if documents.is_empty() {
                    println!("No documents found.");
                    return;
                }
                for doc in documents {
                    println!(
                        "{:>6} | {}",
                        id_or_dash(doc.document_id),
                        truncate(title_of(doc), 60)
                    );
                }
                println!("\n{} document(s)", documents.len());
            }
            OutputFormat::Json => print_json(documents),
            OutputFormat::Quiet => {
                for doc in documents {
                    println!("{}", id_or_dash(doc.document_id));
                }
            }
        }
    }

    /// Print tags with the number of documents using each
    pub fn print_tags(&self, tags: &[TagWithDocuments]) {
        match self.format {
            OutputFormat::Human => {
                if tags.is_empty() {
                    println!("No tags found.");
                    return;
                }
                for entry in tags {
                    println!(
                        "{:>6} | {} ({})",
                        id_or_dash(entry.tag.tag_id),
                        name_of(&entry.tag),
                        entry.documents.len()
                    );
                }
                println!("\n{} tag(s)", tags.len());
            }
            OutputFormat::Json => {
                let json_tags: Vec<_> = tags
                    .iter()
                    .map(|entry| {
                        serde_json::json!({
                            "tag_id": entry.tag.tag_id,
                            "name": entry.tag.name,
                            "documents": entry.documents,
                        })
                    })
                    .collect();
                print_json(&json_tags);
            }
            OutputFormat::Quiet => {
                for entry in tags {
                    println!("{}", id_or_dash(entry.tag.tag_id));
                }
            }
        }
    }

    /// Print a success message; quiet mode prints the affected id only
    pub fn success(&self, message: &str, id: Option<i64>) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message, "id": id})
                );
            }
            OutputFormat::Quiet => {
                if let Some(id) = id {
                    println!("{}", id);
                }
            }
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn title_of(doc: &Document) -> &str {
    doc.title.as_deref().unwrap_or(UNSET)
}

fn name_of(tag: &Tag) -> &str {
    tag.name.as_deref().unwrap_or(UNSET)
}

fn id_or_dash(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
