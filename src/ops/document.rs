//! Document-level operations: title, outline, page count, metadata.

use serde::Serialize;

use crate::engine::{EngineDocument, OutlineNode};
use crate::error::Result;
use crate::session::Session;

// ============== Document Title ==============

/// Title from the document information, `None` when absent or empty.
pub fn document_title<D: EngineDocument>(session: &Session<D>) -> Result<Option<String>> {
    session.document()?.title()
}

// ============== Document Outline ==============

/// A single outline entry.
#[derive(Debug, Serialize, PartialEq)]
pub struct OutlineEntry {
    pub title: String,
    /// Target page (0-indexed), `None` when the entry has no destination.
    pub page: Option<i32>,
    /// Only present for entries with children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down: Option<Vec<OutlineEntry>>,
}

fn convert_outline(nodes: &[OutlineNode]) -> Vec<OutlineEntry> {
    nodes
        .iter()
        .map(|node| OutlineEntry {
            title: node.title.clone(),
            page: node.page,
            down: (!node.children.is_empty()).then(|| convert_outline(&node.children)),
        })
        .collect()
}

/// Depth-first outline, or `None` when the document has none.
pub fn document_outline<D: EngineDocument>(
    session: &Session<D>,
) -> Result<Option<Vec<OutlineEntry>>> {
    let outline = session.document()?.outline()?;
    Ok(outline.map(|nodes| convert_outline(&nodes)))
}

// ============== Count Pages ==============

pub fn count_pages<D: EngineDocument>(session: &Session<D>) -> Result<i32> {
    session.document()?.page_count()
}

// ============== Document Metadata ==============

/// Document metadata.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    /// Application that created the document.
    pub creator: Option<String>,
    /// Application that produced the PDF.
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

pub fn document_metadata<D: EngineDocument>(session: &Session<D>) -> Result<DocumentMetadata> {
    let meta = session.document()?.metadata()?;
    Ok(DocumentMetadata {
        title: meta.title,
        author: meta.author,
        subject: meta.subject,
        keywords: meta.keywords,
        creator: meta.creator,
        producer: meta.producer,
        creation_date: meta.creation_date,
        modification_date: meta.modification_date,
    })
}

// ============== Password ==============

pub fn needs_password<D: EngineDocument>(session: &Session<D>) -> Result<bool> {
    session.document()?.needs_password()
}

/// Try a password against an encrypted document.
pub fn authenticate_password<D: EngineDocument>(
    session: &mut Session<D>,
    password: &str,
) -> Result<bool> {
    session.document_mut()?.authenticate(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outline_down_only_for_parents() {
        let nodes = vec![
            OutlineNode {
                title: "Chapter 1".to_string(),
                page: Some(0),
                children: vec![OutlineNode {
                    title: "Section 1.1".to_string(),
                    page: Some(1),
                    children: vec![],
                }],
            },
            OutlineNode {
                title: "Chapter 2".to_string(),
                page: None,
                children: vec![],
            },
        ];

        let value = serde_json::to_value(convert_outline(&nodes)).unwrap();
        assert_eq!(
            value,
            json!([
                {"title": "Chapter 1", "page": 0, "down": [
                    {"title": "Section 1.1", "page": 1}
                ]},
                {"title": "Chapter 2", "page": null}
            ])
        );
    }
}
