//! Structured text extraction.

use serde_json::Value;

use super::page_index;
use crate::engine::EngineDocument;
use crate::error::Result;
use crate::geometry::POINTS_PER_INCH;
use crate::session::Session;

// ============== Get Page Text ==============

/// Structured text of a page as the engine's JSON tree, with coordinates
/// in device pixels.
pub fn get_page_text<D: EngineDocument>(session: &Session<D>, page: i32, dpi: f32) -> Result<Value> {
    let doc = session.document()?;
    let json = doc.text_json(page_index(doc, page)?, dpi / POINTS_PER_INCH)?;
    Ok(serde_json::from_str(&json)?)
}
