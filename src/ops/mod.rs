//! Handlers for the registered worker operations.
//!
//! Each handler takes the session by reference and returns a plain
//! serializable value. Page numbers arriving here are 1-based.

pub mod document;
pub mod page;
pub mod session;
pub mod text;

pub use document::*;
pub use page::*;
pub use session::*;
pub use text::*;

use crate::engine::EngineDocument;
use crate::error::{Result, WorkerError};

/// Validate a 1-based page number and return the engine's 0-based index.
pub(crate) fn page_index<D: EngineDocument>(doc: &D, page: i32) -> Result<i32> {
    let page_count = doc.page_count()?;
    if page < 1 || page > page_count {
        return Err(WorkerError::InvalidPageNumber {
            page,
            total: page_count,
        });
    }
    Ok(page - 1)
}
