//! Capability interface over the document engine.
//!
//! The dispatcher never touches engine types directly: every handler goes
//! through [`EngineDocument`], which hands back plain geometry in document
//! space. Engine resources acquired inside a method are dropped before it
//! returns.

pub mod mupdf;

use crate::error::Result;
use crate::geometry::{Affine, Rect};

pub use self::mupdf::{MupdfDocument, MupdfEngine};

/// A node of the document outline.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineNode {
    pub title: String,
    /// 0-based target page, if the entry resolves to one.
    pub page: Option<i32>,
    pub children: Vec<OutlineNode>,
}

/// Where a link points.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    External(String),
    /// 0-based page inside the same document.
    Internal(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineLink {
    pub bounds: Rect,
    /// `None` when an internal link cannot be resolved.
    pub target: Option<LinkTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineAnnotation {
    pub bounds: Rect,
    pub kind: String,
}

/// Document information dictionary entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

/// Opens documents.
pub trait DocumentEngine {
    type Document: EngineDocument;

    /// One-time engine setup; must run on the dispatch thread.
    fn init(&self) -> Result<()>;

    /// Open a document from an in-memory buffer. `magic` is a MIME type or
    /// file name used for format detection.
    fn open(&self, bytes: &[u8], magic: &str) -> Result<Self::Document>;
}

/// Operations on one open document. Page indices are 0-based and already
/// validated against [`EngineDocument::page_count`].
pub trait EngineDocument {
    fn page_count(&self) -> Result<i32>;
    fn title(&self) -> Result<Option<String>>;
    fn metadata(&self) -> Result<EngineMetadata>;
    /// `None` when the document has no outline.
    fn outline(&self) -> Result<Option<Vec<OutlineNode>>>;
    fn needs_password(&self) -> Result<bool>;
    fn authenticate(&mut self, password: &str) -> Result<bool>;

    /// Page bounds in document units.
    fn page_bounds(&self, index: i32) -> Result<Rect>;
    fn links(&self, index: i32) -> Result<Vec<EngineLink>>;
    fn annotations(&self, index: i32) -> Result<Vec<EngineAnnotation>>;
    /// Structured text as the engine's JSON, coordinates scaled by `scale`.
    fn text_json(&self, index: i32, scale: f32) -> Result<String>;
    fn search(&self, index: i32, needle: &str, hit_max: u32) -> Result<Vec<Rect>>;
    fn render_png(&self, index: i32, ctm: &Affine) -> Result<Vec<u8>>;
}
