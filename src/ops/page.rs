//! Page-level operations: sizes, links, search, annotations, render.

use base64::Engine as _;
use serde::Serialize;
use tracing::debug;

use super::page_index;
use crate::engine::{EngineDocument, LinkTarget};
use crate::error::Result;
use crate::geometry::{to_device, Affine, DeviceRect};
use crate::session::Session;

// ============== Get Page Sizes ==============

/// Page dimensions in device pixels.
#[derive(Debug, Serialize, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Size of every page at `dpi`, in page order.
pub fn get_page_sizes<D: EngineDocument>(session: &Session<D>, dpi: f32) -> Result<Vec<PageSize>> {
    let doc = session.document()?;
    let page_count = doc.page_count()?;

    let mut sizes = Vec::with_capacity(page_count.max(0) as usize);
    for index in 0..page_count {
        let bounds = doc.page_bounds(index)?;
        sizes.push(PageSize {
            width: to_device(bounds.x1 - bounds.x0, dpi),
            height: to_device(bounds.y1 - bounds.y0, dpi),
        });
    }
    Ok(sizes)
}

// ============== Get Page Width / Height ==============

pub fn get_page_width<D: EngineDocument>(session: &Session<D>, page: i32, dpi: f32) -> Result<f32> {
    let doc = session.document()?;
    let bounds = doc.page_bounds(page_index(doc, page)?)?;
    Ok(to_device(bounds.x1 - bounds.x0, dpi))
}

pub fn get_page_height<D: EngineDocument>(
    session: &Session<D>,
    page: i32,
    dpi: f32,
) -> Result<f32> {
    let doc = session.document()?;
    let bounds = doc.page_bounds(page_index(doc, page)?)?;
    Ok(to_device(bounds.y1 - bounds.y0, dpi))
}

// ============== Get Page Links ==============

/// A hyperlink on a page.
#[derive(Debug, Serialize, PartialEq)]
pub struct PageLink {
    #[serde(flatten)]
    pub rect: DeviceRect,
    /// External URI, or `#page{n}` with a 1-based page for internal links.
    pub href: String,
}

/// All resolvable hyperlinks on a page.
pub fn get_page_links<D: EngineDocument>(
    session: &Session<D>,
    page: i32,
    dpi: f32,
) -> Result<Vec<PageLink>> {
    let doc = session.document()?;
    let doc_to_screen = Affine::doc_to_device(dpi);

    let mut links = Vec::new();
    for link in doc.links(page_index(doc, page)?)? {
        let href = match link.target {
            Some(LinkTarget::External(uri)) => uri,
            Some(LinkTarget::Internal(target)) => format!("#page{}", target + 1),
            None => {
                debug!(page, "skipping unresolvable link");
                continue;
            }
        };
        links.push(PageLink {
            rect: doc_to_screen.project(link.bounds),
            href,
        });
    }
    Ok(links)
}

// ============== Search ==============

/// Bounding rectangle of every match of `needle` on the page.
pub fn search<D: EngineDocument>(
    session: &Session<D>,
    page: i32,
    dpi: f32,
    needle: &str,
    hit_max: u32,
) -> Result<Vec<DeviceRect>> {
    let doc = session.document()?;
    let index = page_index(doc, page)?;
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let doc_to_screen = Affine::doc_to_device(dpi);
    let hits = doc
        .search(index, needle, hit_max)?
        .into_iter()
        .map(|hit| doc_to_screen.project(hit))
        .collect();
    Ok(hits)
}

// ============== Get Page Annotations ==============

/// An annotation on a page.
#[derive(Debug, Serialize, PartialEq)]
pub struct PageAnnotation {
    #[serde(flatten)]
    pub rect: DeviceRect,
    #[serde(rename = "type")]
    pub kind: String,
    /// Position in the page's annotation list; only meaningful within the
    /// call that returned it.
    #[serde(rename = "ref")]
    pub reference: usize,
}

pub fn get_page_annotations<D: EngineDocument>(
    session: &Session<D>,
    page: i32,
    dpi: f32,
) -> Result<Vec<PageAnnotation>> {
    let doc = session.document()?;
    let doc_to_screen = Affine::doc_to_device(dpi);

    let annotations = doc
        .annotations(page_index(doc, page)?)?
        .into_iter()
        .enumerate()
        .map(|(reference, annot)| PageAnnotation {
            rect: doc_to_screen.project(annot.bounds),
            kind: annot.kind,
            reference,
        })
        .collect();
    Ok(annotations)
}

// ============== Draw Page As PNG ==============

/// Rasterize a page at `dpi` and return the PNG, base64-encoded.
pub fn draw_page_as_png<D: EngineDocument>(
    session: &Session<D>,
    page: i32,
    dpi: f32,
) -> Result<String> {
    let doc = session.document()?;
    let png = doc.render_png(page_index(doc, page)?, &Affine::doc_to_device(dpi))?;
    debug!(page, dpi, len = png.len(), "rendered page");
    Ok(base64::engine::general_purpose::STANDARD.encode(png))
}
