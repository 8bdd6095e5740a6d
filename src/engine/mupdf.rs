//! MuPDF-backed engine.

use mupdf::pdf::{PdfObject, PdfPage};
use mupdf::{Colorspace, Document, Matrix, MetadataName, TextPageFlags};
use tracing::debug;

use super::{
    DocumentEngine, EngineAnnotation, EngineDocument, EngineLink, EngineMetadata, LinkTarget,
    OutlineNode,
};
use crate::error::Result;
use crate::geometry::{Affine, Rect};

/// Engine handle. The MuPDF context is thread-local, so this must live on
/// the dispatch thread.
#[derive(Debug, Default)]
pub struct MupdfEngine;

impl MupdfEngine {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentEngine for MupdfEngine {
    type Document = MupdfDocument;

    fn init(&self) -> Result<()> {
        // First use creates the thread's context and default colorspaces.
        let _rgb = Colorspace::device_rgb();
        debug!("MuPDF context initialized");
        Ok(())
    }

    fn open(&self, bytes: &[u8], magic: &str) -> Result<MupdfDocument> {
        let doc = Document::from_bytes(bytes, magic)?;
        Ok(MupdfDocument { doc })
    }
}

/// An open MuPDF document.
pub struct MupdfDocument {
    doc: Document,
}

fn rect_from(r: &mupdf::Rect) -> Rect {
    Rect::new(r.x0, r.y0, r.x1, r.y1)
}

/// Subtypes MuPDF lists as page annotations.
fn is_markup_subtype(subtype: &str) -> bool {
    !matches!(subtype, "Link" | "Popup" | "Widget")
}

/// Normalized `/Rect` array in PDF user space.
fn pdf_rect(array: &PdfObject) -> Result<mupdf::Rect> {
    let mut v = [0.0f32; 4];
    for (i, slot) in v.iter_mut().enumerate() {
        if let Some(n) = array.get_array(i as i32)? {
            *slot = n.as_float()?;
        }
    }
    Ok(mupdf::Rect::new(
        v[0].min(v[2]),
        v[1].min(v[3]),
        v[0].max(v[2]),
        v[1].max(v[3]),
    ))
}

fn convert_outline(outline: &mupdf::Outline) -> OutlineNode {
    OutlineNode {
        title: outline.title.clone(),
        page: outline.dest.as_ref().map(|dest| dest.loc.page_number as i32),
        children: outline.down.iter().map(convert_outline).collect(),
    }
}

impl MupdfDocument {
    fn metadata_field(&self, name: MetadataName) -> Option<String> {
        self.doc.metadata(name).ok().filter(|s| !s.is_empty())
    }
}

impl EngineDocument for MupdfDocument {
    fn page_count(&self) -> Result<i32> {
        Ok(self.doc.page_count()?)
    }

    fn title(&self) -> Result<Option<String>> {
        Ok(self.metadata_field(MetadataName::Title))
    }

    fn metadata(&self) -> Result<EngineMetadata> {
        Ok(EngineMetadata {
            title: self.metadata_field(MetadataName::Title),
            author: self.metadata_field(MetadataName::Author),
            subject: self.metadata_field(MetadataName::Subject),
            keywords: self.metadata_field(MetadataName::Keywords),
            creator: self.metadata_field(MetadataName::Creator),
            producer: self.metadata_field(MetadataName::Producer),
            creation_date: self.metadata_field(MetadataName::CreationDate),
            modification_date: self.metadata_field(MetadataName::ModDate),
        })
    }

    fn outline(&self) -> Result<Option<Vec<OutlineNode>>> {
        let outlines = self.doc.outlines()?;
        if outlines.is_empty() {
            return Ok(None);
        }
        Ok(Some(outlines.iter().map(convert_outline).collect()))
    }

    fn needs_password(&self) -> Result<bool> {
        Ok(self.doc.needs_password()?)
    }

    fn authenticate(&mut self, password: &str) -> Result<bool> {
        Ok(self.doc.authenticate(password)?)
    }

    fn page_bounds(&self, index: i32) -> Result<Rect> {
        let page = self.doc.load_page(index)?;
        Ok(rect_from(&page.bounds()?))
    }

    fn links(&self, index: i32) -> Result<Vec<EngineLink>> {
        let page = self.doc.load_page(index)?;

        let mut links = Vec::new();
        for link in page.links()? {
            let target = match link.dest {
                Some(dest) => Some(LinkTarget::Internal(dest.loc.page_number as i32)),
                None if link.uri.starts_with('#') => None,
                None => Some(LinkTarget::External(link.uri)),
            };
            links.push(EngineLink {
                bounds: rect_from(&link.bounds),
                target,
            });
        }
        Ok(links)
    }

    fn annotations(&self, index: i32) -> Result<Vec<EngineAnnotation>> {
        if !self.doc.is_pdf() {
            return Ok(Vec::new());
        }
        let page = PdfPage::try_from(self.doc.load_page(index)?)?;
        let ctm = page.ctm()?;
        let Some(annots) = page.object().get_dict("Annots")? else {
            return Ok(Vec::new());
        };

        let mut annotations = Vec::new();
        for i in 0..annots.len()? {
            let Some(annot) = annots.get_array(i as i32)? else {
                continue;
            };
            if !annot.is_dict()? {
                continue;
            }
            let kind = match annot.get_dict("Subtype")? {
                Some(subtype) => String::from_utf8_lossy(subtype.as_name()?).into_owned(),
                None => "Unknown".to_string(),
            };
            // Links and form fields are reported elsewhere; popups belong to their parent.
            if !is_markup_subtype(&kind) {
                continue;
            }
            let Some(rect) = annot.get_dict("Rect")? else {
                continue;
            };
            let bounds = pdf_rect(&rect)?.transform(&ctm);
            annotations.push(EngineAnnotation {
                bounds: rect_from(&bounds),
                kind,
            });
        }
        Ok(annotations)
    }

    fn text_json(&self, index: i32, scale: f32) -> Result<String> {
        let page = self.doc.load_page(index)?;
        let text_page = page.to_text_page(TextPageFlags::empty())?;
        Ok(text_page.to_json(scale)?)
    }

    fn search(&self, index: i32, needle: &str, hit_max: u32) -> Result<Vec<Rect>> {
        let page = self.doc.load_page(index)?;
        let hits = page
            .search(needle, hit_max)?
            .iter()
            .map(|quad| {
                Rect::enclosing(&[
                    (quad.ul.x, quad.ul.y),
                    (quad.ur.x, quad.ur.y),
                    (quad.ll.x, quad.ll.y),
                    (quad.lr.x, quad.lr.y),
                ])
            })
            .collect();
        Ok(hits)
    }

    fn render_png(&self, index: i32, ctm: &Affine) -> Result<Vec<u8>> {
        let page = self.doc.load_page(index)?;
        let matrix = Matrix::new(ctm.a, ctm.b, ctm.c, ctm.d, ctm.e, ctm.f);
        // Page contents only; annotations are not composited.
        let pixmap = page.to_pixmap(&matrix, &Colorspace::device_rgb(), false, false)?;

        let mut png = Vec::new();
        pixmap.write_to(&mut png, mupdf::ImageFormat::PNG)?;
        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_subtypes() {
        assert!(is_markup_subtype("Square"));
        assert!(is_markup_subtype("Highlight"));
        assert!(is_markup_subtype("FreeText"));
        assert!(!is_markup_subtype("Link"));
        assert!(!is_markup_subtype("Popup"));
        assert!(!is_markup_subtype("Widget"));
    }
}
