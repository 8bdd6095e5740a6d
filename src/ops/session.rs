//! Session management: open from buffer or URL, free.

use base64::Engine as _;
use tracing::info;

use crate::engine::DocumentEngine;
use crate::error::{Result, WorkerError};
use crate::protocol::UrlSource;
use crate::remote::{chunk_size, FetchJob};
use crate::session::Session;

// ============== Open Document From Buffer ==============

/// Decode a base64 buffer and make it the open document.
pub fn open_document_from_buffer<E: DocumentEngine>(
    engine: &E,
    session: &mut Session<E::Document>,
    buffer: &str,
    magic: &str,
) -> Result<()> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(buffer)?;
    let document = engine.open(&bytes, magic)?;
    let generation = session.open(document);
    info!(generation, len = bytes.len(), magic, "opened document from buffer");
    Ok(())
}

// ============== Open Document From URL ==============

/// Put the session into the loading state and describe the fetch that will
/// fill it. Calls against the document are parked until the fetch finishes.
pub fn open_document_from_url<D>(session: &mut Session<D>, source: UrlSource) -> Result<FetchJob> {
    if source.content_length == 0 {
        return Err(WorkerError::InvalidParams {
            method: "openDocumentFromUrl".to_string(),
            reason: "content length must be positive".to_string(),
        });
    }

    let generation = session.begin_loading(source.url.as_str());
    let job = FetchJob {
        generation,
        chunk_size: chunk_size(source.progressive),
        url: source.url,
        content_length: source.content_length,
        prefetch: source.prefetch,
        magic: source.magic,
    };
    info!(
        generation,
        url = %job.url,
        content_length = job.content_length,
        chunk_size = job.chunk_size,
        prefetch = job.prefetch,
        "opening document from url"
    );
    Ok(job)
}

// ============== Free Document ==============

/// Release the open document, if any.
pub fn free_document<D>(session: &mut Session<D>) {
    session.close();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_from_url_rejects_empty_document() {
        let mut session: Session<()> = Session::new();
        let err = open_document_from_url(
            &mut session,
            UrlSource {
                url: "https://example.com/a.pdf".to_string(),
                content_length: 0,
                progressive: 0,
                prefetch: false,
                magic: "application/pdf".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(err.name(), "InvalidParams");
        assert!(!session.is_loading());
    }

    #[test]
    fn test_open_from_url_enters_loading() {
        let mut session: Session<()> = Session::new();
        let job = open_document_from_url(
            &mut session,
            UrlSource {
                url: "https://example.com/a.pdf".to_string(),
                content_length: 1 << 20,
                progressive: 128,
                prefetch: true,
                magic: "application/pdf".to_string(),
            },
        )
        .unwrap();
        assert!(session.is_loading());
        assert_eq!(job.generation, session.generation());
        assert_eq!(job.chunk_size, 128 << 10);
    }
}
