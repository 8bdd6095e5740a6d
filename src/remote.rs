//! Remote byte-range source for documents opened from a URL.
//!
//! The document is fetched in fixed-size `Range` requests. Once every chunk
//! is resident the assembled buffer is handed back to the dispatch loop as a
//! [`FetchEvent`], which opens it and re-dispatches parked calls.

use std::ops::Range;

use futures::{stream, StreamExt, TryStreamExt};
use reqwest::header::RANGE;
use reqwest::StatusCode;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, WorkerError};

/// Smallest chunk ever requested.
pub const MIN_CHUNK_SIZE: u64 = 1 << 16;

/// Chunk size for a progressive hint given in KiB.
pub fn chunk_size(progressive: u64) -> u64 {
    progressive.saturating_mul(1 << 10).max(MIN_CHUNK_SIZE)
}

/// Split `0..content_length` into consecutive ranges of at most `chunk_size`.
pub fn chunk_ranges(content_length: u64, chunk_size: u64) -> Vec<Range<u64>> {
    let chunk_size = chunk_size.max(1);
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < content_length {
        let end = (start + chunk_size).min(content_length);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

/// A remote load requested by `openDocumentFromUrl`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchJob {
    /// Session generation the load belongs to.
    pub generation: u64,
    pub url: String,
    pub content_length: u64,
    pub chunk_size: u64,
    pub prefetch: bool,
    pub magic: String,
}

/// Outcome of a remote load, delivered to the dispatch loop.
#[derive(Debug)]
pub enum FetchEvent {
    Loaded {
        generation: u64,
        magic: String,
        bytes: Vec<u8>,
    },
    Failed {
        generation: u64,
        message: String,
    },
}

fn fetch_error(url: &str, err: impl std::fmt::Display) -> WorkerError {
    WorkerError::FetchError(format!("{url}: {err}"))
}

/// Issues range requests for remote documents.
#[derive(Clone)]
pub struct RangeFetcher {
    client: reqwest::Client,
    prefetch_concurrency: usize,
}

impl RangeFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|e| WorkerError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            prefetch_concurrency: config.prefetch_concurrency.max(1),
        })
    }

    /// Run `job` in the background and report its outcome on `events`.
    pub fn spawn(&self, job: FetchJob, events: UnboundedSender<FetchEvent>) -> JoinHandle<()> {
        let fetcher = self.clone();
        tokio::spawn(async move {
            let generation = job.generation;
            let result = fetcher.fetch(&job).await;
            let event = match result {
                Ok(bytes) => FetchEvent::Loaded {
                    generation,
                    magic: job.magic,
                    bytes,
                },
                Err(e) => {
                    warn!(generation, url = %job.url, error = %e, "remote load failed");
                    FetchEvent::Failed {
                        generation,
                        message: e.to_string(),
                    }
                }
            };
            if events.send(event).is_err() {
                debug!(generation, "dispatch loop gone, dropping fetch result");
            }
        })
    }

    /// Fetch the whole document. Chunks are requested one at a time, or
    /// with bounded fan-out when the job asks for prefetch.
    pub async fn fetch(&self, job: &FetchJob) -> Result<Vec<u8>> {
        let ranges = chunk_ranges(job.content_length, job.chunk_size);
        let in_flight = if job.prefetch {
            self.prefetch_concurrency
        } else {
            1
        };
        info!(
            url = %job.url,
            chunks = ranges.len(),
            in_flight,
            "fetching remote document"
        );

        let chunks: Vec<Vec<u8>> = stream::iter(ranges)
            .map(|range| self.fetch_chunk(&job.url, job.content_length, range))
            .buffered(in_flight)
            .try_collect()
            .await?;

        let bytes = chunks.concat();
        if bytes.len() as u64 != job.content_length {
            return Err(fetch_error(
                &job.url,
                format!(
                    "expected {} bytes, received {}",
                    job.content_length,
                    bytes.len()
                ),
            ));
        }
        Ok(bytes)
    }

    async fn fetch_chunk(&self, url: &str, content_length: u64, range: Range<u64>) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header(RANGE, format!("bytes={}-{}", range.start, range.end - 1))
            .send()
            .await
            .map_err(|e| fetch_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(url, format!("HTTP {status}")));
        }
        let body = response.bytes().await.map_err(|e| fetch_error(url, e))?;

        let chunk = if status == StatusCode::PARTIAL_CONTENT {
            body.to_vec()
        } else {
            // Server ignored the Range header and sent the whole body.
            if body.len() as u64 != content_length {
                return Err(fetch_error(
                    url,
                    format!("full response of {} bytes, expected {}", body.len(), content_length),
                ));
            }
            warn!(url, "server does not support range requests");
            body[range.start as usize..range.end as usize].to_vec()
        };

        if chunk.len() as u64 != range.end - range.start {
            return Err(fetch_error(
                url,
                format!(
                    "short read for bytes {}-{}: got {}",
                    range.start,
                    range.end - 1,
                    chunk.len()
                ),
            ));
        }
        debug!(url, start = range.start, end = range.end, "chunk resident");
        Ok(chunk)
    }
}
