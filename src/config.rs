//! Command-line and environment configuration.

use std::time::Duration;

use clap::Parser;

/// Runtime settings for the worker.
#[derive(Debug, Clone, Parser)]
#[command(name = "mupdf-view-worker", version, about)]
pub struct Config {
    /// Tracing filter directive; `RUST_LOG` takes precedence when set.
    #[arg(long, env = "MUPDF_WORKER_LOG", default_value = "mupdf_view_worker=info")]
    pub log_filter: String,

    /// Maximum number of hits returned by a single page search.
    #[arg(long, env = "MUPDF_WORKER_SEARCH_HIT_MAX", default_value_t = 500)]
    pub search_hit_max: u32,

    /// Timeout for each remote byte-range request, in seconds.
    #[arg(long, env = "MUPDF_WORKER_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Concurrent range requests when a remote document is prefetched.
    #[arg(long, env = "MUPDF_WORKER_PREFETCH_CONCURRENCY", default_value_t = 4)]
    pub prefetch_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "mupdf_view_worker=info".to_string(),
            search_hit_max: 500,
            fetch_timeout_secs: 30,
            prefetch_concurrency: 4,
        }
    }
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
