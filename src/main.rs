//! MuPDF view worker entry point.
//!
//! Reads call envelopes from stdin and writes replies to stdout, one JSON
//! array per line.

use clap::Parser;
use mupdf_view_worker::{run, Config, MupdfEngine, RangeFetcher, Worker};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// MuPDF documents are !Send and the engine context is per-thread, so the
// dispatch loop stays on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize logging to stderr (stdout carries the protocol)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting MuPDF view worker v{}", env!("CARGO_PKG_VERSION"));

    let fetcher = RangeFetcher::new(&config)?;
    let worker = Worker::new(MupdfEngine::new(), config);

    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    run(worker, fetcher, input, &mut output).await?;

    tracing::info!("MuPDF view worker stopped");
    Ok(())
}
