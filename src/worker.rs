//! Request dispatcher.
//!
//! Decodes call envelopes, binds them to typed calls, invokes the handler
//! against the session and encodes the reply. Calls that fail with a
//! try-later condition are parked and re-dispatched once the remote load
//! they are waiting on finishes.

use std::collections::VecDeque;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::DocumentEngine;
use crate::error::{Result, WorkerError};
use crate::ops;
use crate::protocol::{Call, Envelope, EnvelopeError, Reply};
use crate::remote::{FetchEvent, FetchJob, RangeFetcher};
use crate::session::Session;

/// What handling one event produced.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Replies to send, in order.
    pub replies: Vec<Reply>,
    /// A remote load to start.
    pub fetch: Option<FetchJob>,
}

/// Owns the engine, the session and the retry queue.
pub struct Worker<E: DocumentEngine> {
    engine: E,
    session: Session<E::Document>,
    config: Config,
    /// Calls parked on a try-later condition, in arrival order.
    parked: VecDeque<Envelope>,
}

impl<E: DocumentEngine> Worker<E> {
    pub fn new(engine: E, config: Config) -> Self {
        Self {
            engine,
            session: Session::new(),
            config,
            parked: VecDeque::new(),
        }
    }

    pub fn session(&self) -> &Session<E::Document> {
        &self.session
    }

    /// Number of calls waiting for a remote load.
    pub fn parked(&self) -> usize {
        self.parked.len()
    }

    /// Initialize the engine. The returned reply is the readiness signal.
    pub fn init(&self) -> Result<Reply> {
        self.engine.init()?;
        info!("engine ready");
        Ok(Reply::Ready)
    }

    /// Handle one line of input.
    pub fn handle_line(&mut self, line: &str) -> Outcome {
        match Envelope::parse(line) {
            Ok(envelope) => self.handle_envelope(envelope),
            Err(EnvelopeError { id, error }) => {
                warn!(error = %error, "rejecting malformed envelope");
                Outcome {
                    replies: id.map(|id| Reply::error(id, &error)).into_iter().collect(),
                    fetch: None,
                }
            }
        }
    }

    /// Handle one decoded call envelope.
    pub fn handle_envelope(&mut self, envelope: Envelope) -> Outcome {
        let mut outcome = Outcome::default();
        let generation = self.session.generation();

        self.dispatch(envelope, &mut outcome);

        // The slot was replaced or freed: parked calls no longer wait on a load.
        if self.session.generation() != generation && !self.session.is_loading() {
            self.drain_parked(&mut outcome);
        }
        outcome
    }

    /// Handle the outcome of a remote load.
    pub fn handle_fetch(&mut self, event: FetchEvent) -> Outcome {
        let mut outcome = Outcome::default();
        match event {
            FetchEvent::Loaded {
                generation,
                magic,
                bytes,
            } => {
                if self.session.loading_generation() != Some(generation) {
                    debug!(generation, "ignoring stale remote load");
                    return outcome;
                }
                match self.engine.open(&bytes, &magic) {
                    Ok(document) => {
                        self.session.complete_loading(generation, document);
                        info!(generation, len = bytes.len(), "remote document opened");
                        self.drain_parked(&mut outcome);
                    }
                    Err(e) => {
                        error!(generation, error = %e, "remote document failed to open");
                        self.session.fail_loading(generation);
                        let err = WorkerError::FetchError(format!(
                            "fetched document could not be opened: {e}"
                        ));
                        self.fail_parked(&err, &mut outcome);
                    }
                }
            }
            FetchEvent::Failed {
                generation,
                message,
            } => {
                if !self.session.fail_loading(generation) {
                    debug!(generation, "ignoring stale fetch failure");
                    return outcome;
                }
                self.fail_parked(&WorkerError::FetchError(message), &mut outcome);
            }
        }
        outcome
    }

    fn dispatch(&mut self, envelope: Envelope, outcome: &mut Outcome) {
        let call = match Call::bind(&envelope.method, &envelope.args) {
            Ok(call) => call,
            Err(e) => {
                error!("{} calling {}: {}", e.name(), envelope.method, e);
                outcome.replies.push(Reply::error(envelope.id, &e));
                return;
            }
        };

        match self.invoke(call) {
            Ok((value, fetch)) => {
                outcome.replies.push(Reply::result(envelope.id, value));
                if fetch.is_some() {
                    outcome.fetch = fetch;
                }
            }
            Err(e) if e.is_try_later() => {
                warn!(method = %envelope.method, "document data not yet available, parking call");
                self.parked.push_back(envelope);
            }
            Err(e) => {
                error!("{} calling {}: {}", e.name(), envelope.method, e);
                outcome.replies.push(Reply::error(envelope.id, &e));
            }
        }
    }

    fn invoke(&mut self, call: Call) -> Result<(Value, Option<FetchJob>)> {
        let value = match call {
            Call::OpenDocumentFromBuffer { buffer, magic } => {
                ops::open_document_from_buffer(&self.engine, &mut self.session, &buffer, &magic)?;
                Value::Null
            }
            Call::OpenDocumentFromUrl(source) => {
                let job = ops::open_document_from_url(&mut self.session, source)?;
                return Ok((Value::Null, Some(job)));
            }
            Call::FreeDocument => {
                ops::free_document(&mut self.session);
                Value::Null
            }
            Call::DocumentTitle => serde_json::to_value(ops::document_title(&self.session)?)?,
            Call::DocumentOutline => serde_json::to_value(ops::document_outline(&self.session)?)?,
            Call::DocumentMetadata => {
                serde_json::to_value(ops::document_metadata(&self.session)?)?
            }
            Call::NeedsPassword => serde_json::to_value(ops::needs_password(&self.session)?)?,
            Call::AuthenticatePassword { password } => {
                serde_json::to_value(ops::authenticate_password(&mut self.session, &password)?)?
            }
            Call::CountPages => serde_json::to_value(ops::count_pages(&self.session)?)?,
            Call::GetPageSizes { dpi } => {
                serde_json::to_value(ops::get_page_sizes(&self.session, dpi)?)?
            }
            Call::GetPageWidth { page, dpi } => {
                serde_json::to_value(ops::get_page_width(&self.session, page, dpi)?)?
            }
            Call::GetPageHeight { page, dpi } => {
                serde_json::to_value(ops::get_page_height(&self.session, page, dpi)?)?
            }
            Call::GetPageLinks { page, dpi } => {
                serde_json::to_value(ops::get_page_links(&self.session, page, dpi)?)?
            }
            Call::GetPageText { page, dpi } => ops::get_page_text(&self.session, page, dpi)?,
            Call::Search { page, dpi, needle } => serde_json::to_value(ops::search(
                &self.session,
                page,
                dpi,
                &needle,
                self.config.search_hit_max,
            )?)?,
            Call::GetPageAnnotations { page, dpi } => {
                serde_json::to_value(ops::get_page_annotations(&self.session, page, dpi)?)?
            }
            Call::DrawPageAsPng { page, dpi } => {
                serde_json::to_value(ops::draw_page_as_png(&self.session, page, dpi)?)?
            }
        };
        Ok((value, None))
    }

    fn drain_parked(&mut self, outcome: &mut Outcome) {
        if self.parked.is_empty() {
            return;
        }
        info!(count = self.parked.len(), "re-dispatching parked calls");
        for envelope in std::mem::take(&mut self.parked) {
            self.dispatch(envelope, outcome);
        }
    }

    fn fail_parked(&mut self, err: &WorkerError, outcome: &mut Outcome) {
        for envelope in std::mem::take(&mut self.parked) {
            outcome.replies.push(Reply::error(envelope.id, err));
        }
    }
}

async fn send<W: AsyncWrite + Unpin>(output: &mut W, reply: &Reply) -> Result<()> {
    output.write_all(reply.to_line().as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

/// The reader on the other end of `output` went away.
fn is_output_closed(err: &WorkerError) -> bool {
    matches!(err, WorkerError::IoError(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
}

/// Serve calls read from `input` until it closes, writing replies to
/// `output`. Emits `READY` once the engine is initialized, before any call
/// is handled.
///
/// After `input` closes, calls still parked on a remote load are answered
/// once that load settles. A closed `output` stops the loop without error.
pub async fn run<E, R, W>(
    mut worker: Worker<E>,
    fetcher: RangeFetcher,
    input: R,
    output: &mut W,
) -> Result<()>
where
    E: DocumentEngine,
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    let reader = tokio::spawn(async move {
        let mut lines = input.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "failed to read input");
                    break;
                }
            }
        }
    });

    let (fetch_tx, mut fetch_rx) = mpsc::unbounded_channel::<FetchEvent>();
    let mut fetch_task: Option<(u64, JoinHandle<()>)> = None;
    let mut input_open = true;

    let ready = worker.init()?;
    let mut result = send(output, &ready).await;

    'serve: while result.is_ok() {
        let outcome = tokio::select! {
            line = line_rx.recv(), if input_open => match line {
                Some(line) => worker.handle_line(&line),
                None => {
                    info!("input closed");
                    input_open = false;
                    Outcome::default()
                }
            },
            Some(event) = fetch_rx.recv() => worker.handle_fetch(event),
        };

        for reply in &outcome.replies {
            result = send(output, reply).await;
            if result.is_err() {
                break 'serve;
            }
        }

        if let Some(job) = outcome.fetch {
            if let Some((_, task)) = fetch_task.take() {
                task.abort();
            }
            let generation = job.generation;
            fetch_task = Some((generation, fetcher.spawn(job, fetch_tx.clone())));
        }

        let stale = matches!(
            &fetch_task,
            Some((generation, _)) if worker.session().loading_generation() != Some(*generation)
        );
        if stale {
            if let Some((generation, task)) = fetch_task.take() {
                debug!(generation, "remote load no longer needed");
                task.abort();
            }
        }

        if !input_open {
            if worker.parked() == 0 || fetch_task.is_none() {
                break;
            }
            debug!(count = worker.parked(), "waiting on remote load for parked calls");
        }
    }

    if worker.parked() > 0 {
        warn!(count = worker.parked(), "worker stopping with calls still parked");
    }
    if let Some((_, task)) = fetch_task {
        task.abort();
    }
    reader.abort();

    match result {
        Err(e) if is_output_closed(&e) => {
            info!("output closed, worker stopping");
            Ok(())
        }
        Err(e) => Err(e),
        Ok(()) => {
            info!("worker stopping");
            Ok(())
        }
    }
}
