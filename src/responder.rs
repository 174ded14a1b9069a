//! Streaming preview responder.
//!
//! The body is opened before metadata is known. A preamble goes out at once,
//! acquisition runs as a separate task, and filler tokens are written at a
//! fixed interval until the task finishes or the deadline passes. The rest of
//! the document is written only after the drip loop has exited, so a single
//! task ever writes to the stream.

use crate::config::RelayConfig;
use crate::document::{self, FILLER, PREAMBLE};
use crate::error::{RelayError, Result};
use crate::fetchers::MarkupSource;
use crate::filter::ItemRequest;
use crate::notify::Notifier;
use crate::parsers::MetaExtractor;
use crate::results::{FetchOutcome, FetchTarget, PageMetadata};
use axum::body::{Body, Bytes};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_stream::wrappers::ReceiverStream;

/// Chunks buffered between the responder and the HTTP body
const CHANNEL_CAPACITY: usize = 16;

/// One item of a streamed body; an `Err` aborts the connection
pub type Chunk = std::result::Result<Bytes, std::io::Error>;

/// Write half of a streamed response body.
///
/// `close` and `abort` consume the stream, so it is terminated once at most.
/// Dropping it without either also ends the body cleanly.
#[derive(Debug)]
pub struct ResponseStream {
    tx: mpsc::Sender<Chunk>,
    bytes_written: usize,
}

impl ResponseStream {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Chunk>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                bytes_written: 0,
            },
            rx,
        )
    }

    pub async fn write(&mut self, text: &str) -> Result<()> {
        self.tx
            .send(Ok(Bytes::from(text.to_owned())))
            .await
            .map_err(|_| RelayError::StreamWrite)?;
        self.bytes_written += text.len();
        Ok(())
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Finish the body normally
    pub fn close(self) {
        ::log::debug!("Closing response stream after {} bytes", self.bytes_written);
    }

    /// Finish the body with an error so the peer sees a broken transfer
    pub async fn abort(self, reason: &str) {
        ::log::error!("Aborting response stream: {}", reason);
        let error = std::io::Error::other(reason.to_string());
        // The receiver may already be gone; there is nobody left to tell.
        let _ = self.tx.send(Err(error)).await;
    }
}

/// Acquisition progress for one response.
///
/// Written once, by the responder, when the acquisition task is joined.
#[derive(Debug, Clone)]
pub struct StreamState {
    pub data_ready: bool,
    pub metadata: PageMetadata,
}

impl StreamState {
    pub fn new(defaults: PageMetadata) -> Self {
        Self {
            data_ready: false,
            metadata: defaults,
        }
    }

    /// Record the finished task; a panicked task keeps the defaults
    fn resolve(&mut self, joined: std::result::Result<PageMetadata, JoinError>) {
        match joined {
            Ok(metadata) => self.metadata = metadata,
            Err(e) => ::log::error!("Acquisition task failed: {}", e),
        }
        self.data_ready = true;
    }
}

/// Answers preview requests, either streamed or buffered
pub struct StreamingResponder<S> {
    source: Arc<S>,
    extractor: MetaExtractor,
    notifier: Notifier,
    config: Arc<RelayConfig>,
}

impl<S> Clone for StreamingResponder<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            extractor: self.extractor.clone(),
            notifier: self.notifier.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: MarkupSource> StreamingResponder<S> {
    pub fn new(source: S, notifier: Notifier, config: Arc<RelayConfig>) -> Result<Self> {
        Ok(Self {
            source: Arc::new(source),
            extractor: MetaExtractor::new()?,
            notifier,
            config,
        })
    }

    /// Open a streamed body and return it without waiting for metadata
    pub fn respond(&self, item: ItemRequest, defaults: PageMetadata) -> Body {
        Body::from_stream(ReceiverStream::new(self.open(item, defaults)))
    }

    /// Start a streaming session and hand back the read half of its body
    pub fn open(&self, item: ItemRequest, defaults: PageMetadata) -> mpsc::Receiver<Chunk> {
        let (stream, rx) = ResponseStream::channel(CHANNEL_CAPACITY);
        let session = self.clone();
        tokio::spawn(async move { session.run(stream, item, defaults).await });
        rx
    }

    /// Wait for metadata, bounded by deadline plus grace, and build the whole document
    pub async fn respond_buffered(&self, item: ItemRequest, defaults: PageMetadata) -> String {
        let timings = &self.config.timings;
        let mut state = StreamState::new(defaults);
        let acquisition = self.spawn_acquisition(&item, state.metadata.clone());

        match timeout(timings.deadline() + timings.grace(), acquisition).await {
            Ok(joined) => state.resolve(joined),
            Err(_) => ::log::warn!(
                "Metadata for item {} not ready after {:?}, using fallback data",
                item.item_id,
                timings.deadline() + timings.grace()
            ),
        }

        let html = document::full_document(&state.metadata, &item, &self.config);
        ::log::info!("Embed HTML length: {}", html.len());
        self.notifier.spawn(state.metadata, item);
        html
    }

    /// Drive one streamed response to termination
    async fn run(self, mut stream: ResponseStream, item: ItemRequest, defaults: PageMetadata) {
        let mut state = StreamState::new(defaults.clone());

        match self.stream_document(&mut stream, &item, &mut state).await {
            Ok(()) => {
                stream.close();
                ::log::info!(
                    "Streamed preview for item {} (data ready: {})",
                    item.item_id,
                    state.data_ready
                );
                self.notifier.spawn(state.metadata, item);
            }
            Err(e) => {
                ::log::warn!("Streaming item {} failed: {}", item.item_id, e);
                let fallback = if stream.bytes_written() > 0 {
                    document::head_tail(&defaults, &item, &self.config)
                } else {
                    document::full_document(&defaults, &item, &self.config)
                };

                match stream.write(&fallback).await {
                    Ok(()) => {
                        stream.close();
                        self.notifier.spawn(defaults, item);
                    }
                    Err(e) => stream.abort(&e.to_string()).await,
                }
            }
        }
    }

    /// Preamble, filler while waiting, then the rest of the document
    async fn stream_document(
        &self,
        stream: &mut ResponseStream,
        item: &ItemRequest,
        state: &mut StreamState,
    ) -> Result<()> {
        let timings = &self.config.timings;
        let opened = Instant::now();
        stream.write(PREAMBLE).await?;

        let mut acquisition = self.spawn_acquisition(item, state.metadata.clone());

        let mut ticker = interval_at(opened + timings.drip_interval(), timings.drip_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut fillers = 0usize;

        loop {
            tokio::select! {
                biased;
                joined = &mut acquisition => {
                    state.resolve(joined);
                    break;
                }
                _ = ticker.tick() => {
                    if opened.elapsed() >= timings.deadline() {
                        ::log::warn!(
                            "Deadline of {:?} reached for item {} after {} fillers",
                            timings.deadline(),
                            item.item_id,
                            fillers
                        );
                        break;
                    }
                    stream.write(FILLER).await?;
                    fillers += 1;
                    ::log::trace!("Filler {} for item {}", fillers, item.item_id);
                }
            }
        }

        if !state.data_ready {
            match timeout(timings.grace(), &mut acquisition).await {
                Ok(joined) => state.resolve(joined),
                // The task is detached here and finishes on its own timers
                Err(_) => ::log::warn!(
                    "Item {} still pending after {:?} grace, using fallback data",
                    item.item_id,
                    timings.grace()
                ),
            }
        }

        stream
            .write(&document::head_tail(&state.metadata, item, &self.config))
            .await
    }

    fn spawn_acquisition(&self, item: &ItemRequest, defaults: PageMetadata) -> JoinHandle<PageMetadata> {
        let source = Arc::clone(&self.source);
        let extractor = self.extractor.clone();
        let target = FetchTarget::new(item.canonical_url.clone(), self.config.user_agent.clone());

        tokio::spawn(async move { acquire(source.as_ref(), &extractor, &target, defaults).await })
    }
}

/// Fetch and extract, falling back to `defaults` when nothing was retrieved
pub async fn acquire<S: MarkupSource>(
    source: &S,
    extractor: &MetaExtractor,
    target: &FetchTarget,
    defaults: PageMetadata,
) -> PageMetadata {
    match source.fetch(target).await {
        FetchOutcome::Success(markup) => {
            ::log::debug!("Acquired {} bytes of markup for {}", markup.len(), target.url());
            extractor.extract(&markup, &defaults)
        }
        FetchOutcome::Exhausted => {
            let e = RelayError::Acquisition(target.url().to_string());
            ::log::warn!("{}, using fallback data", e);
            defaults
        }
    }
}
