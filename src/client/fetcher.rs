//! Debounced, paginated read fetching.
//!
//! [`ReadFetcher`] owns one background task. Viewport changes are sent to it
//! as [`RangeRequest`]s; it waits for a quiet period, skips ranges already
//! covered by the last completed fetch, follows page tokens to the end and
//! reports layouts on an event channel. Every issued fetch gets a new epoch;
//! pages from an older epoch are dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::client::api::ReadSource;
use crate::client::config::DEFAULT_DEBOUNCE_MS;
use crate::client::notify::Notification;
use crate::client::ClientError;
use crate::core::api::{SearchReadsParams, SearchReadsResponse};
use crate::core::read::AlignmentRecord;
use crate::core::types::{PaginationMode, QueryType};
use crate::layout::engine::{LayoutEngine, LayoutOptions, ReadLayout};

/// A region of reads the view wants to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequest {
    pub readset_ids: Vec<String>,
    pub sequence_name: String,
    pub start: u64,
    pub end: u64,
    pub query_type: QueryType,
}

impl RangeRequest {
    /// True if `other` asks for a subrange of the same readsets and sequence
    pub fn contains(&self, other: &RangeRequest) -> bool {
        self.readset_ids == other.readset_ids
            && self.sequence_name == other.sequence_name
            && self.query_type == other.query_type
            && self.start <= other.start
            && other.end <= self.end
    }

    pub fn to_params(&self) -> SearchReadsParams {
        let mut params =
            SearchReadsParams::new(&self.readset_ids, &self.sequence_name, self.start, self.end);
        params.query_type = self.query_type;
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Quiet period before a requested range is fetched
    pub debounce: Duration,
    pub pagination: PaginationMode,
    pub layout: LayoutOptions,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            pagination: PaginationMode::default(),
            layout: LayoutOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FetchEvent {
    /// A new layout for `range`. With incremental pagination one is sent per
    /// page and only the last has `complete` set.
    Layout {
        epoch: u64,
        range: RangeRequest,
        layout: ReadLayout,
        complete: bool,
    },
    /// `range` is covered by the last completed fetch; nothing was fetched
    Skipped { range: RangeRequest },
    Notification(Notification),
}

/// Handle to the background fetch task
#[derive(Debug)]
pub struct ReadFetcher {
    commands: mpsc::UnboundedSender<RangeRequest>,
    task: JoinHandle<()>,
}

impl ReadFetcher {
    /// Start the fetch task on the current tokio runtime
    pub fn spawn<S: ReadSource>(
        source: S,
        config: FetchConfig,
    ) -> (Self, mpsc::UnboundedReceiver<FetchEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (fetch_loop, pages) = FetchLoop::new(Arc::new(source), config, event_tx);
        let task = tokio::spawn(fetch_loop.run(command_rx, pages));

        (
            Self {
                commands: command_tx,
                task,
            },
            event_rx,
        )
    }

    /// Ask for `range`; returns false if the fetch task has stopped
    pub fn request(&self, range: RangeRequest) -> bool {
        self.commands.send(range).is_ok()
    }

    /// Stop the task, abandoning any pending or in-flight fetch
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Fetch task ended abnormally");
        }
    }
}

struct PageMessage {
    epoch: u64,
    result: Result<SearchReadsResponse, ClientError>,
}

struct InFlight {
    epoch: u64,
    range: RangeRequest,
    task: JoinHandle<()>,
    buffered: Vec<AlignmentRecord>,
}

struct FetchLoop<S> {
    source: Arc<S>,
    config: FetchConfig,
    events: mpsc::UnboundedSender<FetchEvent>,
    pages: mpsc::UnboundedSender<PageMessage>,
    engine: LayoutEngine,
    pending: Option<(RangeRequest, Instant)>,
    epoch: u64,
    in_flight: Option<InFlight>,
    last_completed: Option<RangeRequest>,
}

impl<S: ReadSource> FetchLoop<S> {
    fn new(
        source: Arc<S>,
        config: FetchConfig,
        events: mpsc::UnboundedSender<FetchEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<PageMessage>) {
        let (pages, pages_rx) = mpsc::unbounded_channel();
        let fetch_loop = Self {
            source,
            config,
            events,
            pages,
            engine: LayoutEngine::new(config.layout),
            pending: None,
            epoch: 0,
            in_flight: None,
            last_completed: None,
        };
        (fetch_loop, pages_rx)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<RangeRequest>,
        mut pages: mpsc::UnboundedReceiver<PageMessage>,
    ) {
        loop {
            let deadline = self.pending.as_ref().map(|(_, at)| *at);
            tokio::select! {
                command = commands.recv() => match command {
                    Some(range) => self.on_request(range, Instant::now()),
                    None => break,
                },
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.fire();
                }
                Some(message) = pages.recv() => self.on_page(message),
            }
        }

        if let Some(flight) = self.in_flight.take() {
            flight.task.abort();
        }
    }

    fn emit(&self, event: FetchEvent) {
        // The receiver going away just means nobody is watching anymore
        let _ = self.events.send(event);
    }

    fn on_request(&mut self, range: RangeRequest, now: Instant) {
        if self
            .last_completed
            .as_ref()
            .is_some_and(|done| done.contains(&range))
        {
            debug!(start = range.start, end = range.end, "Range already loaded");
            self.pending = None;
            // Whatever is in flight would replace the layout that covers this range
            if let Some(flight) = self.in_flight.take() {
                flight.task.abort();
                self.epoch += 1;
            }
            self.emit(FetchEvent::Skipped { range });
            return;
        }

        self.pending = Some((range, now + self.config.debounce));
    }

    fn fire(&mut self) {
        let Some((range, _)) = self.pending.take() else {
            return;
        };

        self.epoch += 1;
        let epoch = self.epoch;
        if let Some(previous) = self.in_flight.take() {
            debug!(epoch = previous.epoch, "Abandoning superseded fetch");
            previous.task.abort();
        }
        if self.config.pagination == PaginationMode::Incremental {
            self.engine.reset();
        }

        debug!(
            epoch,
            sequence = %range.sequence_name,
            start = range.start,
            end = range.end,
            "Fetching reads"
        );
        let task = tokio::spawn(fetch_pages(
            Arc::clone(&self.source),
            range.to_params(),
            epoch,
            self.pages.clone(),
        ));

        self.in_flight = Some(InFlight {
            epoch,
            range,
            task,
            buffered: Vec::new(),
        });
    }

    fn on_page(&mut self, message: PageMessage) {
        let Some(flight) = self
            .in_flight
            .as_mut()
            .filter(|flight| flight.epoch == message.epoch)
        else {
            warn!(
                epoch = message.epoch,
                latest = self.epoch,
                "Dropping response from a superseded fetch"
            );
            return;
        };

        let response = match message.result {
            Ok(response) => response,
            Err(e) => {
                warn!(epoch = message.epoch, error = %e, "Read fetch failed");
                self.in_flight = None;
                self.emit(FetchEvent::Notification(Notification::error(format!(
                    "Failed to load reads: {e}"
                ))));
                return;
            }
        };

        let complete = response
            .next_page_token
            .as_deref()
            .map_or(true, str::is_empty);
        debug!(
            epoch = message.epoch,
            reads = response.reads.len(),
            complete,
            "Received page"
        );

        let layout = match self.config.pagination {
            PaginationMode::Incremental => Some(self.engine.append_page(response.reads)),
            PaginationMode::Accumulate => {
                flight.buffered.extend(response.reads);
                complete.then(|| self.engine.replace(std::mem::take(&mut flight.buffered)))
            }
        };
        let range = flight.range.clone();

        if complete {
            self.in_flight = None;
            self.last_completed = Some(range.clone());
        }

        if let Some(layout) = layout {
            // A partial layout replaces what is shown, so the last completed
            // range no longer describes it
            if !complete {
                self.last_completed = None;
            }
            if complete {
                for issue in &layout.issues {
                    self.emit(FetchEvent::Notification(Notification::warning(issue.message())));
                }
            }
            self.emit(FetchEvent::Layout {
                epoch: message.epoch,
                range,
                layout,
                complete,
            });
        }
    }
}

async fn fetch_pages<S: ReadSource>(
    source: Arc<S>,
    mut params: SearchReadsParams,
    epoch: u64,
    pages: mpsc::UnboundedSender<PageMessage>,
) {
    loop {
        let result = source.search_reads(&params).await;
        let next = match &result {
            Ok(response) => response.next_page_token.clone().filter(|t| !t.is_empty()),
            Err(_) => None,
        };
        if pages.send(PageMessage { epoch, result }).is_err() {
            return;
        }
        match next {
            Some(token) => params.page_token = Some(token),
            None => return,
        }
    }
}
