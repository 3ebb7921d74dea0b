//! Change feed over PostgreSQL LISTEN/NOTIFY.
//!
//! Triggers installed by `sql/001_change_notifications.sql` publish one
//! notification per inserted, updated or deleted row on any of the source
//! tables. The feed does not patch data from those payloads; it only uses
//! them to decide that "something changed" and hands the owner a coalesced
//! batch so it can refetch everything.
//!
//! # Lifecycle
//! `ChangeFeed::open` acquires the connection and starts the listener thread;
//! `ChangeFeed::close` (or dropping the feed) stops the thread and releases
//! the connection. Nothing is global.
//!
//! # Clock injection
//! `Coalescer` takes `now: Instant` on every call so throttling is
//! deterministic in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use postgres::fallible_iterator::FallibleIterator;
use postgres::{Client, NoTls};
use serde::Deserialize;

use crate::config::RealtimeConfig;
use crate::logging::{self, Source};
use crate::model::BackendError;

/// Longest the listener blocks before re-checking the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// Payload missing or not understood.
    Other,
}

/// One row-level change. `table` is `None` when the payload could not be read;
/// such events still invalidate the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Option<String>,
    pub kind: ChangeKind,
}

#[derive(Deserialize)]
struct Payload {
    table: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Reads a trigger payload such as `{"table":"company_secondary","type":"UPDATE"}`.
pub fn parse_notification(payload: &str) -> ChangeEvent {
    match serde_json::from_str::<Payload>(payload) {
        Ok(p) => ChangeEvent {
            table: p.table,
            kind: match p.kind.as_deref().map(str::to_ascii_uppercase).as_deref() {
                Some("INSERT") => ChangeKind::Insert,
                Some("UPDATE") => ChangeKind::Update,
                Some("DELETE") => ChangeKind::Delete,
                _ => ChangeKind::Other,
            },
        },
        Err(_) => ChangeEvent {
            table: None,
            kind: ChangeKind::Other,
        },
    }
}

/// Whether an event concerns one of `tables`. Events without a table name
/// are always relevant.
pub fn is_relevant(event: &ChangeEvent, tables: &[String]) -> bool {
    match &event.table {
        Some(table) => tables.iter().any(|t| t == table),
        None => true,
    }
}

// ---------------------------------------------------------------------------
// Coalescing
// ---------------------------------------------------------------------------

/// Merges bursts of events into batches spaced at least `min_interval` apart.
/// Events are never dropped, only delayed into the next batch.
#[derive(Debug)]
pub struct Coalescer {
    min_interval: Duration,
    last_delivery: Option<Instant>,
    pending: Vec<ChangeEvent>,
}

impl Coalescer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_delivery: None,
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, event: ChangeEvent) {
        self.pending.push(event);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// How long until a batch may be delivered; `None` when nothing is pending.
    pub fn wait_time(&self, now: Instant) -> Option<Duration> {
        if self.pending.is_empty() {
            return None;
        }
        Some(match self.last_delivery {
            Some(last) => self.min_interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        })
    }

    /// Takes the pending batch if the interval since the last delivery has
    /// elapsed.
    pub fn take_ready(&mut self, now: Instant) -> Option<Vec<ChangeEvent>> {
        if self.wait_time(now)? > Duration::ZERO {
            return None;
        }
        self.last_delivery = Some(now);
        Some(std::mem::take(&mut self.pending))
    }
}

// ---------------------------------------------------------------------------
// Change feed
// ---------------------------------------------------------------------------

/// An open subscription. Close it explicitly or drop it.
pub struct ChangeFeed {
    channel: String,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ChangeFeed {
    /// Connects, issues `LISTEN`, and starts delivering coalesced batches of
    /// changes on `tables` to `on_change` from a background thread.
    ///
    /// Connection failures are returned here; a connection lost later ends
    /// the listener thread with an error log.
    pub fn open<F>(config: &RealtimeConfig, tables: &[&str], on_change: F) -> Result<Self, BackendError>
    where
        F: FnMut(Vec<ChangeEvent>) + Send + 'static,
    {
        validate_channel(&config.channel)?;
        let mut client = Client::connect(config.database_url()?, NoTls)?;
        client.batch_execute(&format!("LISTEN {}", config.channel))?;

        logging::info(
            Source::Realtime,
            None,
            &format!("listening on '{}' for {} tables", config.channel, tables.len()),
        );

        let stop = Arc::new(AtomicBool::new(false));
        let listener = Listener {
            client,
            tables: tables.iter().map(|t| t.to_string()).collect(),
            coalescer: Coalescer::new(config.min_interval()),
            stop: Arc::clone(&stop),
        };
        let handle = std::thread::Builder::new()
            .name("change-feed".to_string())
            .spawn(move || listener.run(on_change))
            .map_err(|e| BackendError::Realtime(format!("cannot spawn listener: {}", e)))?;

        Ok(Self {
            channel: config.channel.clone(),
            stop,
            handle: Some(handle),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether the listener thread is still running.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops listening and releases the connection.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                logging::error(Source::Realtime, None, "listener thread panicked");
            }
            logging::info(Source::Realtime, None, &format!("unsubscribed from '{}'", self.channel));
        }
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Channel names are interpolated into `LISTEN` unquoted.
pub fn validate_channel(channel: &str) -> Result<(), BackendError> {
    let valid = !channel.is_empty()
        && channel.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !channel.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(BackendError::Config(format!(
            "invalid notification channel '{}': use lower snake case",
            channel
        )))
    }
}

struct Listener {
    client: Client,
    tables: Vec<String>,
    coalescer: Coalescer,
    stop: Arc<AtomicBool>,
}

impl Listener {
    fn run<F>(mut self, mut on_change: F)
    where
        F: FnMut(Vec<ChangeEvent>),
    {
        while !self.stop.load(Ordering::Relaxed) {
            let wait = self
                .coalescer
                .wait_time(Instant::now())
                .map_or(POLL_INTERVAL, |w| w.min(POLL_INTERVAL))
                .max(Duration::from_millis(1));

            match self.receive(wait) {
                Ok(payloads) => {
                    for payload in payloads {
                        let event = parse_notification(&payload);
                        if is_relevant(&event, &self.tables) {
                            self.coalescer.push(event);
                        } else {
                            logging::debug(
                                Source::Realtime,
                                event.table.as_deref(),
                                "ignoring change on unsubscribed table",
                            );
                        }
                    }
                }
                Err(e) => {
                    let err = BackendError::from(e);
                    logging::log_backend_failure(Source::Realtime, None, "listen", &err);
                    break;
                }
            }

            if let Some(batch) = self.coalescer.take_ready(Instant::now()) {
                logging::debug(
                    Source::Realtime,
                    None,
                    &format!("delivering batch of {} changes", batch.len()),
                );
                on_change(batch);
            }
        }
    }

    /// Blocks up to `wait` for one notification, then drains whatever else is
    /// already queued.
    fn receive(&mut self, wait: Duration) -> Result<Vec<String>, postgres::Error> {
        let mut notifications = self.client.notifications();
        let mut payloads = Vec::new();

        let first = notifications.timeout_iter(wait).next()?;
        if let Some(notification) = first {
            payloads.push(notification.payload().to_string());
            let mut queued = notifications.iter();
            while let Some(notification) = queued.next()? {
                payloads.push(notification.payload().to_string());
            }
        }
        Ok(payloads)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
