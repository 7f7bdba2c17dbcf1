//! Bounded queue and background dispatcher shared by a logger tree
//!
//! A root logger owns one [`Pipeline`]; every logger derived from it holds
//! the same `Arc<Pipeline>`. The pipeline carries the level table, the rate
//! sampler, the sink list and a bounded channel drained by exactly one
//! dispatcher thread.
//!
//! Producers never block: enqueueing is a `try_send` and an entry that does
//! not fit is dropped and counted. The dispatcher writes every entry to
//! every sink in registration order; a failing or panicking sink is
//! reported to the error handler and skipped for that entry only.

use super::error::{ErrorHandler, LoggerError, Result};
use super::level_table::LevelTable;
use super::log_entry::LogEntry;
use super::metrics::LoggerMetrics;
use super::sampling::RateSampler;
use super::sink::Sink;
use chrono::Utc;
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Queue capacity used when none is configured
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Upper bound on entries written between two sink flushes
const BATCH_SIZE: usize = 50;

const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Overflow is reported on the first drop and then once per this many drops
const OVERFLOW_ALERT_INTERVAL: u64 = 1000;

/// Callback type for overflow notifications
///
/// Called when entries are dropped because the queue is full.
/// The parameter is the total count of dropped entries so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// The part of the pipeline the dispatcher thread works with
struct Dispatch {
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
    metrics: LoggerMetrics,
    /// Entries accepted into the queue but not yet written and flushed
    pending: AtomicUsize,
    on_error: ErrorHandler,
}

impl Dispatch {
    fn report(&self, err: &LoggerError) {
        (self.on_error)(err);
    }

    /// Write a batch to a snapshot of the sink list, then flush every sink.
    fn deliver(&self, batch: &mut Vec<LogEntry>) {
        let sinks: Vec<Arc<dyn Sink>> = self.sinks.read().clone();

        for entry in batch.iter() {
            let mut failed = false;
            for sink in &sinks {
                if let Err(err) = guarded(sink.as_ref(), |s| s.write(entry)) {
                    self.metrics.record_write_failure();
                    self.report(&err);
                    failed = true;
                }
            }
            if !failed {
                self.metrics.record_delivered();
            }
        }

        for sink in &sinks {
            if let Err(err) = guarded(sink.as_ref(), |s| s.flush()) {
                self.report(&err);
            }
        }

        let done = batch.len();
        batch.clear();
        self.pending.fetch_sub(done, Ordering::AcqRel);
    }
}

/// Run one sink call, converting a panic into a [`LoggerError::SinkPanic`]
fn guarded<F>(sink: &dyn Sink, op: F) -> Result<()>
where
    F: FnOnce(&dyn Sink) -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| op(sink))) {
        Ok(result) => result,
        Err(payload) => Err(LoggerError::sink_panic(sink.name(), panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn run_dispatcher(dispatch: Arc<Dispatch>, entries: Receiver<LogEntry>, shutdown: Receiver<()>) {
    let mut batch = Vec::with_capacity(BATCH_SIZE);

    loop {
        let running = select! {
            recv(entries) -> msg => match msg {
                Ok(entry) => {
                    batch.push(entry);
                    batch.extend(entries.try_iter().take(BATCH_SIZE - 1));
                    dispatch.deliver(&mut batch);
                    true
                }
                Err(_) => false,
            },
            recv(shutdown) -> _ => false,
        };
        if !running {
            break;
        }
    }

    // every accepted entry is already queued; deliver the rest
    loop {
        batch.extend(entries.try_iter().take(BATCH_SIZE));
        if batch.is_empty() {
            break;
        }
        dispatch.deliver(&mut batch);
    }
}

/// Shared state of one logger tree
pub(crate) struct Pipeline {
    dispatch: Arc<Dispatch>,
    levels: LevelTable,
    sampler: RateSampler,
    instance_id: String,
    sender: Sender<LogEntry>,
    capacity: usize,
    closed: AtomicBool,
    /// Producers between their closed check and the end of their send
    in_flight: AtomicUsize,
    /// Dropping this sender wakes the dispatcher for shutdown
    shutdown: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    on_overflow: Option<OverflowCallback>,
}

impl Pipeline {
    /// Allocate the queue and start the dispatcher thread.
    ///
    /// A capacity of zero is raised to one.
    pub(crate) fn new(
        capacity: usize,
        levels: LevelTable,
        on_error: ErrorHandler,
        on_overflow: Option<OverflowCallback>,
    ) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let dispatch = Arc::new(Dispatch {
            sinks: RwLock::new(Vec::new()),
            metrics: LoggerMetrics::new(),
            pending: AtomicUsize::new(0),
            on_error,
        });

        let worker_dispatch = Arc::clone(&dispatch);
        let worker = thread::Builder::new()
            .name("vlog-dispatcher".to_string())
            .spawn(move || run_dispatcher(worker_dispatch, receiver, shutdown_rx));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                // Without a dispatcher entries queue up until full and are then dropped.
                dispatch.report(&LoggerError::io_operation(
                    "starting dispatcher",
                    "log entries will not be delivered",
                    e,
                ));
                None
            }
        };

        Self {
            dispatch,
            levels,
            sampler: RateSampler::new(),
            instance_id: generate_instance_id(),
            sender,
            capacity,
            closed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            shutdown: Mutex::new(Some(shutdown_tx)),
            worker: Mutex::new(worker),
            on_overflow,
        }
    }

    pub(crate) fn levels(&self) -> &LevelTable {
        &self.levels
    }

    pub(crate) fn sampler(&self) -> &RateSampler {
        &self.sampler
    }

    pub(crate) fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub(crate) fn metrics(&self) -> &LoggerMetrics {
        &self.dispatch.metrics
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries currently waiting in the queue
    pub(crate) fn queue_len(&self) -> usize {
        self.sender.len()
    }

    pub(crate) fn sink_count(&self) -> usize {
        self.dispatch.sinks.read().len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Register a sink; a sink added after close is closed immediately.
    pub(crate) fn add_sink(&self, sink: Arc<dyn Sink>) {
        let mut sinks = self.dispatch.sinks.write();
        if self.is_closed() {
            drop(sinks);
            if let Err(err) = guarded(sink.as_ref(), |s| s.close()) {
                self.dispatch.report(&err);
            }
            return;
        }
        sinks.push(sink);
    }

    /// Non-blocking enqueue; returns whether the entry was accepted.
    pub(crate) fn enqueue(&self, entry: LogEntry) -> bool {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let accepted = self.try_enqueue(entry);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        accepted
    }

    fn try_enqueue(&self, entry: LogEntry) -> bool {
        let metrics = &self.dispatch.metrics;
        // pairs with the in_flight wait in close(): a send that passes this
        // check completes before the dispatcher is told to stop
        if self.closed.load(Ordering::SeqCst) {
            metrics.record_dropped();
            return false;
        }

        self.dispatch.pending.fetch_add(1, Ordering::AcqRel);
        match self.sender.try_send(entry) {
            Ok(()) => {
                metrics.record_enqueued();
                true
            }
            Err(TrySendError::Full(_)) => {
                self.dispatch.pending.fetch_sub(1, Ordering::AcqRel);
                self.handle_overflow();
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                // dispatcher is gone
                self.dispatch.pending.fetch_sub(1, Ordering::AcqRel);
                metrics.record_dropped();
                false
            }
        }
    }

    fn handle_overflow(&self) {
        let metrics = &self.dispatch.metrics;
        metrics.record_queue_full();
        let dropped = metrics.record_dropped() + 1;

        if dropped == 1 || dropped % OVERFLOW_ALERT_INTERVAL == 0 {
            self.dispatch
                .report(&LoggerError::queue_full(self.capacity, dropped));
            if let Some(ref callback) = self.on_overflow {
                callback(dropped);
            }
        }
    }

    fn worker_alive(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Block until every accepted entry has been written and flushed.
    ///
    /// Entries enqueued concurrently by other producers extend the wait.
    pub(crate) fn flush(&self) {
        while self.dispatch.pending.load(Ordering::Acquire) > 0 {
            if self.is_closed() || !self.worker_alive() {
                return;
            }
            thread::sleep(FLUSH_POLL_INTERVAL);
        }
    }

    /// Refuse new entries, drain the queue, stop the dispatcher and close
    /// every sink once. Returns the first close error; all are reported.
    pub(crate) fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        while self.in_flight.load(Ordering::SeqCst) > 0 {
            thread::yield_now();
        }
        drop(self.shutdown.lock().take());

        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            if handle.join().is_err() {
                self.dispatch.report(&LoggerError::other(
                    "dispatcher thread panicked during shutdown",
                ));
            }
        }

        let sinks = std::mem::take(&mut *self.dispatch.sinks.write());
        let mut first_error = None;
        for sink in sinks {
            if let Err(err) = guarded(sink.as_ref(), |s| s.close()) {
                self.dispatch.report(&err);
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        // errors were already reported to the handler
        let _ = self.close();
    }
}

fn generate_instance_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}-{}", std::process::id(), nanos)
}
