//! Dispatcher: admits sorted work keys, runs the checker under a bounded
//! admission gate, and feeds results to the ordered release buffer.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, warn};

use crate::error::{Error, Result};
use crate::model::{Message, Seq, Status, WorkKey};
use crate::telemetry::check::start_check_span;

use super::registry::WorkItemRegistry;
use super::release::OrderedReleaseBuffer;

/// The work function run for every admitted key.
///
/// Implementations turn their own failures into a [`Message`] where they can.
/// An `Err` is printed as an `ERROR` status line for that key and does not
/// stop the batch.
pub trait Checker: Send + Sync + 'static {
    fn check(&self, key: &WorkKey) -> impl Future<Output = Result<Message>> + Send;
}

/// Counts reported after a batch completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Keys that received a sequence number.
    pub admitted: usize,
    /// Status lines written to the sink.
    pub printed: usize,
    /// Admitted keys that produced no output.
    pub skipped: usize,
    /// Repeated candidates, and keys rejected because they were in flight.
    pub duplicates: usize,
}

/// State shared between the dispatch loop and its workers.
struct Context<W> {
    registry: WorkItemRegistry,
    buffer: OrderedReleaseBuffer<W>,
}

/// Drives a batch of work keys through admission, checking and release.
pub struct Dispatcher<C, W> {
    ctx: Arc<Context<W>>,
    checker: Arc<C>,
    max_workers: usize,
    color: bool,
}

impl<C, W> Dispatcher<C, W>
where
    C: Checker,
    W: Write + Send + 'static,
{
    /// `max_workers` of 1 (or 0) runs every check inline, one at a time.
    pub fn new(checker: C, sink: W, max_workers: usize) -> Self {
        Self {
            ctx: Arc::new(Context {
                registry: WorkItemRegistry::new(),
                buffer: OrderedReleaseBuffer::new(sink),
            }),
            checker: Arc::new(checker),
            max_workers: max_workers.max(1),
            color: false,
        }
    }

    /// Colourize the `ERROR` lines the dispatcher writes on a worker's behalf.
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn registry(&self) -> &WorkItemRegistry {
        &self.ctx.registry
    }

    /// Check every candidate and wait for all workers to finish.
    ///
    /// Candidates are sorted and deduplicated first, so sequence numbers (and
    /// therefore the output order) follow key order.
    ///
    /// # Errors
    ///
    /// Returns the first fatal release error ([`Error::OutOfRangeSequence`]
    /// or a sink failure). Individual check failures are not errors here.
    pub async fn run<I>(&self, candidates: I) -> Result<Summary>
    where
        I: IntoIterator<Item = WorkKey>,
    {
        let mut summary = Summary::default();
        let mut candidates: Vec<WorkKey> = candidates.into_iter().collect();
        candidates.sort();
        // Several ebuilds of one package share a key; check it once.
        candidates.dedup_by(|next, prev| {
            let duplicate = next == prev;
            if duplicate {
                debug!(key = %next, "skipping duplicate package");
                summary.duplicates += 1;
            }
            duplicate
        });

        let gate = Arc::new(Semaphore::new(self.max_workers));
        let mut workers = JoinSet::new();

        for key in candidates {
            let seq = match self.ctx.registry.admit(&key) {
                Ok(seq) => seq,
                Err(Error::DuplicateKey(_)) => {
                    debug!(%key, "skipping duplicate package");
                    summary.duplicates += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            summary.admitted += 1;
            let span = start_check_span(&key, seq);

            if self.max_workers == 1 {
                let completion = Completion::new(seq, key, Arc::clone(&self.ctx), None, self.color);
                // Awaited at once; the task only bounds a panicking check.
                match tokio::spawn(self.task(completion).instrument(span)).await {
                    Ok(released) => released?,
                    Err(e) => error!(error = %e, "worker did not complete"),
                }
                continue;
            }

            let permit = Arc::clone(&gate)
                .acquire_owned()
                .await
                .map_err(|e| Error::Other(format!("admission gate closed: {e}")))?;
            let completion =
                Completion::new(seq, key, Arc::clone(&self.ctx), Some(permit), self.color);
            workers.spawn(self.task(completion).instrument(span));
        }

        let mut fatal = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "release failed");
                    fatal.get_or_insert(e);
                }
                Err(e) => error!(error = %e, "worker did not complete"),
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        summary.printed = self.ctx.buffer.released();
        summary.skipped = self.ctx.buffer.skipped();
        Ok(summary)
    }

    fn task(
        &self,
        completion: Completion<W>,
    ) -> impl Future<Output = Result<()>> + Send + use<C, W> {
        let checker = Arc::clone(&self.checker);
        let color = self.color;
        async move {
            let message = outcome(checker.as_ref(), &completion.key, color).await;
            completion.finish(message)
        }
    }
}

async fn outcome<C: Checker>(checker: &C, key: &WorkKey, color: bool) -> Message {
    match checker.check(key).await {
        Ok(message) => message,
        Err(e) => {
            warn!(%key, error = %e, "check failed");
            Message::Line(Status::Error(e.to_string()).line(key, color))
        }
    }
}

/// One admitted key's obligation to submit its slot and leave the in-flight set.
///
/// Dropping it without calling [`Completion::finish`] (a panicking worker)
/// submits an `ERROR` line instead, so later sequence numbers still release.
/// The admission permit is dropped last, after submit and release.
struct Completion<W: Write + Send> {
    seq: Seq,
    key: WorkKey,
    ctx: Arc<Context<W>>,
    _permit: Option<OwnedSemaphorePermit>,
    color: bool,
    done: bool,
}

impl<W: Write + Send> Completion<W> {
    fn new(
        seq: Seq,
        key: WorkKey,
        ctx: Arc<Context<W>>,
        permit: Option<OwnedSemaphorePermit>,
        color: bool,
    ) -> Self {
        Self {
            seq,
            key,
            ctx,
            _permit: permit,
            color,
            done: false,
        }
    }

    fn finish(mut self, message: Message) -> Result<()> {
        self.done = true;
        let submitted = self.ctx.buffer.submit(self.seq, message);
        self.ctx.registry.release(&self.key);
        submitted
    }
}

impl<W: Write + Send> Drop for Completion<W> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        warn!(key = %self.key, seq = %self.seq, "worker exited without a result");
        let line = Status::Error("worker panicked".to_string()).line(&self.key, self.color);
        if let Err(e) = self.ctx.buffer.submit(self.seq, Message::Line(line)) {
            error!(key = %self.key, error = %e, "could not release slot of failed worker");
        }
        self.ctx.registry.release(&self.key);
    }
}
