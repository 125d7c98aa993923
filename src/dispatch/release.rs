//! Ordered release of worker messages.
//!
//! Workers finish in any order. Each message is tagged with the sequence
//! number its key received at admission, and the buffer writes messages to
//! the sink strictly in sequence order, holding early arrivals back until
//! every predecessor has been released.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Message, Seq};

#[derive(Debug)]
struct State<W> {
    sink: W,
    next_to_release: u64,
    pending: HashMap<u64, Message>,
    released: usize,
    skipped: usize,
}

impl<W: Write> State<W> {
    /// Write one message and advance. Skips advance without output.
    fn release(&mut self, message: Message) -> Result<()> {
        self.next_to_release += 1;
        match message {
            Message::Line(text) => {
                writeln!(self.sink, "{text}")?;
                self.sink.flush()?;
                self.released += 1;
                debug!(seq = self.next_to_release, status = "checked", "releasing package");
            }
            Message::Skip => {
                self.skipped += 1;
                debug!(seq = self.next_to_release, status = "skipped", "releasing package");
            }
        }
        Ok(())
    }
}

/// Releases messages to `W` in sequence order, whatever order they arrive in.
#[derive(Debug)]
pub struct OrderedReleaseBuffer<W> {
    state: Mutex<State<W>>,
}

impl<W: Write + Send> OrderedReleaseBuffer<W> {
    pub fn new(sink: W) -> Self {
        Self {
            state: Mutex::new(State {
                sink,
                next_to_release: 0,
                pending: HashMap::new(),
                released: 0,
                skipped: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Submit the message for `seq`.
    ///
    /// If `seq` is the next one due, it is released along with every
    /// contiguous successor already buffered. Otherwise it is held back.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRangeSequence`] if `seq` was already released, already
    /// buffered, or is 0. [`Error::Io`] if the sink fails.
    pub fn submit(&self, seq: Seq, message: Message) -> Result<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let next = state.next_to_release;

        if seq.0 <= next || state.pending.contains_key(&seq.0) {
            return Err(Error::OutOfRangeSequence { seq, next });
        }

        if seq.0 != next + 1 {
            debug!(%seq, next, "freezing package");
            state.pending.insert(seq.0, message);
            return Ok(());
        }

        state.release(message)?;
        loop {
            let due = state.next_to_release + 1;
            let Some(message) = state.pending.remove(&due) else {
                return Ok(());
            };
            state.release(message)?;
        }
    }

    /// Sequence number of the last released message (0 before any release).
    pub fn next_to_release(&self) -> u64 {
        self.lock().next_to_release
    }

    /// Number of messages held back waiting for a predecessor.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of lines written to the sink.
    pub fn released(&self) -> usize {
        self.lock().released
    }

    /// Number of skip markers consumed.
    pub fn skipped(&self) -> usize {
        self.lock().skipped
    }

    /// Consume the buffer and return the sink.
    pub fn into_inner(self) -> W {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .sink
    }
}
