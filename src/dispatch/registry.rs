//! In-flight tracking and sequence number assignment.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Seq, WorkKey};

#[derive(Debug, Default)]
struct Inner {
    in_flight: HashSet<WorkKey>,
    counter: u64,
}

/// Hands out dense sequence numbers and rejects keys that are already in flight.
#[derive(Debug, Default)]
pub struct WorkItemRegistry {
    inner: Mutex<Inner>,
}

impl WorkItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Both fields are updated together under the lock, so a poisoned guard
    // still holds consistent state.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit `key` and assign it the next sequence number.
    ///
    /// Fails with [`Error::DuplicateKey`] if `key` is still in flight; no
    /// number is consumed in that case.
    pub fn admit(&self, key: &WorkKey) -> Result<Seq> {
        let mut inner = self.lock();
        if inner.in_flight.contains(key) {
            return Err(Error::DuplicateKey(key.clone()));
        }
        inner.in_flight.insert(key.clone());
        inner.counter += 1;
        let seq = Seq(inner.counter);
        debug!(%key, %seq, "admitted package");
        Ok(seq)
    }

    /// Drop `key` from the in-flight set. Unknown keys are ignored.
    pub fn release(&self, key: &WorkKey) {
        self.lock().in_flight.remove(key);
    }

    /// Number of keys currently in flight.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Highest sequence number issued so far (0 before the first admission).
    pub fn issued(&self) -> u64 {
        self.lock().counter
    }
}
