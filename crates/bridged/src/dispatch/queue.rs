//! Deferred request queue.
//!
//! One mutex guards both the pending list and the drain-scheduled flag so an
//! enqueue can never be lost between a drain capturing the list and clearing
//! the flag.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::errors::QueueError;
use super::request::PendingRequest;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<PendingRequest>,
    drain_scheduled: bool,
}

/// FIFO buffer of requests that arrived while the engine was busy.
#[derive(Debug)]
pub struct DeferredQueue {
    state: Mutex<QueueState>,
    limit: Option<usize>,
}

impl DeferredQueue {
    /// Creates a queue holding at most `limit` requests, or unbounded when
    /// `limit` is `None`.
    #[must_use]
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            limit,
        }
    }

    /// Appends `request` and schedules a drain. Returns the new depth.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`], carrying the rejected request, when the
    /// queue is at its limit.
    pub fn enqueue(&self, request: PendingRequest) -> Result<usize, QueueError> {
        let mut state = self.lock();
        if let Some(limit) = self.limit
            && state.pending.len() >= limit
        {
            return Err(QueueError::Full {
                limit,
                request: Box::new(request),
            });
        }
        state.pending.push_back(request);
        state.drain_scheduled = true;
        Ok(state.pending.len())
    }

    /// Removes and returns every pending request in arrival order, clearing
    /// the drain-scheduled flag in the same critical section.
    pub fn take_all(&self) -> Vec<PendingRequest> {
        let mut state = self.lock();
        state.drain_scheduled = false;
        state.pending.drain(..).collect()
    }

    /// Returns true when requests are waiting for a drain.
    #[must_use]
    pub fn is_drain_scheduled(&self) -> bool {
        self.lock().drain_scheduled
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Returns true when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Configured capacity.
    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock is still safe to reuse.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
