//! Blocking producer/consumer queue fed by a stream worker.
//!
//! Consumers may start iterating before the stream completes. A consumer
//! waiting on an empty queue is woken by the next `push` or by `finish`, so
//! iteration ends only when the queue is both drained and finished.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use ecfeed_protocol::{MethodHeader, MethodInfo};
use tracing::warn;

use crate::feedback::FeedbackLedger;

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    finished: bool,
    header: Option<MethodHeader>,
    failure: Option<String>,
}

#[derive(Debug)]
pub struct StreamQueue<T> {
    state: Mutex<QueueState<T>>,
    changed: Condvar,
    ledger: Option<Arc<FeedbackLedger>>,
}

impl<T> Default for StreamQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StreamQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                finished: false,
                header: None,
                failure: None,
            }),
            changed: Condvar::new(),
            ledger: None,
        }
    }

    /// A queue whose `finish` also completes the session's feedback ledger.
    pub fn with_ledger(ledger: Arc<FeedbackLedger>) -> Self {
        Self {
            ledger: Some(ledger),
            ..Self::new()
        }
    }

    pub fn ledger(&self) -> Option<&Arc<FeedbackLedger>> {
        self.ledger.as_ref()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_while<F>(&self, condition: F) -> MutexGuard<'_, QueueState<T>>
    where
        F: FnMut(&mut QueueState<T>) -> bool,
    {
        self.changed
            .wait_while(self.lock(), condition)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item and wake waiting consumers. Ignored after `finish`.
    pub fn push(&self, item: T) {
        let mut state = self.lock();
        if state.finished {
            warn!("Item pushed after the stream finished; dropping it");
            return;
        }
        state.items.push_back(item);
        drop(state);
        self.changed.notify_all();
    }

    /// Remove the earliest item without waiting.
    pub fn pop_front(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Wait for the next item and remove it; `None` once drained and finished.
    pub fn next_blocking(&self) -> Option<T> {
        self.wait_while(|s| s.items.is_empty() && !s.finished)
            .items
            .pop_front()
    }

    /// Mark the stream complete and release every waiter. Idempotent.
    ///
    /// The ledger is marked finished before consumers are released.
    pub fn finish(&self) {
        if self.is_finished() {
            return;
        }
        if let Some(ledger) = &self.ledger {
            ledger.mark_finished();
        }
        self.lock().finished = true;
        self.changed.notify_all();
    }

    /// True iff nothing is pending and the stream has finished.
    ///
    /// Returns `false` at once when items are pending; on an empty, unfinished
    /// queue it waits for the next push or finish.
    pub fn is_done(&self) -> bool {
        let state = self.wait_while(|s| s.items.is_empty() && !s.finished);
        state.items.is_empty() && state.finished
    }

    /// Wait for the stream to finish and take everything it produced.
    pub fn drain_blocking(&self) -> Vec<T> {
        self.wait_while(|s| !s.finished).items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Store the method header. The first header wins; later ones are ignored.
    pub fn set_method_metadata(&self, header: MethodHeader) -> bool {
        let mut state = self.lock();
        if state.header.is_some() {
            return false;
        }
        if let Some(ledger) = &self.ledger {
            ledger.set_header(header.clone());
        }
        state.header = Some(header);
        drop(state);
        self.changed.notify_all();
        true
    }

    /// Whether the method header has arrived.
    pub fn is_ready(&self) -> bool {
        self.lock().header.is_some()
    }

    /// Parameter metadata if already known.
    pub fn method_metadata(&self) -> Option<MethodInfo> {
        self.lock().header.as_ref().map(|h| h.method.clone())
    }

    /// Wait for the method header and return its parameter metadata.
    ///
    /// `None` if the stream finished without announcing a method.
    pub fn await_method_metadata(&self) -> Option<MethodInfo> {
        self.wait_while(|s| s.header.is_none() && !s.finished)
            .header
            .as_ref()
            .map(|h| h.method.clone())
    }

    pub fn session_id(&self) -> Option<String> {
        self.lock()
            .header
            .as_ref()
            .and_then(|h| h.test_session_id.clone())
    }

    pub fn timestamp(&self) -> Option<String> {
        self.lock().header.as_ref().and_then(|h| h.timestamp.clone())
    }

    /// Record the fatal error that cut the stream short. The first one is kept.
    pub fn set_failure(&self, message: impl Into<String>) {
        self.lock().failure.get_or_insert_with(|| message.into());
    }

    /// The fatal stream error, if the stream was aborted.
    pub fn failure(&self) -> Option<String> {
        self.lock().failure.clone()
    }

    /// Blocking iterator that consumes items as they arrive.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { queue: self }
    }
}

impl<T: Clone> StreamQueue<T> {
    /// Wait for an item and return a copy of it without removing it.
    ///
    /// `None` once the queue is drained and finished.
    pub fn front(&self) -> Option<T> {
        self.wait_while(|s| s.items.is_empty() && !s.finished)
            .items
            .front()
            .cloned()
    }
}

pub struct Iter<'a, T> {
    queue: &'a StreamQueue<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.next_blocking()
    }
}

impl<'a, T> IntoIterator for &'a StreamQueue<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
