pub mod registry;

use crate::error::DequeueError;
use bytes::Bytes;
use log::{debug, trace, warn};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

type WaiterId = u64;

/// A blocked dequeue call waiting for exactly one payload.
struct Waiter {
    id: WaiterId,
    slot: oneshot::Sender<Bytes>,
}

#[derive(Default)]
struct QueueState {
    /// Buffered payloads, oldest first.
    messages: VecDeque<Bytes>,
    /// Blocked consumers, oldest first. Never non-empty together with `messages` once the lock
    /// is released.
    waiters: VecDeque<Waiter>,
    next_waiter_id: WaiterId,
    /// Set by purge, a closed queue is not reachable from the registry any more.
    closed: bool,
}

impl QueueState {
    /// Give the payload to the oldest waiter which is still listening. Returns the payload if
    /// there was nobody to take it.
    fn hand_off(&mut self, mut payload: Bytes) -> Option<Bytes> {
        while let Some(waiter) = self.waiters.pop_front() {
            match waiter.slot.send(payload) {
                Ok(()) => {
                    trace!("Handed off message to waiter {}", waiter.id);

                    return None;
                }
                Err(returned) => payload = returned,
            }
        }

        Some(payload)
    }
}

/// The payload is given back because the queue has been purged in the meantime.
#[derive(Debug)]
pub struct QueueClosed(pub Bytes);

/// Result of the non-blocking part of a dequeue.
pub(crate) enum Take<'a> {
    Message(Bytes),
    Wait(PendingDequeue<'a>),
    Closed,
}

/// Named FIFO of byte payloads where consumers can wait for the next message.
pub struct Queue {
    name: String,
    state: Mutex<QueueState>,
}

impl Queue {
    pub fn new(name: &str) -> Self {
        Queue {
            name: name.to_string(),
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a payload, or hand it to the oldest blocked consumer directly. Returns the number
    /// of buffered messages after the operation.
    pub fn enqueue(&self, payload: Bytes) -> Result<usize, QueueClosed> {
        let mut state = self.lock();

        if state.closed {
            return Err(QueueClosed(payload));
        }

        if let Some(payload) = state.hand_off(payload) {
            trace!("Queue {} buffers {} bytes", self.name, payload.len());

            state.messages.push_back(payload);
        }

        Ok(state.messages.len())
    }

    /// Take the oldest message, waiting for one if the queue is empty. The wait ends when a
    /// producer hands over a payload, when `cancel` fires or when the queue is purged.
    ///
    /// If the cancellation races with a producer which already handed over its payload, the
    /// payload wins and is returned. Dropping the returned future is also a cancellation, in that
    /// case an already handed over payload is put back to the head of the queue.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Result<Bytes, DequeueError> {
        match self.take_or_wait() {
            Take::Message(payload) => Ok(payload),
            Take::Wait(pending) => pending.wait(cancel).await,
            Take::Closed => Err(DequeueError::Purged),
        }
    }

    /// Number of buffered messages. Blocked consumers are not counted.
    pub fn length(&self) -> usize {
        self.lock().messages.len()
    }

    /// Number of consumers blocked in dequeue.
    pub fn waiters(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Pop the head message or register a waiter, in one critical section.
    pub(crate) fn take_or_wait(&self) -> Take<'_> {
        let mut state = self.lock();

        if state.closed {
            return Take::Closed;
        }

        if let Some(payload) = state.messages.pop_front() {
            return Take::Message(payload);
        }

        let (tx, rx) = oneshot::channel();
        let id = state.next_waiter_id;

        state.next_waiter_id = state.next_waiter_id.wrapping_add(1);
        state.waiters.push_back(Waiter { id, slot: tx });

        trace!("Queue {} is empty, waiter {} registered", self.name, id);

        Take::Wait(PendingDequeue {
            queue: self,
            id,
            slot: rx,
            finished: false,
        })
    }

    /// Remove the waiter if it is still registered. It is a no-op if a producer has already
    /// taken it out.
    fn disconnect(&self, id: WaiterId) {
        let mut state = self.lock();

        if let Some(pos) = state.waiters.iter().position(|w| w.id == id) {
            state.waiters.remove(pos);

            trace!("Waiter {} disconnected from queue {}", id, self.name);
        }
    }

    /// Put back a payload which was handed to a consumer who gave up before reading it.
    fn requeue_front(&self, payload: Bytes) {
        let mut state = self.lock();

        if state.closed {
            warn!("Queue {} is purged, dropping returned message of {} bytes", self.name, payload.len());

            return;
        }

        if let Some(payload) = state.hand_off(payload) {
            state.messages.push_front(payload);
        }
    }

    /// Close the queue, discard the buffered messages and release the blocked consumers. Returns
    /// the number of discarded messages.
    pub fn close(&self) -> usize {
        let mut state = self.lock();

        state.closed = true;

        let discarded = state.messages.len();
        let waiters = state.waiters.len();

        state.messages.clear();
        // dropping the senders wakes up the receivers with an error
        state.waiters.clear();

        debug!(
            "Queue {} closed, {} messages discarded, {} waiters released",
            self.name, discarded, waiters
        );

        discarded
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A dequeue which registered a waiter and has not finished yet.
pub(crate) struct PendingDequeue<'a> {
    queue: &'a Queue,
    id: WaiterId,
    slot: oneshot::Receiver<Bytes>,
    finished: bool,
}

impl PendingDequeue<'_> {
    pub(crate) async fn wait(mut self, cancel: &CancellationToken) -> Result<Bytes, DequeueError> {
        tokio::select! {
            biased;

            delivered = &mut self.slot => {
                self.finished = true;

                // the sender is dropped without a value only when the queue is closed
                delivered.map_err(|_| DequeueError::Purged)
            }
            _ = cancel.cancelled() => {
                match self.withdraw() {
                    Some(payload) => {
                        debug!("Dequeue on {} was cancelled but message already arrived", self.queue.name);

                        Ok(payload)
                    }
                    None => Err(DequeueError::Cancelled),
                }
            }
        }
    }

    /// Unregister the waiter and return the payload if a producer handed it over before.
    ///
    /// After the waiter left the queue under the lock, no producer can reach the slot, so
    /// whatever is in there now is final.
    fn withdraw(&mut self) -> Option<Bytes> {
        self.finished = true;
        self.queue.disconnect(self.id);
        self.slot.close();

        self.slot.try_recv().ok()
    }
}

impl Drop for PendingDequeue<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        if let Some(payload) = self.withdraw() {
            debug!("Dequeue on {} dropped, returning message to the queue", self.queue.name);

            self.queue.requeue_front(payload);
        }
    }
}
