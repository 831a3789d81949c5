use crate::error::DequeueError;
use crate::queue::{Queue, QueueClosed, Take};
use bytes::Bytes;
use dashmap::DashMap;
use log::{debug, trace};
use serde_derive::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Name and buffered length of a queue, as the admin API shows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueueInfo {
    pub name: String,
    pub length: usize,
}

/// Directory of the queues by name. Queues are created on the first reference and removed by
/// purge.
#[derive(Default)]
pub struct QueueRegistry {
    queues: DashMap<String, Arc<Queue>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the queue by name or create it if it doesn't exist yet. Concurrent callers with the
    /// same new name end up with the same queue instance.
    pub fn get_or_create(&self, name: &str) -> Arc<Queue> {
        if let Some(queue) = self.lookup(name) {
            return queue;
        }

        // entry() locks the shard and checks again, so only one of the racing callers inserts
        self.queues
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating queue {}", name);

                Arc::new(Queue::new(name))
            })
            .value()
            .clone()
    }

    /// Get the queue without creating it.
    pub fn lookup(&self, name: &str) -> Option<Arc<Queue>> {
        self.queues.get(name).map(|q| q.value().clone())
    }

    /// Enqueue to the named queue, returns the buffered length after the enqueue.
    pub fn enqueue(&self, name: &str, mut payload: Bytes) -> usize {
        loop {
            match self.get_or_create(name).enqueue(payload) {
                Ok(len) => return len,
                Err(QueueClosed(returned)) => {
                    trace!("Queue {} was purged during enqueue, retrying", name);

                    payload = returned;
                }
            }
        }
    }

    /// Dequeue from the named queue, waiting for a message if it is empty.
    pub async fn dequeue(&self, name: &str, cancel: &CancellationToken) -> Result<Bytes, DequeueError> {
        loop {
            let queue = self.get_or_create(name);

            match queue.take_or_wait() {
                Take::Message(payload) => return Ok(payload),
                Take::Wait(pending) => return pending.wait(cancel).await,
                Take::Closed => trace!("Queue {} was purged during dequeue, retrying", name),
            };
        }
    }

    /// Buffered length of the named queue, 0 if the queue doesn't exist.
    pub fn length(&self, name: &str) -> usize {
        match self.lookup(name) {
            Some(queue) => queue.length(),
            None => 0,
        }
    }

    /// Remove the named queue and discard its messages. Consumers blocked on it are released with
    /// [`DequeueError::Purged`]. Returns the number of discarded messages.
    pub fn purge(&self, name: &str) -> usize {
        match self.queues.remove(name) {
            Some((_, queue)) => queue.close(),
            None => 0,
        }
    }

    /// Purge all the queues. Returns the number of removed queues and discarded messages.
    pub fn flush(&self) -> (usize, usize) {
        let names: Vec<String> = self.queues.iter().map(|e| e.key().clone()).collect();
        let mut queues = 0;
        let mut messages = 0;

        for name in names {
            if let Some((_, queue)) = self.queues.remove(&name) {
                queues += 1;
                messages += queue.close();
            }
        }

        debug!("Flush removed {} queues with {} messages", queues, messages);

        (queues, messages)
    }

    /// Name and length of all the queues, sorted by name.
    pub fn snapshot(&self) -> Vec<QueueInfo> {
        let queues: Vec<Arc<Queue>> = self.queues.iter().map(|e| e.value().clone()).collect();

        let mut infos: Vec<QueueInfo> = queues
            .iter()
            .map(|q| QueueInfo {
                name: q.name().to_string(),
                length: q.length(),
            })
            .collect();

        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Number of existing queues.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
