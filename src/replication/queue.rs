//! Replication Queue
//!
//! A bounded drop-oldest buffer sitting between the write path and the
//! replicator. A single worker task owns the buffer; writers reach it through
//! a non-blocking hand-off channel, and the replicator takes one item per
//! request so every item not yet handed over counts against the capacity.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::Item;
use crate::replication::ReplicationStats;

/// Default number of items held for the replicator.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

// == Drop-Oldest Buffer ==
/// FIFO with a fixed capacity that discards its oldest item on overflow.
#[derive(Debug)]
pub struct DropOldestBuffer {
    items: VecDeque<Item>,
    capacity: usize,
}

impl DropOldestBuffer {
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be non-zero");
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `item`, returning the oldest item if it had to make room.
    pub fn push(&mut self, item: Item) -> Option<Item> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn pop(&mut self) -> Option<Item> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// == Replication Sender ==
/// Write-path end of the queue. Cloned into every request handler.
#[derive(Debug, Clone)]
pub struct ReplicationSender {
    tx: mpsc::Sender<Item>,
    stats: Arc<ReplicationStats>,
}

impl ReplicationSender {
    /// Hands `item` to the queue without waiting.
    ///
    /// If the hand-off is full or closed the item is dropped and counted.
    pub fn enqueue(&self, item: Item) {
        match self.tx.try_send(item) {
            Ok(()) => self.stats.record_enqueued(),
            Err(TrySendError::Full(item)) => {
                self.stats.record_dropped_handoff();
                warn!(key = item.key(), "replication hand-off full, dropping item");
            }
            Err(TrySendError::Closed(item)) => {
                self.stats.record_dropped_handoff();
                debug!(key = item.key(), "replication queue closed, dropping item");
            }
        }
    }
}

// == Replication Feed ==
/// Replicator end of the queue.
#[derive(Debug)]
pub struct ReplicationFeed {
    demand: mpsc::Sender<oneshot::Sender<Item>>,
}

impl ReplicationFeed {
    /// Waits for the next item, oldest first.
    ///
    /// Returns `None` once the queue is closed and its buffer is empty.
    pub async fn next(&mut self) -> Option<Item> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.demand.send(reply_tx).await.ok()?;
        reply_rx.await.ok()
    }
}

// == Replication Queue ==
/// Handle to the queue worker.
///
/// The worker stops taking items once every [`ReplicationSender`] is dropped
/// or [`ReplicationQueue::close`] is called. It then forwards whatever is
/// still buffered and closes the [`ReplicationFeed`].
#[derive(Debug)]
pub struct ReplicationQueue {
    close_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ReplicationQueue {
    /// Spawns the worker.
    ///
    /// Returns the write-path sender, the feed the replicator drains and the
    /// worker handle. `handoff_capacity` bounds items accepted but not yet
    /// moved into the buffer.
    ///
    /// # Panics
    /// Panics if either capacity is zero.
    pub fn spawn(
        capacity: usize,
        handoff_capacity: usize,
        stats: Arc<ReplicationStats>,
    ) -> (ReplicationSender, ReplicationFeed, ReplicationQueue) {
        let (input_tx, input_rx) = mpsc::channel(handoff_capacity);
        let (demand_tx, demand_rx) = mpsc::channel(1);
        let (close_tx, close_rx) = oneshot::channel();

        let worker = QueueWorker {
            input: input_rx,
            demand: demand_rx,
            buffer: DropOldestBuffer::new(capacity),
            close_rx,
            stats: Arc::clone(&stats),
        };
        let handle = tokio::spawn(worker.run());

        let sender = ReplicationSender {
            tx: input_tx,
            stats,
        };
        let queue = ReplicationQueue {
            close_tx: Some(close_tx),
            handle,
        };
        (sender, ReplicationFeed { demand: demand_tx }, queue)
    }

    /// Stops intake. Items still in the hand-off are discarded.
    pub fn close(&mut self) {
        if let Some(close_tx) = self.close_tx.take() {
            let _ = close_tx.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub(crate) fn into_task(self) -> JoinHandle<()> {
        self.handle
    }
}

struct QueueWorker {
    input: mpsc::Receiver<Item>,
    demand: mpsc::Receiver<oneshot::Sender<Item>>,
    buffer: DropOldestBuffer,
    close_rx: oneshot::Receiver<()>,
    stats: Arc<ReplicationStats>,
}

impl QueueWorker {
    async fn run(self) {
        let QueueWorker {
            mut input,
            mut demand,
            mut buffer,
            mut close_rx,
            stats,
        } = self;

        debug!(capacity = buffer.capacity(), "replication queue started");

        loop {
            tokio::select! {
                // intake first so a burst is fully absorbed before forwarding
                biased;

                _ = &mut close_rx => {
                    input.close();
                    break;
                }
                received = input.recv() => match received {
                    Some(item) => {
                        if let Some(dropped) = buffer.push(item) {
                            stats.record_dropped_overflow();
                            warn!(
                                key = dropped.key(),
                                "replication queue full, dropped oldest item"
                            );
                        }
                    }
                    None => break,
                },
                request = demand.recv(), if !buffer.is_empty() => match request {
                    Some(reply) => {
                        if let Some(item) = buffer.pop() {
                            if reply.send(item).is_err() {
                                debug!("replicator request dropped, stopping queue");
                                return;
                            }
                        }
                    }
                    None => {
                        debug!("replicator gone, stopping replication queue");
                        return;
                    }
                },
            }
        }

        debug!(remaining = buffer.len(), "replication queue closed, forwarding remainder");
        while !buffer.is_empty() {
            let Some(reply) = demand.recv().await else {
                break;
            };
            if let Some(item) = buffer.pop() {
                if reply.send(item).is_err() {
                    break;
                }
            }
        }
    }
}
