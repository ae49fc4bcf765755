//! Broadcast queue for one-to-many event distribution.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

/// Every subscriber receives every message. Backed by tokio's broadcast
/// channel, so slow subscribers observe `Lagged` rather than blocking senders.
#[derive(Clone)]
pub struct BroadcastQueue<T> {
    sender: Arc<broadcast::Sender<T>>,
}

impl<T: Clone> BroadcastQueue<T> {
    /// create a new broadcast queue
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, _) = broadcast::channel(cap.max(1));

        Arc::new(Self {
            sender: Arc::new(tx),
        })
    }

    /// Sends to current subscribers and returns how many received it.
    /// Having no subscriber is not an error.
    pub fn send(
        &self,
        msg: T,
    ) -> usize {
        match self.sender.send(msg) {
            Ok(n) => n,
            Err(_) => {
                trace!("broadcast without subscribers");
                0
            }
        }
    }

    /// subscribe to the queue
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }
}
