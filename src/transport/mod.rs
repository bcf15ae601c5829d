pub mod local;

use crate::error::TransportError;
use crate::protocol::Frame;
use async_trait::async_trait;
use log::warn;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Publish/subscribe fan-out the sessions talk through.
///
/// Delivery is at-most-once. A single publisher's frames arrive in the order
/// they were published; frames from different publishers may interleave in
/// any order. Nothing published before a subscription exists is replayed.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: Value,
    ) -> Result<(), TransportError>;

    fn subscribe(&self, channel: &str) -> Result<Subscription, TransportError>;

    fn unsubscribe(&self, channel: &str);
}

/// Inbound queue of frames for one subscriber.
pub struct Subscription {
    channel: String,
    rx: broadcast::Receiver<Frame>,
}

impl Subscription {
    pub fn new(channel: String, rx: broadcast::Receiver<Frame>) -> Self {
        Self { channel, rx }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Waits for the next frame. Fails with `ChannelClosed` once the relay
    /// has dropped the channel.
    pub async fn recv(&mut self) -> Result<Frame, TransportError> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Ok(frame),
                Err(RecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(RecvError::Closed) => {
                    return Err(TransportError::ChannelClosed(self.channel.clone()));
                }
            }
        }
    }

    /// Next frame if one is already queued.
    pub fn try_recv(&mut self) -> Option<Frame> {
        loop {
            match self.rx.try_recv() {
                Ok(frame) => return Some(frame),
                Err(TryRecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    fn lagged(&self, skipped: u64) {
        warn!(
            "Subscriber on '{}' fell behind, {} frame(s) dropped",
            self.channel, skipped
        );
    }
}
