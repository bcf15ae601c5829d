use crate::error::TransportError;
use crate::protocol::Frame;
use crate::transport::{Subscription, Transport};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// In-process relay: every frame published on a channel goes to every
/// current subscriber of that channel, the publisher included.
pub struct LocalRelay {
    channels: Mutex<HashMap<String, broadcast::Sender<Frame>>>,
    offline: AtomicBool,
    published: AtomicUsize,
}

impl LocalRelay {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            published: AtomicUsize::new(0),
        }
    }

    /// While offline every publish fails with `TransportError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Publish attempts so far, failed ones included.
    pub fn publish_count(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.lock()
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, broadcast::Sender<Frame>>> {
        // A panic while holding the map cannot leave it half-updated.
        self.channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LocalRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LocalRelay {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: Value,
    ) -> Result<(), TransportError> {
        self.published.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("relay is offline".to_string()));
        }

        let frame = Frame {
            event: event.to_string(),
            payload,
        };
        match self.lock().get(channel) {
            Some(tx) => {
                // No receivers is not an error: the frame is simply lost.
                let delivered = tx.send(frame).unwrap_or(0);
                debug!("'{}' on '{}' delivered to {} subscriber(s)", event, channel, delivered);
            }
            None => debug!("'{}' on '{}' had no subscribers", event, channel),
        }
        Ok(())
    }

    fn subscribe(&self, channel: &str) -> Result<Subscription, TransportError> {
        let mut channels = self.lock();
        let tx = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        Ok(Subscription::new(channel.to_string(), tx.subscribe()))
    }

    fn unsubscribe(&self, channel: &str) {
        let mut channels = self.lock();
        if channels.get(channel).is_some_and(|tx| tx.receiver_count() == 0) {
            channels.remove(channel);
            debug!("Channel '{}' has no subscribers left, dropped", channel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn frames_fan_out_in_publish_order() {
        let relay = LocalRelay::new();
        let mut a = relay.subscribe("voting-channel").unwrap();
        let mut b = relay.subscribe("voting-channel").unwrap();

        relay.publish("voting-channel", "next-question", json!({"index": 1})).await.unwrap();
        relay.publish("voting-channel", "next-question", json!({"index": 2})).await.unwrap();

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await.unwrap().payload, json!({"index": 1}));
            assert_eq!(sub.recv().await.unwrap().payload, json!({"index": 2}));
            assert!(sub.try_recv().is_none());
        }
    }

    #[tokio::test]
    async fn late_subscribers_get_no_history() {
        let relay = LocalRelay::new();
        let _early = relay.subscribe("voting-channel").unwrap();
        relay.publish("voting-channel", "session-start", json!({})).await.unwrap();

        let mut late = relay.subscribe("voting-channel").unwrap();
        assert!(late.try_recv().is_none());
    }

    #[tokio::test]
    async fn offline_relay_fails_publishes_and_counts_them() {
        let relay = LocalRelay::new();
        let mut sub = relay.subscribe("voting-channel").unwrap();
        relay.set_offline(true);

        let result = relay.publish("voting-channel", "session-end", json!({})).await;
        assert!(matches!(result, Err(TransportError::Unavailable(_))));
        assert_eq!(relay.publish_count(), 1);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn channels_are_isolated_and_dropped_when_empty() {
        let relay = LocalRelay::new();
        let mut other = relay.subscribe("other").unwrap();
        let sub = relay.subscribe("voting-channel").unwrap();

        relay.publish("voting-channel", "session-start", json!({})).await.unwrap();
        assert!(other.try_recv().is_none());

        drop(sub);
        relay.unsubscribe("voting-channel");
        assert_eq!(relay.subscriber_count("voting-channel"), 0);
        assert_eq!(relay.subscriber_count("other"), 1);
    }

    #[tokio::test]
    async fn subscription_reports_a_closed_channel() {
        let relay = LocalRelay::new();
        let mut sub = relay.subscribe("voting-channel").unwrap();
        drop(relay);

        match sub.recv().await {
            Err(TransportError::ChannelClosed(channel)) => assert_eq!(channel, "voting-channel"),
            other => panic!("expected a closed channel, got {:?}", other),
        }
    }
}
