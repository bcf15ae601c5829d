use crate::protocol::Event;
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use log::{debug, error};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};

/// Something the participant should be told about right away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// How a failed publish is surfaced. It is never rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    Log,
    Alert(&'static str),
}

enum Outbound {
    Publish(Event, OnFailure),
    Flush(oneshot::Sender<()>),
}

/// Outbound side of a session.
///
/// Events are queued and published by one sender task, strictly in the
/// order they were queued. Nobody waits on a publish for correctness.
pub struct Outbox {
    label: String,
    queue: mpsc::UnboundedSender<Outbound>,
    queued: Arc<AtomicUsize>,
}

impl Outbox {
    /// Starts the sender task; must be called inside a tokio runtime.
    pub fn new(
        transport: Arc<dyn Transport>,
        channel: String,
        label: String,
        alerts: mpsc::UnboundedSender<Alert>,
    ) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        let queued = Arc::new(AtomicUsize::new(0));

        tokio::spawn(run_sender(
            transport,
            channel,
            label.clone(),
            alerts,
            rx,
            Arc::clone(&queued),
        ));

        Self {
            label,
            queue,
            queued,
        }
    }

    pub fn send(&mut self, event: Event, on_failure: OnFailure) {
        let name = event.name();
        self.queued.fetch_add(1, Ordering::SeqCst);
        if self.queue.send(Outbound::Publish(event, on_failure)).is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            error!("[{}] sender task is gone, '{}' not published", self.label, name);
        }
    }

    /// Waits until everything queued so far has been published or has
    /// failed. Only drivers and tests that want a quiet point use this;
    /// state never depends on it.
    pub async fn settle(&mut self) {
        let pending = self.in_flight();
        if pending > 0 {
            debug!("[{}] settling {} queued publish(es)", self.label, pending);
        }

        let (done_tx, done_rx) = oneshot::channel();
        if self.queue.send(Outbound::Flush(done_tx)).is_err() || done_rx.await.is_err() {
            error!("[{}] sender task stopped before the queue drained", self.label);
        }
    }

    /// Publishes queued but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }
}

async fn run_sender(
    transport: Arc<dyn Transport>,
    channel: String,
    label: String,
    alerts: mpsc::UnboundedSender<Alert>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    queued: Arc<AtomicUsize>,
) {
    while let Some(outbound) = rx.recv().await {
        let (event, on_failure) = match outbound {
            Outbound::Publish(event, on_failure) => (event, on_failure),
            Outbound::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let name = event.name();
        let result = match event.payload() {
            Ok(payload) => transport.publish(&channel, name, payload).await,
            Err(e) => Err(e.into()),
        };
        queued.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(()) => debug!("[{}] published '{}'", label, name),
            Err(e) => {
                error!("[{}] failed to publish '{}': {}", label, name, e);
                if let OnFailure::Alert(message) = on_failure {
                    let _ = alerts.send(Alert {
                        message: message.to_string(),
                        raised_at: Utc::now(),
                    });
                }
            }
        }
    }
    debug!("[{}] sender task finished", label);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::NextQuestion;
    use crate::transport::local::LocalRelay;

    fn outbox(relay: &Arc<LocalRelay>) -> (Outbox, mpsc::UnboundedReceiver<Alert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport: Arc<dyn Transport> = relay.clone();
        let outbox = Outbox::new(
            transport,
            "voting-channel".to_string(),
            "test".to_string(),
            tx,
        );
        (outbox, rx)
    }

    #[tokio::test]
    async fn delivered_publish_raises_no_alert() {
        let relay = Arc::new(LocalRelay::new());
        let mut sub = relay.subscribe("voting-channel").unwrap();
        let (mut outbox, mut alerts) = outbox(&relay);

        outbox.send(Event::SessionStart, OnFailure::Alert("nope"));
        outbox.settle().await;

        assert_eq!(sub.try_recv().unwrap().event, "session-start");
        assert!(alerts.try_recv().is_err());
        assert_eq!(outbox.in_flight(), 0);
    }

    #[tokio::test]
    async fn failed_publish_alerts_only_when_asked() {
        let relay = Arc::new(LocalRelay::new());
        relay.set_offline(true);
        let (mut outbox, mut alerts) = outbox(&relay);

        outbox.send(Event::SessionEnd, OnFailure::Log);
        outbox.send(Event::SessionStart, OnFailure::Alert("Failed to save your vote."));
        outbox.settle().await;

        let alert = alerts.try_recv().unwrap();
        assert_eq!(alert.message, "Failed to save your vote.");
        assert!(alerts.try_recv().is_err());
        assert_eq!(relay.publish_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn publishes_leave_in_queue_order() {
        let relay = Arc::new(LocalRelay::new());
        let mut sub = relay.subscribe("voting-channel").unwrap();
        let (mut outbox, _alerts) = outbox(&relay);

        for index in 0..200 {
            outbox.send(Event::NextQuestion(NextQuestion { index }), OnFailure::Log);
        }
        outbox.settle().await;
        assert_eq!(outbox.in_flight(), 0);

        for expected in 0..200usize {
            let frame = sub.try_recv().unwrap();
            assert_eq!(frame.payload["index"], expected);
        }
        assert!(sub.try_recv().is_none());
    }
}
