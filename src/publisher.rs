//! Periodic publisher.
//!
//! Pushes a generated test payload to the default topic on a fixed
//! interval. The first round fires one full interval after start. The
//! loop stops when its [`CancellationToken`] is cancelled; a round that is
//! already running finishes first (each delivery is bounded by the
//! dispatcher's timeout).

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::dispatcher::NotificationDispatcher;

/// Default JSON test payload, keys sorted.
///
/// Falls back to `{}` if serialization fails.
pub fn test_payload() -> Vec<u8> {
    let payload = serde_json::json!({
        "event": "test_event",
        "message": "Hello, subscriber!",
        "status": "success",
    });

    serde_json::to_vec(&payload).unwrap_or_else(|e| {
        log::error!("Failed to generate test payload: {}", e);
        b"{}".to_vec()
    })
}

/// Repeating notification task for one topic.
#[derive(Debug)]
pub struct PeriodicPublisher {
    dispatcher: NotificationDispatcher,
    topic: String,
    interval: Duration,
}

impl PeriodicPublisher {
    /// Creates a publisher pushing to `topic` every `interval`.
    pub fn new(
        dispatcher: NotificationDispatcher,
        topic: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            dispatcher,
            topic: topic.into(),
            interval,
        }
    }

    /// Runs until `shutdown` is cancelled.
    ///
    /// A zero interval disables publishing and returns immediately.
    pub async fn run(self, shutdown: CancellationToken) {
        if self.interval.is_zero() {
            log::info!("Periodic publisher disabled");
            return;
        }

        log::info!(
            "Publishing test payloads to {} every {:?}",
            self.topic,
            self.interval
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.dispatcher.notify(test_payload(), &self.topic).await;
                }
            }
        }

        log::info!("Periodic publisher shutting down");
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SubscriptionRegistry;
    use crate::signer;
    use crate::subscriber::SubscriberRecord;
    use std::sync::Arc;
    use wiremock::matchers::{body_bytes, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_payload_is_sorted_json() {
        assert_eq!(
            String::from_utf8(test_payload()).unwrap(),
            r#"{"event":"test_event","message":"Hello, subscriber!","status":"success"}"#
        );
    }

    #[tokio::test]
    async fn test_publishes_to_default_topic_until_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_bytes(test_payload()))
            .and(header(
                "x-hub-signature",
                signer::signature_header("k", &test_payload()).as_str(),
            ))
            .respond_with(ResponseTemplate::new(204))
            .expect(1..)
            .mount(&server)
            .await;

        let registry = Arc::new(SubscriptionRegistry::new());
        registry.add(SubscriberRecord::new(format!("{}/cb", server.uri()), "/a/topic", "k"));
        let dispatcher =
            NotificationDispatcher::new(Arc::clone(&registry), Duration::from_secs(2)).unwrap();

        let shutdown = CancellationToken::new();
        let handle = PeriodicPublisher::new(dispatcher, "/a/topic", Duration::from_millis(50))
            .spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_before_first_round() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let registry = Arc::new(SubscriptionRegistry::new());
        registry.add(SubscriberRecord::new(format!("{}/cb", server.uri()), "/a/topic", ""));
        let dispatcher =
            NotificationDispatcher::new(Arc::clone(&registry), Duration::from_secs(2)).unwrap();

        let shutdown = CancellationToken::new();
        let handle = PeriodicPublisher::new(dispatcher, "/a/topic", Duration::from_secs(3600))
            .spawn(shutdown.clone());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_interval_returns_immediately() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = NotificationDispatcher::new(registry, Duration::from_secs(1)).unwrap();
        PeriodicPublisher::new(dispatcher, "/a/topic", Duration::ZERO)
            .run(CancellationToken::new())
            .await;
    }
}
