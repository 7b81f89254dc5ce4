//! Signed fan-out delivery.
//!
//! [`NotificationDispatcher::notify`] pushes one payload to every
//! subscriber bound to a topic. Each delivery is independent: a dead
//! callback or an error status is logged and the rest of the round goes
//! ahead. Deliveries are at-most-once; nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::join_all;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};

use crate::constants::{NOTIFICATION_CONTENT_TYPE, SIGNATURE_HEADER};
use crate::error::{DeliveryError, HubResult};
use crate::registry::SubscriptionRegistry;
use crate::signer;
use crate::subscriber::{NotificationEvent, SubscriberRecord};

/// Pushes signed notifications to the subscribers of a topic.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    client: Client,
    registry: Arc<SubscriptionRegistry>,
    timeout: Duration,
}

impl NotificationDispatcher {
    /// Creates a dispatcher reading from `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(registry: Arc<SubscriptionRegistry>, timeout: Duration) -> HubResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            registry,
            timeout,
        })
    }

    /// Delivers `payload` to every subscriber of `topic`.
    ///
    /// Outcomes are only observable through the log.
    pub async fn notify(&self, payload: impl Into<Bytes>, topic: &str) {
        let payload: Bytes = payload.into();
        let subscribers = self.registry.matching_topic(topic);

        if subscribers.is_empty() {
            log::debug!("No subscribers for topic {}", topic);
            return;
        }

        let round = uuid::Uuid::new_v4();
        log::debug!(
            "[{}] Notifying {} subscriber(s) of topic {}",
            round,
            subscribers.len(),
            topic
        );

        let outcomes = join_all(
            subscribers
                .iter()
                .map(|record| self.deliver_and_log(record, payload.clone())),
        )
        .await;

        let delivered = outcomes.iter().filter(|ok| **ok).count();
        log::info!(
            "[{}] Topic {}: delivered {}/{}",
            round,
            topic,
            delivered,
            outcomes.len()
        );
    }

    /// Delivers a [`NotificationEvent`].
    pub async fn publish(&self, event: &NotificationEvent) {
        self.notify(event.payload.clone(), &event.topic).await;
    }

    async fn deliver_and_log(&self, record: &SubscriberRecord, payload: Bytes) -> bool {
        match self.deliver(record, payload).await {
            Ok(_) => {
                log::info!("Notification sent to {}", record.callback_address);
                true
            }
            Err(DeliveryError::UnexpectedStatus(status)) => {
                log::warn!(
                    "Subscriber {} responded with status {}",
                    record.callback_address,
                    status.as_u16()
                );
                false
            }
            Err(e) => {
                log::warn!(
                    "Error sending notification to {}: {}",
                    record.callback_address,
                    e
                );
                false
            }
        }
    }

    /// One signed POST. Only 200 and 204 count as delivered.
    async fn deliver(
        &self,
        record: &SubscriberRecord,
        payload: Bytes,
    ) -> Result<StatusCode, DeliveryError> {
        let signature = signer::signature_header(&record.secret, &payload);

        let response = self
            .client
            .post(&record.callback_address)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, NOTIFICATION_CONTENT_TYPE)
            .header(SIGNATURE_HEADER, signature)
            .body(payload)
            .send()
            .await
            .map_err(DeliveryError::Transport)?;

        match response.status() {
            status @ (StatusCode::OK | StatusCode::NO_CONTENT) => Ok(status),
            status => Err(DeliveryError::UnexpectedStatus(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher(registry: &Arc<SubscriptionRegistry>) -> NotificationDispatcher {
        NotificationDispatcher::new(Arc::clone(registry), Duration::from_secs(2)).unwrap()
    }

    fn dead_callback() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/cb")
    }

    #[tokio::test]
    async fn test_signed_post_carries_raw_body() {
        let server = MockServer::start().await;
        let payload = br#"{"x":1}"#;
        Mock::given(method("POST"))
            .and(path("/cb"))
            .and(header("content-type", "application/json"))
            .and(header(
                "x-hub-signature",
                signer::signature_header("s1", payload).as_str(),
            ))
            .and(body_bytes(payload.to_vec()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let registry = Arc::new(SubscriptionRegistry::new());
        registry.add(SubscriberRecord::new(format!("{}/cb", server.uri()), "news", "s1"));

        dispatcher(&registry).notify(&payload[..], "news").await;
    }

    #[tokio::test]
    async fn test_other_topics_get_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let registry = Arc::new(SubscriptionRegistry::new());
        registry.add(SubscriberRecord::new(format!("{}/cb", server.uri()), "news", "s1"));

        dispatcher(&registry).notify(&b"{}"[..], "sports").await;
    }

    #[tokio::test]
    async fn test_unreachable_subscriber_does_not_block_others() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/s2"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let registry = Arc::new(SubscriptionRegistry::new());
        registry.add(SubscriberRecord::new(dead_callback(), "news", "s1"));
        registry.add(SubscriberRecord::new(format!("{}/s2", server.uri()), "news", "s2"));

        dispatcher(&registry).notify(&b"{}"[..], "news").await;
    }

    #[tokio::test]
    async fn test_error_status_does_not_block_others() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/s1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/s2"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let registry = Arc::new(SubscriptionRegistry::new());
        registry.add(SubscriberRecord::new(format!("{}/s1", server.uri()), "news", "a"));
        registry.add(SubscriberRecord::new(format!("{}/s2", server.uri()), "news", "b"));

        dispatcher(&registry).notify(&b"{}"[..], "news").await;
    }

    #[tokio::test]
    async fn test_failed_delivery_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let registry = Arc::new(SubscriptionRegistry::new());
        registry.add(SubscriberRecord::new(format!("{}/cb", server.uri()), "news", ""));

        dispatcher(&registry).notify(&b"{}"[..], "news").await;
    }

    #[tokio::test]
    async fn test_deliver_status_classification() {
        let server = MockServer::start().await;
        Mock::given(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(path("/empty"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(path("/created"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = dispatcher(&registry);
        let record = |p: &str| SubscriberRecord::new(format!("{}{}", server.uri(), p), "t", "");

        assert_eq!(
            dispatcher.deliver(&record("/ok"), Bytes::new()).await.unwrap(),
            StatusCode::OK
        );
        assert_eq!(
            dispatcher.deliver(&record("/empty"), Bytes::new()).await.unwrap(),
            StatusCode::NO_CONTENT
        );
        assert!(matches!(
            dispatcher.deliver(&record("/created"), Bytes::new()).await,
            Err(DeliveryError::UnexpectedStatus(StatusCode::CREATED))
        ));
    }

    #[tokio::test]
    async fn test_slow_subscriber_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher =
            NotificationDispatcher::new(Arc::clone(&registry), Duration::from_millis(200)).unwrap();
        let record = SubscriberRecord::new(format!("{}/cb", server.uri()), "t", "");

        assert!(matches!(
            dispatcher.deliver(&record, Bytes::new()).await,
            Err(DeliveryError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_routes_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_bytes(b"hello".to_vec()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let registry = Arc::new(SubscriptionRegistry::new());
        registry.add(SubscriberRecord::new(format!("{}/cb", server.uri()), "news", "k"));

        dispatcher(&registry)
            .publish(&NotificationEvent::new(&b"hello"[..], "news"))
            .await;
    }
}
