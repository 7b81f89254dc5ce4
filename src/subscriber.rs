//! Subscriber and notification data model.
//!
//! A [`SubscriberRecord`] starts life as an untrusted candidate parsed from
//! a registration body. It only becomes active once the verification
//! handshake succeeds and the hub appends it to the registry; records are
//! never mutated afterwards.

use bytes::Bytes;

use crate::constants::{PARAM_CALLBACK, PARAM_SECRET, PARAM_TOPIC};

/// One subscription: where to deliver, what topic, and how to sign.
#[derive(Clone, PartialEq, Eq)]
pub struct SubscriberRecord {
    /// URI the hub calls for verification and delivery.
    pub callback_address: String,
    /// Topic this subscriber is bound to.
    pub topic: String,
    /// HMAC key for outgoing notifications. May be empty.
    pub secret: String,
}

impl SubscriberRecord {
    /// Creates a record from its three fields.
    pub fn new(
        callback_address: impl Into<String>,
        topic: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            callback_address: callback_address.into(),
            topic: topic.into(),
            secret: secret.into(),
        }
    }

    /// Parses a candidate from an `application/x-www-form-urlencoded` body.
    ///
    /// Never fails: missing fields become empty strings, and when a field is
    /// repeated the first value wins. An empty callback surfaces later as a
    /// verification failure.
    pub fn from_form(body: &[u8]) -> Self {
        let mut callback_address = None;
        let mut topic = None;
        let mut secret = None;

        for (key, value) in url::form_urlencoded::parse(body) {
            let slot = match &*key {
                PARAM_CALLBACK => &mut callback_address,
                PARAM_TOPIC => &mut topic,
                PARAM_SECRET => &mut secret,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        Self {
            callback_address: callback_address.unwrap_or_default(),
            topic: topic.unwrap_or_default(),
            secret: secret.unwrap_or_default(),
        }
    }
}

/// Re-encodes a registration body for logging with `hub.secret` masked.
pub fn redacted_form(body: &[u8]) -> String {
    let mut out = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in url::form_urlencoded::parse(body) {
        if key == PARAM_SECRET {
            out.append_pair(&key, "<redacted>");
        } else {
            out.append_pair(&key, &value);
        }
    }
    out.finish()
}

// Secrets stay out of logs.
impl std::fmt::Debug for SubscriberRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secret = if self.secret.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("SubscriberRecord")
            .field("callback_address", &self.callback_address)
            .field("topic", &self.topic)
            .field("secret", &secret)
            .finish()
    }
}

/// A single publish occurrence: opaque payload routed by exact topic match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    /// Content pushed verbatim as the POST body.
    pub payload: Bytes,
    /// Routing key.
    pub topic: String,
}

impl NotificationEvent {
    /// Creates an event for `topic` carrying `payload`.
    pub fn new(payload: impl Into<Bytes>, topic: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            topic: topic.into(),
        }
    }
}
