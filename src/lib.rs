//! WebSub hub - verified subscriptions and signed fan-out delivery.
//!
//! Subscribers register a callback address for a topic; the hub proves the
//! callback is live and consenting with a challenge-response GET before
//! trusting it, then pushes every payload published on that topic to the
//! callback, signed with the subscriber's secret.
//!
//! # Architecture
//!
//! ```text
//! POST /  ──► server ──► SubscriptionHandler (Hub)
//!                          │ Verifier (challenge GET)
//!                          ▼
//!                   SubscriptionRegistry ◄── NotificationDispatcher ◄── PeriodicPublisher
//!                                              │ signer (HMAC-SHA256)
//!                                              ▼
//!                                     POST <callback>, X-Hub-Signature
//! ```
//!
//! # Modules
//!
//! - [`subscriber`] - Subscriber records and notification events
//! - [`signer`] - HMAC-SHA256 signatures
//! - [`registry`] - The shared subscriber list
//! - [`verification`] - The challenge-response handshake
//! - [`dispatcher`] - Signed fan-out delivery
//! - [`hub`] - Registration contract and in-memory backend
//! - [`server`] - HTTP endpoint
//! - [`publisher`] - Periodic test-payload publisher
//! - [`config`] - Configuration loading

pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod hub;
pub mod publisher;
pub mod registry;
pub mod request_log;
pub mod server;
pub mod signer;
pub mod subscriber;
pub mod verification;

// Re-export commonly used types
pub use config::Config;
pub use dispatcher::NotificationDispatcher;
pub use error::{DeliveryError, HubError, HubResult, VerifyError};
pub use hub::{Hub, RegistrationOutcome, SubscriptionHandler};
pub use publisher::PeriodicPublisher;
pub use registry::{SubscriberList, SubscriptionRegistry};
pub use subscriber::{NotificationEvent, SubscriberRecord};
pub use verification::{ChallengeVerifier, Verifier};
