//! Registration contract and the in-memory hub backend.
//!
//! [`SubscriptionHandler`] is what the HTTP layer talks to: hand it an
//! untrusted candidate, get back whether it was registered. [`Hub`] is the
//! in-memory implementation: verify, then append to the registry. Other
//! backends (persistent, clustered) plug in behind the same trait without
//! touching the handshake or the signer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::registry::SubscriptionRegistry;
use crate::subscriber::SubscriberRecord;
use crate::verification::{ChallengeVerifier, Verifier};

/// Result of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Verified and stored.
    Registered,
    /// Verification failed; nothing stored.
    Rejected,
}

impl RegistrationOutcome {
    /// Returns `true` for [`RegistrationOutcome::Registered`].
    pub fn is_registered(self) -> bool {
        self == Self::Registered
    }
}

/// Handles an inbound registration request.
#[async_trait]
pub trait SubscriptionHandler: Send + Sync {
    /// Verifies `candidate` and, on success, makes it active.
    async fn register(&self, candidate: SubscriberRecord) -> RegistrationOutcome;
}

/// In-memory hub: verification in front of a shared registry.
#[derive(Debug)]
pub struct Hub<V = ChallengeVerifier> {
    registry: Arc<SubscriptionRegistry>,
    verifier: V,
}

impl<V: Verifier> Hub<V> {
    /// Creates a hub appending verified subscribers to `registry`.
    pub fn new(registry: Arc<SubscriptionRegistry>, verifier: V) -> Self {
        Self { registry, verifier }
    }

    /// The registry this hub writes to.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }
}

#[async_trait]
impl<V: Verifier> SubscriptionHandler for Hub<V> {
    async fn register(&self, candidate: SubscriberRecord) -> RegistrationOutcome {
        log::info!(
            "Get subscriber - CallbackURL: {}, Topic: {}",
            candidate.callback_address,
            candidate.topic
        );

        if !self.verifier.verify(&candidate).await {
            return RegistrationOutcome::Rejected;
        }

        self.registry.add(candidate);
        RegistrationOutcome::Registered
    }
}
