//! Hub-wide constants.
//!
//! Protocol parameter names, header names and default timings live here so
//! the handshake, the dispatcher and the config layer agree on them.
//!
//! # Categories
//!
//! - **Protocol**: WebSub form fields and query parameters
//! - **Headers**: outbound notification headers
//! - **Timeouts**: verification and delivery bounds
//! - **Publishing**: default topic and interval for the periodic publisher

use std::time::Duration;

// ============================================================================
// Protocol
// ============================================================================

/// Form field carrying the subscriber's callback address.
pub const PARAM_CALLBACK: &str = "hub.callback";

/// Form field / query parameter carrying the topic.
pub const PARAM_TOPIC: &str = "hub.topic";

/// Form field carrying the per-subscriber signing secret.
pub const PARAM_SECRET: &str = "hub.secret";

/// Query parameter carrying the verification mode.
pub const PARAM_MODE: &str = "hub.mode";

/// Query parameter carrying the verification challenge.
pub const PARAM_CHALLENGE: &str = "hub.challenge";

/// The only verification mode this hub issues.
pub const MODE_SUBSCRIBE: &str = "subscribe";

/// Number of random bytes in a verification challenge (hex-encoded to 32 chars).
pub const CHALLENGE_BYTES: usize = 16;

/// Characters of a mismatched verification body kept for logging.
pub const MISMATCH_PREVIEW_CHARS: usize = 64;

/// Largest registration body the hub will read.
pub const MAX_REGISTRATION_BODY: usize = 64 * 1024;

// ============================================================================
// Headers
// ============================================================================

/// Header carrying the HMAC signature of a notification body.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

/// Algorithm prefix of the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Content type of pushed notifications.
pub const NOTIFICATION_CONTENT_TYPE: &str = "application/json";

// ============================================================================
// Timeouts
// ============================================================================

/// Upper bound on a verification GET, including reading the body.
pub const VERIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a single notification POST.
///
/// Keeps one unresponsive subscriber from stretching a whole fan-out round.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Publishing
// ============================================================================

/// Topic the periodic publisher pushes to.
pub const DEFAULT_TOPIC: &str = "/a/topic";

/// Interval between periodic publish rounds.
pub const PUBLISH_INTERVAL: Duration = Duration::from_secs(10);

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default listen address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_values_are_reasonable() {
        assert!(VERIFICATION_TIMEOUT >= Duration::from_secs(1));
        assert!(VERIFICATION_TIMEOUT <= Duration::from_secs(60));
        assert!(DELIVERY_TIMEOUT >= VERIFICATION_TIMEOUT);
    }

    #[test]
    fn test_challenge_has_at_least_128_bits() {
        assert!(CHALLENGE_BYTES >= 16);
    }

    #[test]
    fn test_signature_prefix_names_digest() {
        assert!(SIGNATURE_PREFIX.starts_with("sha256"));
        assert!(SIGNATURE_PREFIX.ends_with('='));
    }
}
