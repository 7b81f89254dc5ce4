//! Error types for the hub.
//!
//! Verification and delivery failures are contained inside their
//! components: they are logged and turned into a boolean or a skipped
//! subscriber, never propagated to the HTTP caller or the publisher.
//! [`HubError`] covers the few conditions that can stop the process.

use std::path::PathBuf;

use thiserror::Error;

/// Why a verification handshake did not succeed.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The callback address could not be parsed as an absolute URL.
    #[error("invalid callback URL '{url}': {source}")]
    InvalidCallback {
        /// Callback address as supplied by the subscriber.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },

    /// DNS, connect, TLS or timeout failure talking to the callback.
    #[error("failed to contact subscriber: {0}")]
    Transport(#[source] reqwest::Error),

    /// The callback answered with something other than 200 OK.
    #[error("subscriber responded with status {0}")]
    UnexpectedStatus(reqwest::StatusCode),

    /// The response body could not be read to completion.
    #[error("error reading subscriber response: {0}")]
    BodyRead(#[source] reqwest::Error),

    /// The body was not exactly the challenge that was sent.
    #[error("challenge mismatch: expected {expected}, got {received:?}")]
    ChallengeMismatch {
        /// Challenge sent in `hub.challenge`.
        expected: String,
        /// Body returned by the callback, lossily decoded.
        received: String,
    },
}

/// Why a single notification delivery failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The request could not be sent or timed out.
    #[error("error sending notification: {0}")]
    Transport(#[source] reqwest::Error),

    /// The subscriber answered with neither 200 nor 204.
    #[error("subscriber responded with status {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}

/// Process-level failures: configuration, listener and client setup.
#[derive(Debug, Error)]
pub enum HubError {
    /// Config file exists but could not be read or parsed.
    #[error("failed to load config from {path}: {message}")]
    Config {
        /// Config file path.
        path: PathBuf,
        /// Underlying cause.
        message: String,
    },

    /// A config value is syntactically valid JSON but unusable.
    #[error("invalid {key}: {value:?}")]
    InvalidSetting {
        /// Setting name.
        key: &'static str,
        /// Offending value.
        value: String,
    },

    /// The HTTP listener could not bind.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address the listener tried to bind.
        addr: String,
        /// Socket error.
        #[source]
        source: std::io::Error,
    },

    /// The outbound HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    /// Other I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for hub setup operations.
pub type HubResult<T> = Result<T, HubError>;
