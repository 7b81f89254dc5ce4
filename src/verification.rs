//! Challenge-response verification of subscriber callbacks.
//!
//! Before a candidate is trusted for delivery the hub proves that whoever
//! sits behind the callback address wants the subscription: it sends a
//! fresh random challenge in a GET and expects it echoed back verbatim
//! with `200 OK`.
//!
//! ```text
//! hub                                   callback
//!  │ GET <callback>?hub.mode=subscribe      │
//!  │     &hub.topic=<topic>                 │
//!  │     &hub.challenge=<32 hex chars> ────►│
//!  │◄──────────────── 200 OK, body = challenge
//! ```
//!
//! Every failure (bad URL, transport error, timeout, non-200, body
//! mismatch) collapses to "not verified"; [`ChallengeVerifier::handshake`]
//! keeps the reason for logging.

use std::time::Duration;

use async_trait::async_trait;
use data_encoding::HEXLOWER;
use rand::RngCore;
use reqwest::{Client, Response, StatusCode};
use url::Url;

use crate::constants::{
    CHALLENGE_BYTES, MISMATCH_PREVIEW_CHARS, MODE_SUBSCRIBE, PARAM_CHALLENGE, PARAM_MODE,
    PARAM_TOPIC,
};
use crate::error::{HubResult, VerifyError};
use crate::subscriber::SubscriberRecord;

/// Decides whether a candidate controls and consents to its callback.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Returns `true` only if the candidate passed verification.
    async fn verify(&self, candidate: &SubscriberRecord) -> bool;
}

/// Generates a fresh challenge: 16 random bytes as lowercase hex.
pub fn generate_challenge() -> String {
    let mut bytes = [0u8; CHALLENGE_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    HEXLOWER.encode(&bytes)
}

/// Builds the verification URI for `callback`.
///
/// Query parameters already on the callback are kept; `hub.mode`,
/// `hub.topic` and `hub.challenge` replace any existing values of the same
/// name.
pub fn verification_url(
    callback: &str,
    topic: &str,
    challenge: &str,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(callback)?;

    let preserved: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !matches!(&**key, PARAM_MODE | PARAM_TOPIC | PARAM_CHALLENGE))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(preserved)
        .append_pair(PARAM_MODE, MODE_SUBSCRIBE)
        .append_pair(PARAM_TOPIC, topic)
        .append_pair(PARAM_CHALLENGE, challenge);

    Ok(url)
}

/// Reads at most `limit` bytes of the body, then stops.
async fn read_capped(mut response: Response, limit: usize) -> Result<Vec<u8>, VerifyError> {
    let mut body = Vec::with_capacity(limit);
    while let Some(chunk) = response.chunk().await.map_err(VerifyError::BodyRead)? {
        let room = limit - body.len();
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() >= limit {
            break;
        }
    }
    Ok(body)
}

/// Lossy, length-bounded rendering of a callback body for logs.
fn preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() <= MISMATCH_PREVIEW_CHARS {
        return text.into_owned();
    }
    let mut out: String = text.chars().take(MISMATCH_PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}

/// Verifier that performs the GET handshake over HTTP.
#[derive(Debug, Clone)]
pub struct ChallengeVerifier {
    client: Client,
    timeout: Duration,
}

impl ChallengeVerifier {
    /// Creates a verifier with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> HubResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    /// Runs the handshake and reports why it failed, if it did.
    pub async fn handshake(&self, candidate: &SubscriberRecord) -> Result<(), VerifyError> {
        let challenge = generate_challenge();

        let url = verification_url(&candidate.callback_address, &candidate.topic, &challenge)
            .map_err(|source| VerifyError::InvalidCallback {
                url: candidate.callback_address.clone(),
                source,
            })?;

        log::debug!("Verifying subscriber via {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(VerifyError::Transport)?;

        let status = response.status();
        // One byte past the challenge is enough to prove a mismatch.
        let body = read_capped(response, challenge.len() + 1).await?;

        if status != StatusCode::OK {
            return Err(VerifyError::UnexpectedStatus(status));
        }

        if body != challenge.as_bytes() {
            return Err(VerifyError::ChallengeMismatch {
                expected: challenge,
                received: preview(&body),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Verifier for ChallengeVerifier {
    async fn verify(&self, candidate: &SubscriberRecord) -> bool {
        match self.handshake(candidate).await {
            Ok(()) => {
                log::info!(
                    "Successfully validated subscriber at {}",
                    candidate.callback_address
                );
                true
            }
            Err(e) => {
                log::warn!(
                    "Subscriber validation failed for {}: {}",
                    candidate.callback_address,
                    e
                );
                false
            }
        }
    }
}
