//! HTTP surface of the hub.
//!
//! A single endpoint: `POST /` with a form body carrying `hub.callback`,
//! `hub.topic` and `hub.secret`. The handler parses a candidate, hands it
//! to the [`SubscriptionHandler`] and maps the outcome to a plain-text
//! response. Any other method on `/` gets `405`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::constants::MAX_REGISTRATION_BODY;
use crate::error::{HubError, HubResult};
use crate::hub::{RegistrationOutcome, SubscriptionHandler};
use crate::request_log::RequestLog;
use crate::subscriber::{redacted_form, SubscriberRecord};

/// Shared state for the registration handler.
#[derive(Clone)]
pub struct AppState {
    handler: Arc<dyn SubscriptionHandler>,
    request_log: Option<RequestLog>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("request_log", &self.request_log)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates state around a registration backend.
    pub fn new(handler: Arc<dyn SubscriptionHandler>) -> Self {
        Self {
            handler,
            request_log: None,
        }
    }

    /// Also dump every registration request to `log`.
    pub fn with_request_log(mut self, log: RequestLog) -> Self {
        self.request_log = Some(log);
        self
    }
}

/// Builds the hub router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_registration).fallback(method_not_allowed))
        .with_state(state)
}

/// Binds the listener. Failing here is fatal for the process.
///
/// # Errors
///
/// Returns [`HubError::Bind`] if the address is unavailable.
pub async fn bind(addr: SocketAddr) -> HubResult<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| HubError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Serves `router` until `shutdown` is cancelled, then drains in-flight
/// requests.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> HubResult<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("Hub listening on http://{}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    log::info!("HTTP server stopped");
    Ok(())
}

/// POST / -- register a subscriber
async fn handle_registration(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, MAX_REGISTRATION_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Error reading request body: {}", e);
            return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
        }
    };

    if let Some(request_log) = &state.request_log {
        request_log.record(&parts, &body).await;
    }

    log::info!("Registration body: {}", redacted_form(&body));
    let candidate = SubscriberRecord::from_form(&body);
    log::debug!("Registration candidate: {:?}", candidate);

    match state.handler.register(candidate).await {
        RegistrationOutcome::Registered => {
            (StatusCode::OK, "Subscriber registered").into_response()
        }
        RegistrationOutcome::Rejected => {
            (StatusCode::BAD_REQUEST, "Subscriber not registered").into_response()
        }
    }
}

/// Anything but POST on /
async fn method_not_allowed(method: Method) -> impl IntoResponse {
    log::warn!("Method not allowed: {}", method);
    (StatusCode::METHOD_NOT_ALLOWED, "Only POST supported")
}
