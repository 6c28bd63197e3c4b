use axum::extract::{Request, State};
use axum::http::header::HOST;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;
use crate::security::CSRF_HEADER;
use crate::server::response::ApiError;
use crate::server::AppState;

/// Require the session token on every state-changing request.
///
/// Runs before body extraction, so a forged request is refused without its
/// payload ever being parsed. GET/HEAD/OPTIONS never mutate and pass through.
pub async fn require_session_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.method().is_safe() {
        return next.run(request).await;
    }

    let presented = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok());

    match state.guard.verify(presented) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            tracing::warn!(
                method = %request.method(),
                path = request.uri().path(),
                "rejected state-changing request without a valid session token"
            );
            ApiError(err).into_response()
        }
    }
}

/// Refuse requests addressed to a non-loopback host name.
///
/// A page that rebinds its own domain to 127.0.0.1 becomes same-origin with
/// this server and could read the session token; its requests still carry
/// the attacker's host name.
pub async fn require_loopback_host(request: Request, next: Next) -> Response {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok());

    match host {
        Some(host) if !is_loopback_host(host) => {
            tracing::warn!(host, "rejected request for non-loopback host");
            ApiError(GatewayError::Forbidden).into_response()
        }
        _ => next.run(request).await,
    }
}

fn is_loopback_host(host: &str) -> bool {
    let name = if let Some(rest) = host.strip_prefix('[') {
        // [::1]:3000
        rest.split(']').next().unwrap_or_default()
    } else {
        host.rsplit_once(':').map_or(host, |(name, _port)| name)
    };
    matches!(name, "localhost" | "127.0.0.1" | "::1")
}
