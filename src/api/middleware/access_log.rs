//! Request access logging.
//!
//! Reads never touch the audit table; this only writes a tracing event per
//! request, tagged with the acting user once the session layer has run.

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::SessionContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user_id = req
        .extensions()
        .get::<SessionContext>()
        .map(|s| s.user_id.to_string());
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if status >= 500 {
        tracing::warn!(%method, path, status, elapsed_ms, user_id, "API request failed");
    } else {
        tracing::info!(%method, path, status, elapsed_ms, user_id, "API request");
    }
    response
}
