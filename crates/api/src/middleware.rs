use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use pms_auth::AuthorizationGate;

/// Resolve the caller once per request and attach the resulting
/// `SecurityContext` as a request extension.
///
/// The gate never rejects: a missing or bad token yields an anonymous context
/// and the operation's role check decides between 401 and 403.
pub async fn gate_middleware(
    State(gate): State<Arc<AuthorizationGate>>,
    mut req: Request,
    next: Next,
) -> Response {
    let authorization = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    // Owned copies: the body is not `Sync`, so `req` cannot be borrowed across the await.
    let path = req.uri().path().to_owned();

    let resolution = gate.resolve(&path, authorization.as_deref()).await;
    debug!(
        path = %path,
        stage = ?resolution.stage,
        authenticated = resolution.context.is_authenticated(),
        "request gated"
    );

    req.extensions_mut().insert(resolution.context);
    next.run(req).await
}
