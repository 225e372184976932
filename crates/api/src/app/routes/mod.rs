use axum::{routing::get, Router};

pub mod auth;
pub mod cohorts;
pub mod docs;
pub mod students;
pub mod system;

/// Router for every endpoint behind the authorization gate.
///
/// Public paths (register, login, docs) still pass through the gate; it
/// attaches an anonymous context for them.
pub fn router() -> Router {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/cohorts", cohorts::router())
        .nest("/api/students", students::router())
        .route("/v3/api-docs", get(docs::api_docs))
}
