//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and domain mapping
//! - `errors.rs`: consistent error responses

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tracing::{info, warn};

use pms_auth::{
    AuthorizationGate, PasswordHasher, SigningSecret, TokenService, DEFAULT_ITERATIONS,
    DEFAULT_MEMORY_KIB,
};
use pms_infra::{InMemoryStore, PostgresStore, Services, StoreIdentityLookup, Stores};

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router from configuration (public entrypoint used by `main.rs`).
///
/// Connects to and migrates Postgres when `DATABASE_URL` is set; otherwise
/// everything lives in memory for the life of the process.
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    let tokens = TokenService::new(
        SigningSecret::new(config.jwt_secret.clone()),
        config.token_lifetime(),
    )
    .context("JWT_SECRET / JWT_EXPIRATION_MS")?;

    let hasher = match (config.argon2_memory_kib, config.argon2_iterations) {
        (None, None) => PasswordHasher::new(),
        (memory, iterations) => PasswordHasher::with_params(
            memory.unwrap_or(DEFAULT_MEMORY_KIB),
            iterations.unwrap_or(DEFAULT_ITERATIONS),
        )
        .context("ARGON2_MEMORY_KIB / ARGON2_ITERATIONS")?,
    };

    let stores = match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url)
                .await
                .context("connecting to DATABASE_URL")?;
            store.migrate().await.context("applying schema")?;
            info!("using postgres store");
            Stores::from_backend(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set; data lives in memory only");
            Stores::from_backend(Arc::new(InMemoryStore::new()))
        }
    };

    Ok(build_router(stores, hasher, tokens, config.store_timeout))
}

/// Wire services and the authorization gate over `stores`.
pub fn build_router(
    stores: Stores,
    hasher: PasswordHasher,
    tokens: TokenService,
    store_timeout: Duration,
) -> Router {
    let tokens = Arc::new(tokens);
    let identities = Arc::new(StoreIdentityLookup::new(stores.users.clone()));
    let gate = Arc::new(AuthorizationGate::new(tokens.clone(), identities, store_timeout));
    let services = Services::new(stores, Arc::new(hasher), tokens, store_timeout);

    // Every resource route runs behind the gate exactly once. Layers apply top to bottom.
    let gated = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                gate,
                middleware::gate_middleware,
            ))
            .layer(Extension(services)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(gated)
}
