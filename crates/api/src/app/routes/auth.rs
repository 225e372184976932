use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};

use pms_auth::SecurityContext;
use pms_core::UserId;
use pms_infra::Services;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(profile))
        .route("/users", get(list_users))
        .route("/users/:id", put(update_user).delete(delete_user))
        .route("/users/:id/role", patch(change_role))
}

pub async fn register(
    Extension(services): Extension<Services>,
    body: Result<Json<dto::RegisterRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.accounts.register(body.into()).await {
        Ok(user) => (StatusCode::CREATED, Json(dto::UserResponse::from(user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// The token is returned as the raw response body, with no JSON envelope.
pub async fn login(
    Extension(services): Extension<Services>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.accounts.login(&body.email, &body.password).await {
        Ok(token) => (StatusCode::OK, token).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn profile(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
) -> axum::response::Response {
    match services.accounts.profile(&ctx).await {
        Ok(user) => Json(dto::UserResponse::from(user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_users(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
) -> axum::response::Response {
    match services.accounts.list_users(&ctx).await {
        Ok(users) => Json(
            users
                .into_iter()
                .map(dto::UserResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UserUpdateRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("user"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.accounts.update_user(&ctx, id, body.into()).await {
        Ok(user) => Json(dto::UserResponse::from(user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("user"),
    };

    match services.accounts.delete_user(&ctx, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn change_role(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::RoleChangeRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("user"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.accounts.change_role(&ctx, id, body.role).await {
        Ok(user) => Json(dto::UserResponse::from(user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
