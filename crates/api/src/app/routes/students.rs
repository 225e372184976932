use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use pms_auth::SecurityContext;
use pms_core::StudentId;
use pms_infra::Services;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_student).get(list_students))
        .route("/:id", get(get_student).put(update_student).delete(delete_student))
}

pub async fn create_student(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
    body: Result<Json<dto::StudentRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.students.create(&ctx, body.into()).await {
        Ok(details) => (StatusCode::CREATED, Json(dto::StudentResponse::from(details))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_students(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
) -> axum::response::Response {
    match services.students.list(&ctx).await {
        Ok(students) => Json(
            students
                .into_iter()
                .map(dto::StudentResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_student(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: StudentId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("student"),
    };

    match services.students.get(&ctx, id).await {
        Ok(details) => Json(dto::StudentResponse::from(details)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_student(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::StudentRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: StudentId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("student"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.students.update(&ctx, id, body.into()).await {
        Ok(details) => Json(dto::StudentResponse::from(details)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_student(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: StudentId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("student"),
    };

    match services.students.delete(&ctx, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
