use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use pms_auth::SecurityContext;
use pms_core::CohortId;
use pms_infra::Services;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_cohort).get(list_cohorts))
        .route("/:id", get(get_cohort).put(update_cohort).delete(delete_cohort))
}

pub async fn create_cohort(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
    body: Result<Json<dto::CohortRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.cohorts.create(&ctx, body.into()).await {
        Ok(details) => (StatusCode::CREATED, Json(dto::CohortResponse::from(details))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_cohorts(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
) -> axum::response::Response {
    match services.cohorts.list(&ctx).await {
        Ok(cohorts) => Json(
            cohorts
                .into_iter()
                .map(dto::CohortResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_cohort(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CohortId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("cohort"),
    };

    match services.cohorts.get(&ctx, id).await {
        Ok(details) => Json(dto::CohortResponse::from(details)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_cohort(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::CohortRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: CohortId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("cohort"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.cohorts.update(&ctx, id, body.into()).await {
        Ok(details) => Json(dto::CohortResponse::from(details)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_cohort(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CohortId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("cohort"),
    };

    match services.cohorts.delete(&ctx, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
