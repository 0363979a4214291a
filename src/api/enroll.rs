use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    auth::AuthUser,
    course::get_owned_course,
    enrollment::{self, Enrollment},
    error::{ErrorBody, Result},
    report::{self, EnrolledCourse},
    server::Server,
};

#[utoipa::path(
    post,
    path = "/enroll/{user_id}/{course_id}",
    tag = "enroll",
    security(("bearer" = [])),
    params(("user_id" = i64, Path), ("course_id" = i64, Path)),
    responses(
        (status = 201, body = Enrollment),
        (status = 404, body = ErrorBody),
        (status = 409, description = "already enrolled", body = ErrorBody),
    )
)]
pub async fn enroll(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path((user_id, course_id)): Path<(i64, i64)>,
) -> Result<(StatusCode, Json<Enrollment>)> {
    auth.ensure_self(user_id)?;
    let enrollment = enrollment::enroll(&server.database, user_id, course_id).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/enroll/{user_id}/{course_id}",
    tag = "enroll",
    security(("bearer" = [])),
    params(("user_id" = i64, Path), ("course_id" = i64, Path)),
    responses(
        (status = 200, body = Enrollment),
        (status = 404, description = "not enrolled", body = ErrorBody),
    )
)]
pub async fn check_enrollment(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path((user_id, course_id)): Path<(i64, i64)>,
) -> Result<Json<Enrollment>> {
    auth.ensure_self_or_instructor(user_id)?;
    Ok(Json(
        enrollment::get_enrollment(&server.database, user_id, course_id).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/enroll/{user_id}/{course_id}",
    tag = "enroll",
    security(("bearer" = [])),
    params(("user_id" = i64, Path), ("course_id" = i64, Path)),
    responses(
        (status = 204, description = "left the course"),
        (status = 404, body = ErrorBody),
        (status = 409, description = "progress already recorded", body = ErrorBody),
    )
)]
pub async fn unenroll(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path((user_id, course_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    auth.ensure_self(user_id)?;
    enrollment::unenroll(&server.database, user_id, course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/enroll/user/{user_id}",
    tag = "enroll",
    security(("bearer" = [])),
    params(("user_id" = i64, Path)),
    responses((status = 200, body = Vec<Enrollment>))
)]
pub async fn user_enrollments(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Enrollment>>> {
    auth.ensure_self_or_instructor(user_id)?;
    Ok(Json(
        enrollment::get_user_enrollments(&server.database, user_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/enroll/user/{user_id}/overview",
    tag = "enroll",
    security(("bearer" = [])),
    params(("user_id" = i64, Path)),
    responses((status = 200, body = Vec<EnrolledCourse>))
)]
pub async fn enrolled_overview(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<EnrolledCourse>>> {
    auth.ensure_self_or_instructor(user_id)?;
    Ok(Json(
        report::enrolled_overview(&server.database, user_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/enroll/students/{course_id}",
    tag = "enroll",
    security(("bearer" = [])),
    params(("course_id" = i64, Path)),
    responses(
        (status = 200, body = Vec<Enrollment>),
        (status = 403, body = ErrorBody),
    )
)]
pub async fn course_students(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path(course_id): Path<i64>,
) -> Result<Json<Vec<Enrollment>>> {
    get_owned_course(&server.database, course_id, &auth).await?;
    Ok(Json(
        enrollment::get_course_enrollments(&server.database, course_id).await?,
    ))
}

pub fn get_enroll_scope() -> Router<Arc<Server>> {
    Router::new()
        .route("/user/{user_id}", get(user_enrollments))
        .route("/user/{user_id}/overview", get(enrolled_overview))
        .route("/students/{course_id}", get(course_students))
        .route(
            "/{user_id}/{course_id}",
            post(enroll).get(check_enrollment).delete(unenroll),
        )
}
