use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    auth::AuthUser,
    course::{self, Course, NewCourse},
    error::{ErrorBody, Result},
    report::{self, RosterEntry, StudentReport},
    server::Server,
};

#[utoipa::path(
    get,
    path = "/courses",
    tag = "courses",
    responses((status = 200, body = Vec<Course>))
)]
pub async fn list_courses(State(server): State<Arc<Server>>) -> Result<Json<Vec<Course>>> {
    Ok(Json(course::get_course_list(&server.database).await?))
}

#[utoipa::path(
    get,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = i64, Path)),
    responses((status = 200, body = Course), (status = 404, body = ErrorBody))
)]
pub async fn get_course(
    State(server): State<Arc<Server>>,
    Path(id): Path<i64>,
) -> Result<Json<Course>> {
    Ok(Json(course::get_course(&server.database, id).await?))
}

#[utoipa::path(
    post,
    path = "/courses/create",
    tag = "courses",
    security(("bearer" = [])),
    request_body = NewCourse,
    responses(
        (status = 201, body = Course),
        (status = 400, body = ErrorBody),
        (status = 403, body = ErrorBody),
    )
)]
pub async fn create_course(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Json(req): Json<NewCourse>,
) -> Result<(StatusCode, Json<Course>)> {
    auth.require_instructor()?;
    let course = course::create_course(&server.database, auth.id, req).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    get,
    path = "/courses/instructor/{id}",
    tag = "courses",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "instructor id")),
    responses((status = 200, body = Vec<Course>))
)]
pub async fn instructor_courses(
    State(server): State<Arc<Server>>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Course>>> {
    Ok(Json(
        course::get_instructor_courses(&server.database, id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/courses/{id}/students",
    tag = "courses",
    security(("bearer" = [])),
    params(("id" = i64, Path)),
    responses(
        (status = 200, body = Vec<RosterEntry>),
        (status = 403, body = ErrorBody),
    )
)]
pub async fn course_roster(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<RosterEntry>>> {
    course::get_owned_course(&server.database, id, &auth).await?;
    Ok(Json(report::course_roster(&server.database, id).await?))
}

#[utoipa::path(
    get,
    path = "/courses/{id}/students/{student_id}/report",
    tag = "courses",
    security(("bearer" = [])),
    params(("id" = i64, Path), ("student_id" = i64, Path)),
    responses(
        (status = 200, body = StudentReport),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn student_report(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path((id, student_id)): Path<(i64, i64)>,
) -> Result<Json<StudentReport>> {
    course::get_owned_course(&server.database, id, &auth).await?;
    Ok(Json(
        report::student_report(&server.database, id, student_id).await?,
    ))
}

pub fn get_courses_scope() -> Router<Arc<Server>> {
    Router::new()
        .route("/", get(list_courses))
        .route("/create", post(create_course))
        .route("/instructor/{id}", get(instructor_courses))
        .route("/{id}", get(get_course))
        .route("/{id}/students", get(course_roster))
        .route("/{id}/students/{student_id}/report", get(student_report))
}
