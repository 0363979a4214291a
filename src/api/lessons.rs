use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    auth::AuthUser,
    course::{
        get_course, get_owned_course,
        lesson::{self, Lesson, NewLesson},
    },
    error::{ErrorBody, Result},
    server::Server,
};

#[utoipa::path(
    get,
    path = "/lessons/{id}",
    tag = "lessons",
    params(("id" = i64, Path)),
    responses((status = 200, body = Lesson), (status = 404, body = ErrorBody))
)]
pub async fn get_lesson(
    State(server): State<Arc<Server>>,
    Path(id): Path<i64>,
) -> Result<Json<Lesson>> {
    Ok(Json(lesson::get_lesson(&server.database, id).await?))
}

#[utoipa::path(
    get,
    path = "/lessons/course/{id}",
    tag = "lessons",
    params(("id" = i64, Path, description = "course id")),
    responses((status = 200, body = Vec<Lesson>), (status = 404, body = ErrorBody))
)]
pub async fn course_lessons(
    State(server): State<Arc<Server>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Lesson>>> {
    get_course(&server.database, id).await?;
    Ok(Json(lesson::get_course_lessons(&server.database, id).await?))
}

#[utoipa::path(
    post,
    path = "/lessons/create",
    tag = "lessons",
    security(("bearer" = [])),
    request_body = NewLesson,
    responses(
        (status = 201, body = Lesson),
        (status = 400, body = ErrorBody),
        (status = 403, body = ErrorBody),
        (status = 409, description = "order already used", body = ErrorBody),
    )
)]
pub async fn create_lesson(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Json(req): Json<NewLesson>,
) -> Result<(StatusCode, Json<Lesson>)> {
    get_owned_course(&server.database, req.course_id, &auth).await?;
    let lesson = lesson::create_lesson(&server.database, req).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

pub fn get_lessons_scope() -> Router<Arc<Server>> {
    Router::new()
        .route("/create", post(create_lesson))
        .route("/course/{id}", get(course_lessons))
        .route("/{id}", get(get_lesson))
}
