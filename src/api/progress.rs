use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    error::{Error, ErrorBody, Result},
    progress::{self, CourseProgress, LessonProgress},
    server::Server,
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonRequest {
    /// Titles of the chapters the learner ticked off, all of the lesson's are required
    pub checked_chapters: Vec<String>,
}

#[utoipa::path(
    post,
    path = "/lesson-progress/complete/{user_id}/{course_id}/{lesson_id}",
    tag = "progress",
    security(("bearer" = [])),
    params(("user_id" = i64, Path), ("course_id" = i64, Path), ("lesson_id" = i64, Path)),
    request_body = CompleteLessonRequest,
    responses(
        (status = 200, body = LessonProgress),
        (status = 400, description = "unchecked chapters", body = ErrorBody),
        (status = 403, description = "not enrolled", body = ErrorBody),
    )
)]
pub async fn complete_lesson(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path((user_id, course_id, lesson_id)): Path<(i64, i64, i64)>,
    Json(req): Json<CompleteLessonRequest>,
) -> Result<Json<LessonProgress>> {
    auth.ensure_self(user_id)?;
    let record = progress::mark_lesson_complete(
        &server.database,
        user_id,
        course_id,
        lesson_id,
        &req.checked_chapters,
    )
    .await?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/lesson-progress/{user_id}/{course_id}",
    tag = "progress",
    security(("bearer" = [])),
    params(("user_id" = i64, Path), ("course_id" = i64, Path)),
    responses((status = 200, body = Vec<LessonProgress>))
)]
pub async fn course_records(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path((user_id, course_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<LessonProgress>>> {
    auth.ensure_self_or_instructor(user_id)?;
    Ok(Json(
        progress::get_user_course_progress(&server.database, user_id, course_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/lesson-progress/{user_id}/{course_id}/{lesson_id}",
    tag = "progress",
    security(("bearer" = [])),
    params(("user_id" = i64, Path), ("course_id" = i64, Path), ("lesson_id" = i64, Path)),
    responses(
        (status = 200, body = LessonProgress),
        (status = 404, description = "lesson not completed yet", body = ErrorBody),
    )
)]
pub async fn lesson_record(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path((user_id, course_id, lesson_id)): Path<(i64, i64, i64)>,
) -> Result<Json<LessonProgress>> {
    auth.ensure_self_or_instructor(user_id)?;
    let record = progress::find_lesson_progress(&server.database, user_id, lesson_id)
        .await?
        .filter(|record| record.course_id == course_id)
        .ok_or(Error::NotFound("lesson progress"))?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/lesson-progress/summary/{user_id}/{course_id}",
    tag = "progress",
    security(("bearer" = [])),
    params(("user_id" = i64, Path), ("course_id" = i64, Path)),
    responses((status = 200, body = CourseProgress))
)]
pub async fn summary(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path((user_id, course_id)): Path<(i64, i64)>,
) -> Result<Json<CourseProgress>> {
    auth.ensure_self_or_instructor(user_id)?;
    Ok(Json(
        progress::get_course_progress(&server.database, user_id, course_id).await?,
    ))
}

pub fn get_progress_scope() -> Router<Arc<Server>> {
    Router::new()
        .route(
            "/complete/{user_id}/{course_id}/{lesson_id}",
            post(complete_lesson),
        )
        .route("/summary/{user_id}/{course_id}", get(summary))
        .route("/{user_id}/{course_id}", get(course_records))
        .route("/{user_id}/{course_id}/{lesson_id}", get(lesson_record))
}
