use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    course::{get_course, get_owned_course},
    error::{ErrorBody, Result},
    quiz::{
        self, AttemptSubmission, NewQuiz, Quiz, QuizResponse, QuizView, attempt::AttemptView,
    },
    server::Server,
};

#[utoipa::path(
    post,
    path = "/quiz/add",
    tag = "quiz",
    security(("bearer" = [])),
    request_body = NewQuiz,
    responses(
        (status = 201, body = Quiz),
        (status = 400, body = ErrorBody),
        (status = 409, description = "course already has a quiz", body = ErrorBody),
    )
)]
pub async fn add_quiz(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Json(req): Json<NewQuiz>,
) -> Result<(StatusCode, Json<Quiz>)> {
    get_owned_course(&server.database, req.course_id, &auth).await?;
    let quiz = quiz::add_quiz(&server.database, req).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

#[utoipa::path(
    get,
    path = "/quiz/{course_id}",
    tag = "quiz",
    security(("bearer" = [])),
    params(("course_id" = i64, Path)),
    responses(
        (status = 200, description = "answers are only included for the instructor", body = QuizView),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn get_quiz(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path(course_id): Path<i64>,
) -> Result<Json<QuizView>> {
    let course = get_course(&server.database, course_id).await?;
    let owner = auth.is_instructor() && course.instructor_id == auth.id;
    if !owner {
        quiz::ensure_quiz_access(&server.database, auth.id, course_id).await?;
    }
    let quiz = quiz::get_course_quiz(&server.database, course_id).await?;
    Ok(Json(QuizView::new(
        &quiz,
        server.attempts.time_limit(),
        owner,
    )))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    /// Empty or missing when unanswered
    #[serde(default)]
    pub user_answer: String,
}

/// Any `answer` or `score` sent along is ignored, scoring happens on the server
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    pub user_id: i64,
    pub course_id: i64,
    pub answers: Vec<SubmittedAnswer>,
}

#[utoipa::path(
    post,
    path = "/quiz/submit",
    tag = "quiz",
    security(("bearer" = [])),
    request_body = QuizSubmission,
    responses(
        (status = 200, body = QuizResponse),
        (status = 403, body = ErrorBody),
        (status = 409, description = "open timed attempt ran out of time", body = ErrorBody),
    )
)]
pub async fn submit_quiz(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Json(req): Json<QuizSubmission>,
) -> Result<Json<QuizResponse>> {
    auth.ensure_self(req.user_id)?;
    let answers: Vec<&str> = req.answers.iter().map(|a| a.user_answer.as_str()).collect();
    let response = quiz::submit(
        &server.database,
        &server.attempts,
        req.user_id,
        req.course_id,
        &answers,
    )
    .await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/quiz/response/{course_id}/{user_id}",
    tag = "quiz",
    security(("bearer" = [])),
    params(("course_id" = i64, Path), ("user_id" = i64, Path)),
    responses(
        (status = 200, body = QuizResponse),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn get_response(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path((course_id, user_id)): Path<(i64, i64)>,
) -> Result<Json<QuizResponse>> {
    auth.ensure_self_or_instructor(user_id)?;
    Ok(Json(
        quiz::get_response(&server.database, user_id, course_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/quiz/{course_id}/attempt",
    tag = "quiz",
    security(("bearer" = [])),
    params(("course_id" = i64, Path)),
    responses(
        (status = 200, description = "new or resumed attempt", body = AttemptView),
        (status = 403, body = ErrorBody),
    )
)]
pub async fn start_attempt(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path(course_id): Path<i64>,
) -> Result<Json<AttemptView>> {
    Ok(Json(
        quiz::start_attempt(&server.database, &server.attempts, auth.id, course_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/quiz/{course_id}/attempt",
    tag = "quiz",
    security(("bearer" = [])),
    params(("course_id" = i64, Path)),
    responses(
        (status = 200, body = AttemptView),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn get_attempt(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path(course_id): Path<i64>,
) -> Result<Json<AttemptView>> {
    Ok(Json(
        quiz::get_attempt(&server.attempts, auth.id, course_id).await?,
    ))
}

#[derive(Deserialize, ToSchema)]
pub struct AnswerRequest {
    pub option: String,
}

#[utoipa::path(
    put,
    path = "/quiz/{course_id}/attempt/answers/{index}",
    tag = "quiz",
    security(("bearer" = [])),
    params(("course_id" = i64, Path), ("index" = usize, Path, description = "question index, from 0")),
    request_body = AnswerRequest,
    responses(
        (status = 200, body = AttemptView),
        (status = 400, body = ErrorBody),
        (status = 409, description = "attempt submitted or out of time", body = ErrorBody),
    )
)]
pub async fn answer_question(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path((course_id, index)): Path<(i64, usize)>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AttemptView>> {
    Ok(Json(
        quiz::answer_attempt(&server.attempts, auth.id, course_id, index, &req.option).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/quiz/{course_id}/attempt/submit",
    tag = "quiz",
    security(("bearer" = [])),
    params(("course_id" = i64, Path)),
    responses(
        (status = 200, body = AttemptSubmission),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn submit_attempt(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
    Path(course_id): Path<i64>,
) -> Result<Json<AttemptSubmission>> {
    Ok(Json(
        quiz::submit_attempt(&server.database, &server.attempts, auth.id, course_id).await?,
    ))
}

pub fn get_quiz_scope() -> Router<Arc<Server>> {
    Router::new()
        .route("/add", post(add_quiz))
        .route("/submit", post(submit_quiz))
        .route("/response/{course_id}/{user_id}", get(get_response))
        .route("/{course_id}", get(get_quiz))
        .route("/{course_id}/attempt", post(start_attempt).get(get_attempt))
        .route("/{course_id}/attempt/answers/{index}", put(answer_question))
        .route("/{course_id}/attempt/submit", post(submit_attempt))
}
