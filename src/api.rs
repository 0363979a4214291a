pub mod auth;
pub mod courses;
pub mod enroll;
pub mod lessons;
pub mod progress;
pub mod quiz;
pub mod users;

use std::sync::Arc;

use axum::Router;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::server::Server;

pub fn routes() -> Router<Arc<Server>> {
    Router::new()
        .nest("/api/auth", auth::get_auth_scope())
        .nest("/users", users::get_users_scope())
        .nest("/courses", courses::get_courses_scope())
        .nest("/lessons", lessons::get_lessons_scope())
        .nest("/enroll", enroll::get_enroll_scope())
        .nest("/lesson-progress", progress::get_progress_scope())
        .nest("/quiz", quiz::get_quiz_scope())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "course server", version = "0.1.0"),
    modifiers(&BearerAuth),
    paths(
        auth::register,
        auth::login,
        users::list_users,
        users::me,
        users::get_user,
        courses::list_courses,
        courses::get_course,
        courses::create_course,
        courses::instructor_courses,
        courses::course_roster,
        courses::student_report,
        lessons::get_lesson,
        lessons::course_lessons,
        lessons::create_lesson,
        enroll::enroll,
        enroll::check_enrollment,
        enroll::unenroll,
        enroll::user_enrollments,
        enroll::enrolled_overview,
        enroll::course_students,
        progress::complete_lesson,
        progress::course_records,
        progress::lesson_record,
        progress::summary,
        quiz::add_quiz,
        quiz::get_quiz,
        quiz::submit_quiz,
        quiz::get_response,
        quiz::start_attempt,
        quiz::get_attempt,
        quiz::answer_question,
        quiz::submit_attempt,
    ),
    components(schemas(crate::error::ErrorBody))
)]
pub struct ApiDoc;

pub fn get_openapi_json() -> anyhow::Result<String> {
    let json = ApiDoc::openapi().to_pretty_json()?;
    Ok(json)
}
