use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool};
use time::OffsetDateTime;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    course::lesson::{get_course_lessons, get_lesson},
    enrollment::find_enrollment,
    error::{Error, Result},
    utils::now,
};

/// Completion marker of one lesson for one learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub lesson_id: i64,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

/// Progress of a learner through all lessons of a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    /// lesson id -> completed, every lesson of the course is present
    pub lessons: BTreeMap<i64, bool>,
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
    pub all_completed: bool,
}

impl CourseProgress {
    /// Records of lessons outside `lesson_ids` are ignored.
    pub fn compute(lesson_ids: &[i64], records: &[LessonProgress]) -> Self {
        let mut lessons: BTreeMap<i64, bool> = lesson_ids.iter().map(|id| (*id, false)).collect();
        for record in records {
            if let Some(done) = lessons.get_mut(&record.lesson_id) {
                *done |= record.completed;
            }
        }
        let total = lessons.len();
        let completed = lessons.values().filter(|done| **done).count();
        CourseProgress {
            lessons,
            completed,
            total,
            percentage: completion_percentage(completed, total),
            all_completed: total > 0 && completed == total,
        }
    }
}

/// Rounded to the nearest integer, but only a fully completed course reports 100.
pub fn completion_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    if completed >= total {
        return 100;
    }
    let percentage = (completed as f64 / total as f64 * 100.0).round() as u8;
    percentage.min(99)
}

const PROGRESS_COLUMNS: &str =
    "SELECT id, user_id, course_id, lesson_id, completed, completed_at FROM lesson_progress";

pub async fn get_user_course_progress<'e, E>(
    executor: E,
    user_id: i64,
    course_id: i64,
) -> Result<Vec<LessonProgress>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let records = sqlx::query_as::<_, LessonProgress>(&format!(
        "{PROGRESS_COLUMNS} WHERE user_id = ? AND course_id = ? ORDER BY id"
    ))
    .bind(user_id)
    .bind(course_id)
    .fetch_all(executor)
    .await?;
    Ok(records)
}

pub async fn find_lesson_progress(
    database: &SqlitePool,
    user_id: i64,
    lesson_id: i64,
) -> Result<Option<LessonProgress>> {
    let record = sqlx::query_as::<_, LessonProgress>(&format!(
        "{PROGRESS_COLUMNS} WHERE user_id = ? AND lesson_id = ?"
    ))
    .bind(user_id)
    .bind(lesson_id)
    .fetch_optional(database)
    .await?;
    Ok(record)
}

pub async fn get_course_progress(
    database: &SqlitePool,
    user_id: i64,
    course_id: i64,
) -> Result<CourseProgress> {
    let lesson_ids: Vec<i64> = get_course_lessons(database, course_id)
        .await?
        .iter()
        .map(|lesson| lesson.id)
        .collect();
    let records = get_user_course_progress(database, user_id, course_id).await?;
    Ok(CourseProgress::compute(&lesson_ids, &records))
}

/// Mark a lesson complete once every one of its chapters is checked.
/// Completing an already completed lesson keeps the first completion time.
pub async fn mark_lesson_complete(
    database: &SqlitePool,
    user_id: i64,
    course_id: i64,
    lesson_id: i64,
    checked_chapters: &[String],
) -> Result<LessonProgress> {
    let lesson = get_lesson(database, lesson_id).await?;
    if lesson.course_id != course_id {
        return Err(Error::validation(format!(
            "lesson {lesson_id} does not belong to course {course_id}"
        )));
    }
    if find_enrollment(database, user_id, course_id)
        .await?
        .is_none()
    {
        return Err(Error::forbidden(
            "Enroll in the course before completing its lessons",
        ));
    }
    let unchecked = lesson.unchecked_chapters(checked_chapters);
    if !unchecked.is_empty() {
        return Err(Error::validation(format!(
            "unchecked chapters: {}",
            unchecked.join(", ")
        )));
    }
    sqlx::query(
        "INSERT INTO lesson_progress (user_id, course_id, lesson_id, completed, completed_at) VALUES (?, ?, ?, 1, ?) \
         ON CONFLICT (user_id, lesson_id) DO UPDATE SET completed = 1, \
         completed_at = COALESCE(lesson_progress.completed_at, excluded.completed_at)",
    )
    .bind(user_id)
    .bind(course_id)
    .bind(lesson_id)
    .bind(now())
    .execute(database)
    .await?;
    info!(
        "user {} completed lesson {} of course {}",
        user_id, lesson_id, course_id
    );
    find_lesson_progress(database, user_id, lesson_id)
        .await?
        .ok_or(Error::NotFound("lesson progress"))
}
