use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    error::{Error, Result},
    progress::{self, LessonProgress},
    user::get_user,
    utils::now,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub enrolled_at: OffsetDateTime,
}

/// A learner may leave a course only while nothing has been recorded for it.
pub fn can_unenroll(progress: &[LessonProgress]) -> bool {
    progress.is_empty()
}

pub async fn enroll(database: &SqlitePool, user_id: i64, course_id: i64) -> Result<Enrollment> {
    // the remaining foreign key is the course
    get_user(database, user_id).await?;
    let enrolled_at = now();
    let id = sqlx::query("INSERT INTO enrollment (user_id, course_id, enrolled_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(course_id)
        .bind(enrolled_at)
        .execute(database)
        .await
        .map_err(|e| Error::from_write(e, "User is already enrolled in this course", "course"))?
        .last_insert_rowid();
    info!("user {} enrolled in course {}", user_id, course_id);
    Ok(Enrollment {
        id,
        user_id,
        course_id,
        enrolled_at,
    })
}

pub async fn find_enrollment(
    database: &SqlitePool,
    user_id: i64,
    course_id: i64,
) -> Result<Option<Enrollment>> {
    let enrollment = sqlx::query_as::<_, Enrollment>(
        "SELECT id, user_id, course_id, enrolled_at FROM enrollment WHERE user_id = ? AND course_id = ?",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(database)
    .await?;
    Ok(enrollment)
}

pub async fn get_enrollment(
    database: &SqlitePool,
    user_id: i64,
    course_id: i64,
) -> Result<Enrollment> {
    find_enrollment(database, user_id, course_id)
        .await?
        .ok_or(Error::NotFound("enrollment"))
}

pub async fn get_user_enrollments(database: &SqlitePool, user_id: i64) -> Result<Vec<Enrollment>> {
    let enrollments = sqlx::query_as::<_, Enrollment>(
        "SELECT id, user_id, course_id, enrolled_at FROM enrollment WHERE user_id = ? ORDER BY enrolled_at, id",
    )
    .bind(user_id)
    .fetch_all(database)
    .await?;
    Ok(enrollments)
}

pub async fn get_course_enrollments(
    database: &SqlitePool,
    course_id: i64,
) -> Result<Vec<Enrollment>> {
    let enrollments = sqlx::query_as::<_, Enrollment>(
        "SELECT id, user_id, course_id, enrolled_at FROM enrollment WHERE course_id = ? ORDER BY enrolled_at, id",
    )
    .bind(course_id)
    .fetch_all(database)
    .await?;
    Ok(enrollments)
}

/// Remove an enrollment, refused while any progress exists for the pair.
pub async fn unenroll(database: &SqlitePool, user_id: i64, course_id: i64) -> Result<()> {
    let mut tx = database.begin().await?;
    let progress = progress::get_user_course_progress(&mut *tx, user_id, course_id).await?;
    if !can_unenroll(&progress) {
        return Err(Error::conflict(
            "Cannot de-enroll: lessons of this course have already been completed",
        ));
    }
    let deleted = sqlx::query("DELETE FROM enrollment WHERE user_id = ? AND course_id = ?")
        .bind(user_id)
        .bind(course_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(Error::NotFound("enrollment"));
    }
    tx.commit().await?;
    info!("user {} left course {}", user_id, course_id);
    Ok(())
}
