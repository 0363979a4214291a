use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{Error, Result};

/// A lesson is an ordered list of chapters, lessons of a course are ordered by `order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub chapters: Vec<String>,
    pub order: i64,
}

#[derive(sqlx::FromRow)]
struct LessonRow {
    id: i64,
    course_id: i64,
    title: String,
    chapters: String,
    lesson_order: i64,
}

impl TryFrom<LessonRow> for Lesson {
    type Error = Error;
    fn try_from(row: LessonRow) -> Result<Self> {
        let chapters = serde_json::from_str(&row.chapters)
            .map_err(|e| anyhow::anyhow!("corrupt chapters of lesson {}: {}", row.id, e))?;
        Ok(Lesson {
            id: row.id,
            course_id: row.course_id,
            title: row.title,
            chapters,
            order: row.lesson_order,
        })
    }
}

impl Lesson {
    /// Chapters of this lesson missing from `checked`, in lesson order.
    pub fn unchecked_chapters<'a>(&'a self, checked: &[String]) -> Vec<&'a str> {
        let checked: BTreeSet<&str> = checked.iter().map(String::as_str).collect();
        self.chapters
            .iter()
            .map(String::as_str)
            .filter(|ch| !checked.contains(ch))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewLesson {
    pub course_id: i64,
    #[validate(length(min = 5, message = "Lesson title must be at least 5 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "At least one chapter is required"))]
    pub chapters: Vec<String>,
    pub order: i64,
}

impl NewLesson {
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        if let Some(ch) = self.chapters.iter().find(|ch| ch.chars().count() < 3) {
            return Err(Error::validation(format!(
                "chapter \"{ch}\" must be at least 3 characters"
            )));
        }
        let unique: BTreeSet<&String> = self.chapters.iter().collect();
        if unique.len() != self.chapters.len() {
            return Err(Error::validation("chapter titles must be unique"));
        }
        Ok(())
    }
}

const LESSON_COLUMNS: &str = "SELECT id, course_id, title, chapters, lesson_order FROM lesson";

pub async fn create_lesson(database: &SqlitePool, lesson: NewLesson) -> Result<Lesson> {
    lesson.check()?;
    let chapters = serde_json::to_string(&lesson.chapters)
        .map_err(|e| anyhow::anyhow!("Failed to encode chapters: {}", e))?;
    let id = sqlx::query(
        "INSERT INTO lesson (course_id, title, chapters, lesson_order) VALUES (?, ?, ?, ?)",
    )
    .bind(lesson.course_id)
    .bind(&lesson.title)
    .bind(chapters)
    .bind(lesson.order)
    .execute(database)
    .await
    .map_err(|e| {
        Error::from_write(
            e,
            "A lesson with this order already exists in the course",
            "course",
        )
    })?
    .last_insert_rowid();
    info!(
        "added lesson {}-{} to course {}",
        id, lesson.title, lesson.course_id
    );
    Ok(Lesson {
        id,
        course_id: lesson.course_id,
        title: lesson.title,
        chapters: lesson.chapters,
        order: lesson.order,
    })
}

pub async fn get_lesson(database: &SqlitePool, id: i64) -> Result<Lesson> {
    sqlx::query_as::<_, LessonRow>(&format!("{LESSON_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(database)
        .await?
        .ok_or(Error::NotFound("lesson"))?
        .try_into()
}

pub async fn get_course_lessons(database: &SqlitePool, course_id: i64) -> Result<Vec<Lesson>> {
    sqlx::query_as::<_, LessonRow>(&format!(
        "{LESSON_COLUMNS} WHERE course_id = ? ORDER BY lesson_order"
    ))
    .bind(course_id)
    .fetch_all(database)
    .await?
    .into_iter()
    .map(Lesson::try_from)
    .collect()
}
