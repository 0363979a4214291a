pub mod lesson;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::AuthUser,
    error::{Error, Result},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub instructor_id: i64,
    pub difficulty: String,
    pub hours: i64,
    pub price: String,
    pub rating: f64,
    /// Number of lessons, derived from the lesson table
    pub lessons: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewCourse {
    #[validate(length(min = 5, message = "Title must be at least 5 characters"))]
    pub title: String,
    #[validate(length(min = 20, message = "Description must be at least 20 characters"))]
    pub description: String,
    #[validate(length(min = 1, message = "Please select a difficulty level"))]
    pub difficulty: String,
    #[validate(range(min = 1, message = "Hours must be at least 1"))]
    pub hours: i64,
    #[validate(length(min = 1, message = "Please enter a price"))]
    pub price: String,
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: Option<f64>,
}

const COURSE_COLUMNS: &str = "SELECT c.id, c.title, c.description, c.instructor_id, c.difficulty, c.hours, c.price, c.rating, \
     (SELECT COUNT(*) FROM lesson l WHERE l.course_id = c.id) AS lessons FROM course c";

pub async fn create_course(
    database: &SqlitePool,
    instructor_id: i64,
    course: NewCourse,
) -> Result<Course> {
    course.validate()?;
    let rating = course.rating.unwrap_or(5.0);
    let id = sqlx::query(
        "INSERT INTO course (title, description, instructor_id, difficulty, hours, price, rating) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&course.title)
    .bind(&course.description)
    .bind(instructor_id)
    .bind(&course.difficulty)
    .bind(course.hours)
    .bind(&course.price)
    .bind(rating)
    .execute(database)
    .await
    .map_err(|e| Error::from_write(e, "Course already exists", "instructor"))?
    .last_insert_rowid();
    info!("instructor {} created course {}-{}", instructor_id, id, course.title);
    get_course(database, id).await
}

pub async fn get_course(database: &SqlitePool, id: i64) -> Result<Course> {
    sqlx::query_as::<_, Course>(&format!("{COURSE_COLUMNS} WHERE c.id = ?"))
        .bind(id)
        .fetch_optional(database)
        .await?
        .ok_or(Error::NotFound("course"))
}

pub async fn get_course_list(database: &SqlitePool) -> Result<Vec<Course>> {
    let courses = sqlx::query_as::<_, Course>(&format!("{COURSE_COLUMNS} ORDER BY c.id"))
        .fetch_all(database)
        .await?;
    Ok(courses)
}

pub async fn get_instructor_courses(
    database: &SqlitePool,
    instructor_id: i64,
) -> Result<Vec<Course>> {
    let courses = sqlx::query_as::<_, Course>(&format!(
        "{COURSE_COLUMNS} WHERE c.instructor_id = ? ORDER BY c.id"
    ))
    .bind(instructor_id)
    .fetch_all(database)
    .await?;
    Ok(courses)
}

/// Load the course and check that `user` is the instructor who owns it.
pub async fn get_owned_course(
    database: &SqlitePool,
    course_id: i64,
    user: &AuthUser,
) -> Result<Course> {
    user.require_instructor()?;
    let course = get_course(database, course_id).await?;
    if course.instructor_id != user.id {
        return Err(Error::forbidden("Only the course instructor can do this"));
    }
    Ok(course)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        db,
        user::{Role, create_user, tests::new_user},
    };

    pub(crate) fn new_course(title: &str) -> NewCourse {
        NewCourse {
            title: title.to_string(),
            description: "A thorough introduction for complete beginners".to_string(),
            difficulty: "Beginner".to_string(),
            hours: 12,
            price: "49.99".to_string(),
            rating: None,
        }
    }

    #[tokio::test]
    async fn create_and_list_courses() {
        let database = db::connect_in_memory().await.unwrap();
        let instructor = create_user(&database, new_user("grace", Role::Instructor))
            .await
            .unwrap();
        let course = create_course(&database, instructor.id, new_course("Java Basics"))
            .await
            .unwrap();
        assert_eq!(course.rating, 5.0);
        assert_eq!(course.lessons, 0);
        assert_eq!(course.instructor_id, instructor.id);

        let all = get_course_list(&database).await.unwrap();
        assert_eq!(all, vec![course.clone()]);
        let mine = get_instructor_courses(&database, instructor.id).await.unwrap();
        assert_eq!(mine, vec![course]);
        assert!(
            get_instructor_courses(&database, instructor.id + 1)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn short_description_is_rejected() {
        let database = db::connect_in_memory().await.unwrap();
        let mut course = new_course("Java Basics");
        course.description = "too short".to_string();
        assert!(matches!(
            create_course(&database, 1, course).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unknown_instructor_is_not_found() {
        let database = db::connect_in_memory().await.unwrap();
        assert!(matches!(
            create_course(&database, 42, new_course("Java Basics")).await,
            Err(Error::NotFound("instructor"))
        ));
    }

    #[tokio::test]
    async fn only_the_owner_passes_the_ownership_check() {
        let database = db::connect_in_memory().await.unwrap();
        let owner = create_user(&database, new_user("grace", Role::Instructor))
            .await
            .unwrap();
        let other = create_user(&database, new_user("alan", Role::Instructor))
            .await
            .unwrap();
        let course = create_course(&database, owner.id, new_course("Java Basics"))
            .await
            .unwrap();
        let as_owner = AuthUser {
            id: owner.id,
            role: Role::Instructor,
        };
        let as_other = AuthUser {
            id: other.id,
            role: Role::Instructor,
        };
        assert!(get_owned_course(&database, course.id, &as_owner).await.is_ok());
        assert!(matches!(
            get_owned_course(&database, course.id, &as_other).await,
            Err(Error::Forbidden(_))
        ));
    }
}
