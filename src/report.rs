use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::{
    course::{
        Course, get_course,
        lesson::{Lesson, get_course_lessons},
    },
    enrollment::{
        Enrollment, can_unenroll, get_course_enrollments, get_enrollment, get_user_enrollments,
    },
    error::{Error, Result},
    progress::{CourseProgress, LessonProgress, get_user_course_progress},
    quiz::{QuizResponse, find_response},
    user::{UserInfo, get_user},
};

/// One enrolled student as listed for the course instructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub user: UserInfo,
    #[serde(with = "time::serde::rfc3339")]
    pub enrolled_at: OffsetDateTime,
    pub percentage: u8,
    pub quiz_score: Option<usize>,
    pub quiz_total: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonReport {
    pub lesson: Lesson,
    pub progress: Option<LessonProgress>,
}

/// Everything recorded for one student in one course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub user: UserInfo,
    pub enrollment: Enrollment,
    pub lessons: Vec<LessonReport>,
    pub progress: CourseProgress,
    pub quiz: Option<QuizResponse>,
}

/// A course on a learner's dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    pub enrollment: Enrollment,
    pub course: Course,
    pub progress: CourseProgress,
    pub can_unenroll: bool,
}

fn lesson_ids(lessons: &[Lesson]) -> Vec<i64> {
    lessons.iter().map(|lesson| lesson.id).collect()
}

pub async fn course_roster(database: &SqlitePool, course_id: i64) -> Result<Vec<RosterEntry>> {
    let ids = lesson_ids(&get_course_lessons(database, course_id).await?);
    let enrollments = get_course_enrollments(database, course_id).await?;
    try_join_all(enrollments.into_iter().map(|enrollment| {
        let ids = &ids;
        async move {
            let (user, records, response) = futures::try_join!(
                get_user(database, enrollment.user_id),
                get_user_course_progress(database, enrollment.user_id, course_id),
                find_response(database, enrollment.user_id, course_id),
            )?;
            Ok::<_, Error>(RosterEntry {
                user,
                enrolled_at: enrollment.enrolled_at,
                percentage: CourseProgress::compute(ids, &records).percentage,
                quiz_score: response.as_ref().map(|r| r.score),
                quiz_total: response.as_ref().map(|r| r.total),
            })
        }
    }))
    .await
}

pub async fn student_report(
    database: &SqlitePool,
    course_id: i64,
    user_id: i64,
) -> Result<StudentReport> {
    let enrollment = get_enrollment(database, user_id, course_id).await?;
    let (user, lessons, records, quiz) = futures::try_join!(
        get_user(database, user_id),
        get_course_lessons(database, course_id),
        get_user_course_progress(database, user_id, course_id),
        find_response(database, user_id, course_id),
    )?;
    let progress = CourseProgress::compute(&lesson_ids(&lessons), &records);
    let lessons = lessons
        .into_iter()
        .map(|lesson| LessonReport {
            progress: records.iter().find(|r| r.lesson_id == lesson.id).cloned(),
            lesson,
        })
        .collect();
    Ok(StudentReport {
        user,
        enrollment,
        lessons,
        progress,
        quiz,
    })
}

pub async fn enrolled_overview(database: &SqlitePool, user_id: i64) -> Result<Vec<EnrolledCourse>> {
    let enrollments = get_user_enrollments(database, user_id).await?;
    try_join_all(enrollments.into_iter().map(|enrollment| async move {
        let (course, lessons, records) = futures::try_join!(
            get_course(database, enrollment.course_id),
            get_course_lessons(database, enrollment.course_id),
            get_user_course_progress(database, user_id, enrollment.course_id),
        )?;
        Ok::<_, Error>(EnrolledCourse {
            progress: CourseProgress::compute(&lesson_ids(&lessons), &records),
            can_unenroll: can_unenroll(&records),
            enrollment,
            course,
        })
    }))
    .await
}
