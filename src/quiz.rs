pub mod attempt;
pub mod scoring;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::{error, info};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    enrollment::find_enrollment,
    error::{Error, Result},
    progress::get_course_progress,
    utils::now,
};
use attempt::{AttemptView, Finish, FinishedAttempt, QuizAttempts, SharedAttempt, Trigger};
use scoring::{Answer, Grade, QuizOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Question {
    #[validate(length(min = 5, message = "Question must be at least 5 characters"))]
    pub question: String,
    #[validate(length(equal = 4, message = "Exactly 4 options are required"))]
    pub options: Vec<String>,
    pub answer: String,
}

impl Question {
    fn check(&self, index: usize) -> Result<()> {
        self.validate()
            .map_err(|e| Error::validation(format!("question {}: {}", index + 1, e)))?;
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err(Error::validation(format!(
                "question {}: options must not be empty",
                index + 1
            )));
        }
        if !self.options.contains(&self.answer) {
            return Err(Error::validation(format!(
                "question {}: the answer must be one of the options",
                index + 1
            )));
        }
        Ok(())
    }
}

/// The quiz of a course, `answer` of every question is the correct option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,
    pub questions: Vec<Question>,
}

#[derive(sqlx::FromRow)]
struct QuizRow {
    id: i64,
    course_id: i64,
    questions: String,
}

impl TryFrom<QuizRow> for Quiz {
    type Error = Error;
    fn try_from(row: QuizRow) -> Result<Self> {
        let questions = serde_json::from_str(&row.questions)
            .map_err(|e| anyhow::anyhow!("corrupt questions of quiz {}: {}", row.id, e))?;
        Ok(Quiz {
            id: row.id,
            course_id: row.course_id,
            questions,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewQuiz {
    pub course_id: i64,
    #[validate(length(min = 1, message = "At least one question is required"))]
    pub questions: Vec<Question>,
}

impl NewQuiz {
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        for (i, question) in self.questions.iter().enumerate() {
            question.check(i)?;
        }
        Ok(())
    }
}

/// A question as shown while taking the quiz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuestionView {
    pub question: String,
    pub options: Vec<String>,
    /// Only present for the course instructor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            question: question.question.clone(),
            options: question.options.clone(),
            answer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
    pub id: i64,
    pub course_id: i64,
    pub questions: Vec<QuestionView>,
    pub time_limit_secs: i64,
}

impl QuizView {
    pub fn new(quiz: &Quiz, time_limit: time::Duration, with_answers: bool) -> Self {
        let questions = quiz
            .questions
            .iter()
            .map(|q| QuestionView {
                answer: with_answers.then(|| q.answer.clone()),
                ..QuestionView::from(q)
            })
            .collect();
        Self {
            id: quiz.id,
            course_id: quiz.course_id,
            questions,
            time_limit_secs: time_limit.whole_seconds(),
        }
    }
}

/// A learner's latest scored submission for a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub answers: Vec<Answer>,
    pub score: usize,
    pub total: usize,
    pub percentage: u8,
    pub grade: Grade,
    pub message: String,
    /// Number of submissions so far, the stored answers are the latest one
    pub attempts: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
}

#[derive(sqlx::FromRow)]
struct QuizResponseRow {
    id: i64,
    user_id: i64,
    course_id: i64,
    answers: String,
    attempts: i64,
    submitted_at: OffsetDateTime,
}

impl TryFrom<QuizResponseRow> for QuizResponse {
    type Error = Error;
    fn try_from(row: QuizResponseRow) -> Result<Self> {
        let answers: Vec<Answer> = serde_json::from_str(&row.answers)
            .map_err(|e| anyhow::anyhow!("corrupt answers of quiz response {}: {}", row.id, e))?;
        let outcome = QuizOutcome::from_answers(answers);
        Ok(QuizResponse {
            id: row.id,
            user_id: row.user_id,
            course_id: row.course_id,
            answers: outcome.answers,
            score: outcome.score,
            total: outcome.total,
            percentage: outcome.percentage,
            grade: outcome.grade,
            message: outcome.message,
            attempts: row.attempts,
            submitted_at: row.submitted_at,
        })
    }
}

pub async fn add_quiz(database: &SqlitePool, quiz: NewQuiz) -> Result<Quiz> {
    quiz.check()?;
    let questions = serde_json::to_string(&quiz.questions)
        .map_err(|e| anyhow::anyhow!("Failed to encode questions: {}", e))?;
    let id = sqlx::query("INSERT INTO quiz (course_id, questions) VALUES (?, ?)")
        .bind(quiz.course_id)
        .bind(questions)
        .execute(database)
        .await
        .map_err(|e| Error::from_write(e, "This course already has a quiz", "course"))?
        .last_insert_rowid();
    info!(
        "added quiz {} with {} questions to course {}",
        id,
        quiz.questions.len(),
        quiz.course_id
    );
    Ok(Quiz {
        id,
        course_id: quiz.course_id,
        questions: quiz.questions,
    })
}

pub async fn find_course_quiz(database: &SqlitePool, course_id: i64) -> Result<Option<Quiz>> {
    sqlx::query_as::<_, QuizRow>("SELECT id, course_id, questions FROM quiz WHERE course_id = ?")
        .bind(course_id)
        .fetch_optional(database)
        .await?
        .map(Quiz::try_from)
        .transpose()
}

pub async fn get_course_quiz(database: &SqlitePool, course_id: i64) -> Result<Quiz> {
    find_course_quiz(database, course_id)
        .await?
        .ok_or(Error::NotFound("quiz"))
}

/// Store a scored submission, replacing the previous one of the same learner.
pub async fn save_response(
    database: &SqlitePool,
    user_id: i64,
    course_id: i64,
    outcome: &QuizOutcome,
) -> Result<QuizResponse> {
    let answers = serde_json::to_string(&outcome.answers)
        .map_err(|e| anyhow::anyhow!("Failed to encode answers: {}", e))?;
    sqlx::query(
        "INSERT INTO quiz_response (user_id, course_id, answers, score, attempts, submitted_at) VALUES (?, ?, ?, ?, 1, ?) \
         ON CONFLICT (user_id, course_id) DO UPDATE SET answers = excluded.answers, score = excluded.score, \
         attempts = quiz_response.attempts + 1, submitted_at = excluded.submitted_at",
    )
    .bind(user_id)
    .bind(course_id)
    .bind(answers)
    .bind(outcome.score as i64)
    .bind(now())
    .execute(database)
    .await
    .map_err(|e| Error::from_write(e, "Quiz response already exists", "course"))?;
    info!(
        "user {} scored {}/{} on the quiz of course {}",
        user_id, outcome.score, outcome.total, course_id
    );
    get_response(database, user_id, course_id).await
}

pub async fn find_response(
    database: &SqlitePool,
    user_id: i64,
    course_id: i64,
) -> Result<Option<QuizResponse>> {
    sqlx::query_as::<_, QuizResponseRow>(
        "SELECT id, user_id, course_id, answers, attempts, submitted_at FROM quiz_response WHERE user_id = ? AND course_id = ?",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(database)
    .await?
    .map(QuizResponse::try_from)
    .transpose()
}

pub async fn get_response(
    database: &SqlitePool,
    user_id: i64,
    course_id: i64,
) -> Result<QuizResponse> {
    find_response(database, user_id, course_id)
        .await?
        .ok_or(Error::NotFound("quiz response"))
}

/// The quiz opens for a learner once enrolled and through every lesson.
pub async fn ensure_quiz_access(database: &SqlitePool, user_id: i64, course_id: i64) -> Result<()> {
    if find_enrollment(database, user_id, course_id)
        .await?
        .is_none()
    {
        return Err(Error::forbidden("Enroll in the course to take its quiz"));
    }
    let progress = get_course_progress(database, user_id, course_id).await?;
    if !progress.all_completed {
        return Err(Error::forbidden(format!(
            "Complete all lessons before taking the quiz ({}/{} done)",
            progress.completed, progress.total
        )));
    }
    Ok(())
}

/// Untimed submission, scored against the stored quiz. An open timed attempt
/// is closed with the same outcome so its timer stores nothing afterwards.
pub async fn submit<S: AsRef<str>>(
    database: &SqlitePool,
    attempts: &QuizAttempts,
    user_id: i64,
    course_id: i64,
    user_answers: &[S],
) -> Result<QuizResponse> {
    ensure_quiz_access(database, user_id, course_id).await?;
    let quiz = get_course_quiz(database, course_id).await?;
    let outcome = scoring::grade(&quiz.questions, user_answers);
    if let Some(attempt) = attempts.get(user_id, course_id).await {
        let settled = attempt.lock().settle(outcome.clone(), now())?;
        if let Finish::Submitted(_) = settled {
            info!(
                "untimed submission closed the open attempt of user {} on course {}",
                user_id, course_id
            );
        }
    }
    save_response(database, user_id, course_id, &outcome).await
}

/// Start a timed attempt, or resume the open one. A new attempt gets its own
/// timer that submits it at the deadline.
pub async fn start_attempt(
    database: &SqlitePool,
    attempts: &QuizAttempts,
    user_id: i64,
    course_id: i64,
) -> Result<AttemptView> {
    ensure_quiz_access(database, user_id, course_id).await?;
    let quiz = get_course_quiz(database, course_id).await?;
    let started_at = now();
    let (attempt, fresh) = attempts.start(user_id, &quiz, started_at).await;
    if fresh {
        info!("user {} started the quiz of course {}", user_id, course_id);
        spawn_timer(database.clone(), attempt.clone());
    }
    let view = attempt.lock().view(now());
    Ok(view)
}

pub async fn get_attempt(
    attempts: &QuizAttempts,
    user_id: i64,
    course_id: i64,
) -> Result<AttemptView> {
    let attempt = open_attempt(attempts, user_id, course_id).await?;
    let view = attempt.lock().view(now());
    Ok(view)
}

pub async fn answer_attempt(
    attempts: &QuizAttempts,
    user_id: i64,
    course_id: i64,
    index: usize,
    option: &str,
) -> Result<AttemptView> {
    let attempt = open_attempt(attempts, user_id, course_id).await?;
    let mut attempt = attempt.lock();
    let at = now();
    attempt.answer(index, option, at)?;
    Ok(attempt.view(at))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSubmission {
    /// Set when the attempt had already been finished, by the learner or the timer
    pub already_submitted: bool,
    pub result: FinishedAttempt,
}

/// Finish the attempt by hand. Only the first finish is stored.
pub async fn submit_attempt(
    database: &SqlitePool,
    attempts: &QuizAttempts,
    user_id: i64,
    course_id: i64,
) -> Result<AttemptSubmission> {
    let attempt = open_attempt(attempts, user_id, course_id).await?;
    let finish = {
        let mut attempt = attempt.lock();
        let at = now();
        let trigger = if attempt.is_expired(at) {
            Trigger::Timeout
        } else {
            Trigger::Manual
        };
        attempt.finish(at, trigger)
    };
    let already_submitted = matches!(finish, Finish::AlreadySubmitted(_));
    if !already_submitted {
        save_response(database, user_id, course_id, &finish.attempt().outcome).await?;
    }
    Ok(AttemptSubmission {
        already_submitted,
        result: finish.attempt().clone(),
    })
}

async fn open_attempt(attempts: &QuizAttempts, user_id: i64, course_id: i64) -> Result<SharedAttempt> {
    attempts
        .get(user_id, course_id)
        .await
        .ok_or(Error::NotFound("quiz attempt"))
}

/// Submit the attempt when its deadline passes, unless it was finished before.
fn spawn_timer(database: SqlitePool, attempt: SharedAttempt) {
    tokio::spawn(async move {
        let (remaining, user_id, course_id) = {
            let attempt = attempt.lock();
            (
                attempt.remaining(now()),
                attempt.user_id(),
                attempt.course_id(),
            )
        };
        tokio::time::sleep(remaining.unsigned_abs()).await;
        let finish = {
            let mut attempt = attempt.lock();
            let deadline = attempt.deadline();
            attempt.finish(deadline.max(now()), Trigger::Timeout)
        };
        if let Finish::Submitted(result) = finish {
            info!(
                "time is up for user {} on the quiz of course {}",
                user_id, course_id
            );
            if let Err(e) = save_response(&database, user_id, course_id, &result.outcome).await {
                error!(
                    "failed to store timed out quiz of user {} for course {}: {}",
                    user_id, course_id, e
                );
            }
        }
    });
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        course::{
            create_course,
            lesson::{create_lesson, tests::new_lesson},
            tests::new_course,
        },
        db,
        enrollment::enroll,
        progress::mark_lesson_complete,
        user::{Role, create_user, tests::new_user},
    };

    pub(crate) fn new_quiz(course_id: i64) -> NewQuiz {
        let question = |text: &str, answer: &str| Question {
            question: text.to_string(),
            options: vec![
                "Option A".to_string(),
                "Option B".to_string(),
                "Option C".to_string(),
                "Option D".to_string(),
            ],
            answer: answer.to_string(),
        };
        NewQuiz {
            course_id,
            questions: vec![
                question("What is a class?", "Option A"),
                question("What is an object?", "Option B"),
            ],
        }
    }

    struct Fixture {
        database: SqlitePool,
        attempts: QuizAttempts,
        student: i64,
        course: i64,
    }

    async fn setup(complete_lessons: bool) -> Fixture {
        let database = db::connect_in_memory().await.unwrap();
        let instructor = create_user(&database, new_user("grace", Role::Instructor))
            .await
            .unwrap();
        let student = create_user(&database, new_user("ada", Role::Student))
            .await
            .unwrap();
        let course = create_course(&database, instructor.id, new_course("Java Basics"))
            .await
            .unwrap();
        let lesson = create_lesson(&database, new_lesson(course.id, 1))
            .await
            .unwrap();
        add_quiz(&database, new_quiz(course.id)).await.unwrap();
        enroll(&database, student.id, course.id).await.unwrap();
        if complete_lessons {
            mark_lesson_complete(&database, student.id, course.id, lesson.id, &lesson.chapters)
                .await
                .unwrap();
        }
        Fixture {
            database,
            attempts: QuizAttempts::new(time::Duration::seconds(300)),
            student: student.id,
            course: course.id,
        }
    }

    #[test]
    fn question_rules() {
        let mut quiz = new_quiz(1);
        assert!(quiz.check().is_ok());
        quiz.questions[0].answer = "Option E".to_string();
        assert!(matches!(quiz.check(), Err(Error::Validation(_))));
        quiz.questions[0].answer = "Option A".to_string();
        quiz.questions[1].options.pop();
        assert!(matches!(quiz.check(), Err(Error::Validation(_))));
        quiz.questions[1].options.push(" ".to_string());
        assert!(matches!(quiz.check(), Err(Error::Validation(_))));
        quiz.questions.clear();
        assert!(matches!(quiz.check(), Err(Error::Validation(_))));
    }

    #[test]
    fn learners_do_not_see_answers() {
        let quiz = Quiz {
            id: 1,
            course_id: 1,
            questions: new_quiz(1).questions,
        };
        let limit = time::Duration::seconds(300);
        let hidden = QuizView::new(&quiz, limit, false);
        assert!(hidden.questions.iter().all(|q| q.answer.is_none()));
        assert!(!serde_json::to_string(&hidden).unwrap().contains("answer"));
        let full = QuizView::new(&quiz, limit, true);
        assert_eq!(full.questions[1].answer.as_deref(), Some("Option B"));
        assert_eq!(full.time_limit_secs, 300);
    }

    #[tokio::test]
    async fn second_quiz_for_a_course_conflicts() {
        let f = setup(false).await;
        assert!(matches!(
            add_quiz(&f.database, new_quiz(f.course)).await,
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            add_quiz(&f.database, new_quiz(f.course + 1)).await,
            Err(Error::NotFound("course"))
        ));
    }

    #[tokio::test]
    async fn quiz_is_locked_until_lessons_are_done() {
        let f = setup(false).await;
        assert!(matches!(
            submit(&f.database, &f.attempts, f.student, f.course, &["Option A"]).await,
            Err(Error::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn resubmission_replaces_and_counts() {
        let f = setup(true).await;
        let first = submit(&f.database, &f.attempts, f.student, f.course, &["Option A", "Option C"])
            .await
            .unwrap();
        assert_eq!(first.score, 1);
        assert_eq!(first.total, 2);
        assert_eq!(first.percentage, 50);
        assert_eq!(first.attempts, 1);

        let second = submit(&f.database, &f.attempts, f.student, f.course, &["Option A", "Option B"])
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.score, 2);
        assert_eq!(second.grade, Grade::Excellent);
        assert_eq!(second.attempts, 2);
        assert_eq!(
            get_response(&f.database, f.student, f.course).await.unwrap(),
            second
        );
    }

    #[tokio::test]
    async fn timed_attempt_submits_once() {
        let f = setup(true).await;
        let attempts = QuizAttempts::new(time::Duration::seconds(300));
        let view = start_attempt(&f.database, &attempts, f.student, f.course)
            .await
            .unwrap();
        assert_eq!(view.questions.len(), 2);
        assert!(view.result.is_none());

        answer_attempt(&attempts, f.student, f.course, 0, "Option A")
            .await
            .unwrap();
        let done = submit_attempt(&f.database, &attempts, f.student, f.course)
            .await
            .unwrap();
        assert!(!done.already_submitted);
        assert_eq!(done.result.outcome.score, 1);
        assert_eq!(done.result.trigger, Trigger::Manual);

        let again = submit_attempt(&f.database, &attempts, f.student, f.course)
            .await
            .unwrap();
        assert!(again.already_submitted);
        assert_eq!(again.result, done.result);
        let stored = get_response(&f.database, f.student, f.course).await.unwrap();
        assert_eq!(stored.attempts, 1);
        assert!(matches!(
            answer_attempt(&attempts, f.student, f.course, 1, "Option B").await,
            Err(Error::QuizClosed(_))
        ));
    }

    #[tokio::test]
    async fn timer_submits_unanswered_questions() {
        let f = setup(true).await;
        let attempts = QuizAttempts::new(time::Duration::milliseconds(200));
        start_attempt(&f.database, &attempts, f.student, f.course)
            .await
            .unwrap();
        answer_attempt(&attempts, f.student, f.course, 1, "Option B")
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(600)).await;

        let stored = get_response(&f.database, f.student, f.course).await.unwrap();
        assert_eq!(stored.score, 1);
        assert_eq!(stored.answers[0].user_answer, "");
        assert_eq!(stored.attempts, 1);

        let late = submit_attempt(&f.database, &attempts, f.student, f.course)
            .await
            .unwrap();
        assert!(late.already_submitted);
        assert_eq!(late.result.trigger, Trigger::Timeout);
        assert_eq!(
            get_response(&f.database, f.student, f.course)
                .await
                .unwrap()
                .attempts,
            1
        );
    }

    #[tokio::test]
    async fn attempt_needs_to_be_started() {
        let f = setup(true).await;
        let attempts = QuizAttempts::new(time::Duration::seconds(300));
        assert!(matches!(
            get_attempt(&attempts, f.student, f.course).await,
            Err(Error::NotFound("quiz attempt"))
        ));
    }

    #[tokio::test]
    async fn untimed_submission_closes_the_open_attempt() {
        let f = setup(true).await;
        let attempts = QuizAttempts::new(time::Duration::milliseconds(200));
        start_attempt(&f.database, &attempts, f.student, f.course)
            .await
            .unwrap();
        let submitted = submit(&f.database, &attempts, f.student, f.course, &["Option A", "Option B"])
            .await
            .unwrap();
        assert_eq!(submitted.score, 2);
        assert_eq!(submitted.attempts, 1);

        tokio::time::sleep(std::time::Duration::from_millis(600)).await;
        let stored = get_response(&f.database, f.student, f.course).await.unwrap();
        assert_eq!(stored, submitted);

        let view = get_attempt(&attempts, f.student, f.course).await.unwrap();
        let result = view.result.unwrap();
        assert_eq!(result.trigger, Trigger::Manual);
        assert_eq!(result.outcome.score, 2);
    }
}
