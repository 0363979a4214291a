use std::sync::Arc;

use moka::{
    Entry,
    future::Cache,
    ops::compute::{CompResult, Op},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use super::{
    Question, QuestionView, Quiz,
    scoring::{self, QuizOutcome},
};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    Manual,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinishedAttempt {
    pub outcome: QuizOutcome,
    pub trigger: Trigger,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

/// Result of a finish request, only `Submitted` must be persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum Finish {
    Submitted(FinishedAttempt),
    AlreadySubmitted(FinishedAttempt),
}

impl Finish {
    pub fn attempt(&self) -> &FinishedAttempt {
        match self {
            Finish::Submitted(done) | Finish::AlreadySubmitted(done) => done,
        }
    }
}

/// A timed run through a quiz. It ends exactly once, either by the learner
/// or by the countdown, and unanswered questions then count as wrong.
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    user_id: i64,
    course_id: i64,
    questions: Vec<Question>,
    answers: Vec<Option<String>>,
    started_at: OffsetDateTime,
    deadline: OffsetDateTime,
    finished: Option<FinishedAttempt>,
}

impl QuizAttempt {
    pub fn start(
        user_id: i64,
        quiz: &Quiz,
        started_at: OffsetDateTime,
        time_limit: time::Duration,
    ) -> Self {
        Self {
            user_id,
            course_id: quiz.course_id,
            questions: quiz.questions.clone(),
            answers: vec![None; quiz.questions.len()],
            started_at,
            deadline: started_at + time_limit,
            finished: None,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn course_id(&self) -> i64 {
        self.course_id
    }

    pub fn deadline(&self) -> OffsetDateTime {
        self.deadline
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.deadline
    }

    pub fn is_submitted(&self) -> bool {
        self.finished.is_some()
    }

    pub fn remaining(&self, now: OffsetDateTime) -> time::Duration {
        let remaining = self.deadline - now;
        if remaining.is_negative() {
            time::Duration::ZERO
        } else {
            remaining
        }
    }

    pub fn answer(&mut self, index: usize, option: &str, now: OffsetDateTime) -> Result<()> {
        if self.is_submitted() {
            return Err(Error::QuizClosed("already submitted"));
        }
        if self.is_expired(now) {
            return Err(Error::QuizClosed("time is up"));
        }
        let question = self
            .questions
            .get(index)
            .ok_or_else(|| Error::validation(format!("no question at index {index}")))?;
        if !question.options.iter().any(|o| o == option) {
            return Err(Error::validation(format!(
                "\"{option}\" is not an option of question {index}"
            )));
        }
        self.answers[index] = Some(option.to_string());
        Ok(())
    }

    pub fn finish(&mut self, now: OffsetDateTime, trigger: Trigger) -> Finish {
        if let Some(done) = &self.finished {
            return Finish::AlreadySubmitted(done.clone());
        }
        let answers: Vec<&str> = self
            .answers
            .iter()
            .map(|a| a.as_deref().unwrap_or_default())
            .collect();
        let done = FinishedAttempt {
            outcome: scoring::grade(&self.questions, &answers),
            trigger,
            finished_at: now,
        };
        self.finished = Some(done.clone());
        Finish::Submitted(done)
    }

    /// Close the attempt with an outcome graded elsewhere, so its timer
    /// has nothing left to store.
    pub fn settle(&mut self, outcome: QuizOutcome, now: OffsetDateTime) -> Result<Finish> {
        if let Some(done) = &self.finished {
            return Ok(Finish::AlreadySubmitted(done.clone()));
        }
        if self.is_expired(now) {
            return Err(Error::QuizClosed("time is up"));
        }
        self.answers = outcome
            .answers
            .iter()
            .map(|a| (!a.user_answer.is_empty()).then(|| a.user_answer.clone()))
            .collect();
        let done = FinishedAttempt {
            outcome,
            trigger: Trigger::Manual,
            finished_at: now,
        };
        self.finished = Some(done.clone());
        Ok(Finish::Submitted(done))
    }

    pub fn view(&self, now: OffsetDateTime) -> AttemptView {
        AttemptView {
            course_id: self.course_id,
            questions: self.questions.iter().map(QuestionView::from).collect(),
            answers: self.answers.clone(),
            started_at: self.started_at,
            deadline: self.deadline,
            remaining_secs: self.remaining(now).whole_seconds(),
            result: self.finished.clone(),
        }
    }
}

/// What the learner sees of a running or finished attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttemptView {
    pub course_id: i64,
    pub questions: Vec<QuestionView>,
    pub answers: Vec<Option<String>>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    pub remaining_secs: i64,
    pub result: Option<FinishedAttempt>,
}

type AttemptKey = (i64, i64);
pub type SharedAttempt = Arc<Mutex<QuizAttempt>>;

/// Open attempts keyed by (user, course); entries expire well after their deadline.
#[derive(Clone)]
pub struct QuizAttempts {
    cache: Cache<AttemptKey, SharedAttempt>,
    time_limit: time::Duration,
}

impl QuizAttempts {
    pub fn new(time_limit: time::Duration) -> Self {
        let ttl = (time_limit * 2i32 + time::Duration::minutes(1)).unsigned_abs();
        Self {
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
            time_limit,
        }
    }

    pub fn time_limit(&self) -> time::Duration {
        self.time_limit
    }

    pub async fn get(&self, user_id: i64, course_id: i64) -> Option<SharedAttempt> {
        self.cache.get(&(user_id, course_id)).await
    }

    /// Resume the open attempt, or start a new one when there is none or the
    /// previous one was submitted. The flag tells whether the attempt is new.
    pub async fn start(
        &self,
        user_id: i64,
        quiz: &Quiz,
        now: OffsetDateTime,
    ) -> (SharedAttempt, bool) {
        let fresh = Arc::new(Mutex::new(QuizAttempt::start(
            user_id,
            quiz,
            now,
            self.time_limit,
        )));
        let result = self
            .cache
            .entry((user_id, quiz.course_id))
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if !entry.value().lock().is_submitted() => Op::Nop,
                    _ => Op::Put(fresh.clone()),
                };
                std::future::ready(op)
            })
            .await;
        match result {
            CompResult::Unchanged(entry) => (entry.into_value(), false),
            other => (other.into_entry().map(Entry::into_value).unwrap_or(fresh), true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz() -> Quiz {
        let question = |n: usize, answer: &str| Question {
            question: format!("Question number {n}"),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            answer: answer.to_string(),
        };
        Quiz {
            id: 1,
            course_id: 9,
            questions: vec![question(1, "A"), question(2, "B"), question(3, "C")],
        }
    }

    fn t0() -> OffsetDateTime {
        time::macros::datetime!(2025-04-01 12:00 UTC)
    }

    #[test]
    fn answers_are_scored_on_finish() {
        let mut attempt = QuizAttempt::start(1, &quiz(), t0(), time::Duration::seconds(300));
        attempt.answer(0, "A", t0()).unwrap();
        attempt.answer(1, "C", t0()).unwrap();
        attempt.answer(1, "B", t0()).unwrap();
        let Finish::Submitted(done) = attempt.finish(t0(), Trigger::Manual) else {
            panic!("first finish must submit");
        };
        assert_eq!(done.outcome.score, 2);
        assert_eq!(done.outcome.answers[2].user_answer, "");
        assert!(matches!(
            attempt.answer(2, "C", t0()),
            Err(Error::QuizClosed(_))
        ));
    }

    #[test]
    fn invalid_answers_are_rejected() {
        let mut attempt = QuizAttempt::start(1, &quiz(), t0(), time::Duration::seconds(300));
        assert!(matches!(
            attempt.answer(5, "A", t0()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            attempt.answer(0, "Z", t0()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn countdown_closes_the_attempt() {
        let limit = time::Duration::seconds(300);
        let mut attempt = QuizAttempt::start(1, &quiz(), t0(), limit);
        assert_eq!(attempt.remaining(t0()), limit);
        let late = t0() + limit;
        assert!(attempt.is_expired(late));
        assert_eq!(attempt.remaining(late + time::Duration::seconds(5)), time::Duration::ZERO);
        assert!(matches!(
            attempt.answer(0, "A", late),
            Err(Error::QuizClosed(_))
        ));
        let finish = attempt.finish(late, Trigger::Timeout);
        assert!(matches!(finish, Finish::Submitted(_)));
        assert_eq!(finish.attempt().outcome.score, 0);
    }

    #[test]
    fn finish_happens_once() {
        let mut attempt = QuizAttempt::start(1, &quiz(), t0(), time::Duration::seconds(300));
        let first = attempt.finish(t0(), Trigger::Timeout);
        let second = attempt.finish(t0(), Trigger::Manual);
        assert!(matches!(first, Finish::Submitted(_)));
        assert!(matches!(second, Finish::AlreadySubmitted(_)));
        assert_eq!(first.attempt(), second.attempt());
        assert_eq!(second.attempt().trigger, Trigger::Timeout);
    }

    #[test]
    fn concurrent_finishers_submit_once() {
        for _ in 0..50 {
            let attempt: SharedAttempt = Arc::new(Mutex::new(QuizAttempt::start(
                1,
                &quiz(),
                t0(),
                time::Duration::seconds(300),
            )));
            let handles: Vec<_> = [Trigger::Timeout, Trigger::Manual, Trigger::Manual]
                .into_iter()
                .map(|trigger| {
                    let attempt = attempt.clone();
                    std::thread::spawn(move || attempt.lock().finish(t0(), trigger))
                })
                .collect();
            let submitted = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|f| matches!(f, Finish::Submitted(_)))
                .count();
            assert_eq!(submitted, 1);
        }
    }

    #[tokio::test]
    async fn start_resumes_then_retakes() {
        let attempts = QuizAttempts::new(time::Duration::seconds(300));
        let (first, fresh) = attempts.start(1, &quiz(), t0()).await;
        assert!(fresh);
        first.lock().answer(0, "A", t0()).unwrap();

        let (resumed, fresh) = attempts.start(1, &quiz(), t0()).await;
        assert!(!fresh);
        assert!(Arc::ptr_eq(&first, &resumed));

        let finish = first.lock().finish(t0(), Trigger::Manual);
        assert!(matches!(finish, Finish::Submitted(_)));
        let (retake, fresh) = attempts.start(1, &quiz(), t0()).await;
        assert!(fresh);
        assert!(!Arc::ptr_eq(&first, &retake));
        assert!(!retake.lock().is_submitted());
        let current = attempts.get(1, 9).await.unwrap();
        assert!(Arc::ptr_eq(&current, &retake));

        // other learners have their own attempt
        let (other, fresh) = attempts.start(2, &quiz(), t0()).await;
        assert!(fresh);
        assert!(!Arc::ptr_eq(&other, &retake));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_retakes_start_one_attempt() {
        for _ in 0..20 {
            let attempts = QuizAttempts::new(time::Duration::seconds(300));
            let (first, _) = attempts.start(1, &quiz(), t0()).await;
            first.lock().finish(t0(), Trigger::Manual);

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let attempts = attempts.clone();
                    tokio::spawn(async move { attempts.start(1, &quiz(), t0()).await })
                })
                .collect();
            let mut started = Vec::new();
            for handle in handles {
                started.push(handle.await.unwrap());
            }
            assert_eq!(started.iter().filter(|(_, fresh)| *fresh).count(), 1);
            let current = attempts.get(1, 9).await.unwrap();
            assert!(started.iter().all(|(a, _)| Arc::ptr_eq(a, &current)));
            assert!(!current.lock().is_submitted());
        }
    }

    #[test]
    fn settle_closes_an_open_attempt() {
        let questions = quiz().questions;
        let mut attempt = QuizAttempt::start(1, &quiz(), t0(), time::Duration::seconds(300));
        let outcome = scoring::grade(&questions, &["A", "B"]);
        let finish = attempt.settle(outcome, t0()).unwrap();
        assert!(matches!(finish, Finish::Submitted(_)));
        assert_eq!(finish.attempt().outcome.score, 2);
        assert_eq!(attempt.view(t0()).answers[1].as_deref(), Some("B"));
        assert!(matches!(
            attempt.finish(t0(), Trigger::Timeout),
            Finish::AlreadySubmitted(_)
        ));

        let mut late = QuizAttempt::start(1, &quiz(), t0(), time::Duration::seconds(300));
        let outcome = scoring::grade(&questions, &["A"]);
        assert!(matches!(
            late.settle(outcome, t0() + time::Duration::seconds(300)),
            Err(Error::QuizClosed(_))
        ));
    }
}
