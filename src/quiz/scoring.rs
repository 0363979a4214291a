use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Question;

/// One question of a submitted quiz together with what the learner chose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    /// Empty when the question was left unanswered
    pub user_answer: String,
}

impl Answer {
    pub fn is_correct(&self) -> bool {
        self.user_answer == self.answer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    Excellent,
    Good,
    KeepPracticing,
}

impl Grade {
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            80..=u8::MAX => Grade::Excellent,
            60..=79 => Grade::Good,
            _ => Grade::KeepPracticing,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Grade::Excellent => "Excellent! You've mastered this topic.",
            Grade::Good => "Good job! You have a solid understanding.",
            Grade::KeepPracticing => "Keep practicing to improve your knowledge.",
        }
    }
}

/// Scored answers of one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub answers: Vec<Answer>,
    pub score: usize,
    pub total: usize,
    pub percentage: u8,
    pub grade: Grade,
    pub message: String,
}

impl QuizOutcome {
    pub fn from_answers(answers: Vec<Answer>) -> Self {
        let score = answers.iter().filter(|a| a.is_correct()).count();
        let total = answers.len();
        let percentage = score_percentage(score, total);
        let grade = Grade::from_percentage(percentage);
        QuizOutcome {
            answers,
            score,
            total,
            percentage,
            grade,
            message: grade.message().to_string(),
        }
    }
}

/// Pair every question with the learner's choice at the same index.
/// Missing choices count as the empty answer, surplus choices are dropped.
pub fn grade<S: AsRef<str>>(questions: &[Question], user_answers: &[S]) -> QuizOutcome {
    let answers = questions
        .iter()
        .enumerate()
        .map(|(i, q)| Answer {
            question: q.question.clone(),
            options: q.options.clone(),
            answer: q.answer.clone(),
            user_answer: user_answers
                .get(i)
                .map(|a| a.as_ref().to_string())
                .unwrap_or_default(),
        })
        .collect();
    QuizOutcome::from_answers(answers)
}

pub fn score_percentage(score: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (score.min(total) as f64 / total as f64 * 100.0).round() as u8
}
