// src/models/quiz_attempt.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::config::MAX_QUIZ_SCORE;

/// The two quiz kinds tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizKind {
    Basic,
    Advance,
}

impl QuizKind {
    pub fn label(self) -> &'static str {
        match self {
            QuizKind::Basic => "basic",
            QuizKind::Advance => "advance",
        }
    }
}

/// Represents the 'quiz_attempts' table in the database.
/// One row can hold a basic score, an advanced score, or both.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,

    /// Owner, matched by value against `users.email`.
    pub email: String,

    pub basic_quiz: bool,
    pub basic_quiz_marks: Option<i32>,

    pub advance_quiz: bool,
    pub advance_quiz_marks: Option<i32>,

    /// Day of the attempt (UTC).
    pub date: NaiveDate,
}

impl QuizAttempt {
    /// Score recorded for `kind`, if any.
    pub fn marks(&self, kind: QuizKind) -> Option<i32> {
        match kind {
            QuizKind::Basic => self.basic_quiz_marks,
            QuizKind::Advance => self.advance_quiz_marks,
        }
    }

    /// Records `score` for `kind` and marks the kind as taken.
    pub fn set_marks(&mut self, kind: QuizKind, score: i32) {
        match kind {
            QuizKind::Basic => {
                self.basic_quiz = true;
                self.basic_quiz_marks = Some(score);
            }
            QuizKind::Advance => {
                self.advance_quiz = true;
                self.advance_quiz_marks = Some(score);
            }
        }
    }
}

/// Fields needed to create an attempt. The store assigns `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuizAttempt {
    pub email: String,
    pub basic_quiz: bool,
    pub basic_quiz_marks: Option<i32>,
    pub advance_quiz: bool,
    pub advance_quiz_marks: Option<i32>,
    pub date: NaiveDate,
}

impl NewQuizAttempt {
    pub fn new(email: &str, kind: QuizKind, score: i32, date: NaiveDate) -> Self {
        let (basic, advance) = match kind {
            QuizKind::Basic => (Some(score), None),
            QuizKind::Advance => (None, Some(score)),
        };
        Self {
            email: email.to_string(),
            basic_quiz: basic.is_some(),
            basic_quiz_marks: basic,
            advance_quiz: advance.is_some(),
            advance_quiz_marks: advance,
            date,
        }
    }
}

/// DTO for submitting a quiz score.
#[derive(Debug, Deserialize, Validate)]
pub struct SaveQuizRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(range(min = 0, max = MAX_QUIZ_SCORE, message = "Score is out of range."))]
    pub score: i32,
}

/// DTO for requests identified by email (body or query string).
#[derive(Debug, Deserialize, Validate)]
pub struct EmailQuery {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
}

/// A score for display: a number, or the `"--"` sentinel when never attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Marks {
    Score(i32),
    NotAttempted(&'static str),
}

impl Marks {
    pub const SENTINEL: &'static str = "--";

    pub fn from_option(marks: Option<i32>) -> Self {
        marks.map_or(Marks::NotAttempted(Self::SENTINEL), Marks::Score)
    }
}

/// Response body of `/fetchquizscores`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizScores {
    #[serde(rename = "BasicQuizMarks")]
    pub basic_quiz_marks: i32,
    #[serde(rename = "AdvanceQuizMarks")]
    pub advance_quiz_marks: Marks,
}

/// One ranked row of `/quiz-history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// 1-based position after ranking.
    pub attempt: usize,
    #[serde(rename = "BasicQuiz")]
    pub basic_quiz: bool,
    #[serde(rename = "BasicQuizMarks")]
    pub basic_quiz_marks: i32,
    #[serde(rename = "AdvanceQuiz")]
    pub advance_quiz: bool,
    #[serde(rename = "AdvanceQuizMarks")]
    pub advance_quiz_marks: Marks,
    pub date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_attempt_sets_only_the_submitted_kind() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let a = NewQuizAttempt::new("a@b.c", QuizKind::Advance, 7, date);
        assert!(!a.basic_quiz);
        assert_eq!(a.basic_quiz_marks, None);
        assert!(a.advance_quiz);
        assert_eq!(a.advance_quiz_marks, Some(7));
    }

    #[test]
    fn marks_serialize_as_number_or_sentinel() {
        let scores = QuizScores {
            basic_quiz_marks: 0,
            advance_quiz_marks: Marks::from_option(None),
        };
        let value = serde_json::to_value(&scores).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"BasicQuizMarks": 0, "AdvanceQuizMarks": "--"})
        );
        assert_eq!(
            serde_json::to_value(Marks::from_option(Some(12))).unwrap(),
            serde_json::json!(12)
        );
    }
}
