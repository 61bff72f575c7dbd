// src/ranking.rs

use crate::models::quiz_attempt::{HistoryEntry, Marks, QuizAttempt, QuizScores};

/// Number of attempts shown by `/quiz-history`.
pub const HISTORY_LIMIT: usize = 3;

/// Basic plus advanced score, absent scores counting as zero.
pub fn combined_score(attempt: &QuizAttempt) -> i64 {
    i64::from(attempt.basic_quiz_marks.unwrap_or(0))
        + i64::from(attempt.advance_quiz_marks.unwrap_or(0))
}

/// Ranks attempts by combined score, then by date, both descending, and keeps the top three.
///
/// The sort is stable: attempts with equal score and date keep their input order.
pub fn rank_top3(attempts: &[QuizAttempt]) -> Vec<HistoryEntry> {
    let mut ranked: Vec<&QuizAttempt> = attempts.iter().collect();
    ranked.sort_by(|a, b| {
        combined_score(b)
            .cmp(&combined_score(a))
            .then_with(|| b.date.cmp(&a.date))
    });

    ranked
        .into_iter()
        .take(HISTORY_LIMIT)
        .enumerate()
        .map(|(i, a)| HistoryEntry {
            attempt: i + 1,
            basic_quiz: a.basic_quiz,
            basic_quiz_marks: a.basic_quiz_marks.unwrap_or(0),
            advance_quiz: a.advance_quiz,
            advance_quiz_marks: Marks::from_option(a.advance_quiz_marks),
            date: a.date,
        })
        .collect()
}

/// Best score per quiz kind across all attempts.
pub fn max_scores(attempts: &[QuizAttempt]) -> QuizScores {
    let basic = attempts
        .iter()
        .filter_map(|a| a.basic_quiz_marks)
        .max()
        .unwrap_or(0);
    let advance = attempts.iter().filter_map(|a| a.advance_quiz_marks).max();

    QuizScores {
        basic_quiz_marks: basic,
        advance_quiz_marks: Marks::from_option(advance),
    }
}
