// src/ledger.rs

//! Capped quiz-score ledger.
//!
//! Every user keeps at most `cap` attempts. Below the cap a submission always
//! appends a new attempt. At the cap only the lowest-scoring attempt for the
//! submitted quiz kind may change.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::quiz_attempt::{NewQuizAttempt, QuizAttempt, QuizKind};

/// Outcome of [`admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Append a new attempt.
    Insert,
    /// Overwrite score and date of the attempt with this id.
    ReplaceLowest { id: i64 },
    /// The candidate ties the lowest score: refresh only the date.
    UpdateDateOnly { id: i64 },
    /// The candidate is below every retained score.
    Reject,
}

/// What a caller has to persist for a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerWrite {
    Insert(NewQuizAttempt),
    Save(QuizAttempt),
}

impl Decision {
    /// Short machine-readable name, echoed to clients as `outcome`.
    pub fn outcome(self) -> &'static str {
        match self {
            Decision::Insert => "insert",
            Decision::ReplaceLowest { .. } => "replace_lowest",
            Decision::UpdateDateOnly { .. } => "update_date_only",
            Decision::Reject => "reject",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Decision::Insert => "New quiz entry added successfully!",
            Decision::ReplaceLowest { .. } => "Lowest score updated successfully!",
            Decision::UpdateDateOnly { .. } => {
                "Score equals the lowest existing score. Attempt date updated."
            }
            Decision::Reject => {
                "Score is not higher than the lowest existing score. No update performed."
            }
        }
    }

    /// Builds the single write the decision calls for, or `None` for `Reject`.
    ///
    /// `existing` must be the slice the decision was computed from.
    pub fn apply(
        self,
        existing: &[QuizAttempt],
        email: &str,
        kind: QuizKind,
        score: i32,
        today: NaiveDate,
    ) -> Option<LedgerWrite> {
        match self {
            Decision::Insert => Some(LedgerWrite::Insert(NewQuizAttempt::new(
                email, kind, score, today,
            ))),
            Decision::ReplaceLowest { id } => {
                let mut attempt = existing.iter().find(|a| a.id == id)?.clone();
                attempt.set_marks(kind, score);
                attempt.date = today;
                Some(LedgerWrite::Save(attempt))
            }
            Decision::UpdateDateOnly { id } => {
                let mut attempt = existing.iter().find(|a| a.id == id)?.clone();
                // A missing score counted as 0 is recorded when 0 is submitted.
                if attempt.marks(kind).is_none() {
                    attempt.set_marks(kind, score);
                }
                attempt.date = today;
                Some(LedgerWrite::Save(attempt))
            }
            Decision::Reject => None,
        }
    }
}

/// Decides how `candidate` enters a user's ledger.
///
/// A missing score for `kind` counts as 0. Ties on the minimum keep the first
/// attempt found. Counts above `cap` are handled like a full ledger.
pub fn admit(existing: &[QuizAttempt], kind: QuizKind, candidate: i32, cap: usize) -> Decision {
    if existing.len() < cap {
        return Decision::Insert;
    }

    let lowest = existing.iter().fold(None::<&QuizAttempt>, |min, attempt| match min {
        Some(m) if score_of(m, kind) <= score_of(attempt, kind) => Some(m),
        _ => Some(attempt),
    });

    let Some(lowest) = lowest else {
        // cap == 0 and nothing stored
        return Decision::Reject;
    };

    let lowest_score = score_of(lowest, kind);
    if candidate > lowest_score {
        Decision::ReplaceLowest { id: lowest.id }
    } else if candidate == lowest_score {
        Decision::UpdateDateOnly { id: lowest.id }
    } else {
        Decision::Reject
    }
}

fn score_of(attempt: &QuizAttempt, kind: QuizKind) -> i32 {
    attempt.marks(kind).unwrap_or(0)
}

/// Serialises ledger submissions per email inside this process.
///
/// Holding the guard across the find, decide and save steps prevents two
/// concurrent submissions for one user from computing against the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct LedgerLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl LedgerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, email: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = match self.inner.lock() {
                Ok(map) => map,
                Err(poisoned) => poisoned.into_inner(),
            };
            // Drop entries nobody is waiting on.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(email.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        match self.inner.lock() {
            Ok(map) => map.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn basic(id: i64, score: i32, date: NaiveDate) -> QuizAttempt {
        QuizAttempt {
            id,
            email: "u@example.com".into(),
            basic_quiz: true,
            basic_quiz_marks: Some(score),
            advance_quiz: false,
            advance_quiz_marks: None,
            date,
        }
    }

    fn full_ledger(cap: usize) -> Vec<QuizAttempt> {
        (0..cap)
            .map(|i| basic(i as i64 + 1, 50 + i as i32, day(1)))
            .collect()
    }

    #[test]
    fn below_cap_always_inserts() {
        for n in 0..5 {
            let existing = full_ledger(n);
            assert_eq!(admit(&existing, QuizKind::Basic, 0, 5), Decision::Insert);
            assert_eq!(admit(&existing, QuizKind::Basic, 999, 5), Decision::Insert);
        }
    }

    #[test]
    fn at_cap_higher_score_replaces_lowest() {
        let existing = full_ledger(3);
        let decision = admit(&existing, QuizKind::Basic, 51, 3);
        assert_eq!(decision, Decision::ReplaceLowest { id: 1 });

        let write = decision.apply(&existing, "u@example.com", QuizKind::Basic, 51, day(9));
        let Some(LedgerWrite::Save(saved)) = write else {
            panic!("expected a save");
        };
        assert_eq!(saved.id, 1);
        assert_eq!(saved.basic_quiz_marks, Some(51));
        assert_eq!(saved.date, day(9));
    }

    #[test]
    fn at_cap_equal_score_updates_date_only() {
        let existing = full_ledger(3);
        let decision = admit(&existing, QuizKind::Basic, 50, 3);
        assert_eq!(decision, Decision::UpdateDateOnly { id: 1 });

        let write = decision.apply(&existing, "u@example.com", QuizKind::Basic, 50, day(9));
        let Some(LedgerWrite::Save(saved)) = write else {
            panic!("expected a save");
        };
        assert_eq!(saved.basic_quiz_marks, Some(50));
        assert_eq!(saved.date, day(9));
    }

    #[test]
    fn at_cap_lower_score_is_rejected() {
        let existing = full_ledger(3);
        let decision = admit(&existing, QuizKind::Basic, 49, 3);
        assert_eq!(decision, Decision::Reject);
        assert_eq!(
            decision.apply(&existing, "u@example.com", QuizKind::Basic, 49, day(9)),
            None
        );
    }

    #[test]
    fn over_cap_behaves_like_full() {
        let existing = full_ledger(4);
        assert_eq!(
            admit(&existing, QuizKind::Basic, 60, 3),
            Decision::ReplaceLowest { id: 1 }
        );
    }

    #[test]
    fn tie_on_minimum_picks_first_found() {
        let existing = vec![basic(7, 10, day(1)), basic(8, 10, day(2)), basic(9, 30, day(3))];
        assert_eq!(
            admit(&existing, QuizKind::Basic, 20, 3),
            Decision::ReplaceLowest { id: 7 }
        );
    }

    #[test]
    fn policy_only_inspects_the_submitted_kind() {
        let mut advanced_only = basic(5, 0, day(1));
        advanced_only.basic_quiz = false;
        advanced_only.basic_quiz_marks = None;
        advanced_only.advance_quiz = true;
        advanced_only.advance_quiz_marks = Some(90);
        let existing = vec![basic(4, 40, day(1)), advanced_only];

        // The advanced-only record has no basic score, so it is the basic minimum.
        assert_eq!(
            admit(&existing, QuizKind::Basic, 1, 2),
            Decision::ReplaceLowest { id: 5 }
        );
        // For the advanced kind, the basic-only record is the minimum.
        assert_eq!(
            admit(&existing, QuizKind::Advance, 1, 2),
            Decision::ReplaceLowest { id: 4 }
        );
    }

    #[test]
    fn replacing_into_other_kind_makes_a_mixed_record() {
        let existing = vec![basic(4, 40, day(1))];
        let decision = admit(&existing, QuizKind::Advance, 12, 1);
        let Some(LedgerWrite::Save(saved)) =
            decision.apply(&existing, "u@example.com", QuizKind::Advance, 12, day(2))
        else {
            panic!("expected a save");
        };
        assert!(saved.basic_quiz && saved.advance_quiz);
        assert_eq!(saved.basic_quiz_marks, Some(40));
        assert_eq!(saved.advance_quiz_marks, Some(12));
    }

    #[test]
    fn zero_score_tying_a_missing_score_is_recorded() {
        let existing = vec![basic(4, 40, day(1))];
        let decision = admit(&existing, QuizKind::Advance, 0, 1);
        assert_eq!(decision, Decision::UpdateDateOnly { id: 4 });

        let Some(LedgerWrite::Save(saved)) =
            decision.apply(&existing, "u@example.com", QuizKind::Advance, 0, day(2))
        else {
            panic!("expected a save");
        };
        assert!(saved.advance_quiz);
        assert_eq!(saved.advance_quiz_marks, Some(0));
        assert_eq!(saved.basic_quiz_marks, Some(40));
        assert_eq!(saved.date, day(2));
    }

    #[test]
    fn zero_cap_with_empty_ledger_rejects() {
        assert_eq!(admit(&[], QuizKind::Basic, 10, 0), Decision::Reject);
    }

    #[test]
    fn insert_builds_a_record_for_today() {
        let write = Decision::Insert.apply(&[], "u@example.com", QuizKind::Basic, 8, day(4));
        assert_eq!(
            write,
            Some(LedgerWrite::Insert(NewQuizAttempt::new(
                "u@example.com",
                QuizKind::Basic,
                8,
                day(4)
            )))
        );
    }

    #[tokio::test]
    async fn locks_serialize_the_same_email() {
        let locks = LedgerLocks::new();
        let guard = locks.acquire("a@example.com").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire("a@example.com").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // A different email is not blocked.
        let _other = locks.acquire("b@example.com").await;

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn idle_locks_are_pruned() {
        let locks = LedgerLocks::new();
        drop(locks.acquire("a@example.com").await);
        drop(locks.acquire("b@example.com").await);
        let _held = locks.acquire("c@example.com").await;
        assert_eq!(locks.tracked(), 1);
    }
}
