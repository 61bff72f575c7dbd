// src/store/mod.rs

//! Record store for users and quiz attempts.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    quiz_attempt::{NewQuizAttempt, QuizAttempt},
    user::{NewUser, User},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug)]
pub enum StoreError {
    /// A uniqueness constraint was violated. Carries a description of the clashing value.
    Duplicate(String),
    /// The backend failed.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Duplicate(what) => write!(f, "duplicate: {what}"),
            StoreError::Backend(msg) => write!(f, "store backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations used by the handlers.
///
/// Attempts are matched to users by email value. `find_attempts_by_email`
/// returns attempts in insertion order.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>>;

    /// Creates a user. Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    /// Overwrites every mutable field of the user with the same id.
    async fn save_user(&self, user: &User) -> StoreResult<()>;

    async fn find_attempts_by_email(&self, email: &str) -> StoreResult<Vec<QuizAttempt>>;

    async fn insert_attempt(&self, attempt: NewQuizAttempt) -> StoreResult<QuizAttempt>;

    /// Overwrites scores, flags and date of the attempt with the same id.
    async fn save_attempt(&self, attempt: &QuizAttempt) -> StoreResult<()>;

    /// Clears OTPs, verification codes and reset tokens whose expiry is at or before `now`.
    /// Returns the number of users touched.
    async fn clear_expired_codes(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}
