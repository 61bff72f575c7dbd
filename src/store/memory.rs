// src/store/memory.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{RecordStore, StoreError, StoreResult};
use crate::models::{
    quiz_attempt::{NewQuizAttempt, QuizAttempt},
    user::{NewUser, User},
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    attempts: Vec<QuizAttempt>,
    next_user_id: i64,
    next_attempt_id: i64,
}

/// Process-local store used for development without PostgreSQL and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Clears a code pair when it has expired. Returns whether anything changed.
fn clear_if_expired(
    code: &mut Option<String>,
    expires_at: &mut Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match *expires_at {
        Some(exp) if exp <= now => {
            *code = None;
            *expires_at = None;
            true
        }
        _ => false,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("Email '{}'", user.email)));
        }
        tables.next_user_id += 1;
        let created = User {
            id: tables.next_user_id,
            name: user.name,
            email: user.email,
            password: user.password,
            google_id: user.google_id,
            otp: None,
            otp_expires_at: None,
            verification_code: user.verification_code,
            verification_expires_at: user.verification_expires_at,
            reset_token: None,
            reset_expires_at: None,
            is_verified: user.is_verified,
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| StoreError::Backend(format!("user {} does not exist", user.id)))?;
        *slot = user.clone();
        Ok(())
    }

    async fn find_attempts_by_email(&self, email: &str) -> StoreResult<Vec<QuizAttempt>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .filter(|a| a.email == email)
            .cloned()
            .collect())
    }

    async fn insert_attempt(&self, attempt: NewQuizAttempt) -> StoreResult<QuizAttempt> {
        let mut tables = self.tables.write().await;
        tables.next_attempt_id += 1;
        let created = QuizAttempt {
            id: tables.next_attempt_id,
            email: attempt.email,
            basic_quiz: attempt.basic_quiz,
            basic_quiz_marks: attempt.basic_quiz_marks,
            advance_quiz: attempt.advance_quiz,
            advance_quiz_marks: attempt.advance_quiz_marks,
            date: attempt.date,
        };
        tables.attempts.push(created.clone());
        Ok(created)
    }

    async fn save_attempt(&self, attempt: &QuizAttempt) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt.id)
            .ok_or_else(|| StoreError::Backend(format!("attempt {} does not exist", attempt.id)))?;
        *slot = attempt.clone();
        Ok(())
    }

    async fn clear_expired_codes(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut touched = 0;
        for user in tables.users.iter_mut() {
            let otp = clear_if_expired(&mut user.otp, &mut user.otp_expires_at, now);
            let verification = clear_if_expired(
                &mut user.verification_code,
                &mut user.verification_expires_at,
                now,
            );
            let reset = clear_if_expired(&mut user.reset_token, &mut user.reset_expires_at, now);
            if otp || verification || reset {
                touched += 1;
            }
        }
        Ok(touched)
    }
}
