// src/store/postgres.rs

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, postgres::PgPoolOptions};

use super::{RecordStore, StoreError, StoreResult};
use crate::models::{
    quiz_attempt::{NewQuizAttempt, QuizAttempt},
    user::{NewUser, User},
};

const USER_COLUMNS: &str = r#"
    id, name, email, password, google_id,
    otp, otp_expires_at,
    verification_code, verification_expires_at,
    reset_token, reset_expires_at,
    is_verified, created_at
"#;

const ATTEMPT_COLUMNS: &str =
    "id, email, basic_quiz, basic_quiz_marks, advance_quiz, advance_quiz_marks, date";

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with retries, then applies the embedded migrations.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let mut retry_count = 0;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    retry_count += 1;
                    if retry_count > 5 {
                        return Err(StoreError::Backend(format!(
                            "failed to connect to database after 5 retries: {e}"
                        )));
                    }
                    tracing::warn!(
                        "Database not ready, retrying in 2s... (Attempt {})",
                        retry_count
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };
        tracing::info!("Database connected...");

        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        tracing::info!("Migrations applied successfully.");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE reset_token = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users
                (name, email, password, google_id,
                 verification_code, verification_expires_at, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.google_id)
            .bind(&user.verification_code)
            .bind(user.verification_expires_at)
            .bind(user.is_verified)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db) = &e {
                    if db.is_unique_violation() {
                        return StoreError::Duplicate(format!("Email '{}'", user.email));
                    }
                }
                tracing::error!("Failed to insert user: {:?}", e);
                StoreError::from(e)
            })
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                name = $2,
                password = $3,
                google_id = $4,
                otp = $5,
                otp_expires_at = $6,
                verification_code = $7,
                verification_expires_at = $8,
                reset_token = $9,
                reset_expires_at = $10,
                is_verified = $11
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.password)
        .bind(&user.google_id)
        .bind(&user.otp)
        .bind(user.otp_expires_at)
        .bind(&user.verification_code)
        .bind(user.verification_expires_at)
        .bind(&user.reset_token)
        .bind(user.reset_expires_at)
        .bind(user.is_verified)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_attempts_by_email(&self, email: &str) -> StoreResult<Vec<QuizAttempt>> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE email = $1 ORDER BY id");
        let attempts = sqlx::query_as::<_, QuizAttempt>(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await?;
        Ok(attempts)
    }

    async fn insert_attempt(&self, attempt: NewQuizAttempt) -> StoreResult<QuizAttempt> {
        let sql = format!(
            r#"
            INSERT INTO quiz_attempts
                (email, basic_quiz, basic_quiz_marks, advance_quiz, advance_quiz_marks, date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ATTEMPT_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, QuizAttempt>(&sql)
            .bind(&attempt.email)
            .bind(attempt.basic_quiz)
            .bind(attempt.basic_quiz_marks)
            .bind(attempt.advance_quiz)
            .bind(attempt.advance_quiz_marks)
            .bind(attempt.date)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn save_attempt(&self, attempt: &QuizAttempt) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE quiz_attempts SET
                basic_quiz = $2,
                basic_quiz_marks = $3,
                advance_quiz = $4,
                advance_quiz_marks = $5,
                date = $6
            WHERE id = $1
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.basic_quiz)
        .bind(attempt.basic_quiz_marks)
        .bind(attempt.advance_quiz)
        .bind(attempt.advance_quiz_marks)
        .bind(attempt.date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_expired_codes(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                otp = CASE WHEN otp_expires_at <= $1 THEN NULL ELSE otp END,
                otp_expires_at = CASE WHEN otp_expires_at <= $1 THEN NULL ELSE otp_expires_at END,
                verification_code = CASE WHEN verification_expires_at <= $1
                    THEN NULL ELSE verification_code END,
                verification_expires_at = CASE WHEN verification_expires_at <= $1
                    THEN NULL ELSE verification_expires_at END,
                reset_token = CASE WHEN reset_expires_at <= $1 THEN NULL ELSE reset_token END,
                reset_expires_at = CASE WHEN reset_expires_at <= $1
                    THEN NULL ELSE reset_expires_at END
            WHERE otp_expires_at <= $1
               OR verification_expires_at <= $1
               OR reset_expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
