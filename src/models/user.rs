// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    pub name: String,

    /// Unique, lower-cased email address.
    pub email: String,

    /// Argon2 password hash. `None` for accounts created through Google sign-in.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: Option<String>,

    /// Google `sub` identifier once the account has signed in with Google.
    #[serde(skip)]
    pub google_id: Option<String>,

    #[serde(skip)]
    pub otp: Option<String>,
    #[serde(skip)]
    pub otp_expires_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub verification_code: Option<String>,
    #[serde(skip)]
    pub verification_expires_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub reset_token: Option<String>,
    #[serde(skip)]
    pub reset_expires_at: Option<DateTime<Utc>>,

    /// Whether the email address has been confirmed.
    pub is_verified: bool,

    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a user. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub google_id: Option<String>,
    pub verification_code: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
    pub is_verified: bool,
}

impl User {
    /// Returns true when `code` matches the pending OTP and it has not expired at `now`.
    pub fn otp_matches(&self, code: &str, now: DateTime<Utc>) -> bool {
        code_is_valid(self.otp.as_deref(), self.otp_expires_at, code, now)
    }

    pub fn verification_matches(&self, code: &str, now: DateTime<Utc>) -> bool {
        code_is_valid(
            self.verification_code.as_deref(),
            self.verification_expires_at,
            code,
            now,
        )
    }

    pub fn reset_token_valid(&self, now: DateTime<Utc>) -> bool {
        matches!(self.reset_expires_at, Some(exp) if exp > now) && self.reset_token.is_some()
    }

    pub fn clear_otp(&mut self) {
        self.otp = None;
        self.otp_expires_at = None;
    }

    pub fn clear_verification(&mut self) {
        self.verification_code = None;
        self.verification_expires_at = None;
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_token = None;
        self.reset_expires_at = None;
    }
}

/// Expiry is checked against the stored timestamp, independent of the sweep.
fn code_is_valid(
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    candidate: &str,
    now: DateTime<Utc>,
) -> bool {
    match (stored, expires_at) {
        (Some(stored), Some(exp)) => !stored.is_empty() && stored == candidate && exp > now,
        _ => false,
    }
}

/// Lower-cases and trims an email so lookups are stable.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// DTO for creating a new account (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for password login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 16))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 16))]
    pub code: String,
}

/// DTO carrying only an email (forgot password, resend verification).
#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, max = 256))]
    pub token: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
}

/// Returned after a successful OTP or Google sign-in.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub email: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> User {
        User {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: None,
            google_id: None,
            otp: None,
            otp_expires_at: None,
            verification_code: None,
            verification_expires_at: None,
            reset_token: None,
            reset_expires_at: None,
            is_verified: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn otp_rejected_after_expiry_even_if_not_swept() {
        let now = Utc::now();
        let mut u = user();
        u.otp = Some("123456".into());
        u.otp_expires_at = Some(now - Duration::seconds(1));
        assert!(!u.otp_matches("123456", now));
    }

    #[test]
    fn otp_accepted_before_expiry() {
        let now = Utc::now();
        let mut u = user();
        u.otp = Some("123456".into());
        u.otp_expires_at = Some(now + Duration::seconds(30));
        assert!(u.otp_matches("123456", now));
        assert!(!u.otp_matches("654321", now));
    }

    #[test]
    fn cleared_verification_never_matches() {
        let now = Utc::now();
        let mut u = user();
        u.verification_code = Some("111111".into());
        u.verification_expires_at = Some(now + Duration::minutes(5));
        u.clear_verification();
        assert!(!u.verification_matches("111111", now));
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
