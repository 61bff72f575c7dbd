// src/handlers/auth.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use chrono::{Duration, Utc};
use serde_json::json;

use crate::{
    config::Config,
    error::AppError,
    extract::ValidJson,
    mailer::{Email, dispatch},
    models::user::{
        EmailRequest, LoginRequest, NewUser, ResetPasswordRequest, SignupRequest, TokenResponse,
        VerifyEmailRequest, VerifyOtpRequest, normalize_email,
    },
    state::{SharedMailer, SharedStore},
    utils::{
        html::escape_text,
        jwt::{Claims, sign_jwt},
        secrets::{generate_code, generate_token, hash_password, verify_password},
    },
};

/// Page served at the emailed reset link. It posts JSON to `POST /reset-password`.
const RESET_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Reset password</title>
</head>
<body>
<h1>Choose a new password</h1>
<form id="reset">
<input type="hidden" name="token" value="__TOKEN__">
<label>New password <input type="password" name="password" minlength="6" maxlength="128" required></label>
<button type="submit">Reset password</button>
</form>
<p id="result"></p>
<script>
document.getElementById("reset").addEventListener("submit", async (event) => {
  event.preventDefault();
  const form = event.target;
  const response = await fetch("/reset-password", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ token: form.token.value, password: form.password.value }),
  });
  const body = await response.json();
  document.getElementById("result").textContent = body.message || body.error;
});
</script>
</body>
</html>
"#;

/// Whole minutes for email copy, never below one.
fn minutes(seconds: i64) -> i64 {
    (seconds / 60).max(1)
}

/// Registers a new account and emails a verification code.
///
/// Returns 201 Created. The account cannot log in until the code is confirmed.
pub async fn signup(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    State(mailer): State<SharedMailer>,
    ValidJson(payload): ValidJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email);
    let hashed_password = hash_password(&payload.password)?;
    let code = generate_code();

    let user = store
        .insert_user(NewUser {
            name: payload.name.trim().to_string(),
            email,
            password: Some(hashed_password),
            google_id: None,
            verification_code: Some(code.clone()),
            verification_expires_at: Some(
                Utc::now() + Duration::seconds(config.verification_ttl_seconds),
            ),
            is_verified: false,
        })
        .await?;

    tracing::info!(email = %user.email, "User registered");
    dispatch(
        mailer,
        Email::verification_code(
            &user.email,
            &user.name,
            &code,
            minutes(config.verification_ttl_seconds),
        ),
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Signup successful. Check your email for the verification code.",
            "email": user.email,
        })),
    ))
}

/// Confirms the emailed verification code.
pub async fn verify_email(
    State(store): State<SharedStore>,
    ValidJson(payload): ValidJson<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email);
    let mut user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if user.is_verified {
        return Ok(Json(json!({ "message": "Email already verified" })));
    }

    if !user.verification_matches(payload.code.trim(), Utc::now()) {
        return Err(AppError::NotFound(
            "Invalid or expired verification code".to_string(),
        ));
    }

    user.is_verified = true;
    user.clear_verification();
    store.save_user(&user).await?;

    tracing::info!(email = %user.email, "Email verified");
    Ok(Json(json!({ "message": "Email verified successfully" })))
}

/// Issues a fresh verification code for an unverified account.
pub async fn resend_verification(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    State(mailer): State<SharedMailer>,
    ValidJson(payload): ValidJson<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email);
    let mut user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if user.is_verified {
        return Err(AppError::BadRequest("Email already verified".to_string()));
    }

    let code = generate_code();
    user.verification_code = Some(code.clone());
    user.verification_expires_at =
        Some(Utc::now() + Duration::seconds(config.verification_ttl_seconds));
    store.save_user(&user).await?;

    dispatch(
        mailer,
        Email::verification_code(
            &user.email,
            &user.name,
            &code,
            minutes(config.verification_ttl_seconds),
        ),
    );

    Ok(Json(json!({ "message": "Verification code sent" })))
}

/// First login step: checks the password and emails a one-time passcode.
pub async fn login(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    State(mailer): State<SharedMailer>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email);
    let mut user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let password_hash = user.password.as_deref().ok_or(AppError::BadRequest(
        "This account uses Google sign-in".to_string(),
    ))?;

    if !verify_password(&payload.password, password_hash)? {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    if !user.is_verified {
        return Err(AppError::AuthError("Email not verified".to_string()));
    }

    let otp = generate_code();
    user.otp = Some(otp.clone());
    user.otp_expires_at = Some(Utc::now() + Duration::seconds(config.otp_ttl_seconds));
    store.save_user(&user).await?;

    dispatch(
        mailer,
        Email::login_otp(&user.email, &user.name, &otp, minutes(config.otp_ttl_seconds)),
    );

    Ok(Json(json!({ "message": "OTP sent to your email" })))
}

/// Second login step: exchanges a valid OTP for a bearer token.
///
/// Validity is decided by the stored expiry timestamp, whether or not the
/// background sweep has already cleared the code.
pub async fn verify_otp(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    ValidJson(payload): ValidJson<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email);
    let invalid = || AppError::NotFound("Invalid or expired OTP".to_string());

    let mut user = store.find_user_by_email(&email).await?.ok_or_else(invalid)?;

    if !user.otp_matches(payload.otp.trim(), Utc::now()) {
        return Err(invalid());
    }

    user.clear_otp();
    store.save_user(&user).await?;

    let token = sign_jwt(
        &user.email,
        &user.name,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    tracing::info!(email = %user.email, "User logged in");
    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer",
        email: user.email,
        name: user.name,
    }))
}

/// Emails a password reset link.
pub async fn forgot_password(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    State(mailer): State<SharedMailer>,
    ValidJson(payload): ValidJson<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email);
    let mut user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let token = generate_token();
    user.reset_token = Some(token.clone());
    user.reset_expires_at = Some(Utc::now() + Duration::seconds(config.reset_token_ttl_seconds));
    store.save_user(&user).await?;

    let link = format!("{}/reset-password/{}", config.public_base_url, token);
    dispatch(
        mailer,
        Email::password_reset(
            &user.email,
            &user.name,
            &link,
            minutes(config.reset_token_ttl_seconds),
        ),
    );

    Ok(Json(json!({ "message": "Password reset link sent to your email" })))
}

/// Landing page of the emailed reset link.
///
/// Unknown or expired tokens get the same 404 as `reset_password`.
pub async fn reset_password_page(
    State(store): State<SharedStore>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = store.find_user_by_reset_token(&token).await?;
    if !user.is_some_and(|user| user.reset_token_valid(Utc::now())) {
        return Err(AppError::NotFound(
            "Invalid or expired reset link".to_string(),
        ));
    }

    Ok(Html(RESET_PAGE.replace("__TOKEN__", &escape_text(&token))))
}

/// Sets a new password using an emailed reset token.
pub async fn reset_password(
    State(store): State<SharedStore>,
    ValidJson(payload): ValidJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invalid = || AppError::NotFound("Invalid or expired reset link".to_string());

    let mut user = store
        .find_user_by_reset_token(&payload.token)
        .await?
        .ok_or_else(invalid)?;

    if !user.reset_token_valid(Utc::now()) {
        return Err(invalid());
    }

    user.password = Some(hash_password(&payload.password)?);
    user.clear_reset_token();
    store.save_user(&user).await?;

    tracing::info!(email = %user.email, "Password reset");
    Ok(Json(json!({ "message": "Password has been reset successfully" })))
}

/// Returns the profile of the authenticated caller.
pub async fn me(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = store
        .find_user_by_email(&claims.sub)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
