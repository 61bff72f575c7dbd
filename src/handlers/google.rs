// src/handlers/google.rs

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::user::{NewUser, TokenResponse, normalize_email},
    state::AppState,
    utils::{
        jwt::{sign_jwt, sign_oauth_state, verify_oauth_state},
        secrets::generate_token,
    },
};

/// How long the browser has to come back from Google.
const STATE_TTL_SECONDS: u64 = 600;

/// Cookie that binds a signed `state` to the browser that started sign-in.
const NONCE_COOKIE: &str = "oauth_nonce";

fn nonce_cookie(nonce: &str, max_age: u64) -> String {
    format!("{NONCE_COOKIE}={nonce}; Max-Age={max_age}; Path=/auth/google; HttpOnly; SameSite=Lax")
}

/// Value of cookie `name` from the request's `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Redirects the browser to Google's consent screen.
pub async fn google_login(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let google = state.google.as_ref().ok_or(AppError::ServiceUnavailable(
        "Google sign-in is not configured".to_string(),
    ))?;

    let nonce = generate_token();
    let oauth_state = sign_oauth_state(&nonce, &state.config.jwt_secret, STATE_TTL_SECONDS)?;
    let url = google.authorize_url(&oauth_state)?;

    Ok((
        [(header::SET_COOKIE, nonce_cookie(&nonce, STATE_TTL_SECONDS))],
        Redirect::to(url.as_str()),
    ))
}

/// Completes Google sign-in.
///
/// The `state` must be signed by this server and carry the nonce stored in the
/// caller's `oauth_nonce` cookie. Creates a verified account on first sign-in
/// or links the Google id to an existing account with the same email, then
/// returns a bearer token.
pub async fn google_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<GoogleCallbackParams>,
) -> Result<impl IntoResponse, AppError> {
    let google = state.google.as_ref().ok_or(AppError::ServiceUnavailable(
        "Google sign-in is not configured".to_string(),
    ))?;

    if let Some(error) = params.error {
        return Err(AppError::AuthError(format!("Google sign-in failed: {error}")));
    }

    let (Some(code), Some(oauth_state)) = (params.code, params.state) else {
        return Err(AppError::BadRequest(
            "Missing code or state parameter".to_string(),
        ));
    };

    let claims = verify_oauth_state(&oauth_state, &state.config.jwt_secret)?;
    if cookie_value(&headers, NONCE_COOKIE) != Some(claims.nonce.as_str()) {
        return Err(AppError::AuthError(
            "OAuth state was not issued to this browser".to_string(),
        ));
    }

    let profile = google.fetch_profile(&code).await?;
    if !profile.email_verified {
        return Err(AppError::AuthError(
            "Google account email is not verified".to_string(),
        ));
    }

    let email = normalize_email(&profile.email);
    let user = match state.store.find_user_by_email(&email).await? {
        Some(mut user) => {
            let needs_link = user.google_id.as_deref() != Some(profile.sub.as_str());
            if needs_link || !user.is_verified {
                user.google_id = Some(profile.sub.clone());
                // Google has proven ownership of the address.
                user.is_verified = true;
                user.clear_verification();
                state.store.save_user(&user).await?;
            }
            user
        }
        None => {
            let name = profile
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
            let user = state
                .store
                .insert_user(NewUser {
                    name,
                    email,
                    password: None,
                    google_id: Some(profile.sub.clone()),
                    verification_code: None,
                    verification_expires_at: None,
                    is_verified: true,
                })
                .await?;
            tracing::info!(email = %user.email, "User created from Google sign-in");
            user
        }
    };

    let token = sign_jwt(
        &user.email,
        &user.name,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    Ok((
        [(header::SET_COOKIE, nonce_cookie("", 0))],
        Json(TokenResponse {
            token,
            token_type: "Bearer",
            email: user.email,
            name: user.name,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_nonce_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("session=x; oauth_nonce=abc123; lang=en"),
        );
        assert_eq!(cookie_value(&headers, NONCE_COOKIE), Some("abc123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn nonce_cookie_is_http_only_and_scoped() {
        let cookie = nonce_cookie("abc123", 600);
        assert!(cookie.starts_with("oauth_nonce=abc123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/auth/google"));
        assert!(cookie.contains("Max-Age=600"));
    }
}
