// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{config::Config, error::AppError};

/// Session token claims.
///
/// The authenticated email travels with each request through these claims,
/// so handlers never rely on shared "current user" state.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the user's email.
    pub sub: String,
    pub name: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Claims of the `state` parameter round-tripped through Google sign-in.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OAuthStateClaims {
    pub nonce: String,
    pub purpose: String,
    pub exp: usize,
}

pub const OAUTH_STATE_PURPOSE: &str = "google_oauth_state";

fn expires_in(seconds: u64) -> Result<usize, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs();
    usize::try_from(now + seconds).map_err(|e| AppError::InternalServerError(e.to_string()))
}

fn encode_claims<T: Serialize>(claims: &T, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

fn decode_claims<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, AppError> {
    decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))
}

/// Signs a session token for the user.
pub fn sign_jwt(
    email: &str,
    name: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: email.to_owned(),
        name: name.to_owned(),
        exp: expires_in(expiration_seconds)?,
    };
    encode_claims(&claims, secret)
}

/// Verifies and decodes a session token.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode_claims(token, secret)
}

/// Signs an OAuth `state` value carrying `nonce`.
pub fn sign_oauth_state(nonce: &str, secret: &str, ttl_seconds: u64) -> Result<String, AppError> {
    let claims = OAuthStateClaims {
        nonce: nonce.to_owned(),
        purpose: OAUTH_STATE_PURPOSE.to_owned(),
        exp: expires_in(ttl_seconds)?,
    };
    encode_claims(&claims, secret)
}

/// Accepts only unexpired state values this server issued for Google sign-in.
pub fn verify_oauth_state(state: &str, secret: &str) -> Result<OAuthStateClaims, AppError> {
    let claims: OAuthStateClaims = decode_claims(state, secret)?;
    if claims.purpose != OAUTH_STATE_PURPOSE {
        return Err(AppError::AuthError("Invalid OAuth state".to_string()));
    }
    Ok(claims)
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects `Claims`
/// into the request extensions. Returns 401 otherwise.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match verify_jwt(token, &config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}
