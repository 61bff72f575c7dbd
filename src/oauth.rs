// src/oauth.rs

//! Google OAuth 2.0 authorization-code client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{config::GoogleConfig, error::AppError};

const AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email profile";

/// Profile returned by Google's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    /// Stable Google account id.
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    client: Client,
    config: GoogleConfig,
}

impl GoogleOAuth {
    pub fn new(config: GoogleConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// URL the browser is redirected to in order to start sign-in.
    pub fn authorize_url(&self, state: &str) -> Result<Url, AppError> {
        Url::parse_with_params(
            AUTHORIZE_ENDPOINT,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| AppError::InternalServerError(e.to_string()))
    }

    /// Exchanges the authorization code and loads the user's profile.
    pub async fn fetch_profile(&self, code: &str) -> Result<GoogleProfile, AppError> {
        let token: TokenResponse = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::error!("Google token exchange failed: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?
            .json()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        self.client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::error!("Google userinfo request failed: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?
            .json::<GoogleProfile>()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))
    }
}
