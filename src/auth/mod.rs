//! Google OAuth flow and session-cookie extraction.

use axum::http::HeaderMap;
use reqwest::Client;
use serde_json::Value;

use crate::core::config::AppConfig;
use crate::core::errors::ApiError;

pub const SESSION_COOKIE: &str = "access_token";

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Clone)]
pub struct GoogleOAuth {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    userinfo_url: String,
    client: Client,
}

impl GoogleOAuth {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
            token_url: TOKEN_URL.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
            client,
        })
    }

    /// Authorization URL the login endpoint redirects to. Fixed scope,
    /// offline access, forced consent.
    pub fn authorize_url(&self) -> String {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{AUTH_URL}?{query}")
    }

    /// Exchange the callback `code` for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, ApiError> {
        let form = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let res = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Token exchange failed: {e}")))?;

        let payload: Value = res
            .json()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Token exchange failed: {e}")))?;

        payload
            .get("access_token")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::BadRequest("Token exchange failed".to_string()))
    }

    /// Resolve the account email for an access token.
    pub async fn fetch_email(&self, access_token: &str) -> Result<String, ApiError> {
        let res = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to fetch user email: {e}")))?;

        let payload: Value = res
            .json()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to fetch user email: {e}")))?;

        payload
            .get("email")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::BadRequest("Failed to fetch user email".to_string()))
    }

}

/// Pull the session token out of the request's `Cookie` header.
pub fn session_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let cookies = headers
        .get(axum::http::header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::Unauthorized)
}

/// `Set-Cookie` value for a freshly issued session token.
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; Secure; Path=/")
}
