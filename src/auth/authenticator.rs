//! Authenticator implementation
//!
//! Handles applying authentication to requests and managing token refresh.

use super::types::{AuthConfig, CachedToken};
use crate::error::{Error, Result};
use base64::Engine;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Authenticator handles applying authentication to HTTP requests
#[derive(Debug)]
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Cached access token for refresh-token auth
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// HTTP client for token requests
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        let seeded = match &config {
            AuthConfig::RefreshToken {
                access_token: Some(token),
                expires_at,
                ..
            } if !token.expose_secret().is_empty() => {
                Some(CachedToken::new(token.clone(), *expires_at))
            }
            _ => None,
        };

        Self {
            config,
            cached_token: Arc::new(RwLock::new(seeded)),
            http_client,
        }
    }

    /// Fail with a configuration error when a required credential is empty
    pub fn validate(&self) -> Result<()> {
        match self.config.missing_credentials().first() {
            Some(field) => Err(Error::missing_field(format!(
                "auth.{} ({})",
                field,
                self.config.kind()
            ))),
            None => Ok(()),
        }
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        match &self.config {
            AuthConfig::None => Ok(req),

            AuthConfig::Bearer { token } => Ok(req.bearer_auth(token.expose_secret())),

            AuthConfig::ApiKey {
                header,
                prefix,
                value,
            } => {
                let val = format!(
                    "{}{}",
                    prefix.as_deref().unwrap_or(""),
                    value.expose_secret()
                );
                Ok(req.header(header.as_str(), val))
            }

            AuthConfig::CustomHeaders { headers } => {
                let mut req = req;
                for (key, value) in headers {
                    req = req.header(key.as_str(), value.expose_secret());
                }
                Ok(req)
            }

            AuthConfig::FaireApp {
                application_id,
                application_secret,
                access_token,
            } => {
                let credentials = base64::engine::general_purpose::STANDARD.encode(format!(
                    "{}:{}",
                    application_id,
                    application_secret.expose_secret()
                ));
                Ok(req
                    .header("X-FAIRE-APP-CREDENTIALS", credentials)
                    .header("X-FAIRE-OAUTH-ACCESS-TOKEN", access_token.expose_secret()))
            }

            AuthConfig::RefreshToken { .. } => {
                let token = self.get_or_refresh_token().await?;
                Ok(req.bearer_auth(token.expose_secret()))
            }
        }
    }

    /// Get a valid token, refreshing if necessary
    async fn get_or_refresh_token(&self) -> Result<SecretString> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;

        // Another task may have refreshed while we waited for the write lock
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let new_token = self.refresh().await?;
        let token = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token)
    }

    /// Exchange the refresh token for a new access token
    async fn refresh(&self) -> Result<CachedToken> {
        let AuthConfig::RefreshToken {
            refresh_url,
            refresh_token,
            ..
        } = &self.config
        else {
            return Err(Error::TokenRefresh {
                message: format!("auth type '{}' has no refresh flow", self.config.kind()),
            });
        };

        debug!(url = %refresh_url, "Refreshing access token");

        let body = serde_json::json!({ "refresh_token": refresh_token.expose_secret() });
        let response = self
            .http_client
            .post(refresh_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::TokenRefresh {
                message: format!("refresh request failed: {e}"),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenRefresh {
                message: format!("refresh request failed with status {status}: {body}"),
            });
        }

        let token_response: TokenResponse =
            response.json().await.map_err(|e| Error::TokenRefresh {
                message: format!("invalid refresh response: {e}"),
            })?;

        if token_response.access_token.is_empty() {
            return Err(Error::TokenRefresh {
                message: "refresh response has an empty access_token".to_string(),
            });
        }

        info!(
            expires_in = token_response.expires_in,
            "Obtained new access token"
        );
        Ok(token_response.into_cached_token())
    }

    /// Drop the cached token so the next request refreshes
    pub async fn clear_cache(&self) {
        let mut cached = self.cached_token.write().await;
        *cached = None;
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

/// Refresh endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_cached_token(self) -> CachedToken {
        let token = SecretString::from(self.access_token);
        match self.expires_in {
            Some(secs) => CachedToken::expires_in(token, secs),
            None => CachedToken::new(token, None),
        }
    }
}
