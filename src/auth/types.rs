//! Auth configuration types
//!
//! These types represent the runtime auth configuration after template
//! interpolation has been applied. Credentials are held as [`SecretString`].

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;

/// Authentication configuration (after template interpolation)
#[derive(Debug, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: SecretString,
    },

    /// API key in a header (e.g. `X-Shopify-Access-Token`)
    ApiKey {
        /// Header name
        header: String,
        /// Prefix to add before the value (e.g., "Bearer ")
        prefix: Option<String>,
        /// The API key value
        value: SecretString,
    },

    /// Static custom headers
    CustomHeaders {
        /// Headers to add to each request
        headers: BTreeMap<String, SecretString>,
    },

    /// Faire application credentials plus OAuth access token
    FaireApp {
        /// Application id
        application_id: String,
        /// Application secret
        application_secret: SecretString,
        /// OAuth access token obtained from the authorization code exchange
        access_token: SecretString,
    },

    /// Access token renewed by POSTing a refresh token (ShipHero)
    RefreshToken {
        /// Refresh endpoint URL
        refresh_url: String,
        /// Long-lived refresh token
        refresh_token: SecretString,
        /// Current access token, if one is already known
        access_token: Option<SecretString>,
        /// When the current access token expires
        expires_at: Option<DateTime<Utc>>,
    },
}

impl AuthConfig {
    /// Name of the auth type, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            AuthConfig::None => "none",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::ApiKey { .. } => "api_key",
            AuthConfig::CustomHeaders { .. } => "custom_headers",
            AuthConfig::FaireApp { .. } => "faire_app",
            AuthConfig::RefreshToken { .. } => "refresh_token",
        }
    }

    /// Names of required credential fields that are empty
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let empty = |s: &SecretString| s.expose_secret().trim().is_empty();
        let mut missing = Vec::new();
        match self {
            AuthConfig::None => {}
            AuthConfig::Bearer { token } => {
                if empty(token) {
                    missing.push("token");
                }
            }
            AuthConfig::ApiKey { header, value, .. } => {
                if header.trim().is_empty() {
                    missing.push("header");
                }
                if empty(value) {
                    missing.push("value");
                }
            }
            AuthConfig::CustomHeaders { headers } => {
                if headers.values().any(empty) {
                    missing.push("headers");
                }
            }
            AuthConfig::FaireApp {
                application_id,
                application_secret,
                access_token,
            } => {
                if application_id.trim().is_empty() {
                    missing.push("application_id");
                }
                if empty(application_secret) {
                    missing.push("application_secret");
                }
                if empty(access_token) {
                    missing.push("access_token");
                }
            }
            AuthConfig::RefreshToken {
                refresh_url,
                refresh_token,
                ..
            } => {
                if refresh_url.trim().is_empty() {
                    missing.push("refresh_url");
                }
                if empty(refresh_token) {
                    missing.push("refresh_token");
                }
            }
        }
        missing
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: SecretString,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: SecretString, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: SecretString, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_cached_token_not_expired() {
        let token = CachedToken::expires_in(secret("test"), 3600);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_cached_token_expired() {
        let token = CachedToken::expires_in(secret("test"), -100);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_inside_buffer_counts_as_expired() {
        let token = CachedToken::expires_in(secret("test"), 10);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_no_expiration() {
        let token = CachedToken::new(secret("test"), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_missing_credentials() {
        let config = AuthConfig::FaireApp {
            application_id: "apa_123".to_string(),
            application_secret: secret(""),
            access_token: secret("  "),
        };
        assert_eq!(
            config.missing_credentials(),
            vec!["application_secret", "access_token"]
        );

        let config = AuthConfig::Bearer {
            token: secret("abc"),
        };
        assert!(config.missing_credentials().is_empty());
        assert!(AuthConfig::default().missing_credentials().is_empty());
    }
}
