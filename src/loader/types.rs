//! Loader types
//!
//! Declarative source definition types for YAML parsing. String fields may
//! contain `{{ env.X }}` / `{{ config.x }}` templates, rendered when the
//! source is prepared.

use crate::auth::AuthConfig;
use crate::budget::BudgetStrategy;
use crate::error::{Error, Result};
use crate::flatten::EntitySchema;
use crate::pagination::{CursorRule, PaginationConfig};
use crate::provider::ProviderKind;
use crate::retry::RetryPolicy;
use crate::template::{self, TemplateContext};
use crate::types::{JsonObject, TimestampFormat};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// Source Definition
// ============================================================================

/// Top-level source definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SourceDefinition {
    /// Source name, also the output directory name
    pub name: String,
    /// Human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Provider adapter
    #[serde(default)]
    pub provider: ProviderKind,
    /// Base URL for all requests (template)
    pub base_url: String,
    /// Authentication
    #[serde(default)]
    pub auth: AuthDefinition,
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpDefinition,
    /// Retry policy; `max_retries` has no default
    pub retry: RetryPolicy,
    /// Throttling between calls
    #[serde(default)]
    pub budget: BudgetStrategy,
    /// Default start of incremental windows (template)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Streams
    pub streams: Vec<StreamDefinition>,
}

impl SourceDefinition {
    /// Stream by name
    pub fn stream(&self, name: &str) -> Option<&StreamDefinition> {
        self.streams.iter().find(|s| s.name == name)
    }

    /// Stream names in definition order
    pub fn stream_names(&self) -> Vec<&str> {
        self.streams.iter().map(|s| s.name.as_str()).collect()
    }

    /// Structural validation; needs no environment or network
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::missing_field("name"));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::missing_field("base_url"));
        }
        if !template::has_templates(&self.base_url) {
            url::Url::parse(&self.base_url)?;
        }
        if self.streams.is_empty() {
            return Err(Error::config(format!(
                "Source '{}' must have at least one stream",
                self.name
            )));
        }

        self.retry.validate()?;
        self.budget.validate()?;

        let mut names = HashSet::new();
        let mut entities = HashSet::new();
        for stream in &self.streams {
            if !names.insert(stream.name.as_str()) {
                return Err(Error::config(format!(
                    "Duplicate stream name '{}' in source '{}'",
                    stream.name, self.name
                )));
            }
            stream.validate(self.provider.is_graphql())?;
            for info in stream.schema().entities() {
                if !entities.insert(info.name.clone()) {
                    return Err(Error::config(format!(
                        "Entity '{}' is produced by more than one stream of '{}'",
                        info.name, self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Auth Definition
// ============================================================================

/// Authentication definition; values are templates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthDefinition {
    /// No authentication
    #[default]
    None,
    /// `Authorization: Bearer <token>`
    Bearer { token: String },
    /// API key in a header
    ApiKey {
        header: String,
        #[serde(default)]
        prefix: Option<String>,
        value: String,
    },
    /// Fixed headers
    CustomHeaders { headers: BTreeMap<String, String> },
    /// Faire application credentials plus OAuth access token
    FaireApp {
        application_id: String,
        application_secret: String,
        access_token: String,
    },
    /// Access token renewed from a refresh token
    RefreshToken {
        refresh_url: String,
        refresh_token: String,
        #[serde(default)]
        access_token: Option<String>,
    },
}

impl AuthDefinition {
    /// Render templates into a runtime [`AuthConfig`]
    pub fn resolve(&self, ctx: &TemplateContext) -> Result<AuthConfig> {
        let secret = |t: &str| -> Result<SecretString> {
            Ok(SecretString::from(template::render(t, ctx)?))
        };

        Ok(match self {
            AuthDefinition::None => AuthConfig::None,
            AuthDefinition::Bearer { token } => AuthConfig::Bearer {
                token: secret(token)?,
            },
            AuthDefinition::ApiKey {
                header,
                prefix,
                value,
            } => AuthConfig::ApiKey {
                header: template::render(header, ctx)?,
                prefix: prefix.clone(),
                value: secret(value)?,
            },
            AuthDefinition::CustomHeaders { headers } => AuthConfig::CustomHeaders {
                headers: headers
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), secret(v)?)))
                    .collect::<Result<_>>()?,
            },
            AuthDefinition::FaireApp {
                application_id,
                application_secret,
                access_token,
            } => AuthConfig::FaireApp {
                application_id: template::render(application_id, ctx)?,
                application_secret: secret(application_secret)?,
                access_token: secret(access_token)?,
            },
            AuthDefinition::RefreshToken {
                refresh_url,
                refresh_token,
                access_token,
            } => AuthConfig::RefreshToken {
                refresh_url: template::render(refresh_url, ctx)?,
                refresh_token: secret(refresh_token)?,
                access_token: access_token
                    .as_deref()
                    .map(|t| template::render(t, ctx))
                    .transpose()?
                    .filter(|t| !t.trim().is_empty())
                    .map(SecretString::from),
                expires_at: None,
            },
        })
    }
}

// ============================================================================
// HTTP Definition
// ============================================================================

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpDefinition {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Headers sent with every request (templates)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Custom user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout() -> u64 {
    30
}

impl Default for HttpDefinition {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            headers: BTreeMap::new(),
            user_agent: None,
        }
    }
}

// ============================================================================
// Stream Definition
// ============================================================================

/// One stream of a source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDefinition {
    /// Stream name
    pub name: String,
    /// Request shape
    pub request: RequestDefinition,
    /// Path to the records in the response body
    #[serde(default)]
    pub records_path: Option<String>,
    /// How the next cursor is found
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Parameter or variable carrying the cursor
    #[serde(default = "default_cursor_param")]
    pub cursor_param: String,
    /// Whether filters are sent together with a cursor
    #[serde(default)]
    pub cursor_rule: CursorRule,
    /// Page size parameter
    #[serde(default)]
    pub page_size: Option<PageSizeDefinition>,
    /// "Updated since" filter
    #[serde(default)]
    pub incremental: Option<IncrementalDefinition>,
    /// Entity layout; defaults to one entity named after the stream
    #[serde(default)]
    pub schema: Option<EntitySchema>,
}

fn default_cursor_param() -> String {
    "cursor".to_string()
}

impl StreamDefinition {
    /// Entity schema, defaulting to a single entity keyed by `id`
    pub fn schema(&self) -> EntitySchema {
        self.schema
            .clone()
            .unwrap_or_else(|| EntitySchema::new(self.name.clone()))
    }

    fn validate(&self, graphql_provider: bool) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::missing_field("streams.name"));
        }
        let field = |f: &str| format!("streams.{}.{f}", self.name);

        match &self.request {
            RequestDefinition::Rest { path, .. } if path.trim().is_empty() => {
                return Err(Error::missing_field(field("request.path")));
            }
            RequestDefinition::Graphql { query, .. } if query.trim().is_empty() => {
                return Err(Error::missing_field(field("request.query")));
            }
            RequestDefinition::Rest { .. } if graphql_provider => {
                return Err(Error::invalid_value(
                    field("request"),
                    "GraphQL providers need a graphql request",
                ));
            }
            _ => {}
        }

        if self.cursor_param.trim().is_empty() {
            return Err(Error::missing_field(field("cursor_param")));
        }
        if let Some(page_size) = &self.page_size {
            if page_size.value == 0 {
                return Err(Error::invalid_value(
                    field("page_size.value"),
                    "must be greater than 0",
                ));
            }
        }
        if let Some(incremental) = &self.incremental {
            if incremental.param.trim().is_empty() {
                return Err(Error::missing_field(field("incremental.param")));
            }
        }

        self.schema().validate()
    }
}

/// Request shape of a stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestDefinition {
    /// REST GET
    Rest {
        path: String,
        /// Query parameters (templates)
        #[serde(default)]
        params: BTreeMap<String, String>,
    },
    /// GraphQL POST
    Graphql {
        #[serde(default = "default_graphql_path")]
        path: String,
        query: String,
        /// Variables; string values are templates
        #[serde(default)]
        variables: JsonObject,
    },
}

fn default_graphql_path() -> String {
    "/graphql".to_string()
}

/// Page size parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSizeDefinition {
    pub param: String,
    pub value: u32,
}

/// "Updated since" filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncrementalDefinition {
    /// Parameter or variable name
    pub param: String,
    /// How the timestamp is sent
    #[serde(default)]
    pub format: TimestampFormat,
    /// Stream-specific default start (template)
    #[serde(default)]
    pub start_date: Option<String>,
}
