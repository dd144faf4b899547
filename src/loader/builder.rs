//! Runtime source
//!
//! Turns a [`SourceDefinition`] into per-stream [`PagedFetcher`]s. Templates
//! are rendered once, up front, so a missing credential fails before any
//! network call.

use super::types::{RequestDefinition, SourceDefinition, StreamDefinition};
use crate::decode::DecoderConfig;
use crate::error::{Error, Result};
use crate::fetch::{Cancellation, PagedFetcher};
use crate::flatten::EntitySchema;
use crate::http::{HttpTransport, HttpTransportConfig, Transport};
use crate::pagination::{PageRequestBuilder, RequestTemplate};
use crate::provider::ProviderAdapter;
use crate::sleep::Sleeper;
use crate::template::{self, TemplateContext};
use crate::types::{parse_timestamp, JsonValue};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Per-run options applied to every fetcher
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Start of the "updated since" window; overrides definition defaults
    pub since: Option<DateTime<Utc>>,
    /// Stop after this many pages
    pub max_pages: Option<u64>,
    /// Shared cancellation signal
    pub cancellation: Option<Cancellation>,
    /// Sleeper override, for tests
    pub sleeper: Option<Arc<dyn Sleeper>>,
}

/// A source ready to fetch
#[derive(Debug)]
pub struct Source {
    definition: SourceDefinition,
    context: TemplateContext,
    transport: Arc<dyn Transport>,
    adapter: Arc<dyn ProviderAdapter>,
}

impl Source {
    /// Render the definition and build its HTTP transport
    pub fn new(definition: SourceDefinition, context: TemplateContext) -> Result<Self> {
        let base_url = template::render(&definition.base_url, &context)?;
        url::Url::parse(&base_url)?;

        let mut config = HttpTransportConfig::builder()
            .base_url(base_url.trim_end_matches('/'))
            .timeout(Duration::from_secs(definition.http.timeout_secs));
        for (name, value) in &definition.http.headers {
            config = config.header(name.clone(), template::render(value, &context)?);
        }
        if let Some(agent) = &definition.http.user_agent {
            config = config.user_agent(template::render(agent, &context)?);
        }

        let auth = definition.auth.resolve(&context)?;
        let transport = HttpTransport::with_auth(config.build(), auth)?;
        transport.authenticator().validate()?;

        debug!(
            source = %definition.name,
            base_url = %base_url,
            auth = transport.authenticator().config().kind(),
            "Prepared source"
        );

        Ok(Self::with_transport(definition, context, Arc::new(transport)))
    }

    /// Use a caller-supplied transport
    pub fn with_transport(
        definition: SourceDefinition,
        context: TemplateContext,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let adapter = definition.provider.build();
        Self {
            definition,
            context,
            transport,
            adapter,
        }
    }

    /// Source name
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// The parsed definition
    pub fn definition(&self) -> &SourceDefinition {
        &self.definition
    }

    /// Streams selected by name; every stream when `names` is empty
    pub fn select_streams(&self, names: &[String]) -> Result<Vec<&StreamDefinition>> {
        if names.is_empty() {
            return Ok(self.definition.streams.iter().collect());
        }
        names
            .iter()
            .map(|name| {
                self.definition.stream(name).ok_or_else(|| {
                    Error::config(format!(
                        "Unknown stream '{name}' for source '{}'. Available: {}",
                        self.definition.name,
                        self.definition.stream_names().join(", ")
                    ))
                })
            })
            .collect()
    }

    /// Entity schema of a stream
    pub fn schema(&self, stream: &StreamDefinition) -> EntitySchema {
        stream.schema()
    }

    /// Build the fetcher for one stream
    pub fn fetcher(&self, stream: &StreamDefinition, options: &FetchOptions) -> Result<PagedFetcher> {
        let mut requests = PageRequestBuilder::new(self.request_template(stream)?, &stream.cursor_param)
            .cursor_rule(stream.cursor_rule);

        if let Some(page_size) = &stream.page_size {
            requests = requests.page_size(&page_size.param, page_size.value);
        }
        if let Some(incremental) = &stream.incremental {
            if let Some(since) = self.since(stream, options)? {
                requests = requests.filter(&incremental.param, incremental.format.format(&since));
            }
        }

        let decoder = DecoderConfig {
            record_path: stream.records_path.clone(),
            unwrap_node: true,
        };

        let mut fetcher = PagedFetcher::new(
            stream.name.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.adapter),
            requests,
            self.definition.retry.clone(),
        )
        .paginator(stream.pagination.build())
        .decoder(Arc::new(decoder.build()))
        .budget(self.definition.budget.clone())
        .max_pages(options.max_pages);

        if let Some(cancellation) = &options.cancellation {
            fetcher = fetcher.cancellation(cancellation.clone());
        }
        if let Some(sleeper) = &options.sleeper {
            fetcher = fetcher.sleeper(Arc::clone(sleeper));
        }
        Ok(fetcher)
    }

    fn request_template(&self, stream: &StreamDefinition) -> Result<RequestTemplate> {
        Ok(match &stream.request {
            RequestDefinition::Rest { path, params } => RequestTemplate::Rest {
                path: template::render(path, &self.context)?,
                params: params
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), template::render(v, &self.context)?)))
                    .collect::<Result<_>>()?,
            },
            RequestDefinition::Graphql {
                path,
                query,
                variables,
            } => {
                let rendered = template::render_value(
                    &JsonValue::Object(variables.clone()),
                    &self.context,
                )?;
                RequestTemplate::Graphql {
                    path: template::render(path, &self.context)?,
                    query: query.clone(),
                    variables: match rendered {
                        JsonValue::Object(map) => map,
                        _ => variables.clone(),
                    },
                }
            }
        })
    }

    /// Start of the incremental window: run option, then stream default,
    /// then source default
    fn since(
        &self,
        stream: &StreamDefinition,
        options: &FetchOptions,
    ) -> Result<Option<DateTime<Utc>>> {
        if let Some(since) = options.since {
            return Ok(Some(since));
        }

        let configured = stream
            .incremental
            .as_ref()
            .and_then(|i| i.start_date.as_deref())
            .or(self.definition.start_date.as_deref());

        let Some(raw) = configured else {
            return Ok(None);
        };
        // An unset start date variable means a full extract
        let rendered = match template::render(raw, &self.context) {
            Ok(rendered) => rendered,
            Err(Error::UndefinedVariable { variable }) => {
                debug!(stream = %stream.name, variable = %variable, "No start date configured");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        if rendered.trim().is_empty() {
            return Ok(None);
        }
        parse_timestamp(&rendered).map(Some).ok_or_else(|| {
            Error::invalid_value(
                format!("streams.{}.start_date", stream.name),
                format!("'{rendered}' is not a date or timestamp"),
            )
        })
    }
}
