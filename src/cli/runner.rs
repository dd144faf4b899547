//! CLI runner - executes commands
//!
//! Progress goes to the log; one JSON message per line goes to stdout for
//! whatever drives the process.

use crate::cli::commands::{Cli, Commands};
use crate::connectors::list_builtin_info;
use crate::engine::{self, ExtractEngine, ExtractStats};
use crate::error::{Error, Result};
use crate::fetch::Cancellation;
use crate::loader::{load_source, FetchOptions, Source, SourceDefinition};
use crate::output::{open_sink, OutputFormat};
use crate::template::TemplateContext;
use crate::types::parse_timestamp;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Options of one `run` invocation
#[derive(Debug, Clone)]
pub struct RunArgs<'a> {
    pub streams: &'a [String],
    pub since: Option<&'a str>,
    pub output: &'a Path,
    pub format: OutputFormat,
    pub max_pages: Option<u64>,
}

/// CLI runner
pub struct Runner {
    cli: Cli,
    cancellation: Cancellation,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            cancellation: Cancellation::new(),
        }
    }

    /// Share a cancellation signal (e.g. one triggered by Ctrl-C)
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run {
                sources,
                streams,
                since,
                output,
                format,
                max_pages,
            } => {
                let args = RunArgs {
                    streams,
                    since: since.as_deref(),
                    output,
                    format: *format,
                    max_pages: *max_pages,
                };
                self.run_sources(sources, &args).await
            }
            Commands::Check { sources, stream } => self.check(sources, stream.as_deref()).await,
            Commands::Validate { sources } => self.validate(sources),
            Commands::List => {
                self.list_sources();
                Ok(())
            }
        }
    }

    /// Load configuration values for `{{ config.x }}`
    fn load_config(&self) -> Result<Value> {
        if let Some(json_str) = &self.cli.config_json {
            return serde_json::from_str(json_str)
                .map_err(|e| Error::config(format!("Invalid config JSON: {e}")));
        }

        if let Some(path) = &self.cli.config {
            let content = fs::read_to_string(path)
                .map_err(|e| Error::config(format!("Failed to read config file: {e}")))?;
            return serde_json::from_str(&content)
                .map_err(|e| Error::config(format!("Invalid config JSON: {e}")));
        }

        Ok(json!({}))
    }

    fn context(&self) -> Result<TemplateContext> {
        Ok(TemplateContext::from_env(self.load_config()?))
    }

    /// Extract every source independently; fails if any source failed
    pub async fn run_sources(&self, sources: &[String], args: &RunArgs<'_>) -> Result<()> {
        let context = self.context()?;
        let since = args
            .since
            .map(|raw| {
                parse_timestamp(raw).ok_or_else(|| {
                    Error::invalid_value("since", format!("'{raw}' is not a date or timestamp"))
                })
            })
            .transpose()?;

        let mut total = ExtractStats::new();
        let mut failed = Vec::new();

        for name in sources {
            if self.cancellation.is_cancelled() {
                warn!(source = %name, "Skipping source after cancellation");
                failed.push(name.clone());
                continue;
            }

            let options = FetchOptions {
                since,
                max_pages: args.max_pages,
                cancellation: Some(self.cancellation.clone()),
                sleeper: None,
            };

            match self.run_source(name, &context, args, &options).await {
                Ok(stats) => {
                    if stats.failed() > 0 {
                        failed.push(name.clone());
                    }
                    total.merge(&stats);
                }
                Err(err) => {
                    error!(source = %name, kind = err.kind(), error = %err, "Source failed");
                    emit(&json!({
                        "type": "SOURCE_ERROR",
                        "source": name,
                        "kind": err.kind(),
                        "error": err.to_string(),
                    }));
                    failed.push(name.clone());
                }
            }
        }

        emit(&json!({
            "type": "SUMMARY",
            "sources": sources.len(),
            "failed": failed,
            "stats": total,
        }));
        info!(
            sources = sources.len(),
            failed = failed.len(),
            records = total.records,
            pages = total.pages,
            "Run finished"
        );

        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::Other(format!(
                "{} of {} sources failed: {}",
                failed.len(),
                sources.len(),
                failed.join(", ")
            )))
        }
    }

    async fn run_source(
        &self,
        name: &str,
        context: &TemplateContext,
        args: &RunArgs<'_>,
        options: &FetchOptions,
    ) -> Result<ExtractStats> {
        let source = Source::new(load_source(name)?, context.clone())?;
        let streams = source.select_streams(args.streams)?;
        let mut sink = open_sink(args.format, args.output, source.name())?;
        let mut engine = ExtractEngine::new(source.name());

        info!(
            source = %source.name(),
            streams = streams.len(),
            output = %args.output.display(),
            format = args.format.extension(),
            "Starting source"
        );

        for stream in streams {
            let outcome = if self.cancellation.is_cancelled() {
                engine.skip_stream(&stream.name, &stream.schema(), sink.as_mut())
            } else {
                let fetcher = source.fetcher(stream, options)?;
                engine
                    .run_stream(fetcher, &stream.schema(), sink.as_mut())
                    .await
            };
            emit(&json!({"type": "STREAM_REPORT", "report": outcome.report}));
        }

        Ok(engine.stats().clone())
    }

    /// Fetch one page of one stream per source
    async fn check(&self, sources: &[String], stream: Option<&str>) -> Result<()> {
        let context = self.context()?;
        let mut failed = 0usize;

        for name in sources {
            let status = match self.check_source(name, &context, stream).await {
                Ok((stream, records)) => json!({
                    "status": "SUCCEEDED",
                    "stream": stream,
                    "records": records,
                }),
                Err(err) => {
                    failed += 1;
                    error!(source = %name, kind = err.kind(), error = %err, "Check failed");
                    json!({
                        "status": "FAILED",
                        "kind": err.kind(),
                        "message": err.to_string(),
                    })
                }
            };
            emit(&json!({
                "type": "CONNECTION_STATUS",
                "source": name,
                "connectionStatus": status,
            }));
        }

        if failed == 0 {
            Ok(())
        } else {
            Err(Error::Other(format!(
                "{failed} of {} sources failed the check",
                sources.len()
            )))
        }
    }

    async fn check_source(
        &self,
        name: &str,
        context: &TemplateContext,
        stream: Option<&str>,
    ) -> Result<(String, usize)> {
        let source = Source::new(load_source(name)?, context.clone())?;
        let selected = match stream {
            Some(stream) => source.select_streams(&[stream.to_string()])?,
            None => source.select_streams(&[])?,
        };
        let stream = selected
            .first()
            .copied()
            .ok_or_else(|| Error::config(format!("Source '{name}' has no streams")))?;

        let options = FetchOptions {
            cancellation: Some(self.cancellation.clone()),
            ..Default::default()
        };
        let page = engine::check(source.fetcher(stream, &options)?).await?;
        Ok((stream.name.clone(), page.len()))
    }

    /// Validate definitions without touching the network
    fn validate(&self, sources: &[String]) -> Result<()> {
        let mut failed = 0usize;
        for name in sources {
            match load_source(name) {
                Ok(def) => emit(&validation_message(name, &def)),
                Err(err) => {
                    failed += 1;
                    emit(&json!({
                        "type": "VALIDATION",
                        "source": name,
                        "valid": false,
                        "error": err.to_string(),
                    }));
                }
            }
        }

        if failed == 0 {
            Ok(())
        } else {
            Err(Error::config(format!(
                "{failed} of {} source definitions are invalid",
                sources.len()
            )))
        }
    }

    /// List built-in sources
    fn list_sources(&self) {
        let sources: Vec<Value> = list_builtin_info()
            .into_iter()
            .map(|info| {
                let config_fields: Vec<Value> = info
                    .config_schema
                    .iter()
                    .map(|field| {
                        json!({
                            "name": field.name,
                            "required": field.required,
                            "secret": field.secret,
                            "description": field.description,
                        })
                    })
                    .collect();

                json!({
                    "name": info.name,
                    "description": info.description,
                    "aliases": info.aliases,
                    "config_schema": config_fields,
                    "streams": info.streams,
                })
            })
            .collect();

        emit(&json!({"type": "SOURCES", "sources": sources}));
    }
}

fn validation_message(name: &str, def: &SourceDefinition) -> Value {
    let streams: Vec<Value> = def
        .streams
        .iter()
        .map(|stream| {
            let entities: Vec<String> = stream
                .schema()
                .entities()
                .into_iter()
                .map(|e| e.name)
                .collect();
            json!({"name": stream.name, "entities": entities})
        })
        .collect();

    json!({
        "type": "VALIDATION",
        "source": name,
        "valid": true,
        "name": def.name,
        "streams": streams,
    })
}

/// Write one JSON message line to stdout
fn emit(msg: &Value) {
    println!("{msg}");
}
