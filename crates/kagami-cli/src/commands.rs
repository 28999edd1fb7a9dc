//! CLI command definitions and handlers

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use kagami_client::{SchemaSource, WikibaseClient, WikibaseConfig};
use kagami_core::EntityId;
use kagami_engine::{
    Mapped, Replicator, ReplicatorConfig, RootOutcome, RootResult, RunReport,
};
use kagami_shex::{parse_schema_str, ShapeSchema};
use std::path::PathBuf;
use std::sync::Arc;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "kagami")]
#[command(about = "Schema-guided wikibase subgraph replication")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Replicate a subgraph from a source wikibase to a target wikibase
    Replicate {
        /// Base URL of the source wikibase
        #[arg(long)]
        source: String,

        /// SPARQL endpoint of the source wikibase
        #[arg(long)]
        source_sparql: Option<String>,

        /// Base URL of the target wikibase
        #[arg(long)]
        target: String,

        /// SPARQL endpoint of the target wikibase
        #[arg(long)]
        target_sparql: Option<String>,

        /// Schema location: a URL or a local ShExJ file
        #[arg(long)]
        schema: String,

        /// SPARQL query selecting the root entities on the source
        #[arg(short, long)]
        query: Option<String>,

        /// Explicit root entity ids (alternative to --query)
        #[arg(short, long)]
        root: Vec<String>,

        /// Languages to copy terms for (repeatable; "en" is always included)
        #[arg(short, long, default_value = "en")]
        language: Vec<String>,

        /// Bot username for the target wikibase
        #[arg(long)]
        username: Option<String>,

        /// Bot password for the target wikibase
        #[arg(long)]
        password: Option<String>,

        /// Recursion depth bound
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Shallow-copy every property a schema mentions
    CopyProperties {
        /// Base URL of the source wikibase
        #[arg(long)]
        source: String,

        /// Base URL of the target wikibase
        #[arg(long)]
        target: String,

        /// SPARQL endpoint of the target wikibase
        #[arg(long)]
        target_sparql: Option<String>,

        /// Schema location: a URL or a local ShExJ file
        #[arg(long)]
        schema: String,

        /// Languages to copy terms for
        #[arg(short, long, default_value = "en")]
        language: Vec<String>,

        /// Bot username for the target wikibase
        #[arg(long)]
        username: Option<String>,

        /// Bot password for the target wikibase
        #[arg(long)]
        password: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the property labels of a wikibase instance
    ListProperties {
        /// Base URL of the wikibase
        #[arg(long)]
        target: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show version information
    Info,
}

/// Output format options
#[derive(Clone, Debug, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Command execution result
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Execute CLI commands
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&mut self, command: Commands) -> Result<CommandResult> {
        match command {
            Commands::Replicate {
                source,
                source_sparql,
                target,
                target_sparql,
                schema,
                query,
                root,
                language,
                username,
                password,
                max_depth,
                format,
            } => {
                let source_client = build_client(&source, source_sparql.as_deref(), None, None)?;
                let target_client = build_client(
                    &target,
                    target_sparql.as_deref(),
                    username.as_deref(),
                    password.as_deref(),
                )?;
                let schema = load_schema(&source_client, &schema).await?;

                let mut config = ReplicatorConfig::default().with_languages(
                    &language.iter().map(String::as_str).collect::<Vec<_>>(),
                );
                if let Some(max_depth) = max_depth {
                    config = config.with_max_depth(max_depth);
                }
                let mut replicator =
                    Replicator::new(source_client, target_client, config);
                replicator.initialize().await?;

                let report = if !root.is_empty() {
                    copy_roots(&mut replicator, &schema, &root).await?
                } else if let Some(query) = query {
                    replicator.run(&schema, &query).await?
                } else {
                    bail!("either --query or --root is required");
                };
                Ok(report_result(report, format))
            }

            Commands::CopyProperties {
                source,
                target,
                target_sparql,
                schema,
                language,
                username,
                password,
                format,
            } => {
                let source_client = build_client(&source, None, None, None)?;
                let target_client = build_client(
                    &target,
                    target_sparql.as_deref(),
                    username.as_deref(),
                    password.as_deref(),
                )?;
                let schema = load_schema(&source_client, &schema).await?;

                let config = ReplicatorConfig::default().with_languages(
                    &language.iter().map(String::as_str).collect::<Vec<_>>(),
                );
                let mut replicator =
                    Replicator::new(source_client, target_client, config);
                replicator.initialize().await?;
                let report = replicator.copy_properties(&schema).await?;
                Ok(report_result(report, format))
            }

            Commands::ListProperties { target, format } => {
                let client = WikibaseClient::new(WikibaseConfig::new(&target))?;
                let labels = client.list_property_labels().await?;
                match format {
                    OutputFormat::Text => Ok(CommandResult {
                        success: true,
                        message: labels.join("\n"),
                        data: None,
                    }),
                    OutputFormat::Json => Ok(CommandResult {
                        success: true,
                        message: serde_json::to_string_pretty(&labels)?,
                        data: Some(serde_json::json!(labels)),
                    }),
                }
            }

            Commands::Info => Ok(CommandResult {
                success: true,
                message: format!("kagami {}", env!("CARGO_PKG_VERSION")),
                data: None,
            }),
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn build_client(
    base_url: &str,
    sparql: Option<&str>,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<Arc<WikibaseClient>> {
    let mut config = WikibaseConfig::new(base_url);
    if let Some(endpoint) = sparql {
        config = config.with_sparql_endpoint(endpoint);
    }
    if let (Some(username), Some(password)) = (username, password) {
        config = config.with_credentials(username, password);
    }
    Ok(Arc::new(WikibaseClient::new(config)?))
}

/// Load a ShExJ schema from a URL or a local file
async fn load_schema(client: &WikibaseClient, location: &str) -> Result<ShapeSchema> {
    let text = if location.starts_with("http://") || location.starts_with("https://") {
        client
            .fetch(location)
            .await
            .with_context(|| format!("fetching schema from {}", location))?
    } else {
        std::fs::read_to_string(PathBuf::from(location))
            .with_context(|| format!("reading schema file {}", location))?
    };
    Ok(parse_schema_str(&text)?)
}

/// Copy explicitly named roots under the schema's start shape
async fn copy_roots(
    replicator: &mut Replicator,
    schema: &ShapeSchema,
    roots: &[String],
) -> Result<RunReport> {
    let start = schema.start_label()?.to_string();
    let mut report = RunReport::new();
    for root in roots {
        let id = EntityId::new(root.clone());
        let result = match replicator.copy_root(schema, &start, &id).await {
            Ok(Mapped::Target(target)) => RootResult::Copied(target),
            Ok(Mapped::Invalid) => RootResult::Invalid,
            Err(error) => RootResult::Failed(error.to_string()),
        };
        report.push(RootOutcome { source: id, result });
    }
    Ok(report)
}

fn report_result(report: RunReport, format: OutputFormat) -> CommandResult {
    let success = report.failed() == 0;
    let message = match format {
        OutputFormat::Text => {
            let mut lines = vec![format!(
                "run {}: {} copied, {} failed",
                report.id,
                report.copied(),
                report.failed()
            )];
            for outcome in &report.outcomes {
                let line = match &outcome.result {
                    RootResult::Copied(target) => format!("{} -> {}", outcome.source, target),
                    RootResult::Invalid => format!("{} -> invalid datatype", outcome.source),
                    RootResult::Failed(reason) => format!("{} -> FAILED: {}", outcome.source, reason),
                };
                lines.push(line);
            }
            lines.join("\n")
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(&report).unwrap_or_else(|error| error.to_string())
        }
    };
    CommandResult {
        success,
        message,
        data: serde_json::to_value(&report).ok(),
    }
}
