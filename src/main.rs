use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nl2sql_engine::conversation::suggest_queries;
use nl2sql_engine::{
    ConversationTurn, EngineConfig, LlmClient, LlmConfig, OverrideTranslator, Schema, TranslationRequest,
    TranslationResult, Translator,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nl2sql")]
#[command(about = "Translate natural-language database requests into SQL")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate one request and print the result as JSON
    Translate {
        /// The request in plain language, or a full SQL statement
        utterance: String,

        /// Schema JSON file
        #[arg(short, long)]
        schema: PathBuf,

        /// Table to use when the request does not name one
        #[arg(short, long)]
        table: Option<String>,

        /// JSON array of prior {role, content} turns
        #[arg(long)]
        history: Option<PathBuf>,

        /// Engine config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Ask the configured LLM first and fall back to the rule engine
        #[arg(long)]
        llm: bool,
    },
    /// Print starter requests for a schema
    Suggest {
        #[arg(short, long)]
        schema: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Args::parse().command {
        Command::Translate {
            utterance,
            schema,
            table,
            history,
            config,
            llm,
        } => {
            let config = match config {
                Some(path) => EngineConfig::load(&path).with_context(|| format!("loading {}", path.display()))?,
                None => EngineConfig::default(),
            };
            let mut request = TranslationRequest::new(&utterance, load_schema(&schema)?);
            if let Some(table) = table {
                request = request.with_selected_table(&table);
            }
            if let Some(path) = history {
                request = request.with_history(load_history(&path)?);
            }

            let llm_config = if llm {
                config
                    .llm
                    .clone()
                    .map(LlmConfig::sanitized)
                    .filter(|c| !c.api_keys.is_empty())
                    .or_else(LlmConfig::from_env)
            } else {
                None
            };
            let translator = Translator::with_config(config)?;
            let result = match llm_config {
                Some(llm_config) => {
                    let timeout = Duration::from_millis(llm_config.timeout_ms);
                    let client = LlmClient::new(llm_config)?;
                    let runtime = tokio::runtime::Runtime::new()?;
                    runtime.block_on(OverrideTranslator::new(translator, client, timeout).translate(&request))
                }
                None => {
                    if llm {
                        warn!("No LLM API key configured, using the rule engine only");
                    }
                    translator.translate(&request)
                }
            };
            print_result(&result)?;
        }
        Command::Suggest { schema } => {
            let schema = load_schema(&schema)?;
            println!("{}", serde_json::to_string_pretty(&suggest_queries(&schema))?);
        }
    }
    Ok(())
}

fn load_schema(path: &Path) -> Result<Schema> {
    let schema = Schema::load(path).with_context(|| format!("loading schema {}", path.display()))?;
    info!(tables = schema.tables.len(), "Schema loaded");
    Ok(schema)
}

fn load_history(path: &Path) -> Result<Vec<ConversationTurn>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

fn print_result(result: &TranslationResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
