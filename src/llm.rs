//! Optional override path backed by a hosted chat-completions model.
//!
//! Whatever the model proposes is re-checked by `sql_guard`; any failure
//! falls back to the deterministic `Translator`.

use crate::config::LlmConfig;
use crate::error::{Nl2SqlError, Result};
use crate::request::TranslationRequest;
use crate::response::TranslationResult;
use crate::sql_guard;
use crate::translator::Translator;
use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Confidence reported for statements the model wrote.
pub const OVERRIDE_CONFIDENCE: f64 = 0.9;

const HISTORY_TURNS: usize = 6;
const HISTORY_CHARS: usize = 300;
const ROTATE_ON: [u16; 3] = [429, 500, 503];

/// The JSON answer the model is asked to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmReply {
    #[serde(rename = "type", default = "default_reply_type")]
    pub kind: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_reply_type() -> String {
    "info".to_string()
}

impl LlmReply {
    pub fn sql(query: &str, explanation: &str) -> Self {
        Self {
            kind: "sql".to_string(),
            query: Some(query.to_string()),
            explanation: Some(explanation.to_string()),
            message: None,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(strip_code_fences(raw))
            .map_err(|e| Nl2SqlError::Llm(format!("Failed to parse LLM reply: {}", e)))
    }

    /// Convert to a result. SQL must pass the same checks as typed SQL,
    /// and DDL is refused outright.
    pub fn into_result(self) -> Result<TranslationResult> {
        match self.kind.as_str() {
            "sql" => {
                let query = self
                    .query
                    .ok_or_else(|| Nl2SqlError::Llm("SQL reply without a query".to_string()))?;
                let (statement, operation_kind) = sql_guard::validate_proposal(&query)?;
                Ok(TranslationResult::sql(
                    statement,
                    operation_kind,
                    self.explanation.unwrap_or_else(|| "Executing query".to_string()),
                    OVERRIDE_CONFIDENCE,
                ))
            }
            "clarification" => Ok(TranslationResult::clarification(
                self.message.unwrap_or_else(|| "Could you clarify?".to_string()),
                Vec::new(),
            )),
            "error" => Err(Nl2SqlError::Llm(
                self.message.unwrap_or_else(|| "Model reported an error".to_string()),
            )),
            _ => Ok(TranslationResult::info(self.message.unwrap_or_default())),
        }
    }
}

/// Body of a ```json fenced block, or the whole text when unfenced.
pub fn strip_code_fences(raw: &str) -> &str {
    let body = if let Some((_, rest)) = raw.split_once("```json") {
        rest
    } else if let Some((_, rest)) = raw.split_once("```") {
        rest
    } else {
        return raw.trim();
    };
    body.split_once("```").map_or(body, |(inner, _)| inner).trim()
}

pub fn build_prompt(request: &TranslationRequest) -> String {
    let schema = request
        .schema
        .tables
        .iter()
        .map(|table| {
            let columns = table
                .columns
                .iter()
                .map(|c| {
                    format!(
                        "    {} {}{}{}",
                        c.name,
                        c.declared_type,
                        if c.primary_key { " [PK]" } else { "" },
                        if c.not_null { " NOT NULL" } else { "" }
                    )
                })
                .join("\n");
            format!("  TABLE: {} ({} rows)\n{}", table.name, table.row_count, columns)
        })
        .join("\n\n");

    let skip = request.conversation_history.len().saturating_sub(HISTORY_TURNS);
    let history = request.conversation_history[skip..]
        .iter()
        .map(|turn| format!("  {}: {}", turn.role, turn.content.chars().take(HISTORY_CHARS).collect::<String>()))
        .join("\n");

    format!(
        r#"Convert the user's request into one SQLite statement for the schema below.

DATABASE SCHEMA:
{}

CONVERSATION STATE:
- Active table: {}
- History:
{}

RULES:
1. Use only the tables and columns listed above.
2. Never write UPDATE or DELETE without a WHERE clause.
3. Never write CREATE, ALTER or DROP statements.
4. Compare text columns case-insensitively with LOWER().

Return ONLY a JSON object, either
{{"type": "sql", "query": "<sql>", "explanation": "<one sentence>"}}
or
{{"type": "info" | "clarification", "message": "<reply>"}}

USER INPUT: "{}""#,
        schema,
        request.selected_table.as_deref().unwrap_or("none"),
        history,
        request.utterance
    )
}

/// Something that can propose a translation ahead of the deterministic engine.
#[async_trait]
pub trait SqlOverride: Send + Sync {
    async fn propose(&self, request: &TranslationRequest) -> Result<LlmReply>;
}

pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
    current_key: AtomicUsize,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let config = config.sanitized();
        if config.api_keys.is_empty() {
            return Err(Nl2SqlError::Config("No usable LLM API key configured".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Nl2SqlError::Llm(format!("Failed to build HTTP client: {}", e)))?;
        info!(keys = config.api_keys.len(), model = %config.model, "LLM client ready");
        Ok(Self {
            http,
            config,
            current_key: AtomicUsize::new(0),
        })
    }

    /// Send one prompt, rotating through the key pool on quota or server
    /// errors. Each key is tried at most once.
    async fn call_llm(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": "You are a precise JSON-only responder. Always return valid JSON, no other text."},
                {"role": "user", "content": prompt}
            ],
            "temperature": self.config.temperature,
            "max_tokens": 1000
        });
        let keys = &self.config.api_keys;
        let mut last_status = None;

        for _ in 0..keys.len() {
            let index = self.current_key.load(Ordering::Relaxed) % keys.len();
            let response = self
                .http
                .post(&format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')))
                .header("Authorization", format!("Bearer {}", keys[index]))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| Nl2SqlError::Llm(format!("LLM API call failed: {}", e)))?;

            let status = response.status();
            if ROTATE_ON.contains(&status.as_u16()) {
                warn!(key = index + 1, status = status.as_u16(), "LLM key exhausted, rotating");
                self.current_key.store((index + 1) % keys.len(), Ordering::Relaxed);
                last_status = Some(status);
                continue;
            }
            if !status.is_success() {
                return Err(Nl2SqlError::Llm(format!("LLM API returned {}", status)));
            }

            let response_json: serde_json::Value = response
                .json()
                .await
                .map_err(|e| Nl2SqlError::Llm(format!("Failed to parse LLM response: {}", e)))?;
            let content = response_json["choices"][0]["message"]["content"]
                .as_str()
                .ok_or_else(|| Nl2SqlError::Llm("No content in LLM response".to_string()))?;
            return Ok(content.to_string());
        }

        Err(Nl2SqlError::Llm(match last_status {
            Some(status) => format!("All {} API keys exhausted (last status {})", keys.len(), status),
            None => "No API key available".to_string(),
        }))
    }
}

#[async_trait]
impl SqlOverride for LlmClient {
    async fn propose(&self, request: &TranslationRequest) -> Result<LlmReply> {
        let raw = self.call_llm(&build_prompt(request)).await?;
        debug!(chars = raw.len(), "LLM replied");
        LlmReply::parse(&raw)
    }
}

/// Runs an override first and the deterministic engine when it fails.
pub struct OverrideTranslator<O> {
    fallback: Translator,
    override_path: O,
    timeout: Duration,
}

impl<O: SqlOverride> OverrideTranslator<O> {
    pub fn new(fallback: Translator, override_path: O, timeout: Duration) -> Self {
        Self {
            fallback,
            override_path,
            timeout,
        }
    }

    pub fn fallback(&self) -> &Translator {
        &self.fallback
    }

    pub async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        match self.try_override(request).await {
            Ok(result) => {
                info!(kind = result.kind(), "Using override result");
                result
            }
            Err(e) => {
                warn!(error = %e, "Override failed, using deterministic engine");
                self.fallback.translate(request)
            }
        }
    }

    async fn try_override(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        let reply = tokio::time::timeout(self.timeout, self.override_path.propose(request))
            .await
            .map_err(|_| Nl2SqlError::Timeout(self.timeout.as_millis() as u64))??;
        reply.into_result()
    }
}
