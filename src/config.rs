use crate::error::{Nl2SqlError, Result};
use crate::lexicon::Lexicon;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// CRUD intents must score above this to be considered.
    pub crud_threshold: f64,
    /// Table matches below this confidence turn into a clarification.
    pub clarify_below: f64,
    pub fuzzy_threshold: f64,
    pub default_limit: u64,
    /// How many trailing conversation turns the table resolver looks at.
    pub history_window: usize,
    pub lexicon_path: Option<PathBuf>,
    pub llm: Option<LlmConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            crud_threshold: 0.3,
            clarify_below: 0.5,
            fuzzy_threshold: 0.6,
            default_limit: 100,
            history_window: 6,
            lexicon_path: None,
            llm: None,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("crud_threshold", self.crud_threshold),
            ("clarify_below", self.clarify_below),
            ("fuzzy_threshold", self.fuzzy_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Nl2SqlError::Config(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }
        if self.default_limit == 0 {
            return Err(Nl2SqlError::Config("default_limit must be positive".to_string()));
        }
        Ok(())
    }

    /// The configured lexicon file, or the built-in lexicon.
    pub fn lexicon(&self) -> Result<Arc<Lexicon>> {
        match &self.lexicon_path {
            Some(path) => Ok(Arc::new(Lexicon::load(path)?)),
            None => Ok(Lexicon::shared()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Tried in order; the client moves to the next key when one is throttled.
    pub api_keys: Vec<String>,
    pub timeout_ms: u64,
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_keys: Vec::new(),
            timeout_ms: 15_000,
            temperature: 0.1,
        }
    }
}

impl LlmConfig {
    /// Build from `NL2SQL_*` / `OPENAI_API_KEY` environment variables.
    /// Returns `None` when no usable key is configured.
    pub fn from_env() -> Option<Self> {
        let mut config = LlmConfig::default();
        let keys = std::env::var("NL2SQL_API_KEYS")
            .ok()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();
        config.api_keys = usable_keys(keys.split(','));
        if config.api_keys.is_empty() {
            return None;
        }
        if let Ok(model) = std::env::var("NL2SQL_LLM_MODEL") {
            config.model = model;
        }
        if let Ok(base_url) = std::env::var("NL2SQL_LLM_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = std::env::var("NL2SQL_LLM_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            config.timeout_ms = timeout;
        }
        Some(config)
    }

    /// Drop blanks and placeholder values left in sample `.env` files.
    pub fn sanitized(mut self) -> Self {
        self.api_keys = usable_keys(self.api_keys.iter().map(String::as_str));
        self
    }
}

fn usable_keys<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<String> {
    keys.map(str::trim)
        .filter(|k| k.len() > 10 && !k.to_uppercase().contains("PASTE"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.default_limit, 100);
        assert_eq!(config.history_window, 6);
        assert!(config.llm.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold() {
        let config = EngineConfig {
            fuzzy_threshold: 1.5,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Nl2SqlError::Config(_))));
    }

    #[test]
    fn test_placeholder_keys_dropped() {
        let config = LlmConfig {
            api_keys: vec![
                "PASTE_YOUR_KEY_HERE".to_string(),
                "paste_your_key_here".to_string(),
                "short".to_string(),
                " sk-test-0123456789 ".to_string(),
            ],
            ..LlmConfig::default()
        }
        .sanitized();
        assert_eq!(config.api_keys, vec!["sk-test-0123456789".to_string()]);
    }
}
