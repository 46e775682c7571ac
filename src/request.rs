use crate::schema::Schema;
use serde::{Deserialize, Serialize};

/// One prior exchange, oldest first in `TranslationRequest::conversation_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub utterance: String,
    pub schema: Schema,
    #[serde(default)]
    pub selected_table: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

impl TranslationRequest {
    pub fn new(utterance: &str, schema: Schema) -> Self {
        Self {
            utterance: utterance.to_string(),
            schema,
            selected_table: None,
            conversation_history: Vec::new(),
        }
    }

    pub fn with_selected_table(mut self, table: &str) -> Self {
        self.selected_table = Some(table.to_string());
        self
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.conversation_history = history;
        self
    }
}
