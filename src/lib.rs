pub mod builder;
pub mod conditions;
pub mod config;
pub mod conversation;
pub mod error;
pub mod fuzzy_matcher;
pub mod intent;
pub mod lexicon;
pub mod llm;
pub mod request;
pub mod resolver;
pub mod response;
pub mod schema;
pub mod sql_guard;
pub mod translator;
pub mod utterance;
pub mod value;

pub use config::{EngineConfig, LlmConfig};
pub use error::{Nl2SqlError, Result};
pub use intent::{Intent, IntentClassifier, IntentKind};
pub use lexicon::Lexicon;
pub use llm::{LlmClient, LlmReply, OverrideTranslator, SqlOverride};
pub use request::{ConversationTurn, TranslationRequest};
pub use response::{OperationKind, Suggestion, TranslationResult};
pub use schema::{Column, ColumnType, ForeignKey, Schema, Table};
pub use translator::Translator;
