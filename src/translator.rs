//! The deterministic translation pipeline.
//!
//! utterance -> sql guard -> intent -> table -> builder -> result. Each call
//! is a pure function of the request; the lexicon is shared read-only.

use crate::builder::{self, BuildContext};
use crate::config::EngineConfig;
use crate::conversation;
use crate::error::Result;
use crate::intent::{IntentClassifier, IntentKind};
use crate::lexicon::Lexicon;
use crate::request::TranslationRequest;
use crate::resolver::{ResolvedTable, TableContext, TableResolver};
use crate::response::{missing_predicate, table_clarification, OperationKind, TranslationResult};
use crate::sql_guard::{self, Verdict};
use crate::utterance::Utterance;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Translator {
    lexicon: Arc<Lexicon>,
    config: EngineConfig,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(Lexicon::shared(), EngineConfig::default())
    }
}

impl Translator {
    pub fn new(lexicon: Arc<Lexicon>, config: EngineConfig) -> Self {
        Self { lexicon, config }
    }

    /// Validate the config and load the lexicon it points at.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let lexicon = config.lexicon()?;
        Ok(Self::new(lexicon, config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        let utterance = Utterance::new(&request.utterance);
        if utterance.is_empty() {
            return TranslationResult::error("Please type a request.");
        }

        match sql_guard::inspect(&utterance.original) {
            Verdict::NotSql => {}
            Verdict::Accepted { statement, operation_kind } => {
                info!(?operation_kind, "Passing explicit SQL through");
                let explanation = match operation_kind {
                    OperationKind::Ddl => "Runs the schema statement exactly as written.",
                    _ => "Runs the SQL statement exactly as written.",
                };
                return TranslationResult::sql(statement, operation_kind, explanation.to_string(), 1.0);
            }
            Verdict::MissingPredicate { operation_kind } => {
                info!(?operation_kind, "Refusing explicit SQL without WHERE");
                let verb = match operation_kind {
                    OperationKind::Update => "UPDATE",
                    _ => "DELETE",
                };
                return match self.resolve_table(request, &utterance) {
                    Some(resolved) => missing_predicate(resolved.table, verb),
                    None => TranslationResult::clarification(
                        format!("This {} has no WHERE condition and would affect every row. Add a condition to choose which rows to change.", verb),
                        Vec::new(),
                    ),
                };
            }
            Verdict::Rejected(reason) => return TranslationResult::error(reason),
        }

        let intent = IntentClassifier::new(&self.lexicon, self.config.crud_threshold).classify(&utterance);
        info!(kind = ?intent.kind, confidence = intent.confidence, "Classified intent");

        match intent.kind {
            IntentKind::Conversational(kind) => conversation::reply(kind, &utterance, &request.schema),
            IntentKind::SchemaQuery(kind) => {
                let resolved = self.resolve_table(request, &utterance);
                conversation::schema_info(kind, &utterance, &request.schema, resolved)
            }
            IntentKind::SchemaChange => TranslationResult::error(
                "Schema changes are not generated from plain language. Type the full statement instead, for example: ALTER TABLE <table> ADD COLUMN <column> <type>",
            ),
            IntentKind::Unknown => TranslationResult::clarification(
                "I'm not sure what you'd like to do. Try asking to show, add, update, delete or count rows.",
                conversation::suggest_queries(&request.schema),
            ),
            kind => {
                if request.schema.is_empty() {
                    return TranslationResult::error("No tables are loaded yet. Upload or connect a database first.");
                }
                let resolved = match self.resolve_table(request, &utterance) {
                    Some(resolved) if resolved.confidence >= self.config.clarify_below => resolved,
                    other => {
                        debug!(confidence = ?other.map(|r| r.confidence), "Table unresolved");
                        return table_clarification(&request.schema, &utterance.original);
                    }
                };
                let ctx = BuildContext {
                    lexicon: &self.lexicon,
                    config: &self.config,
                    utterance: &utterance,
                    schema: &request.schema,
                    table: resolved.table,
                    confidence: intent.confidence.min(resolved.confidence),
                };
                builder::build(kind, &ctx)
            }
        }
    }

    fn resolve_table<'s>(&self, request: &'s TranslationRequest, utterance: &Utterance) -> Option<ResolvedTable<'s>> {
        let ctx = TableContext {
            utterance,
            hint: request.selected_table.as_deref(),
            history: &request.conversation_history,
        };
        TableResolver::new(&self.lexicon, self.config.history_window).resolve(&ctx, &request.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Schema, Table};

    fn schema() -> Schema {
        Schema::new(vec![
            Table::new(
                "EMPLOYEE",
                vec![
                    Column::new("EMPLOYEE_ID", "INTEGER").primary_key(),
                    Column::new("FIRST_NAME", "TEXT"),
                    Column::new("SALARY", "REAL"),
                ],
            )
            .with_row_count(12),
            Table::new("DEPARTMENT", vec![Column::new("DEPARTMENT_ID", "INTEGER").primary_key()]),
        ])
    }

    fn translate(text: &str) -> TranslationResult {
        Translator::default().translate(&TranslationRequest::new(text, schema()))
    }

    #[test]
    fn test_empty_utterance_is_error() {
        assert_eq!(translate("   ").kind(), "error");
    }

    #[test]
    fn test_raw_select_passes_through() {
        let result = translate("SELECT FIRST_NAME FROM EMPLOYEE");
        assert_eq!(result.statement(), Some("SELECT FIRST_NAME FROM EMPLOYEE"));
        assert_eq!(result.operation_kind(), Some(OperationKind::Select));
    }

    #[test]
    fn test_raw_delete_without_where_reports_rows_at_risk() {
        let result = translate("DELETE FROM EMPLOYEE");
        assert_eq!(result.kind(), "clarification");
        assert!(result.message().unwrap().contains("all 12 rows of EMPLOYEE"));
    }

    #[test]
    fn test_unknown_offers_suggestions() {
        match translate("banana") {
            TranslationResult::Clarification { suggestions, .. } => assert_eq!(suggestions.len(), 4),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_pinned_table_is_used() {
        let request = TranslationRequest::new("show everything", schema()).with_selected_table("department");
        let result = Translator::default().translate(&request);
        assert_eq!(result.statement(), Some("SELECT * FROM \"DEPARTMENT\" LIMIT 100"));
    }

    #[test]
    fn test_empty_schema_is_error() {
        let result = Translator::default().translate(&TranslationRequest::new("show employees", Schema::default()));
        assert_eq!(result.kind(), "error");
    }
}
