//! The closed set of answers a translation can produce.

use crate::schema::{Schema, Table};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
    Aggregate,
    /// Only for statements the caller wrote out in full.
    Ddl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub label: String,
    pub value: String,
    pub description: String,
}

impl Suggestion {
    pub fn new(label: &str, value: &str, description: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TranslationResult {
    Sql {
        statement: String,
        #[serde(rename = "operationKind")]
        operation_kind: OperationKind,
        explanation: String,
        confidence: f64,
    },
    Clarification {
        message: String,
        suggestions: Vec<Suggestion>,
    },
    Info {
        message: String,
    },
    Error {
        message: String,
    },
}

impl TranslationResult {
    pub fn sql(statement: String, operation_kind: OperationKind, explanation: String, confidence: f64) -> Self {
        TranslationResult::Sql {
            statement,
            operation_kind,
            explanation,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn clarification(message: impl Into<String>, suggestions: Vec<Suggestion>) -> Self {
        TranslationResult::Clarification {
            message: message.into(),
            suggestions,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        TranslationResult::Info {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        TranslationResult::Error {
            message: message.into(),
        }
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TranslationResult::Sql { .. } => "sql",
            TranslationResult::Clarification { .. } => "clarification",
            TranslationResult::Info { .. } => "info",
            TranslationResult::Error { .. } => "error",
        }
    }

    pub fn statement(&self) -> Option<&str> {
        match self {
            TranslationResult::Sql { statement, .. } => Some(statement),
            _ => None,
        }
    }

    pub fn operation_kind(&self) -> Option<OperationKind> {
        match self {
            TranslationResult::Sql { operation_kind, .. } => Some(*operation_kind),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            TranslationResult::Sql { .. } => None,
            TranslationResult::Clarification { message, .. }
            | TranslationResult::Info { message }
            | TranslationResult::Error { message } => Some(message),
        }
    }
}

/// "Which table did you mean?" with one suggestion per table.
pub fn table_clarification(schema: &Schema, utterance: &str) -> TranslationResult {
    let suggestions = schema
        .tables
        .iter()
        .map(|t| {
            Suggestion::new(
                &t.name,
                &format!("{} in {}", utterance.trim_end_matches(&['.', '?', '!'][..]), t.name),
                &format!("{} columns, {} rows", t.columns.len(), t.row_count),
            )
        })
        .collect();
    TranslationResult::clarification(
        "I couldn't tell which table you mean. Please pick one of the tables below or name it in your request.",
        suggestions,
    )
}

/// Refusal for UPDATE/DELETE without a predicate, with a corrected example.
pub fn missing_predicate(table: &Table, verb: &str) -> TranslationResult {
    let key = table
        .primary_keys()
        .next()
        .or_else(|| table.name_column())
        .or_else(|| table.columns.first())
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "id".to_string());
    let example = match verb {
        "UPDATE" => format!("update {} set <column> to <value> where {} is <value>", table.name, key),
        _ => format!("delete from {} where {} is <value>", table.name, key),
    };
    TranslationResult::clarification(
        format!(
            "This {} has no WHERE condition and would affect all {} rows of {}. Add a condition to choose which rows to change.",
            verb, table.row_count, table.name
        ),
        vec![Suggestion::new("Add a condition", &example, "Limit the change to matching rows")],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    #[test]
    fn test_wire_shape() {
        let result = TranslationResult::sql(
            "SELECT 1".to_string(),
            OperationKind::Aggregate,
            "One".to_string(),
            0.9,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "sql");
        assert_eq!(json["operationKind"], "AGGREGATE");
        assert_eq!(json["confidence"], 0.9);

        let json = serde_json::to_value(TranslationResult::info("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "info", "message": "hi"}));
    }

    #[test]
    fn test_missing_predicate_mentions_rows() {
        let table = Table::new("EMPLOYEE", vec![Column::new("EMPLOYEE_ID", "INTEGER").primary_key()])
            .with_row_count(107);
        let result = missing_predicate(&table, "DELETE");
        assert_eq!(result.kind(), "clarification");
        let message = result.message().unwrap();
        assert!(message.contains("107"));
        match result {
            TranslationResult::Clarification { suggestions, .. } => {
                assert_eq!(suggestions[0].value, "delete from EMPLOYEE where EMPLOYEE_ID is <value>");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
