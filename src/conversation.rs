//! Informational replies: greetings, help, database concepts and schema questions.

use crate::intent::{ConversationalKind, SchemaQueryKind};
use crate::resolver::ResolvedTable;
use crate::response::{table_clarification, Suggestion, TranslationResult};
use crate::schema::{Schema, Table};
use crate::utterance::Utterance;

/// Concept keyword and its answer; the first keyword found in the question wins.
const KNOWLEDGE: &[(&str, &str)] = &[
    ("foreign key", "A foreign key is a column that references the primary key of another table. It links related rows and keeps references valid."),
    ("primary key", "A primary key is a column (or set of columns) that uniquely identifies each row in a table. It cannot be NULL and cannot repeat."),
    ("normaliz", "Normalization organizes tables to reduce duplicated data: each fact is stored once and related through keys."),
    ("normalis", "Normalization organizes tables to reduce duplicated data: each fact is stored once and related through keys."),
    ("index", "An index is a lookup structure on one or more columns that makes searching and sorting on those columns faster."),
    ("indices", "An index is a lookup structure on one or more columns that makes searching and sorting on those columns faster."),
    ("join", "A JOIN combines rows from two or more tables based on a related column, for example employees with their departments."),
    ("constraint", "A constraint is a rule enforced on a column or table, such as PRIMARY KEY, FOREIGN KEY, NOT NULL, UNIQUE or CHECK."),
    ("transaction", "A transaction groups statements so they succeed or fail together; COMMIT makes the changes permanent, ROLLBACK undoes them."),
    ("view", "A view is a saved SELECT query that can be queried like a table."),
    ("sql", "SQL (Structured Query Language) is the language used to read and change data in relational databases: SELECT, INSERT, UPDATE and DELETE."),
    ("database", "A database is an organized collection of data, stored in tables made of rows and columns."),
];

pub fn reply(kind: ConversationalKind, utterance: &Utterance, schema: &Schema) -> TranslationResult {
    match kind {
        ConversationalKind::Greeting => TranslationResult::info(format!(
            "Hello! Ask me about your data in plain English and I will write the SQL.{}",
            examples(schema)
        )),
        ConversationalKind::Gratitude => {
            TranslationResult::info("You're welcome! Let me know if you need another query.")
        }
        ConversationalKind::Help => TranslationResult::info(format!(
            "I translate requests into SQL. You can show, add, update, delete and summarize rows, or ask about tables and columns.{}",
            examples(schema)
        )),
        ConversationalKind::GeneralKnowledge => {
            let answer = KNOWLEDGE
                .iter()
                .find(|(keyword, _)| utterance.normalized.contains(keyword))
                .map(|(_, answer)| answer.to_string())
                .unwrap_or_else(|| {
                    "That's a good database question, but I can best help by writing queries against your tables."
                        .to_string()
                });
            TranslationResult::info(answer)
        }
    }
}

fn examples(schema: &Schema) -> String {
    let lines: Vec<String> = suggest_queries(schema)
        .into_iter()
        .map(|s| format!("\n- {}", s.value))
        .collect();
    if lines.is_empty() {
        String::new()
    } else {
        format!(" For example:{}", lines.concat())
    }
}

/// Answer a schema question; `resolved` is the table the question is about, if any.
pub fn schema_info(
    kind: SchemaQueryKind,
    utterance: &Utterance,
    schema: &Schema,
    resolved: Option<ResolvedTable<'_>>,
) -> TranslationResult {
    if schema.is_empty() {
        return TranslationResult::info("No tables are loaded yet. Upload or connect a database first.");
    }
    let table = match (kind, resolved) {
        (SchemaQueryKind::ListTables, _) => {
            let tables: Vec<String> = schema
                .tables
                .iter()
                .map(|t| format!("{} ({} rows)", t.name, t.row_count))
                .collect();
            return TranslationResult::info(format!("Available tables: {}", tables.join(", ")));
        }
        (_, Some(r)) => r.table,
        (_, None) => return table_clarification(schema, &utterance.original),
    };
    let message = match kind {
        SchemaQueryKind::DescribeTable => describe(table),
        SchemaQueryKind::Constraints => constraints(table),
        _ => keys(table),
    };
    TranslationResult::info(message)
}

fn describe(table: &Table) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            let mut line = format!("{} {}", c.name, if c.declared_type.is_empty() { "TEXT" } else { c.declared_type.as_str() });
            if c.primary_key {
                line.push_str(" PRIMARY KEY");
            } else if c.not_null {
                line.push_str(" NOT NULL");
            }
            line
        })
        .collect();
    format!(
        "Table {} has {} columns and {} rows: {}",
        table.name,
        table.columns.len(),
        table.row_count,
        columns.join(", ")
    )
}

fn constraints(table: &Table) -> String {
    let mut parts: Vec<String> = Vec::new();
    let pks: Vec<&str> = table.primary_keys().map(|c| c.name.as_str()).collect();
    if !pks.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", pks.join(", ")));
    }
    for column in table.columns.iter().filter(|c| c.not_null && !c.primary_key) {
        parts.push(format!("{} NOT NULL", column.name));
    }
    for fk in &table.foreign_keys {
        parts.push(format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            fk.column, fk.references_table, fk.references_column
        ));
    }
    if parts.is_empty() {
        format!("Table {} has no declared constraints.", table.name)
    } else {
        format!("Constraints on {}: {}", table.name, parts.join("; "))
    }
}

fn keys(table: &Table) -> String {
    let pks: Vec<&str> = table.primary_keys().map(|c| c.name.as_str()).collect();
    let primary = if pks.is_empty() {
        "no primary key".to_string()
    } else {
        format!("primary key {}", pks.join(", "))
    };
    let foreign: Vec<String> = table
        .foreign_keys
        .iter()
        .map(|fk| format!("{} -> {}.{}", fk.column, fk.references_table, fk.references_column))
        .collect();
    if foreign.is_empty() {
        format!("Table {} has {} and no foreign keys.", table.name, primary)
    } else {
        format!("Table {} has {}; foreign keys: {}", table.name, primary, foreign.join(", "))
    }
}

/// Starter requests for the first three tables.
pub fn suggest_queries(schema: &Schema) -> Vec<Suggestion> {
    schema
        .tables
        .iter()
        .take(3)
        .flat_map(|t| {
            [
                Suggestion::new(
                    &format!("View {}", t.name),
                    &format!("Show all data from {}", t.name),
                    &format!("Display the rows of {}", t.name),
                ),
                Suggestion::new(
                    &format!("Count {}", t.name),
                    &format!("How many rows in {}?", t.name),
                    &format!("Count the rows of {}", t.name),
                ),
            ]
        })
        .collect()
}
