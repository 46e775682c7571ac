//! Inspection of SQL typed by the caller or proposed by the override path.
//!
//! Only full statements that parse as exactly one SQLite statement pass. An
//! UPDATE or DELETE without WHERE never passes, whoever wrote it.

use crate::error::{Nl2SqlError, Result};
use crate::response::OperationKind;
use lazy_static::lazy_static;
use regex::Regex;
use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use tracing::debug;

lazy_static! {
    static ref LOOKS_LIKE_SQL: Regex = Regex::new(
        r"(?is)^\s*(?:select\s.+\sfrom\s|select\s+count\s*\(|insert\s+into\s|update\s+\S+\s+set\s|delete\s+from\s|create\s|alter\s|drop\s|truncate\s|pragma\s|with\s+\w+\s+as\s*\()"
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Not SQL, or SQL-looking text that does not parse: translate it as language.
    NotSql,
    Accepted {
        statement: String,
        operation_kind: OperationKind,
    },
    /// A well-formed UPDATE/DELETE with no WHERE clause.
    MissingPredicate { operation_kind: OperationKind },
    Rejected(String),
}

/// Classification of one parsed statement.
fn classify(statement: &Statement) -> std::result::Result<(OperationKind, bool), String> {
    match statement {
        Statement::Query(_) => Ok((OperationKind::Select, true)),
        Statement::Insert { .. } => Ok((OperationKind::Insert, true)),
        Statement::Update { selection, .. } => Ok((OperationKind::Update, selection.is_some())),
        Statement::Delete { selection, .. } => Ok((OperationKind::Delete, selection.is_some())),
        Statement::CreateTable { .. }
        | Statement::AlterTable { .. }
        | Statement::Drop { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::Truncate { .. }
        | Statement::Pragma { .. } => Ok((OperationKind::Ddl, true)),
        other => Err(format!("Unsupported statement: {}", other)),
    }
}

fn parse_one(sql: &str) -> std::result::Result<Statement, String> {
    let mut statements = Parser::parse_sql(&SQLiteDialect {}, sql).map_err(|e| e.to_string())?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        0 => Err("No statement found".to_string()),
        n => Err(format!("Expected a single statement, found {}", n)),
    }
}

fn clean(sql: &str) -> String {
    sql.trim().trim_end_matches(';').trim_end().to_string()
}

/// Decide whether an utterance is itself a SQL statement.
pub fn inspect(utterance: &str) -> Verdict {
    if !LOOKS_LIKE_SQL.is_match(utterance) {
        return Verdict::NotSql;
    }
    let statement = match parse_one(utterance) {
        Ok(statement) => statement,
        Err(e) => {
            debug!(error = %e, "SQL-looking utterance did not parse; translating as language");
            return Verdict::NotSql;
        }
    };
    match classify(&statement) {
        Ok((operation_kind, true)) => Verdict::Accepted {
            statement: clean(utterance),
            operation_kind,
        },
        Ok((operation_kind, false)) => Verdict::MissingPredicate { operation_kind },
        Err(reason) => Verdict::Rejected(reason),
    }
}

/// Check SQL proposed by the override path. DDL is never accepted from it.
pub fn validate_proposal(sql: &str) -> Result<(String, OperationKind)> {
    let statement = parse_one(sql).map_err(Nl2SqlError::Sql)?;
    match classify(&statement).map_err(Nl2SqlError::Sql)? {
        (OperationKind::Ddl, _) => Err(Nl2SqlError::Sql("Schema changes must be written out explicitly".to_string())),
        (kind, false) => Err(Nl2SqlError::Sql(format!("{:?} without WHERE clause", kind))),
        (kind, true) => Ok((clean(sql), kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_is_not_sql() {
        assert_eq!(inspect("show employee table"), Verdict::NotSql);
        assert_eq!(inspect("add column hospital id in the hospital table"), Verdict::NotSql);
        assert_eq!(inspect("create a new table for patients"), Verdict::NotSql);
        assert_eq!(inspect("select all employees from sales where they are happy"), Verdict::NotSql);
    }

    #[test]
    fn test_select_passthrough() {
        match inspect("SELECT * FROM employee WHERE salary > 10;") {
            Verdict::Accepted { statement, operation_kind } => {
                assert_eq!(statement, "SELECT * FROM employee WHERE salary > 10");
                assert_eq!(operation_kind, OperationKind::Select);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_explicit_ddl_passthrough() {
        let verdict = inspect("ALTER TABLE hospital ADD COLUMN hospital_id INTEGER");
        assert!(matches!(
            verdict,
            Verdict::Accepted { operation_kind: OperationKind::Ddl, .. }
        ));
    }

    #[test]
    fn test_unsafe_dml_is_held_back() {
        assert_eq!(
            inspect("delete from EMPLOYEE"),
            Verdict::MissingPredicate { operation_kind: OperationKind::Delete }
        );
        assert_eq!(
            inspect("UPDATE employee SET salary = 0"),
            Verdict::MissingPredicate { operation_kind: OperationKind::Update }
        );
        assert!(matches!(
            inspect("DELETE FROM employee WHERE employee_id = 3"),
            Verdict::Accepted { operation_kind: OperationKind::Delete, .. }
        ));
    }

    #[test]
    fn test_validate_proposal() {
        assert!(validate_proposal("SELECT 1; SELECT 2").is_err());
        assert!(validate_proposal("DROP TABLE employee").is_err());
        assert!(validate_proposal("DELETE FROM employee").is_err());
        let (sql, kind) = validate_proposal("INSERT INTO t (a) VALUES (1)").unwrap();
        assert_eq!(sql, "INSERT INTO t (a) VALUES (1)");
        assert_eq!(kind, OperationKind::Insert);
    }
}
