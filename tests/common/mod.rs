#![allow(dead_code)]

use nl2sql_engine::{Column, Schema, Table, TranslationRequest, TranslationResult, Translator};

/// EMPLOYEE (3 rows) and DEPARTMENT (2 rows).
pub fn schema() -> Schema {
    Schema::new(vec![
        Table::new(
            "EMPLOYEE",
            vec![
                Column::new("EMPLOYEE_ID", "INTEGER").primary_key(),
                Column::new("FIRST_NAME", "TEXT"),
                Column::new("LAST_NAME", "TEXT"),
                Column::new("EMAIL", "TEXT"),
                Column::new("PHONE_NUMBER", "TEXT"),
                Column::new("HIRE_DATE", "TEXT"),
                Column::new("SALARY", "REAL"),
                Column::new("DEPARTMENT_ID", "INTEGER"),
            ],
        )
        .with_row_count(3)
        .with_foreign_key("DEPARTMENT_ID", "DEPARTMENT", "DEPARTMENT_ID"),
        Table::new(
            "DEPARTMENT",
            vec![
                Column::new("DEPARTMENT_ID", "INTEGER").primary_key(),
                Column::new("DEPARTMENT_NAME", "TEXT"),
            ],
        )
        .with_row_count(2),
    ])
}

pub fn translate(text: &str) -> TranslationResult {
    Translator::default().translate(&TranslationRequest::new(text, schema()))
}

pub fn statement(text: &str) -> String {
    let result = translate(text);
    match result.statement() {
        Some(sql) => sql.to_string(),
        None => panic!("expected SQL for {:?}, got {:?}", text, result),
    }
}
