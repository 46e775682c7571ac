mod common;

use common::{schema, statement, translate};
use nl2sql_engine::fuzzy_matcher::edit_distance;
use nl2sql_engine::resolver::{ColumnResolver, ColumnStrategy, TableContext, TableResolver};
use nl2sql_engine::schema::ColumnType;
use nl2sql_engine::utterance::Utterance;
use nl2sql_engine::value::{cast, SqlLiteral};
use nl2sql_engine::{
    Column, ConversationTurn, Lexicon, OperationKind, Schema, Table, TranslationRequest, TranslationResult, Translator,
};

#[test]
fn test_delete_by_employee_name() {
    let result = translate("delete employee record whose employee name is 'Kavya'");
    assert_eq!(
        result.statement(),
        Some(r#"DELETE FROM "EMPLOYEE" WHERE LOWER("FIRST_NAME") = LOWER('Kavya')"#)
    );
    assert_eq!(result.operation_kind(), Some(OperationKind::Delete));
}

#[test]
fn test_show_table_defaults_limit() {
    assert_eq!(statement("show employee table"), r#"SELECT * FROM "EMPLOYEE" LIMIT 100"#);
}

#[test]
fn test_update_phone_by_name() {
    assert_eq!(
        statement(r#"update phone number 987654321 where employee name is "Ammu""#),
        r#"UPDATE "EMPLOYEE" SET "PHONE_NUMBER" = '987654321' WHERE LOWER("FIRST_NAME") = LOWER('Ammu')"#
    );
}

#[test]
fn test_delete_without_predicate_asks() {
    let result = translate("delete from EMPLOYEE");
    match &result {
        TranslationResult::Clarification { message, suggestions } => {
            assert!(message.contains("all 3 rows of EMPLOYEE"));
            assert_eq!(suggestions[0].value, "delete from EMPLOYEE where EMPLOYEE_ID is <value>");
        }
        other => panic!("expected clarification, got {:?}", other),
    }
}

#[test]
fn test_add_column_request_is_refused() {
    let result = translate("add column hospital id in the hospital table");
    assert_eq!(result.kind(), "error");
    assert!(result.statement().is_none());
}

#[test]
fn test_explicit_ddl_is_passed_through() {
    let result = translate("ALTER TABLE EMPLOYEE ADD COLUMN HOSPITAL_ID INTEGER");
    assert_eq!(result.operation_kind(), Some(OperationKind::Ddl));
    assert_eq!(result.statement(), Some("ALTER TABLE EMPLOYEE ADD COLUMN HOSPITAL_ID INTEGER"));
}

#[test]
fn test_comparison_filter() {
    assert_eq!(
        statement("show employees where salary greater than 5000"),
        r#"SELECT * FROM "EMPLOYEE" WHERE "SALARY" > 5000 LIMIT 100"#
    );
    assert_eq!(
        statement("delete employees whose salary is below 1000"),
        r#"DELETE FROM "EMPLOYEE" WHERE "SALARY" < 1000"#
    );
}

#[test]
fn test_delete_with_column_value_pair() {
    let result = translate("delete employees with salary 5000");
    assert_eq!(result.statement(), Some(r#"DELETE FROM "EMPLOYEE" WHERE "SALARY" = 5000"#));
    assert_eq!(translate("delete employees with salary").kind(), "clarification");
}

#[test]
fn test_table_phrasing_for_row_deletes() {
    assert_eq!(
        statement("delete employee table rows where salary below 100"),
        r#"DELETE FROM "EMPLOYEE" WHERE "SALARY" < 100"#
    );
    let result = translate("remove the employee table entry where employee id is 5");
    assert_eq!(result.operation_kind(), Some(OperationKind::Delete));
    assert!(result.statement().unwrap().ends_with(r#"WHERE "EMPLOYEE_ID" = 5"#));
    assert_eq!(translate("delete the employee table").kind(), "error");
}

#[test]
fn test_column_of_value_selects_one_row() {
    assert_eq!(
        statement("show salary of Ravi"),
        r#"SELECT "SALARY" FROM "EMPLOYEE" WHERE LOWER("FIRST_NAME") = LOWER('Ravi') LIMIT 100"#
    );
}

#[test]
fn test_pattern_and_date_filters() {
    assert_eq!(
        statement("show employees whose first name starts with 'ka'"),
        r#"SELECT * FROM "EMPLOYEE" WHERE UPPER("FIRST_NAME") LIKE 'KA%' LIMIT 100"#
    );
    assert_eq!(
        statement("show employees hired in january"),
        r#"SELECT * FROM "EMPLOYEE" WHERE UPPER("HIRE_DATE") LIKE '%-JAN-%' LIMIT 100"#
    );
}

#[test]
fn test_projection_and_ranking() {
    assert_eq!(
        statement("show first name and email of employees"),
        r#"SELECT "FIRST_NAME", "EMAIL" FROM "EMPLOYEE" LIMIT 100"#
    );
    assert_eq!(
        statement("show the top 2 employees by salary"),
        r#"SELECT * FROM "EMPLOYEE" ORDER BY "SALARY" DESC LIMIT 2"#
    );
}

#[test]
fn test_explicit_insert() {
    let result = translate("insert into employee first name = Anu, salary = 5000");
    assert_eq!(
        result.statement(),
        Some(r#"INSERT INTO "EMPLOYEE" ("FIRST_NAME", "SALARY") VALUES ('Anu', 5000)"#)
    );
    assert_eq!(result.operation_kind(), Some(OperationKind::Insert));
}

#[test]
fn test_aggregates() {
    let result = translate("how many employees are there");
    assert_eq!(result.statement(), Some(r#"SELECT COUNT(*) AS result FROM "EMPLOYEE""#));
    assert_eq!(result.operation_kind(), Some(OperationKind::Aggregate));
    assert_eq!(
        statement("total number of employees"),
        r#"SELECT COUNT(*) AS result FROM "EMPLOYEE""#
    );
    assert_eq!(
        statement("count employees per department"),
        r#"SELECT "DEPARTMENT_ID", COUNT(*) AS result FROM "EMPLOYEE" GROUP BY "DEPARTMENT_ID""#
    );
}

#[test]
fn test_informational_replies() {
    assert_eq!(translate("hello there").kind(), "info");
    assert_eq!(
        translate("show tables").message(),
        Some("Available tables: EMPLOYEE (3 rows), DEPARTMENT (2 rows)")
    );
    assert!(translate("describe employee")
        .message()
        .unwrap()
        .starts_with("Table EMPLOYEE has 8 columns and 3 rows"));
    assert!(translate("what is a foreign key?").message().unwrap().starts_with("A foreign key"));
}

#[test]
fn test_unresolved_table_asks_which_one() {
    match translate("show everything") {
        TranslationResult::Clarification { suggestions, .. } => {
            let labels: Vec<&str> = suggestions.iter().map(|s| s.label.as_str()).collect();
            assert_eq!(labels, vec!["EMPLOYEE", "DEPARTMENT"]);
        }
        other => panic!("expected clarification, got {:?}", other),
    }
}

#[test]
fn test_history_supplies_the_table() {
    let request = TranslationRequest::new("show them", schema())
        .with_history(vec![ConversationTurn::user("show all employees")]);
    let result = Translator::default().translate(&request);
    assert_eq!(result.statement(), Some(r#"SELECT * FROM "EMPLOYEE" LIMIT 100"#));
}

#[test]
fn test_update_and_delete_always_carry_where() {
    let utterances = [
        "delete everything",
        "delete all employees",
        "remove employee",
        "wipe the employee table",
        "update salary to 100",
        "change the salary of employees to 10",
        "update employee set salary = 1",
        "DELETE FROM employee",
        "delete employee record whose employee name is 'Kavya'",
        r#"update phone number 987654321 where employee name is "Ammu""#,
    ];
    let mut emitted = 0;
    for text in utterances {
        let result = translate(text);
        if let Some(kind) = result.operation_kind() {
            if matches!(kind, OperationKind::Update | OperationKind::Delete) {
                emitted += 1;
                assert!(
                    result.statement().unwrap().contains(" WHERE "),
                    "{:?} produced {:?}",
                    text,
                    result
                );
            }
        }
    }
    assert!(emitted >= 2);
}

#[test]
fn test_translation_is_deterministic() {
    for text in ["show employee table", "delete from EMPLOYEE", "how many employees are there"] {
        assert_eq!(translate(text), translate(text));
    }
}

#[test]
fn test_single_table_schema_always_resolves() {
    let schema = Schema::new(vec![Table::new(
        "PATIENT",
        vec![Column::new("PATIENT_ID", "INTEGER").primary_key(), Column::new("NAME", "TEXT")],
    )]);
    let lexicon = Lexicon::shared();
    let resolver = TableResolver::new(&lexicon, 6);
    for text in ["", "show me everything", "xyzzy", "delete from nowhere", "patients named Ravi"] {
        let utterance = Utterance::new(text);
        let ctx = TableContext {
            utterance: &utterance,
            hint: None,
            history: &[],
        };
        let resolved = resolver.resolve(&ctx, &schema).expect("single table resolves");
        assert_eq!(resolved.table.name, "PATIENT");
        assert!(resolved.confidence >= 0.7, "{:?} gave {}", text, resolved.confidence);
    }
}

#[test]
fn test_column_name_resolves_to_itself() {
    let schema = schema();
    let lexicon = Lexicon::shared();
    let resolver = ColumnResolver::new(&lexicon, 0.6);
    for table in &schema.tables {
        for column in &table.columns {
            for term in [column.name.clone(), column.name.to_lowercase()] {
                let resolved = resolver.resolve(&term, table).unwrap();
                assert_eq!(resolved.column.name, column.name);
                assert_eq!(resolved.strategy, ColumnStrategy::Exact);
                assert_eq!(resolved.confidence, 1.0);
            }
        }
    }
}

#[test]
fn test_integer_cast_round_trip() {
    for n in [0i64, 7, -42, 1_000_000_007, i64::MAX, i64::MIN] {
        assert_eq!(cast(&n.to_string(), ColumnType::Integer), SqlLiteral::Integer(n));
    }
}

#[test]
fn test_edit_distance_is_symmetric() {
    let pairs = [
        ("salary", "salaries"),
        ("first_name", "firstname"),
        ("", "phone"),
        ("EMAIL", "e-mail"),
        ("department", "dept"),
    ];
    for (a, b) in pairs {
        assert_eq!(edit_distance(a, b), edit_distance(b, a));
    }
}
