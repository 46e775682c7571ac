mod common;

use async_trait::async_trait;
use common::schema;
use nl2sql_engine::{
    LlmReply, Nl2SqlError, OperationKind, OverrideTranslator, Result, SqlOverride, TranslationRequest,
    TranslationResult, Translator,
};
use std::time::Duration;

enum Mock {
    Fails,
    Slow,
    Replies(LlmReply),
}

#[async_trait]
impl SqlOverride for Mock {
    async fn propose(&self, _request: &TranslationRequest) -> Result<LlmReply> {
        match self {
            Mock::Fails => Err(Nl2SqlError::Llm("quota exhausted".to_string())),
            Mock::Slow => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(LlmReply::sql("SELECT 1", "too late"))
            }
            Mock::Replies(reply) => Ok(reply.clone()),
        }
    }
}

async fn run(mock: Mock, text: &str) -> (TranslationResult, TranslationResult) {
    let request = TranslationRequest::new(text, schema());
    let translator = OverrideTranslator::new(Translator::default(), mock, Duration::from_millis(50));
    let deterministic = translator.fallback().translate(&request);
    (translator.translate(&request).await, deterministic)
}

#[tokio::test]
async fn test_failing_override_falls_back() {
    let (result, deterministic) = run(Mock::Fails, "show employee table").await;
    assert_eq!(result, deterministic);
    assert_eq!(result.statement(), Some(r#"SELECT * FROM "EMPLOYEE" LIMIT 100"#));
}

#[tokio::test]
async fn test_slow_override_times_out() {
    let (result, deterministic) = run(Mock::Slow, "show employee table").await;
    assert_eq!(result, deterministic);
}

#[tokio::test]
async fn test_unsafe_override_sql_is_not_used() {
    let reply = LlmReply::sql("DELETE FROM EMPLOYEE", "Deletes everything");
    let (result, _) = run(Mock::Replies(reply), "delete from EMPLOYEE").await;
    assert_eq!(result.kind(), "clarification");

    let reply = LlmReply::sql("ALTER TABLE HOSPITAL ADD COLUMN HOSPITAL_ID INTEGER", "Adds the column");
    let (result, _) = run(Mock::Replies(reply), "add column hospital id in the hospital table").await;
    assert_eq!(result.kind(), "error");
}

#[tokio::test]
async fn test_unparseable_reply_falls_back() {
    let reply = LlmReply::sql("SELEC salary FORM employee", "");
    let (result, deterministic) = run(Mock::Replies(reply), "show employee table").await;
    assert_eq!(result, deterministic);
}

#[tokio::test]
async fn test_valid_override_is_used() {
    let reply = LlmReply::sql(
        r#"SELECT "FIRST_NAME" FROM "EMPLOYEE" WHERE "SALARY" IS NOT NULL ORDER BY "SALARY" DESC LIMIT 1"#,
        "Highest paid employee",
    );
    let (result, _) = run(Mock::Replies(reply), "who earns the most").await;
    match result {
        TranslationResult::Sql {
            operation_kind,
            explanation,
            confidence,
            ..
        } => {
            assert_eq!(operation_kind, OperationKind::Select);
            assert_eq!(explanation, "Highest paid employee");
            assert!((confidence - 0.9).abs() < 1e-9);
        }
        other => panic!("expected sql, got {:?}", other),
    }
}
