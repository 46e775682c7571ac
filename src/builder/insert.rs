use super::BuildContext;
use crate::response::{OperationKind, Suggestion, TranslationResult};
use crate::schema::Column;
use crate::utterance::{captured_value, value_pattern, RawValue};
use crate::value::{cast, quote_ident, SqlLiteral};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EXPLICIT: Regex = Regex::new(&format!(
        r"(?i)\b(?P<term>[a-z_]\w*(?:\s+[a-z_]\w*)?)\s*[=:]\s*{}",
        value_pattern("v")
    ))
    .unwrap();
    static ref TOKEN: Regex = Regex::new(&value_pattern("v")).unwrap();
}

struct Assignment<'t> {
    column: &'t Column,
    value: SqlLiteral,
}

pub fn build(ctx: &BuildContext<'_>) -> TranslationResult {
    let mut assignments = explicit_pairs(ctx);
    if assignments.is_empty() {
        assignments = named_pairs(ctx);
    }
    if assignments.is_empty() {
        assignments = positional(ctx);
    }
    if assignments.is_empty() {
        return clarify(ctx);
    }

    let table = ctx.table;
    let columns: Vec<String> = assignments.iter().map(|a| quote_ident(&a.column.name)).collect();
    let values: Vec<String> = assignments.iter().map(|a| a.value.to_string()).collect();
    let statement = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&table.name),
        columns.join(", "),
        values.join(", ")
    );
    let described: Vec<String> = assignments
        .iter()
        .map(|a| format!("{} = {}", a.column.name, a.value.plain()))
        .collect();
    let explanation = format!("Inserts a new row into {} with {}.", table.name, described.join(", "));
    TranslationResult::sql(statement, OperationKind::Insert, explanation, ctx.confidence)
}

/// `column = value` / `column: value`.
fn explicit_pairs<'t>(ctx: &BuildContext<'t>) -> Vec<Assignment<'t>> {
    let mut assignments: Vec<Assignment<'t>> = Vec::new();
    for caps in EXPLICIT.captures_iter(&ctx.utterance.original) {
        let (term, value) = match (caps.name("term"), captured_value(&caps, "v")) {
            (Some(term), Some(value)) => (term.as_str(), value),
            _ => continue,
        };
        if let Some(resolved) = ctx.resolve_term(term) {
            push_unique(&mut assignments, resolved.column, &value);
        }
    }
    assignments
}

/// `first name Anu and salary 5000`: a column term followed by its value.
fn named_pairs<'t>(ctx: &BuildContext<'t>) -> Vec<Assignment<'t>> {
    let mut assignments = Vec::new();
    for pair in ctx.column_values() {
        push_unique(&mut assignments, pair.column, &pair.value);
    }
    assignments
}

/// Values in order of appearance, assigned to the non-key columns in order.
fn positional<'t>(ctx: &BuildContext<'t>) -> Vec<Assignment<'t>> {
    let values: Vec<RawValue> = TOKEN
        .captures_iter(&ctx.utterance.original)
        .filter_map(|caps| captured_value(&caps, "v"))
        .filter(|v| v.quoted || !(ctx.is_reserved(&v.text) || ctx.is_column_word(&v.text)))
        .collect();
    ctx.table
        .insertable_columns()
        .zip(values.iter())
        .map(|(column, value)| Assignment {
            column,
            value: cast(&value.text, column.affinity()),
        })
        .collect()
}

fn push_unique<'t>(assignments: &mut Vec<Assignment<'t>>, column: &'t Column, value: &RawValue) {
    if assignments.iter().any(|a| a.column.name == column.name) {
        return;
    }
    assignments.push(Assignment {
        column,
        value: cast(&value.text, column.affinity()),
    });
}

fn clarify(ctx: &BuildContext<'_>) -> TranslationResult {
    let table = ctx.table;
    let suggestions = table
        .insertable_columns()
        .map(|c| {
            Suggestion::new(
                &c.name,
                &format!("insert into {} with {} = <value>", table.name, c.name),
                &format!(
                    "{}{}",
                    if c.declared_type.is_empty() { "TEXT" } else { c.declared_type.as_str() },
                    if c.not_null { ", required" } else { "" }
                ),
            )
        })
        .collect();
    let columns: Vec<String> = table
        .insertable_columns()
        .map(|c| format!("{} ({})", c.name, if c.declared_type.is_empty() { "TEXT" } else { c.declared_type.as_str() }))
        .collect();
    TranslationResult::clarification(
        format!(
            "What values should the new {} row have? Columns: {}.",
            table.name,
            columns.join(", ")
        ),
        suggestions,
    )
}
