use super::{describe_conditions, BuildContext};
use crate::conditions::{where_clause, Condition};
use crate::response::{missing_predicate, OperationKind, TranslationResult};
use crate::utterance::{captured_value, value_pattern, RawValue};
use crate::value::quote_ident;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(&value_pattern("v")).unwrap();
}

pub fn build(ctx: &BuildContext<'_>) -> TranslationResult {
    let table = ctx.table;
    let mut conditions = ctx.conditions();
    if conditions.is_empty() && ctx.predicate().is_none() {
        conditions = ctx
            .column_values()
            .iter()
            .map(|p| Condition::equals(p.column, &p.value.text, &p.source))
            .collect();
        if conditions.is_empty() {
            conditions.extend(direct_value(ctx));
        }
    }
    if conditions.is_empty() {
        info!(table = %table.name, "Refusing DELETE without a WHERE condition");
        return missing_predicate(table, "DELETE");
    }
    let statement = format!(
        "DELETE FROM {} WHERE {}",
        quote_ident(&table.name),
        where_clause(&conditions).unwrap_or_default()
    );
    let explanation = format!(
        "Deletes rows from {}{}.",
        table.name,
        describe_conditions(&conditions)
    );
    TranslationResult::sql(statement, OperationKind::Delete, explanation, ctx.confidence)
}

/// "delete Kavya": bind the first value after the verb to the name column,
/// or a bare number to the primary key. Quoted values are preferred, and
/// words that name a column are never taken as values.
fn direct_value(ctx: &BuildContext<'_>) -> Option<Condition> {
    let values: Vec<RawValue> = TOKEN
        .captures_iter(&ctx.utterance.original)
        .filter_map(|caps| captured_value(&caps, "v"))
        .filter(|v| v.quoted || !(ctx.is_reserved(&v.text) || ctx.names_column(&v.text)))
        .collect();
    let value = values
        .iter()
        .find(|v| v.quoted)
        .or_else(|| values.first())?;
    let column = ctx.value_column(value)?;
    Some(Condition::equals(column, &value.text, &value.text))
}
