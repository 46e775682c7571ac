use super::{describe_conditions, BuildContext};
use crate::conditions::{where_clause, Condition};
use crate::response::{missing_predicate, OperationKind, Suggestion, TranslationResult};
use crate::schema::Column;
use crate::utterance::{captured_value, column_term_pattern, value_pattern};
use crate::value::{cast, quote_ident, SqlLiteral};
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;
use tracing::info;

lazy_static! {
    /// "update salary of Anu to 5000"
    static ref OF_FORM: Regex = Regex::new(&format!(
        r"(?i)\b(?:update|change|modify|set|edit|correct|replace)\s+(?:the\s+)?(?P<term>\w+(?:\s+\w+)?)\s+of\s+{}\s+(?:to|as|with|=)\s+{}",
        value_pattern("a"),
        value_pattern("b")
    ))
    .unwrap();
}

struct SetClause<'t> {
    column: &'t Column,
    value: SqlLiteral,
    end: usize,
}

pub fn build(ctx: &BuildContext<'_>) -> TranslationResult {
    let table = ctx.table;
    let predicate = ctx.predicate();

    let (sets, conditions) = match of_form(ctx).filter(|_| predicate.is_none()) {
        Some(found) => found,
        None => {
            let region = predicate.map_or(ctx.utterance.original.as_str(), |_| ctx.head());
            let sets = set_clauses(ctx, region);
            let conditions = match predicate {
                Some(p) => ctx.extractor().extract(p, table),
                // Without a predicate keyword, conditions can only follow the SET part.
                None => {
                    let after = sets.iter().map(|s| s.end).max().unwrap_or(0);
                    ctx.extractor().extract(&region[after..], table)
                }
            };
            (sets, conditions)
        }
    };

    if sets.is_empty() {
        let suggestions = table
            .columns
            .iter()
            .filter(|c| !c.primary_key)
            .take(5)
            .map(|c| {
                Suggestion::new(
                    &c.name,
                    &format!("update {} set {} to <value> where <condition>", table.name, c.name),
                    &format!("Change {}", c.name),
                )
            })
            .collect();
        return TranslationResult::clarification(
            format!("Which column of {} should be changed, and to what value?", table.name),
            suggestions,
        );
    }
    if conditions.is_empty() {
        info!(table = %table.name, "Refusing UPDATE without a WHERE condition");
        return missing_predicate(table, "UPDATE");
    }

    let assignments: Vec<String> = sets
        .iter()
        .map(|s| format!("{} = {}", quote_ident(&s.column.name), s.value))
        .collect();
    let statement = format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(&table.name),
        assignments.join(", "),
        where_clause(&conditions).unwrap_or_default()
    );
    let described: Vec<String> = sets
        .iter()
        .map(|s| format!("{} to {}", s.column.name, s.value.plain()))
        .collect();
    let explanation = format!(
        "Updates {} setting {}{}.",
        table.name,
        described.join(", "),
        describe_conditions(&conditions)
    );
    TranslationResult::sql(statement, OperationKind::Update, explanation, ctx.confidence)
}

fn of_form<'t>(ctx: &BuildContext<'t>) -> Option<(Vec<SetClause<'t>>, Vec<Condition>)> {
    let caps = OF_FORM.captures(&ctx.utterance.original)?;
    let target = captured_value(&caps, "a")?;
    let value = captured_value(&caps, "b")?;
    if !target.quoted && ctx.is_reserved(&target.text) {
        return None;
    }
    let column = ctx.resolve_term(caps.name("term")?.as_str())?.column;
    let name_column = ctx.table.name_column()?;
    let whole = caps.get(0)?;
    let condition = Condition::equals(name_column, &target.text, whole.as_str());
    Some((
        vec![SetClause {
            column,
            value: cast(&value.text, column.affinity()),
            end: whole.end(),
        }],
        vec![condition],
    ))
}

/// `column [to|as|with|=|:] value` pairs, earliest mention first.
fn set_clauses<'t>(ctx: &BuildContext<'t>, region: &str) -> Vec<SetClause<'t>> {
    let extractor = ctx.extractor();
    let mut claimed: Vec<Range<usize>> = Vec::new();
    let mut sets: Vec<(usize, SetClause<'t>)> = Vec::new();

    let exact = ctx.table.columns.iter().map(|c| (c, vec![c.name.clone()]));
    let synonyms = ctx
        .table
        .columns
        .iter()
        .map(|c| (c, extractor.synonym_terms(c, ctx.table)));
    for (column, terms) in exact.chain(synonyms) {
        if sets.iter().any(|(_, s)| s.column.name == column.name) {
            continue;
        }
        for term in terms {
            if ctx.is_reserved(&term) {
                continue;
            }
            let pattern = format!(
                r"(?i){}\s*(?:(?:to|as|with|equals?)\s+|[=:]\s*)?{}",
                column_term_pattern(&term),
                value_pattern("v")
            );
            let re = match Regex::new(&pattern) {
                Ok(re) => re,
                Err(_) => continue,
            };
            let hit = re.captures_iter(region).find_map(|caps| {
                let m = caps.get(0)?;
                let value = captured_value(&caps, "v")?;
                let range = m.range();
                let free = !claimed.iter().any(|c| range.start < c.end && c.start < range.end);
                (free && (value.quoted || !ctx.is_reserved(&value.text))).then(|| (range, value))
            });
            if let Some((range, value)) = hit {
                sets.push((
                    range.start,
                    SetClause {
                        column,
                        value: cast(&value.text, column.affinity()),
                        end: range.end,
                    },
                ));
                claimed.push(range);
                break;
            }
        }
    }
    sets.sort_by_key(|(start, _)| *start);
    sets.into_iter().map(|(_, s)| s).collect()
}
