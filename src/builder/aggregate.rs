use super::{describe_conditions, BuildContext, QueryComponents};
use crate::conditions::where_clause;
use crate::intent::AggregateFunction;
use crate::resolver::ColumnStrategy;
use crate::response::{OperationKind, TranslationResult};
use crate::schema::Column;
use crate::utterance::phrase_pattern;
use crate::value::quote_ident;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref GROUP_BY: Regex =
        Regex::new(r"\b(?:group(?:ed)?\s+by|per|for\s+each|by)\s+(?:the\s+)?(?:each\s+)?(\w+)(?:\s+(\w+))?").unwrap();
    static ref AFTER_KEYWORD: Regex =
        Regex::new(r"^\s+(?:(?:of|the|all|paid|in|for)\s+)*(\w+)(?:\s+(\w+))?").unwrap();
}

/// Named columns below this confidence are treated as not named at all.
const NAMED_COLUMN_CONFIDENCE: f64 = 0.7;

pub fn build(ctx: &BuildContext<'_>, function: AggregateFunction) -> TranslationResult {
    let table = ctx.table;
    let text = ctx.utterance.normalized.as_str();

    let target = match function {
        AggregateFunction::Count => None,
        _ => match numeric_target(ctx, function, text) {
            Ok(column) => Some(column),
            Err(message) => return TranslationResult::error(message),
        },
    };

    let components = QueryComponents {
        conditions: ctx.conditions(),
        group_by: group_column(ctx, text, target),
        ..QueryComponents::default()
    };

    let expression = match target {
        Some(column) => format!("{}({})", function.sql_name(), quote_ident(&column.name)),
        None => "COUNT(*)".to_string(),
    };
    let mut statement = match &components.group_by {
        Some(group) => format!(
            "SELECT {}, {} AS result FROM {}",
            quote_ident(group),
            expression,
            quote_ident(&table.name)
        ),
        None => format!("SELECT {} AS result FROM {}", expression, quote_ident(&table.name)),
    };
    if let Some(clause) = where_clause(&components.conditions) {
        statement.push_str(&format!(" WHERE {}", clause));
    }
    if let Some(group) = &components.group_by {
        statement.push_str(&format!(" GROUP BY {}", quote_ident(group)));
    }

    let subject = match target {
        Some(column) => format!("{} of {}", function.describe(), column.name),
        None => "Number of rows".to_string(),
    };
    let mut explanation = format!(
        "{} in {}{}",
        subject,
        table.name,
        describe_conditions(&components.conditions)
    );
    if let Some(group) = &components.group_by {
        explanation.push_str(&format!(", for each {}", group));
    }
    explanation.push('.');
    TranslationResult::sql(statement, OperationKind::Aggregate, explanation, ctx.confidence)
}

/// The column named right after the aggregate keyword, else the first numeric
/// non-key column, else the first numeric column.
fn numeric_target<'t>(
    ctx: &BuildContext<'t>,
    function: AggregateFunction,
    text: &str,
) -> std::result::Result<&'t Column, String> {
    if let Some(column) = named_column(ctx, function, text) {
        if column.affinity().is_numeric() {
            return Ok(column);
        }
        return Err(format!(
            "Cannot compute {} of {}: it is a {} column, not a numeric one.",
            function.sql_name(),
            column.name,
            if column.declared_type.is_empty() { "TEXT" } else { column.declared_type.as_str() }
        ));
    }
    let numeric = |c: &&Column| c.affinity().is_numeric();
    ctx.table
        .columns
        .iter()
        .filter(|c| !c.primary_key)
        .find(numeric)
        .or_else(|| ctx.table.columns.iter().find(numeric))
        .ok_or_else(|| {
            format!(
                "Cannot compute {}: table {} has no numeric column.",
                function.sql_name(),
                ctx.table.name
            )
        })
}

fn named_column<'t>(ctx: &BuildContext<'t>, function: AggregateFunction, text: &str) -> Option<&'t Column> {
    ctx.lexicon
        .aggregate_keywords(function)
        .iter()
        .filter_map(|kw| Regex::new(&phrase_pattern(kw)).ok())
        .filter_map(|re| re.find(text))
        .min_by_key(|m| m.start())
        .and_then(|m| {
            let caps = AFTER_KEYWORD.captures(&text[m.end()..])?;
            let term = (1..=2)
                .filter_map(|i| caps.get(i))
                .map(|g| g.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            ctx.resolve_term(&term)
        })
        .filter(|r| r.strategy != ColumnStrategy::Substring && r.confidence >= NAMED_COLUMN_CONFIDENCE)
        .map(|r| r.column)
}

fn group_column(ctx: &BuildContext<'_>, text: &str, target: Option<&Column>) -> Option<String> {
    GROUP_BY.captures_iter(text).find_map(|caps| {
        let term = (1..=2)
            .filter_map(|i| caps.get(i))
            .map(|g| g.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        ctx.resolve_term(&term)
            .filter(|r| r.confidence >= NAMED_COLUMN_CONFIDENCE)
            .filter(|r| target.map_or(true, |t| t.name != r.column.name))
            .map(|r| r.column.name.clone())
    })
}
