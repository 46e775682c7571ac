use super::{describe_conditions, BuildContext, OrderBy, QueryComponents, SortDirection};
use crate::conditions::{where_clause, Condition};
use crate::response::{OperationKind, TranslationResult};
use crate::utterance::{captured_value, column_term_pattern, value_pattern};
use crate::value::quote_ident;
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;
use tracing::debug;

lazy_static! {
    static ref DISTINCT: Regex = Regex::new(r"\b(?:distinct|unique|different)\b").unwrap();
    static ref LIMIT: Regex = Regex::new(r"\b(top|first|limit|last)\s+(?:to\s+)?(\d+)\b").unwrap();
    static ref ORDER: Regex =
        Regex::new(r"\b(?:order(?:ed)?|sort(?:ed)?)\s+(?:them\s+|it\s+|results\s+)?by\s+(?:the\s+)?(\w+)(?:\s+(\w+))?(?:\s+(\w+))?").unwrap();
    static ref RANK_BY: Regex = Regex::new(r"\bby\s+(?:the\s+)?(\w+)(?:\s+(\w+))?").unwrap();
    static ref PROJECTION_END: Regex = Regex::new(
        r"\b(?:with|where|whose|having|who|which|that|from|in|of|by|for|sorted|ordered|order|sort|top|limit|named|called|hired|between)\b"
    )
    .unwrap();
    static ref DESCENDING: Regex =
        Regex::new(r"\b(?:desc|descending|highest|high|top|max|maximum|most|largest|biggest|greatest)\b").unwrap();
    static ref ASCENDING: Regex =
        Regex::new(r"\b(?:asc|ascending|lowest|low|bottom|min|minimum|least|smallest|fewest)\b").unwrap();
    static ref RANKING: Regex = Regex::new(r"\b(?:highest|lowest|largest|smallest|biggest)\b").unwrap();
    /// "salary of Ravi"
    static ref COLUMN_OF_VALUE: Regex = Regex::new(&format!(
        r"(?i)\b(?P<term>[a-z_]\w*(?:\s+[a-z_]\w*)?)\s+of\s+{}",
        value_pattern("v")
    ))
    .unwrap();
}

/// Column-name fragments that mark an amount worth ranking by.
const AMOUNT_HINTS: [&str; 5] = ["salary", "amount", "price", "wage", "total"];

pub fn build(ctx: &BuildContext<'_>) -> TranslationResult {
    let text = ctx.utterance.normalized.as_str();
    let mut components = QueryComponents {
        columns: projection(ctx),
        conditions: ctx.conditions(),
        distinct: DISTINCT.is_match(text),
        ..QueryComponents::default()
    };
    if components.conditions.is_empty() && ctx.predicate().is_none() {
        components.conditions.extend(column_of_value(ctx));
    }
    let (limit, by_top) = limit(text);
    components.limit = limit;
    components.order_by = explicit_order(ctx).or_else(|| {
        if by_top || RANKING.is_match(text) {
            ranking_order(ctx)
        } else {
            None
        }
    });
    debug!(?components, "Select components");
    render(ctx, &components)
}

pub fn render(ctx: &BuildContext<'_>, components: &QueryComponents) -> TranslationResult {
    let table = ctx.table;
    let limit = components.limit.unwrap_or(ctx.config.default_limit);
    let projection = if components.columns.is_empty() {
        "*".to_string()
    } else {
        components
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut statement = format!(
        "SELECT {}{} FROM {}",
        if components.distinct { "DISTINCT " } else { "" },
        projection,
        quote_ident(&table.name)
    );
    if let Some(clause) = where_clause(&components.conditions) {
        statement.push_str(&format!(" WHERE {}", clause));
    }
    if let Some(order) = &components.order_by {
        statement.push_str(&format!(" ORDER BY {} {}", quote_ident(&order.column), order.direction.sql()));
    }
    statement.push_str(&format!(" LIMIT {}", limit));

    let what = if components.columns.is_empty() {
        "all columns".to_string()
    } else {
        components.columns.join(", ")
    };
    let mut explanation = format!(
        "Shows {}{} of {}{}",
        if components.distinct { "distinct " } else { "" },
        what,
        table.name,
        describe_conditions(&components.conditions)
    );
    if let Some(order) = &components.order_by {
        let direction = match order.direction {
            SortDirection::Asc => "ascending",
            SortDirection::Desc => "descending",
        };
        explanation.push_str(&format!(", sorted by {} {}", order.column, direction));
    }
    explanation.push_str(&format!(", limited to {} rows.", limit));

    TranslationResult::sql(statement, OperationKind::Select, explanation, ctx.confidence)
}

/// Columns named before the first clause word, in order of mention.
fn projection(ctx: &BuildContext<'_>) -> Vec<String> {
    let head = ctx.head().to_lowercase();
    let end = PROJECTION_END.find(&head).map_or(head.len(), |m| m.start());
    let region = &head[..end];
    let extractor = ctx.extractor();
    let mut claimed: Vec<(Range<usize>, String)> = Vec::new();

    let exact = ctx.table.columns.iter().map(|c| (c, vec![c.name.clone()]));
    let synonyms = ctx
        .table
        .columns
        .iter()
        .map(|c| (c, extractor.synonym_terms(c, ctx.table)));
    for (column, terms) in exact.chain(synonyms) {
        if claimed.iter().any(|(_, name)| *name == column.name) {
            continue;
        }
        for term in terms {
            if ctx.is_reserved(&term) {
                continue;
            }
            let pattern = column_term_pattern(&term);
            let pattern = format!(r"(?i){}(?:s|es)?\b", pattern.trim_end_matches(r"\b"));
            let re = match Regex::new(&pattern) {
                Ok(re) => re,
                Err(_) => continue,
            };
            let hit = re
                .find_iter(region)
                .map(|m| m.range())
                .find(|r| !claimed.iter().any(|(c, _)| r.start < c.end && c.start < r.end));
            if let Some(range) = hit {
                claimed.push((range, column.name.clone()));
                break;
            }
        }
    }
    claimed.sort_by_key(|(range, _)| range.start);
    claimed.into_iter().map(|(_, name)| name).collect()
}

/// "show salary of Ravi": the row is picked by name, or by key for a number.
fn column_of_value(ctx: &BuildContext<'_>) -> Option<Condition> {
    COLUMN_OF_VALUE.captures_iter(&ctx.utterance.original).find_map(|caps| {
        let value = captured_value(&caps, "v")?;
        if !value.quoted && (ctx.is_reserved(&value.text) || ctx.names_column(&value.text)) {
            return None;
        }
        ctx.resolve_term(caps.name("term")?.as_str())?;
        let column = ctx.value_column(&value)?;
        Some(Condition::equals(column, &value.text, caps.get(0)?.as_str()))
    })
}

/// `(limit, came_from_top)`.
fn limit(text: &str) -> (Option<u64>, bool) {
    match LIMIT.captures(text) {
        Some(caps) => {
            let n = caps.get(2).and_then(|m| m.as_str().parse::<u64>().ok());
            let top = caps.get(1).map_or(false, |m| m.as_str() == "top");
            (n.filter(|n| *n > 0), top)
        }
        None => (None, false),
    }
}

fn direction_of(words: &[&str], text: &str) -> SortDirection {
    for word in words {
        match *word {
            "asc" | "ascending" => return SortDirection::Asc,
            "desc" | "descending" => return SortDirection::Desc,
            _ => {}
        }
    }
    if DESCENDING.is_match(text) && !ASCENDING.is_match(text) {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    }
}

fn explicit_order(ctx: &BuildContext<'_>) -> Option<OrderBy> {
    let text = ctx.utterance.normalized.as_str();
    let caps = ORDER.captures(text)?;
    let words: Vec<&str> = (1..=3).filter_map(|i| caps.get(i)).map(|m| m.as_str()).collect();
    let term_words: Vec<&str> = words
        .iter()
        .copied()
        .take_while(|w| !matches!(*w, "asc" | "ascending" | "desc" | "descending"))
        .collect();
    let column = ctx.resolve_term(&term_words.join(" "))?;
    Some(OrderBy {
        column: column.column.name.clone(),
        direction: direction_of(&words, text),
    })
}

/// "top 5 employees by salary" / "highest paid": rank by the named column,
/// else by the first amount-like column.
fn ranking_order(ctx: &BuildContext<'_>) -> Option<OrderBy> {
    let text = ctx.utterance.normalized.as_str();
    let named = RANK_BY.captures(text).and_then(|caps| {
        let term = (1..=2)
            .filter_map(|i| caps.get(i))
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        ctx.resolve_term(&term).map(|r| r.column.name.clone())
    });
    let column = named.or_else(|| {
        ctx.table
            .columns
            .iter()
            .find(|c| {
                let lower = c.name.to_lowercase();
                AMOUNT_HINTS.iter().any(|h| lower.contains(h))
            })
            .map(|c| c.name.clone())
    })?;
    let direction = if ASCENDING.is_match(text) {
        SortDirection::Asc
    } else {
        SortDirection::Desc
    };
    Some(OrderBy { column, direction })
}
