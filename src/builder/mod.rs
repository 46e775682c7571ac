//! Per-operation statement assembly.
//!
//! Every builder returns a finished `TranslationResult`. UPDATE and DELETE
//! builders refuse to emit a statement without a WHERE clause.

pub mod aggregate;
pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

use crate::conditions::{Condition, ConditionExtractor};
use crate::config::EngineConfig;
use crate::intent::IntentKind;
use crate::lexicon::Lexicon;
use crate::resolver::{ColumnResolver, ColumnStrategy, ResolvedColumn};
use crate::response::TranslationResult;
use crate::schema::{Column, Schema, Table};
use crate::utterance::{captured_value, column_term_pattern, value_pattern, RawValue, Utterance};
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

lazy_static! {
    static ref NAMED: Regex = Regex::new(&format!(r"(?i)\b(?:named|called)\s+{}", value_pattern("v"))).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// The pieces a statement is assembled from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryComponents {
    /// Empty means every column.
    pub columns: Vec<String>,
    pub conditions: Vec<Condition>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u64>,
    pub distinct: bool,
    pub group_by: Option<String>,
}

/// A column term and the value typed right after it.
#[derive(Debug, Clone)]
pub struct ColumnValue<'t> {
    pub column: &'t Column,
    pub value: RawValue,
    /// The matched text, for explanations.
    pub source: String,
}

/// Inputs shared by all builders for one translation call.
pub struct BuildContext<'c> {
    pub lexicon: &'c Lexicon,
    pub config: &'c EngineConfig,
    pub utterance: &'c Utterance,
    pub schema: &'c Schema,
    pub table: &'c Table,
    /// Lower of the intent and table confidences.
    pub confidence: f64,
}

impl<'c> BuildContext<'c> {
    pub fn extractor(&self) -> ConditionExtractor<'c> {
        ConditionExtractor::new(self.lexicon)
    }

    pub fn column_resolver(&self) -> ColumnResolver<'c> {
        ColumnResolver::new(self.lexicon, self.config.fuzzy_threshold)
    }

    /// Text before the first predicate keyword.
    pub fn head(&self) -> &'c str {
        self.utterance.split_predicate(self.lexicon).0
    }

    /// Text after the first predicate keyword, if there is one.
    pub fn predicate(&self) -> Option<&'c str> {
        self.utterance.split_predicate(self.lexicon).1
    }

    /// Conditions from the predicate region, or from the whole utterance
    /// when no predicate keyword is present.
    pub fn conditions(&self) -> Vec<Condition> {
        let region = self.predicate().unwrap_or(self.utterance.original.as_str());
        self.extractor().extract(region, self.table)
    }

    /// Resolve a short term, trying the whole phrase before its first and
    /// last words. Filler words at either end are dropped first. A term made
    /// only of table or domain nouns must match exactly or by synonym.
    pub fn resolve_term(&self, term: &str) -> Option<ResolvedColumn<'c>> {
        let resolver = self.column_resolver();
        let mut words: Vec<&str> = term.split_whitespace().collect();
        while words.first().map_or(false, |w| self.is_filler(w)) {
            words.remove(0);
        }
        while words.last().map_or(false, |w| self.is_filler(w)) {
            words.pop();
        }
        let (first, last) = match (words.first(), words.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return None,
        };
        let nouns_only = words.iter().all(|w| self.names_entity(w));
        resolver
            .resolve(&words.join(" "), self.table)
            .or_else(|| if words.len() > 1 { resolver.resolve(first, self.table) } else { None })
            .or_else(|| if words.len() > 1 { resolver.resolve(last, self.table) } else { None })
            .filter(|r| !nouns_only || matches!(r.strategy, ColumnStrategy::Exact | ColumnStrategy::Synonym))
    }

    /// Words that never stand for a value: operation verbs, stopwords, table
    /// names and domain nouns.
    pub fn is_reserved(&self, word: &str) -> bool {
        self.is_filler(word) || self.names_entity(word)
    }

    fn is_filler(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        self.lexicon.is_stopword(&lower) || self.lexicon.all_operation_words().any(|w| *w == lower)
    }

    /// Unquoted words that are part of a column name ("name" in FIRST_NAME).
    pub fn is_column_word(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        self.table
            .columns
            .iter()
            .any(|c| c.name.to_lowercase().split('_').any(|part| part == lower))
    }

    /// Words that stand for a column rather than a value.
    pub fn names_column(&self, word: &str) -> bool {
        self.is_column_word(word)
            || self
                .resolve_term(word)
                .map_or(false, |r| matches!(r.strategy, ColumnStrategy::Exact | ColumnStrategy::Synonym))
    }

    /// Column a lone value identifies a row by: the primary key for a bare
    /// integer, the name column otherwise.
    pub fn value_column(&self, value: &RawValue) -> Option<&'c Column> {
        let numeric = !value.quoted && value.text.parse::<i64>().is_ok();
        if numeric {
            self.table.primary_keys().next().or_else(|| self.table.name_column())
        } else {
            self.table.name_column()
        }
    }

    /// `first name Anu and salary 5000`: column terms directly followed by a
    /// value, in order of mention. Numeric columns only take numbers.
    pub fn column_values(&self) -> Vec<ColumnValue<'c>> {
        let text = self.utterance.original.as_str();
        let extractor = self.extractor();
        let mut claimed: Vec<Range<usize>> = Vec::new();
        let mut found: Vec<(usize, ColumnValue<'c>)> = Vec::new();

        let exact = self.table.columns.iter().map(|c| (c, vec![c.name.clone()]));
        let synonyms = self
            .table
            .columns
            .iter()
            .map(|c| (c, extractor.synonym_terms(c, self.table)));
        for (column, terms) in exact.chain(synonyms) {
            if found.iter().any(|(_, p)| p.column.name == column.name) {
                continue;
            }
            for term in terms {
                if self.is_reserved(&term) {
                    continue;
                }
                let pattern = format!(
                    r"(?i){}\s+(?:is\s+|as\s+|of\s+)?{}",
                    column_term_pattern(&term),
                    value_pattern("v")
                );
                let re = match Regex::new(&pattern) {
                    Ok(re) => re,
                    Err(_) => continue,
                };
                let hit = re.captures_iter(text).find_map(|caps| {
                    let m = caps.get(0)?;
                    let value = captured_value(&caps, "v")?;
                    let range = m.range();
                    let free = !claimed.iter().any(|c| range.start < c.end && c.start < range.end);
                    let fits = !column.affinity().is_numeric() || value.text.parse::<f64>().is_ok();
                    (free && fits && (value.quoted || !self.is_column_word(&value.text)))
                        .then(|| (range, value, m.as_str().to_string()))
                });
                if let Some((range, value, source)) = hit {
                    found.push((range.start, ColumnValue { column, value, source }));
                    claimed.push(range);
                    break;
                }
            }
        }
        if let Some(name_column) = self.table.name_column() {
            if !found.iter().any(|(_, p)| p.column.name == name_column.name) {
                let hit = NAMED.captures_iter(text).find_map(|caps| {
                    let m = caps.get(0)?;
                    let value = captured_value(&caps, "v")?;
                    (value.quoted || !self.is_reserved(&value.text)).then(|| (m.start(), value, m.as_str().to_string()))
                });
                if let Some((start, value, source)) = hit {
                    found.push((
                        start,
                        ColumnValue {
                            column: name_column,
                            value,
                            source,
                        },
                    ));
                }
            }
        }
        found.sort_by_key(|(start, _)| *start);
        found.into_iter().map(|(_, p)| p).collect()
    }

    fn names_entity(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        self.schema.tables.iter().any(|t| t.is_named_by(&lower))
            || self
                .lexicon
                .categories
                .iter()
                .any(|c| c.noun == lower || format!("{}s", c.noun) == lower)
    }
}

/// Dispatch to the builder for a CRUD or aggregate intent.
pub fn build(kind: IntentKind, ctx: &BuildContext<'_>) -> TranslationResult {
    match kind {
        IntentKind::Select => select::build(ctx),
        IntentKind::Insert => insert::build(ctx),
        IntentKind::Update => update::build(ctx),
        IntentKind::Delete => delete::build(ctx),
        IntentKind::Aggregate(function) => aggregate::build(ctx, function),
        other => TranslationResult::error(format!("No query builder for {:?}", other)),
    }
}

/// Explanation fragment for a WHERE clause, empty when there is none.
pub(crate) fn describe_conditions(conditions: &[Condition]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(
            " where {}",
            conditions
                .iter()
                .map(Condition::describe)
                .collect::<Vec<_>>()
                .join(" and ")
        )
    }
}
