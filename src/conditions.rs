//! WHERE-clause extraction.
//!
//! Stages run over one text region in a fixed order: pattern phrases, BETWEEN,
//! comparisons on exact column names, comparisons on synonyms, then date
//! filters. Text consumed by one stage is never reused by a later one, and
//! each column receives at most one comparison.

use crate::lexicon::Lexicon;
use crate::schema::{Column, ColumnType, Table};
use crate::utterance::{captured_value, column_term_pattern, phrase_pattern, value_pattern};
use crate::value::{cast, quote_ident, SqlLiteral};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

lazy_static! {
    static ref NAMED: Regex = Regex::new(&format!(r"(?i)\b(?:named|called)\s+{}", value_pattern(""))).unwrap();
    static ref MONTH: Regex =
        Regex::new(r"(?i)\b(?:in|during|of|from|since)\s+(?:the\s+month\s+of\s+)?([a-z]+)\b").unwrap();
    static ref YEAR: Regex = Regex::new(
        r"(?i)\b(?:(?:in|during|of|from|since)\s+(?:the\s+year\s+)?((?:19|20)\d{2})|year\s+(\d{2}|(?:19|20)\d{2})|'(\d{2}))\b"
    )
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
    Between,
}

impl Operator {
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::Between => "BETWEEN",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Operator::Eq => "is",
            Operator::NotEq => "is not",
            Operator::Gt => "is greater than",
            Operator::Lt => "is less than",
            Operator::Gte => "is at least",
            Operator::Lte => "is at most",
            Operator::Like => "matches",
            Operator::Between => "is between",
        }
    }
}

/// One predicate of an AND-combined WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub column_type: ColumnType,
    pub operator: Operator,
    pub value: SqlLiteral,
    /// Upper bound of a BETWEEN.
    pub high: Option<SqlLiteral>,
    /// The words the condition was read from.
    pub source: String,
}

impl Condition {
    pub fn new(column: &Column, operator: Operator, value: SqlLiteral, source: &str) -> Self {
        Self {
            column: column.name.clone(),
            column_type: column.affinity(),
            operator,
            value,
            high: None,
            source: source.trim().to_string(),
        }
    }

    pub fn equals(column: &Column, raw: &str, source: &str) -> Self {
        Self::new(column, Operator::Eq, cast(raw, column.affinity()), source)
    }

    /// Text literals compare case-insensitively; numbers compare as-is.
    pub fn to_sql(&self) -> String {
        let column = quote_ident(&self.column);
        match self.operator {
            Operator::Like => format!("UPPER({}) LIKE {}", column, self.value),
            Operator::Between => match &self.high {
                Some(high) => format!("{} BETWEEN {} AND {}", column, self.value, high),
                None => format!("{} >= {}", column, self.value),
            },
            op if self.value.is_text() => {
                format!("LOWER({}) {} LOWER({})", column, op.sql(), self.value)
            }
            op => format!("{} {} {}", column, op.sql(), self.value),
        }
    }

    pub fn describe(&self) -> String {
        match (&self.operator, &self.high) {
            (Operator::Between, Some(high)) => format!(
                "{} is between {} and {}",
                self.column,
                self.value.plain(),
                high.plain()
            ),
            (Operator::Like, _) => format!("{} matches '{}'", self.column, self.value.plain()),
            (op, _) => format!("{} {} {}", self.column, op.describe(), self.value.plain()),
        }
    }
}

/// Render conditions as a WHERE clause body joined with AND.
pub fn where_clause(conditions: &[Condition]) -> Option<String> {
    if conditions.is_empty() {
        None
    } else {
        Some(
            conditions
                .iter()
                .map(Condition::to_sql)
                .collect::<Vec<_>>()
                .join(" AND "),
        )
    }
}

struct Scan<'t> {
    text: &'t str,
    consumed: Vec<Range<usize>>,
    found: Vec<(usize, Condition)>,
}

impl<'t> Scan<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            text,
            consumed: Vec::new(),
            found: Vec::new(),
        }
    }

    fn is_free(&self, range: &Range<usize>) -> bool {
        !self
            .consumed
            .iter()
            .any(|c| range.start < c.end && c.start < range.end)
    }

    fn has_column(&self, name: &str) -> bool {
        self.found.iter().any(|(_, c)| c.column.eq_ignore_ascii_case(name))
    }

    fn push(&mut self, range: Range<usize>, condition: Condition) {
        self.found.push((range.start, condition));
        self.consumed.push(range);
    }

    fn into_conditions(mut self) -> Vec<Condition> {
        self.found.sort_by_key(|(start, _)| *start);
        self.found.into_iter().map(|(_, c)| c).collect()
    }
}

pub struct ConditionExtractor<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> ConditionExtractor<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    /// Conditions found in `region`, in order of appearance.
    pub fn extract(&self, region: &str, table: &Table) -> Vec<Condition> {
        let mut scan = Scan::new(region);
        self.patterns(&mut scan, table);
        self.between(&mut scan, table);
        self.comparisons(&mut scan, table);
        self.dates(&mut scan, table);
        scan.into_conditions()
    }

    fn patterns(&self, scan: &mut Scan<'_>, table: &Table) {
        let name_column = match table.name_column() {
            Some(column) => column,
            None => return,
        };
        let phrases = &self.lexicon.pattern_phrases;
        let families: [(&Vec<String>, fn(&str) -> String); 3] = [
            (&phrases.starts_with, |v| format!("{}%", v)),
            (&phrases.ends_with, |v| format!("%{}", v)),
            (&phrases.contains, |v| format!("%{}%", v)),
        ];
        for (list, wrap) in families {
            for phrase in list {
                let pattern = format!(
                    r"(?i){}\s+(?:the\s+)?(?:letters?\s+)?{}",
                    phrase_pattern(phrase),
                    value_pattern("")
                );
                let re = match Regex::new(&pattern) {
                    Ok(re) => re,
                    Err(_) => continue,
                };
                let text = scan.text;
                let hit = re.captures_iter(text).find_map(|caps| {
                    let m = caps.get(0)?;
                    let value = captured_value(&caps, "")?;
                    scan.is_free(&m.range()).then(|| (m.range(), value))
                });
                if let Some((range, value)) = hit {
                    let literal = SqlLiteral::Text(wrap(&value.text.to_uppercase()));
                    let source = &text[range.clone()];
                    let condition = Condition::new(name_column, Operator::Like, literal, source);
                    scan.push(range, condition);
                }
            }
        }
        if !scan.has_column(&name_column.name) {
            let text = scan.text;
            let hit = NAMED.captures_iter(text).find_map(|caps| {
                let m = caps.get(0)?;
                let value = captured_value(&caps, "")?;
                (scan.is_free(&m.range()) && (value.quoted || !self.lexicon.is_stopword(&value.text)))
                    .then(|| (m.range(), value))
            });
            if let Some((range, value)) = hit {
                let condition = Condition::equals(name_column, &value.text, &text[range.clone()]);
                scan.push(range, condition);
            }
        }
    }

    fn between(&self, scan: &mut Scan<'_>, table: &Table) {
        for column in &table.columns {
            if scan.has_column(&column.name) {
                continue;
            }
            for term in self.column_terms(column, table) {
                let pattern = format!(
                    r"(?i){}\s+(?:is\s+)?between\s+(?P<lo>-?\d+(?:\.\d+)?)\s+and\s+(?P<hi>-?\d+(?:\.\d+)?)",
                    column_term_pattern(&term)
                );
                let re = match Regex::new(&pattern) {
                    Ok(re) => re,
                    Err(_) => continue,
                };
                let text = scan.text;
                let hit = re.captures_iter(text).find_map(|caps| {
                    let m = caps.get(0)?;
                    let lo = caps.name("lo")?.as_str().to_string();
                    let hi = caps.name("hi")?.as_str().to_string();
                    scan.is_free(&m.range()).then(|| (m.range(), lo, hi))
                });
                if let Some((range, lo, hi)) = hit {
                    let mut condition = Condition::new(
                        column,
                        Operator::Between,
                        numeric_literal(&lo, column.affinity()),
                        &text[range.clone()],
                    );
                    condition.high = Some(numeric_literal(&hi, column.affinity()));
                    scan.push(range, condition);
                    break;
                }
            }
        }
    }

    fn comparisons(&self, scan: &mut Scan<'_>, table: &Table) {
        for column in &table.columns {
            if !scan.has_column(&column.name) {
                self.compare_terms(scan, column, &[column.name.clone()]);
            }
        }
        for column in &table.columns {
            if scan.has_column(&column.name) {
                continue;
            }
            let terms = self.synonym_terms(column, table);
            self.compare_terms(scan, column, &terms);
        }
    }

    fn compare_terms(&self, scan: &mut Scan<'_>, column: &Column, terms: &[String]) -> bool {
        for term in terms {
            let term_re = column_term_pattern(term);
            for phrase in &self.lexicon.comparison_operators {
                if matches!(phrase.operator, Operator::Like | Operator::Between) {
                    continue;
                }
                let symbolic = !phrase.phrase.chars().any(char::is_alphanumeric);
                let pattern = if symbolic {
                    format!(r"(?i){}\s*{}\s*{}", term_re, regex::escape(&phrase.phrase), value_pattern(""))
                } else {
                    format!(
                        r"(?i){}\s+(?:is\s+)?{}\s+{}",
                        term_re,
                        phrase_pattern(&phrase.phrase),
                        value_pattern("")
                    )
                };
                let re = match Regex::new(&pattern) {
                    Ok(re) => re,
                    Err(_) => continue,
                };
                let text = scan.text;
                let hit = re.captures_iter(text).find_map(|caps| {
                    let m = caps.get(0)?;
                    let value = captured_value(&caps, "")?;
                    let usable = value.quoted || !self.lexicon.is_stopword(&value.text);
                    (usable && scan.is_free(&m.range())).then(|| (m.range(), value))
                });
                if let Some((range, value)) = hit {
                    let literal = cast(&value.text, column.affinity());
                    let condition = Condition::new(column, phrase.operator, literal, &text[range.clone()]);
                    scan.push(range, condition);
                    return true;
                }
            }
        }
        false
    }

    fn dates(&self, scan: &mut Scan<'_>, table: &Table) {
        let date_column = match table.date_column(&self.lexicon.date_column_hints) {
            Some(column) => column,
            None => return,
        };
        if scan.has_column(&date_column.name) {
            return;
        }
        let text = scan.text;
        let month = MONTH.captures_iter(text).find_map(|caps| {
            let m = caps.get(0)?;
            let abbreviation = self.lexicon.month_abbreviation(caps.get(1)?.as_str())?;
            scan.is_free(&m.range()).then(|| (m.range(), abbreviation))
        });
        if let Some((range, abbreviation)) = month {
            let literal = SqlLiteral::Text(format!("%-{}-%", abbreviation));
            let condition = Condition::new(date_column, Operator::Like, literal, &text[range.clone()]);
            scan.push(range, condition);
            return;
        }
        let year = YEAR.captures_iter(text).find_map(|caps| {
            let m = caps.get(0)?;
            let digits = (1..=3).find_map(|i| caps.get(i))?.as_str();
            let short = &digits[digits.len() - 2..];
            scan.is_free(&m.range()).then(|| (m.range(), short.to_string()))
        });
        if let Some((range, short)) = year {
            let literal = SqlLiteral::Text(format!("%-%-{}", short));
            let condition = Condition::new(date_column, Operator::Like, literal, &text[range.clone()]);
            scan.push(range, condition);
        }
    }

    /// The column's own name followed by its synonyms.
    fn column_terms(&self, column: &Column, table: &Table) -> Vec<String> {
        let mut terms = vec![column.name.clone()];
        terms.extend(self.synonym_terms(column, table));
        terms
    }

    /// Synonyms of the groups that target this column, longest first. A group
    /// targets only the first matching column, so "name" means `FIRST_NAME`
    /// rather than every `*_NAME` column. A bare "id" means the first key.
    pub fn synonym_terms(&self, column: &Column, table: &Table) -> Vec<String> {
        let mut terms: Vec<String> = self
            .lexicon
            .synonym_groups_for(&column.name)
            .filter(|group| {
                group_target(table, &group.canonical)
                    .map_or(false, |target| target.name == column.name)
            })
            .flat_map(|group| group.synonyms.iter().cloned())
            .filter(|s| s != "named" && s != "called")
            .collect();
        let is_first_key = table.primary_keys().next().map_or(false, |pk| pk.name == column.name);
        if is_first_key && column.name.len() > 2 && column.name.to_lowercase().ends_with("id") {
            terms.push("id".to_string());
        }
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms.dedup();
        terms
    }
}

fn group_target<'t>(table: &'t Table, canonical: &str) -> Option<&'t Column> {
    if canonical == "name" {
        return table.name_column();
    }
    table
        .columns
        .iter()
        .find(|c| c.name.to_lowercase().contains(canonical))
}

fn numeric_literal(raw: &str, column_type: ColumnType) -> SqlLiteral {
    match column_type {
        ColumnType::Integer | ColumnType::Real => cast(raw, column_type),
        ColumnType::Text => match raw.parse::<i64>() {
            Ok(i) => SqlLiteral::Integer(i),
            Err(_) => cast(raw, ColumnType::Real),
        },
    }
}
