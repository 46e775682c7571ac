use crate::fuzzy_matcher::FuzzyMatcher;
use crate::lexicon::Lexicon;
use crate::schema::{Column, Table};

const SYNONYM_CONFIDENCE: f64 = 0.9;
const SUBSTRING_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnStrategy {
    Exact,
    Synonym,
    Fuzzy,
    Substring,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedColumn<'t> {
    pub column: &'t Column,
    pub confidence: f64,
    pub strategy: ColumnStrategy,
}

pub struct ColumnResolver<'a> {
    lexicon: &'a Lexicon,
    matcher: FuzzyMatcher,
}

/// Lower-case with spaces and underscores folded to `_`.
fn canonical(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '_')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

impl<'a> ColumnResolver<'a> {
    pub fn new(lexicon: &'a Lexicon, fuzzy_threshold: f64) -> Self {
        Self {
            lexicon,
            matcher: FuzzyMatcher::new(fuzzy_threshold),
        }
    }

    /// Map a natural-language term to a column of `table`.
    pub fn resolve<'t>(&self, term: &str, table: &'t Table) -> Option<ResolvedColumn<'t>> {
        let term = canonical(term);
        if term.is_empty() {
            return None;
        }
        if let Some(column) = table.columns.iter().find(|c| canonical(&c.name) == term) {
            return Some(ResolvedColumn {
                column,
                confidence: 1.0,
                strategy: ColumnStrategy::Exact,
            });
        }
        if let Some(column) = self.by_synonym(&term, table) {
            return Some(ResolvedColumn {
                column,
                confidence: SYNONYM_CONFIDENCE,
                strategy: ColumnStrategy::Synonym,
            });
        }

        let fuzzy = self
            .matcher
            .find_best_match(&term, table.columns.iter().map(|c| c.name.as_str()))
            .and_then(|(name, score)| table.column(name).map(|c| (c, score)));
        let substring = table.columns.iter().find(|c| {
            let name = canonical(&c.name);
            name.len() >= 3 && term.len() >= 3 && (term.contains(&name) || name.contains(&term))
        });

        match (fuzzy, substring) {
            (Some((_, score)), Some(column)) if SUBSTRING_CONFIDENCE > score => Some(ResolvedColumn {
                column,
                confidence: SUBSTRING_CONFIDENCE,
                strategy: ColumnStrategy::Substring,
            }),
            (Some((column, score)), _) => Some(ResolvedColumn {
                column,
                confidence: score,
                strategy: ColumnStrategy::Fuzzy,
            }),
            (None, Some(column)) => Some(ResolvedColumn {
                column,
                confidence: SUBSTRING_CONFIDENCE,
                strategy: ColumnStrategy::Substring,
            }),
            (None, None) => None,
        }
    }

    fn by_synonym<'t>(&self, term: &str, table: &'t Table) -> Option<&'t Column> {
        let spoken = term.replace('_', " ");
        table.columns.iter().find(|column| {
            self.lexicon.synonym_groups_for(&column.name).any(|group| {
                group.synonyms.iter().any(|syn| {
                    *syn == spoken
                        || (syn.len() >= 3 && spoken.contains(syn.as_str()))
                        || (spoken.len() >= 3 && leads_phrase(syn, &spoken))
                })
            })
        })
    }
}

/// "phone" leads "phone number"; "number" does not.
fn leads_phrase(phrase: &str, word: &str) -> bool {
    phrase
        .strip_prefix(word)
        .map_or(false, |rest| rest.starts_with(' '))
}
