use crate::lexicon::Lexicon;
use crate::request::ConversationTurn;
use crate::schema::{Schema, Table};
use crate::utterance::Utterance;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref PREPOSITIONAL: Vec<Regex> = [
        r"\b(?:from|in|into|to|of)\s+(?:the\s+)?(\w+)",
        r"\b(\w+)\s+table\b",
        r"\b(\w+)\s+(?:where|set|values)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
}

/// Confidence never drops below this when the schema has a single table.
pub const SINGLE_TABLE_FLOOR: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStrategy {
    /// The caller pinned a table.
    ExplicitHint,
    /// "from employees", "employee table", "employee where ..."
    Prepositional,
    /// A word of the utterance is the table name or its plural.
    DirectMention,
    /// A domain noun mapped to table-name substrings ("staff" -> EMPLOYEE).
    Category,
    /// A table mentioned in recent conversation turns.
    RecentHistory,
    /// A word names a column of some table; the first such table wins.
    ColumnScan,
    SingleTable,
}

impl TableStrategy {
    pub const ORDER: [TableStrategy; 7] = [
        TableStrategy::ExplicitHint,
        TableStrategy::Prepositional,
        TableStrategy::DirectMention,
        TableStrategy::Category,
        TableStrategy::RecentHistory,
        TableStrategy::ColumnScan,
        TableStrategy::SingleTable,
    ];

    pub fn confidence(&self) -> f64 {
        match self {
            TableStrategy::ExplicitHint => 1.0,
            TableStrategy::Prepositional => 0.95,
            TableStrategy::DirectMention => 0.95,
            TableStrategy::Category => 0.85,
            TableStrategy::RecentHistory => 0.75,
            TableStrategy::ColumnScan => 0.6,
            TableStrategy::SingleTable => 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedTable<'s> {
    pub table: &'s Table,
    pub confidence: f64,
    pub strategy: TableStrategy,
}

/// Everything a table strategy may look at.
pub struct TableContext<'c> {
    pub utterance: &'c Utterance,
    pub hint: Option<&'c str>,
    pub history: &'c [ConversationTurn],
}

pub struct TableResolver<'a> {
    lexicon: &'a Lexicon,
    history_window: usize,
}

impl<'a> TableResolver<'a> {
    pub fn new(lexicon: &'a Lexicon, history_window: usize) -> Self {
        Self {
            lexicon,
            history_window,
        }
    }

    pub fn resolve<'s>(&self, ctx: &TableContext<'_>, schema: &'s Schema) -> Option<ResolvedTable<'s>> {
        let resolved = TableStrategy::ORDER.iter().find_map(|strategy| {
            self.apply(*strategy, ctx, schema).map(|table| ResolvedTable {
                table,
                confidence: strategy.confidence(),
                strategy: *strategy,
            })
        });
        let resolved = resolved.map(|mut r| {
            if schema.tables.len() == 1 && r.confidence < SINGLE_TABLE_FLOOR {
                r.confidence = SINGLE_TABLE_FLOOR;
            }
            r
        });
        if let Some(r) = &resolved {
            debug!(table = %r.table.name, strategy = ?r.strategy, confidence = r.confidence, "Resolved table");
        }
        resolved
    }

    /// Run a single strategy in isolation.
    pub fn apply<'s>(&self, strategy: TableStrategy, ctx: &TableContext<'_>, schema: &'s Schema) -> Option<&'s Table> {
        match strategy {
            TableStrategy::ExplicitHint => ctx.hint.and_then(|hint| schema.table(hint.trim())),
            TableStrategy::Prepositional => prepositional(&ctx.utterance.normalized, schema),
            TableStrategy::DirectMention => direct_mention(&ctx.utterance.words(), schema),
            TableStrategy::Category => self.category(&ctx.utterance.words(), schema),
            TableStrategy::RecentHistory => ctx
                .history
                .iter()
                .rev()
                .take(self.history_window)
                .find_map(|turn| {
                    let content = Utterance::new(&turn.content);
                    direct_mention(&content.words(), schema)
                }),
            TableStrategy::ColumnScan => self.column_scan(&ctx.utterance.words(), schema),
            TableStrategy::SingleTable => match schema.tables.as_slice() {
                [only] => Some(only),
                _ => None,
            },
        }
    }

    fn category<'s>(&self, words: &[&str], schema: &'s Schema) -> Option<&'s Table> {
        for word in words {
            for category in &self.lexicon.categories {
                if !is_noun_form(word, &category.noun) {
                    continue;
                }
                for hint in &category.table_hints {
                    if let Some(table) = schema
                        .tables
                        .iter()
                        .find(|t| t.name.to_lowercase().contains(hint.as_str()))
                    {
                        return Some(table);
                    }
                }
            }
        }
        None
    }

    fn column_scan<'s>(&self, words: &[&str], schema: &'s Schema) -> Option<&'s Table> {
        let mut tokens: Vec<String> = Vec::new();
        for pair in words.windows(2) {
            tokens.push(format!("{}_{}", pair[0], pair[1]));
        }
        tokens.extend(
            words
                .iter()
                .filter(|w| w.len() >= 2 && !self.lexicon.is_stopword(w))
                .map(|w| w.to_string()),
        );
        for token in &tokens {
            for table in &schema.tables {
                if table.column(token).is_some() {
                    return Some(table);
                }
                let spoken = token.replace('_', " ");
                let via_synonym = self
                    .lexicon
                    .column_synonyms
                    .iter()
                    .filter(|g| g.synonyms.iter().any(|s| *s == spoken))
                    .any(|g| {
                        table
                            .columns
                            .iter()
                            .any(|c| c.name.to_lowercase().contains(g.canonical.as_str()))
                    });
                if via_synonym {
                    return Some(table);
                }
            }
        }
        None
    }
}

fn prepositional<'s>(text: &str, schema: &'s Schema) -> Option<&'s Table> {
    let mut mentions: Vec<(usize, &str)> = PREPOSITIONAL
        .iter()
        .flat_map(|re| {
            re.captures_iter(text)
                .filter_map(|caps| caps.get(1).map(|m| (m.start(), m.as_str())))
                .collect::<Vec<_>>()
        })
        .collect();
    mentions.sort_by_key(|(start, _)| *start);
    mentions
        .into_iter()
        .find_map(|(_, word)| schema.tables.iter().find(|t| t.is_named_by(word)))
}

fn direct_mention<'s>(words: &[&str], schema: &'s Schema) -> Option<&'s Table> {
    words
        .iter()
        .find_map(|word| schema.tables.iter().find(|t| t.is_named_by(word)))
}

fn is_noun_form(word: &str, noun: &str) -> bool {
    word == noun
        || word == format!("{}s", noun)
        || word == format!("{}es", noun)
        || (noun.ends_with('y') && word == format!("{}ies", &noun[..noun.len() - 1]))
}
