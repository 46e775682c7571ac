//! Intent classification.
//!
//! Recognizers run in a fixed precedence order (conversational, schema change,
//! schema info, aggregate, CRUD). Each one may claim the span of text it
//! matched; CRUD synonyms inside a claimed span are not scored, so the "show"
//! in "show tables" does not turn a schema question into a SELECT.

use crate::lexicon::Lexicon;
use crate::utterance::{phrase_pattern, Utterance};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

const CONVERSATIONAL_CONFIDENCE: f64 = 0.95;
const SCHEMA_CHANGE_CONFIDENCE: f64 = 1.0;
const SCHEMA_INFO_CONFIDENCE: f64 = 0.9;
const AGGREGATE_CONFIDENCE: f64 = 0.85;

/// Optional verb lead-in a non-CRUD recognizer claims along with its keyword.
const VERB_LEAD: &str =
    r"(?:\b(?:show|list|display|get|view|see|give|find|tell|what\s+is|what\s+are)\s+(?:me\s+)?(?:all\s+)?(?:of\s+)?(?:the\s+)?)?";

lazy_static! {
    static ref GREETING: Regex =
        Regex::new(r"^(?:hi|hello|hey|hiya|greetings|good\s+(?:morning|afternoon|evening))\b").unwrap();
    static ref GRATITUDE: Regex =
        Regex::new(r"\b(?:thanks|thank\s+you|thx|cheers|appreciate\s+it)\b").unwrap();
    static ref HELP: Regex = Regex::new(
        r"^(?:help|help\s+me|what\s+can\s+you\s+do|what\s+do\s+you\s+do|how\s+do\s+i\s+use\s+(?:this|you))\b"
    )
    .unwrap();
    static ref KNOWLEDGE: Regex = Regex::new(
        r"^(?:what\s+is|what\s+are|what's|whats|explain|define|how\s+does|how\s+do|tell\s+me\s+about)\s+(?:an?\s+|the\s+)?(?:concept\s+of\s+)?(?:primary\s+keys?|foreign\s+keys?|index(?:es)?|indices|normali[sz]ation|joins?|constraints?|sql|databases?|transactions?|views?)(?:\s+work|\s+mean|\s+in\s+sql)?\s*\??$"
    )
    .unwrap();
    /// `(pattern, row_phrasing_allowed)`. "delete the employee table" drops a
    /// table, "delete employee table rows where ..." deletes rows.
    static ref SCHEMA_CHANGE: Vec<(Regex, bool)> = [
        (r"\bcreate\s+(?:a\s+)?(?:new\s+)?(?:table|index|view|database|schema)\b", false),
        (r"\balter\s+(?:the\s+)?(?:\w+\s+)?table\b", false),
        (r"\b(?:drop|delete|remove|truncate)\s+(?:the\s+)?(?:\w+\s+)?(?:table|index|view|database|schema)\b", true),
        (r"\btruncate\b", false),
        (r"\b(?:add|drop|remove|rename|delete|alter|modify)\s+(?:a\s+|an\s+|the\s+|new\s+)*columns?\b", false),
        (r"\brename\s+(?:the\s+)?(?:\w+\s+)?table\b", false),
    ]
    .iter()
    .map(|(p, rows)| (Regex::new(p).unwrap(), *rows))
    .collect();
    /// Row nouns or a predicate right after "... table".
    static ref ROW_TARGET: Regex =
        Regex::new(r"^\s*(?:(?:rows?|records?|entry|entries|data)\b|.*\b(?:where|whose)\b)").unwrap();
    static ref LIST_TABLES: Regex = Regex::new(&format!(
        r"{}\b(?:available\s+)?tables\b|\b(?:what|which)\s+tables\b|^tables\??$",
        VERB_LEAD
    ))
    .unwrap();
    static ref DESCRIBE: Regex = Regex::new(&format!(
        r"\bdescribe\b|\btable\s+structure\b|{}\b(?:structure|schema|columns|fields)\s+(?:of|in|for)\b|\bwhat\s+columns\b",
        VERB_LEAD
    ))
    .unwrap();
    static ref CONSTRAINTS: Regex = Regex::new(&format!(r"{}\bconstraints?\b", VERB_LEAD)).unwrap();
    static ref KEYS: Regex =
        Regex::new(&format!(r"{}\b(?:(?:primary|foreign)\s+keys?|keys)\b", VERB_LEAD)).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunction {
    Sum,
    Avg,
    Count,
    Max,
    Min,
}

impl AggregateFunction {
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Min => "MIN",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "Total",
            AggregateFunction::Avg => "Average",
            AggregateFunction::Count => "Count",
            AggregateFunction::Max => "Maximum",
            AggregateFunction::Min => "Minimum",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationalKind {
    Greeting,
    Gratitude,
    Help,
    GeneralKnowledge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaQueryKind {
    ListTables,
    DescribeTable,
    Constraints,
    Keys,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Conversational(ConversationalKind),
    SchemaQuery(SchemaQueryKind),
    /// CREATE / ALTER / DROP style requests phrased in natural language.
    SchemaChange,
    Select,
    Insert,
    Update,
    Delete,
    Aggregate(AggregateFunction),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intent {
    pub kind: IntentKind,
    pub confidence: f64,
}

impl Intent {
    pub fn unknown() -> Self {
        Self {
            kind: IntentKind::Unknown,
            confidence: 0.0,
        }
    }

    pub fn is_crud(&self) -> bool {
        matches!(
            self.kind,
            IntentKind::Select | IntentKind::Insert | IntentKind::Update | IntentKind::Delete
        )
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    intent: Intent,
    claimed: Option<Range<usize>>,
}

/// Intent recognizers in precedence order; ties in confidence go to the earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recognizer {
    Conversational,
    SchemaChange,
    SchemaInfo,
    Aggregate,
    Crud,
}

impl Recognizer {
    pub const PRECEDENCE: [Recognizer; 5] = [
        Recognizer::Conversational,
        Recognizer::SchemaChange,
        Recognizer::SchemaInfo,
        Recognizer::Aggregate,
        Recognizer::Crud,
    ];

    fn recognize(&self, text: &str, lexicon: &Lexicon, claimed: &[Range<usize>]) -> Vec<Candidate> {
        match self {
            Recognizer::Conversational => recognize_conversational(text),
            Recognizer::SchemaChange => SCHEMA_CHANGE
                .iter()
                .find_map(|(re, rows)| {
                    re.find(text)
                        .filter(|m| !(*rows && ROW_TARGET.is_match(&text[m.end()..])))
                })
                .map(|m| Candidate {
                    intent: Intent {
                        kind: IntentKind::SchemaChange,
                        confidence: SCHEMA_CHANGE_CONFIDENCE,
                    },
                    claimed: Some(m.range()),
                })
                .into_iter()
                .collect(),
            Recognizer::SchemaInfo => recognize_schema_info(text),
            Recognizer::Aggregate => recognize_aggregate(text, lexicon),
            Recognizer::Crud => score_crud(text, lexicon, claimed),
        }
    }
}

fn recognize_conversational(text: &str) -> Vec<Candidate> {
    let families: [(&Regex, ConversationalKind); 4] = [
        (&*GREETING, ConversationalKind::Greeting),
        (&*GRATITUDE, ConversationalKind::Gratitude),
        (&*HELP, ConversationalKind::Help),
        (&*KNOWLEDGE, ConversationalKind::GeneralKnowledge),
    ];
    families
        .iter()
        .filter_map(|(re, kind)| {
            re.find(text).map(|m| Candidate {
                intent: Intent {
                    kind: IntentKind::Conversational(*kind),
                    confidence: CONVERSATIONAL_CONFIDENCE,
                },
                claimed: Some(m.range()),
            })
        })
        .collect()
}

fn recognize_schema_info(text: &str) -> Vec<Candidate> {
    let families: [(&Regex, SchemaQueryKind); 4] = [
        (&*LIST_TABLES, SchemaQueryKind::ListTables),
        (&*DESCRIBE, SchemaQueryKind::DescribeTable),
        (&*CONSTRAINTS, SchemaQueryKind::Constraints),
        (&*KEYS, SchemaQueryKind::Keys),
    ];
    families
        .iter()
        .filter_map(|(re, kind)| {
            re.find(text).map(|m| Candidate {
                intent: Intent {
                    kind: IntentKind::SchemaQuery(*kind),
                    confidence: SCHEMA_INFO_CONFIDENCE,
                },
                claimed: Some(m.range()),
            })
        })
        .collect()
}

fn recognize_aggregate(text: &str, lexicon: &Lexicon) -> Vec<Candidate> {
    let mut found: Vec<(Range<usize>, Candidate)> = Vec::new();
    for agg in &lexicon.aggregates {
        let earliest = agg
            .keywords
            .iter()
            .filter_map(|kw| {
                Regex::new(&format!("{}{}", VERB_LEAD, phrase_pattern(kw)))
                    .ok()
                    .and_then(|re| re.find(text).map(|m| m.range()))
            })
            .min_by_key(|r| r.start);
        if let Some(range) = earliest {
            found.push((
                range.clone(),
                Candidate {
                    intent: Intent {
                        kind: IntentKind::Aggregate(agg.function),
                        confidence: AGGREGATE_CONFIDENCE,
                    },
                    claimed: Some(range),
                },
            ));
        }
    }
    // The aggregate mentioned first is the one the user asked for, unless it
    // only qualifies the next one ("total number of", "total count").
    found.sort_by_key(|(range, _)| range.start);
    let qualifies_next = |i: usize| {
        let (range, _) = &found[i];
        found.get(i + 1).map_or(false, |(next, _)| {
            next.start >= range.end && text[range.end..next.start].trim().is_empty()
        })
    };
    (0..found.len())
        .filter(|i| !qualifies_next(*i))
        .map(|i| found[i].1.clone())
        .collect()
}

fn overlaps(range: &Range<usize>, claimed: &[Range<usize>]) -> bool {
    claimed.iter().any(|c| range.start < c.end && c.start < range.end)
}

/// Earliest-position score for one operation: `0.5 + 0.5 * (1 - pos / len)`.
fn operation_score(text: &str, synonyms: &[String], claimed: &[Range<usize>]) -> f64 {
    let len = text.len().max(1) as f64;
    synonyms
        .iter()
        .filter_map(|syn| Regex::new(&phrase_pattern(syn)).ok())
        .filter_map(|re| {
            re.find_iter(text)
                .map(|m| m.range())
                .find(|r| !overlaps(r, claimed))
                .map(|r| 0.5 + 0.5 * (1.0 - r.start as f64 / len))
        })
        .fold(0.0, f64::max)
}

fn score_crud(text: &str, lexicon: &Lexicon, claimed: &[Range<usize>]) -> Vec<Candidate> {
    let ops = &lexicon.operations;
    [
        (IntentKind::Select, &ops.select),
        (IntentKind::Insert, &ops.insert),
        (IntentKind::Update, &ops.update),
        (IntentKind::Delete, &ops.delete),
    ]
    .into_iter()
    .map(|(kind, synonyms)| Candidate {
        intent: Intent {
            kind,
            confidence: operation_score(text, synonyms, claimed),
        },
        claimed: None,
    })
    .collect()
}

pub struct IntentClassifier<'a> {
    lexicon: &'a Lexicon,
    crud_threshold: f64,
}

impl<'a> IntentClassifier<'a> {
    pub fn new(lexicon: &'a Lexicon, crud_threshold: f64) -> Self {
        Self {
            lexicon,
            crud_threshold,
        }
    }

    /// All candidates with nonzero confidence, best first. The sort is stable,
    /// so equal confidences keep recognizer precedence.
    pub fn candidates(&self, utterance: &Utterance) -> Vec<Intent> {
        let text = utterance.normalized.as_str();
        let mut claimed: Vec<Range<usize>> = Vec::new();
        let mut all: Vec<Intent> = Vec::new();
        for recognizer in Recognizer::PRECEDENCE {
            for candidate in recognizer.recognize(text, self.lexicon, &claimed) {
                if let Some(range) = candidate.claimed.clone() {
                    claimed.push(range);
                }
                let keep = if candidate.intent.is_crud() {
                    candidate.intent.confidence > self.crud_threshold
                } else {
                    candidate.intent.confidence > 0.0
                };
                if keep {
                    all.push(candidate.intent);
                }
            }
        }
        all.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        all
    }

    pub fn classify(&self, utterance: &Utterance) -> Intent {
        let candidates = self.candidates(utterance);
        debug!(?candidates, "Intent candidates");
        candidates.into_iter().next().unwrap_or_else(Intent::unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Intent {
        let lexicon = Lexicon::shared();
        IntentClassifier::new(&lexicon, 0.3).classify(&Utterance::new(text))
    }

    #[test]
    fn test_crud_position_score() {
        let intent = classify("delete employee record whose employee name is 'Kavya'");
        assert_eq!(intent.kind, IntentKind::Delete);
        assert!((intent.confidence - 1.0).abs() < 1e-9);

        // "show" starts at byte 11 of a 25-byte utterance.
        let intent = classify("now please show employees");
        assert_eq!(intent.kind, IntentKind::Select);
        let expected = 0.5 + 0.5 * (1.0 - 11.0 / 25.0);
        assert!((intent.confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn test_earlier_operation_wins() {
        assert_eq!(classify("update salary to 10 where name is set").kind, IntentKind::Update);
        assert_eq!(classify("remove the employee we added").kind, IntentKind::Delete);
    }

    #[test]
    fn test_conversational() {
        assert_eq!(
            classify("hello there").kind,
            IntentKind::Conversational(ConversationalKind::Greeting)
        );
        assert_eq!(
            classify("what is a primary key?").kind,
            IntentKind::Conversational(ConversationalKind::GeneralKnowledge)
        );
        assert_eq!(
            classify("thank you").kind,
            IntentKind::Conversational(ConversationalKind::Gratitude)
        );
    }

    #[test]
    fn test_schema_info_claims_its_verb() {
        assert_eq!(
            classify("show tables").kind,
            IntentKind::SchemaQuery(SchemaQueryKind::ListTables)
        );
        assert_eq!(
            classify("show columns of employee").kind,
            IntentKind::SchemaQuery(SchemaQueryKind::DescribeTable)
        );
        assert_eq!(
            classify("list the primary keys").kind,
            IntentKind::SchemaQuery(SchemaQueryKind::Keys)
        );
        assert_eq!(classify("show employee table").kind, IntentKind::Select);
    }

    #[test]
    fn test_schema_change_beats_insert() {
        let intent = classify("add column hospital id in the hospital table");
        assert_eq!(intent.kind, IntentKind::SchemaChange);
        assert_eq!(classify("drop table employee").kind, IntentKind::SchemaChange);
        assert_eq!(classify("create a new table for patients").kind, IntentKind::SchemaChange);
        assert_eq!(classify("delete the employee table").kind, IntentKind::SchemaChange);
    }

    #[test]
    fn test_row_phrasing_with_table_is_a_row_operation() {
        assert_eq!(
            classify("delete employee table rows where salary below 100").kind,
            IntentKind::Delete
        );
        assert_eq!(
            classify("remove the employee table entry where employee id is 5").kind,
            IntentKind::Delete
        );
        assert_eq!(classify("delete records from the employee table where id is 3").kind, IntentKind::Delete);
    }

    #[test]
    fn test_aggregate() {
        assert_eq!(
            classify("how many employees are there").kind,
            IntentKind::Aggregate(AggregateFunction::Count)
        );
        assert_eq!(
            classify("show the average salary").kind,
            IntentKind::Aggregate(AggregateFunction::Avg)
        );
        assert_eq!(
            classify("total number of employees").kind,
            IntentKind::Aggregate(AggregateFunction::Count)
        );
        assert_eq!(
            classify("total count of employees").kind,
            IntentKind::Aggregate(AggregateFunction::Count)
        );
        assert_eq!(
            classify("total salary of employees").kind,
            IntentKind::Aggregate(AggregateFunction::Sum)
        );
        // A select verb far from the keyword still wins.
        assert_eq!(classify("show employees with the highest salary").kind, IntentKind::Select);
    }

    #[test]
    fn test_unknown() {
        let intent = classify("lorem ipsum dolor");
        assert_eq!(intent.kind, IntentKind::Unknown);
        assert_eq!(intent.confidence, 0.0);
    }
}
