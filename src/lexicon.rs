//! Semantic lexicon: the vocabulary every translation stage matches against.
//!
//! A `Lexicon` is built once (the built-in tables or a JSON file), normalized,
//! and then shared read-only behind an `Arc` by every translation call.

use crate::conditions::Operator;
use crate::error::{Nl2SqlError, Result};
use crate::intent::AggregateFunction;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

lazy_static! {
    static ref BUILTIN: Arc<Lexicon> = Arc::new(Lexicon::default().normalized());
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    pub operations: OperationSynonyms,
    pub aggregates: Vec<AggregateKeywords>,
    pub column_synonyms: Vec<SynonymGroup>,
    pub comparison_operators: Vec<OperatorPhrase>,
    pub pattern_phrases: PatternPhrases,
    pub categories: Vec<CategoryKeyword>,
    pub months: Vec<String>,
    pub date_column_hints: Vec<String>,
    /// Words that open the predicate part of an utterance ("... where name is X").
    pub predicate_keywords: Vec<String>,
    pub stopwords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationSynonyms {
    pub select: Vec<String>,
    pub insert: Vec<String>,
    pub update: Vec<String>,
    pub delete: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateKeywords {
    pub function: AggregateFunction,
    pub keywords: Vec<String>,
}

/// Natural-language names for a column family. `canonical` is matched as a
/// substring of real column names ("phone" -> `PHONE_NUMBER`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymGroup {
    pub canonical: String,
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorPhrase {
    pub phrase: String,
    pub operator: Operator,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternPhrases {
    pub starts_with: Vec<String>,
    pub ends_with: Vec<String>,
    pub contains: Vec<String>,
}

/// Domain noun mapped to substrings of the table names it usually refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryKeyword {
    pub noun: String,
    pub table_hints: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn group(canonical: &str, synonyms: &[&str]) -> SynonymGroup {
    SynonymGroup {
        canonical: canonical.to_string(),
        synonyms: words(synonyms),
    }
}

fn category(noun: &str, hints: &[&str]) -> CategoryKeyword {
    CategoryKeyword {
        noun: noun.to_string(),
        table_hints: words(hints),
    }
}

fn op(phrase: &str, operator: Operator) -> OperatorPhrase {
    OperatorPhrase {
        phrase: phrase.to_string(),
        operator,
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            operations: OperationSynonyms {
                select: words(&[
                    "show", "display", "list", "get", "fetch", "find", "select", "view",
                    "retrieve", "see", "give me", "search", "look up",
                ]),
                insert: words(&[
                    "insert", "add", "create", "new record", "new entry", "register", "enter",
                    "put",
                ]),
                update: words(&[
                    "update", "modify", "change", "set", "edit", "correct", "replace",
                ]),
                delete: words(&["delete", "remove", "erase", "purge", "eliminate", "wipe"]),
            },
            aggregates: vec![
                AggregateKeywords {
                    function: AggregateFunction::Count,
                    keywords: words(&["count", "how many", "number of"]),
                },
                AggregateKeywords {
                    function: AggregateFunction::Sum,
                    keywords: words(&["sum", "total"]),
                },
                AggregateKeywords {
                    function: AggregateFunction::Avg,
                    keywords: words(&["average", "avg", "mean"]),
                },
                AggregateKeywords {
                    function: AggregateFunction::Max,
                    keywords: words(&["maximum", "max", "highest", "largest", "greatest"]),
                },
                AggregateKeywords {
                    function: AggregateFunction::Min,
                    keywords: words(&["minimum", "min", "lowest", "smallest", "least"]),
                },
            ],
            column_synonyms: vec![
                group(
                    "name",
                    &[
                        "name", "employee name", "emp name", "full name", "person name",
                        "student name", "customer name", "named", "called",
                    ],
                ),
                group(
                    "phone",
                    &[
                        "phone", "phone number", "mobile", "mobile number", "contact number",
                        "telephone", "cell",
                    ],
                ),
                group("email", &["email", "mail", "email address", "e-mail"]),
                group(
                    "salary",
                    &["salary", "pay", "wage", "wages", "income", "earnings", "compensation"],
                ),
                group(
                    "hire",
                    &["hire date", "hired", "joining date", "join date", "joined", "start date"],
                ),
                group("date", &["date", "day"]),
                group("department", &["department", "dept", "division"]),
                group("job", &["job", "role", "position", "designation", "title"]),
                group("manager", &["manager", "boss", "supervisor"]),
                group("commission", &["commission", "bonus"]),
                group("price", &["price", "cost", "rate"]),
                group("quantity", &["quantity", "qty", "units"]),
                group("address", &["address", "location"]),
                group("age", &["age", "years old"]),
            ],
            comparison_operators: vec![
                op("greater than or equal to", Operator::Gte),
                op("more than or equal to", Operator::Gte),
                op("at least", Operator::Gte),
                op("no less than", Operator::Gte),
                op(">=", Operator::Gte),
                op("less than or equal to", Operator::Lte),
                op("at most", Operator::Lte),
                op("no more than", Operator::Lte),
                op("<=", Operator::Lte),
                op("is not equal to", Operator::NotEq),
                op("not equal to", Operator::NotEq),
                op("is not", Operator::NotEq),
                op("isn't", Operator::NotEq),
                op("!=", Operator::NotEq),
                op("<>", Operator::NotEq),
                op("is greater than", Operator::Gt),
                op("greater than", Operator::Gt),
                op("is more than", Operator::Gt),
                op("more than", Operator::Gt),
                op("higher than", Operator::Gt),
                op("above", Operator::Gt),
                op("over", Operator::Gt),
                op("exceeds", Operator::Gt),
                op(">", Operator::Gt),
                op("is less than", Operator::Lt),
                op("less than", Operator::Lt),
                op("lower than", Operator::Lt),
                op("fewer than", Operator::Lt),
                op("below", Operator::Lt),
                op("under", Operator::Lt),
                op("<", Operator::Lt),
                op("is equal to", Operator::Eq),
                op("equal to", Operator::Eq),
                op("equals", Operator::Eq),
                op("is", Operator::Eq),
                op("==", Operator::Eq),
                op("=", Operator::Eq),
            ],
            pattern_phrases: PatternPhrases {
                starts_with: words(&[
                    "starts with", "start with", "starting with", "begins with", "beginning with",
                ]),
                ends_with: words(&["ends with", "end with", "ending with"]),
                contains: words(&["contains", "containing", "includes", "including"]),
            },
            categories: vec![
                category("employee", &["employee", "emp", "staff", "worker"]),
                category("staff", &["staff", "employee"]),
                category("worker", &["worker", "employee"]),
                category("department", &["department", "dept"]),
                category("customer", &["customer", "client"]),
                category("client", &["client", "customer"]),
                category("order", &["order"]),
                category("product", &["product", "item"]),
                category("item", &["item", "product"]),
                category("student", &["student"]),
                category("course", &["course", "class"]),
                category("teacher", &["teacher", "instructor", "faculty"]),
                category("hospital", &["hospital"]),
                category("patient", &["patient"]),
                category("doctor", &["doctor", "physician"]),
                category("user", &["user", "account"]),
                category("job", &["job", "position"]),
                category("location", &["location", "address"]),
            ],
            months: words(&[
                "january", "february", "march", "april", "may", "june", "july", "august",
                "september", "october", "november", "december",
            ]),
            date_column_hints: words(&["date", "hire", "join", "enroll"]),
            predicate_keywords: words(&["where", "whose", "having", "such that", "for which"]),
            stopwords: words(&[
                "a", "an", "the", "all", "any", "of", "in", "into", "to", "from", "for", "on",
                "at", "by", "with", "and", "or", "is", "are", "was", "be", "me", "my", "please",
                "record", "records", "row", "rows", "entry", "entries", "data", "details", "info",
                "table", "tables", "values", "value", "where", "whose", "who", "which", "that",
                "new", "named", "called", "as", "it", "its", "their", "them", "this", "those",
                "these", "every", "each", "some", "can", "you", "i", "want", "need", "everything",
                "everyone", "everybody", "anything", "entire", "whole", "now", "just", "also",
            ]),
        }
    }
}

impl Lexicon {
    /// The built-in lexicon, normalized once per process.
    pub fn shared() -> Arc<Lexicon> {
        Arc::clone(&BUILTIN)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let lexicon: Lexicon = serde_json::from_str(json)?;
        lexicon.validated()
    }

    /// Normalize and check that every stage has vocabulary to work with.
    pub fn validated(self) -> Result<Self> {
        let lexicon = self.normalized();
        let ops = &lexicon.operations;
        for (label, list) in [
            ("select", &ops.select),
            ("insert", &ops.insert),
            ("update", &ops.update),
            ("delete", &ops.delete),
        ] {
            if list.is_empty() {
                return Err(Nl2SqlError::Lexicon(format!("No synonyms for {} operation", label)));
            }
        }
        if lexicon.comparison_operators.is_empty() {
            return Err(Nl2SqlError::Lexicon("No comparison operator phrases".to_string()));
        }
        if lexicon.months.len() != 12 {
            return Err(Nl2SqlError::Lexicon(format!(
                "Expected 12 month names, found {}",
                lexicon.months.len()
            )));
        }
        Ok(lexicon)
    }

    /// Lower-case every entry and order operator phrases longest first, so
    /// "is not" is tried before "is".
    pub fn normalized(mut self) -> Self {
        fn lower_all(list: &mut Vec<String>) {
            for item in list.iter_mut() {
                *item = item.trim().to_lowercase();
            }
            list.retain(|item| !item.is_empty());
        }
        lower_all(&mut self.operations.select);
        lower_all(&mut self.operations.insert);
        lower_all(&mut self.operations.update);
        lower_all(&mut self.operations.delete);
        for agg in &mut self.aggregates {
            lower_all(&mut agg.keywords);
        }
        for group in &mut self.column_synonyms {
            group.canonical = group.canonical.trim().to_lowercase();
            lower_all(&mut group.synonyms);
            group.synonyms.sort_by(|a, b| b.len().cmp(&a.len()));
        }
        for phrase in &mut self.comparison_operators {
            phrase.phrase = phrase.phrase.trim().to_lowercase();
        }
        self.comparison_operators.sort_by(|a, b| b.phrase.len().cmp(&a.phrase.len()));
        lower_all(&mut self.pattern_phrases.starts_with);
        lower_all(&mut self.pattern_phrases.ends_with);
        lower_all(&mut self.pattern_phrases.contains);
        for cat in &mut self.categories {
            cat.noun = cat.noun.trim().to_lowercase();
            lower_all(&mut cat.table_hints);
        }
        lower_all(&mut self.months);
        lower_all(&mut self.date_column_hints);
        lower_all(&mut self.predicate_keywords);
        lower_all(&mut self.stopwords);
        self
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        self.stopwords.iter().any(|s| *s == lower)
    }

    /// Every operation synonym across the four CRUD operations.
    pub fn all_operation_words(&self) -> impl Iterator<Item = &String> {
        self.operations
            .select
            .iter()
            .chain(&self.operations.insert)
            .chain(&self.operations.update)
            .chain(&self.operations.delete)
    }

    /// Synonym groups whose canonical key appears inside `column_name`.
    pub fn synonym_groups_for<'a>(&'a self, column_name: &'a str) -> impl Iterator<Item = &'a SynonymGroup> + 'a {
        let lower = column_name.to_lowercase();
        self.column_synonyms
            .iter()
            .filter(move |g| lower.contains(g.canonical.as_str()))
    }

    /// `DD-MON-YY` month token ("JAN") for a full or three-letter month name.
    pub fn month_abbreviation(&self, word: &str) -> Option<String> {
        let lower = word.to_lowercase();
        if lower.len() < 3 {
            return None;
        }
        self.months
            .iter()
            .find(|m| **m == lower || (lower.len() == 3 && m.starts_with(lower.as_str())))
            .map(|m| m.chars().take(3).collect::<String>().to_uppercase())
    }

    pub fn aggregate_keywords(&self, function: AggregateFunction) -> &[String] {
        self.aggregates
            .iter()
            .find(|a| a.function == function)
            .map(|a| a.keywords.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_phrases_longest_first() {
        let lexicon = Lexicon::shared();
        let is_pos = lexicon
            .comparison_operators
            .iter()
            .position(|p| p.phrase == "is")
            .unwrap();
        let is_not_pos = lexicon
            .comparison_operators
            .iter()
            .position(|p| p.phrase == "is not")
            .unwrap();
        assert!(is_not_pos < is_pos);
    }

    #[test]
    fn test_month_abbreviation() {
        let lexicon = Lexicon::shared();
        assert_eq!(lexicon.month_abbreviation("January").as_deref(), Some("JAN"));
        assert_eq!(lexicon.month_abbreviation("sep").as_deref(), Some("SEP"));
        assert_eq!(lexicon.month_abbreviation("ju"), None);
        assert_eq!(lexicon.month_abbreviation("monday"), None);
    }

    #[test]
    fn test_synonym_groups_for_column() {
        let lexicon = Lexicon::shared();
        let canon: Vec<&str> = lexicon
            .synonym_groups_for("PHONE_NUMBER")
            .map(|g| g.canonical.as_str())
            .collect();
        assert_eq!(canon, vec!["phone"]);
    }

    #[test]
    fn test_json_override_is_validated() {
        let err = Lexicon::from_json_str(r#"{"operations":{"select":["show"]}}"#);
        assert!(err.is_err());

        let default_json = serde_json::to_string(&Lexicon::default()).unwrap();
        let lexicon = Lexicon::from_json_str(&default_json).unwrap();
        assert_eq!(lexicon, *Lexicon::shared());
    }
}
