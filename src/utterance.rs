//! Utterance normalization and the small regex vocabulary shared by the
//! extraction stages.

use crate::lexicon::Lexicon;
use regex::{Captures, Regex};

/// A user request in its original casing plus a lower-cased copy for keyword scans.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub original: String,
    pub normalized: String,
}

/// A literal as the user typed it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawValue {
    pub text: String,
    pub quoted: bool,
}

impl Utterance {
    pub fn new(raw: &str) -> Self {
        let original = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let normalized = original.to_lowercase();
        Self { original, normalized }
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Split at the first predicate keyword: `("update salary to 5", Some("id = 3"))`
    /// for "update salary to 5 where id = 3".
    pub fn split_predicate(&self, lexicon: &Lexicon) -> (&str, Option<&str>) {
        let alternatives: Vec<String> = lexicon
            .predicate_keywords
            .iter()
            .map(|k| phrase_pattern(k))
            .collect();
        if alternatives.is_empty() {
            return (&self.original, None);
        }
        let pattern = format!("(?i)(?:{})", alternatives.join("|"));
        match Regex::new(&pattern).ok().and_then(|re| re.find(&self.original)) {
            Some(m) => (&self.original[..m.start()], Some(&self.original[m.end()..])),
            None => (&self.original, None),
        }
    }

    /// Lower-case word tokens (letters, digits, underscores).
    pub fn words(&self) -> Vec<&str> {
        self.normalized
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
            .collect()
    }
}

/// Regex source for a literal phrase: words separated by any whitespace,
/// anchored on word boundaries where the phrase starts or ends with a word character.
pub fn phrase_pattern(phrase: &str) -> String {
    let body = phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let starts_word = phrase.chars().next().map_or(false, is_word_char);
    let ends_word = phrase.chars().last().map_or(false, is_word_char);
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        body,
        if ends_word { r"\b" } else { "" }
    )
}

/// Regex source matching a column term where spaces and underscores are
/// interchangeable: `first name`, `first_name` and `FIRST NAME` all match.
pub fn column_term_pattern(term: &str) -> String {
    let parts: Vec<String> = term
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|p| !p.is_empty())
        .map(regex::escape)
        .collect();
    format!(r"\b{}\b", parts.join(r"[\s_]+"))
}

/// Regex source for one value slot. Group names are suffixed so a single
/// pattern can hold several slots.
pub fn value_pattern(slot: &str) -> String {
    format!(
        r#"(?:'(?P<sq{s}>(?:[^']|'')*)'|"(?P<dq{s}>[^"]*)"|(?P<bare{s}>[^\s,;'"()]+))"#,
        s = slot
    )
}

/// Pull the value captured by `value_pattern(slot)`.
pub fn captured_value(caps: &Captures<'_>, slot: &str) -> Option<RawValue> {
    if let Some(m) = caps.name(&format!("sq{}", slot)) {
        return Some(RawValue {
            text: m.as_str().replace("''", "'"),
            quoted: true,
        });
    }
    if let Some(m) = caps.name(&format!("dq{}", slot)) {
        return Some(RawValue {
            text: m.as_str().to_string(),
            quoted: true,
        });
    }
    caps.name(&format!("bare{}", slot)).and_then(|m| {
        let text = m.as_str().trim_end_matches(|c| matches!(c, '.' | '?' | '!'));
        if text.is_empty() {
            None
        } else {
            Some(RawValue {
                text: text.to_string(),
                quoted: false,
            })
        }
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_whitespace_and_case() {
        let u = Utterance::new("  Show   EMPLOYEE\ttable ");
        assert_eq!(u.original, "Show EMPLOYEE table");
        assert_eq!(u.normalized, "show employee table");
        assert_eq!(u.words(), vec!["show", "employee", "table"]);
    }

    #[test]
    fn test_split_predicate() {
        let lexicon = Lexicon::shared();
        let u = Utterance::new("update salary to 5000 WHERE name is 'Anu'");
        let (head, predicate) = u.split_predicate(&lexicon);
        assert_eq!(head.trim(), "update salary to 5000");
        assert_eq!(predicate.map(str::trim), Some("name is 'Anu'"));

        let u = Utterance::new("show nowhere table");
        assert_eq!(u.split_predicate(&lexicon).1, None);
    }

    #[test]
    fn test_value_pattern_variants() {
        let re = Regex::new(&format!("is {}", value_pattern(""))).unwrap();
        let caps = re.captures("name is 'O''Brien'").unwrap();
        assert_eq!(captured_value(&caps, "").unwrap().text, "O'Brien");
        let caps = re.captures("name is \"Ammu\"").unwrap();
        assert_eq!(
            captured_value(&caps, ""),
            Some(RawValue { text: "Ammu".to_string(), quoted: true })
        );
        let caps = re.captures("id is 42.").unwrap();
        assert_eq!(captured_value(&caps, "").unwrap().text, "42");
    }

    #[test]
    fn test_column_term_pattern() {
        let re = Regex::new(&format!("(?i){}", column_term_pattern("FIRST_NAME"))).unwrap();
        assert!(re.is_match("where first name is x"));
        assert!(re.is_match("where First_Name is x"));
        assert!(!re.is_match("where firstname is x"));
    }
}
