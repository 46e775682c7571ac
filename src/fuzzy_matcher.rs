use strsim::levenshtein;

/// Case-insensitive edit distance (insert, delete and substitute all cost 1).
pub fn edit_distance(a: &str, b: &str) -> usize {
    levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// `1 - distance / max_len`, in [0, 1]. Two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / max_len as f64
}

/// Fuzzy matcher for natural-language terms against identifier names
pub struct FuzzyMatcher {
    /// Candidates must score strictly above this similarity
    pub similarity_threshold: f64,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.6,
        }
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            similarity_threshold: threshold,
        }
    }

    /// Underscores and spaces are equivalent in identifiers, so compare both
    /// sides with underscores.
    fn canonical(s: &str) -> String {
        s.trim()
            .split(|c: char| c.is_whitespace() || c == '_')
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase()
    }

    pub fn score(&self, term: &str, candidate: &str) -> f64 {
        similarity(&Self::canonical(term), &Self::canonical(candidate))
    }

    /// Best candidate scoring above the threshold; earlier candidates win ties.
    pub fn find_best_match<'a, I>(&self, term: &str, candidates: I) -> Option<(&'a str, f64)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut best: Option<(&'a str, f64)> = None;
        for candidate in candidates {
            let score = self.score(term, candidate);
            if score > self.similarity_threshold && best.map_or(true, |(_, s)| score > s) {
                best = Some((candidate, score));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("SALARY", "salary"), 0);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn test_edit_distance_is_symmetric() {
        let pairs = [
            ("salary", "salry"),
            ("first_name", "frist name"),
            ("", "x"),
            ("hire_date", "HIRED"),
        ];
        for (a, b) in pairs {
            assert_eq!(edit_distance(a, b), edit_distance(b, a));
        }
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert!((similarity("salary", "salry") - (1.0 - 1.0 / 6.0)).abs() < 1e-9);
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_find_best_match() {
        let matcher = FuzzyMatcher::default();
        let columns = ["EMPLOYEE_ID", "FIRST_NAME", "SALARY"];
        let (name, score) = matcher.find_best_match("salry", columns).unwrap();
        assert_eq!(name, "SALARY");
        assert!(score > 0.8);
        assert!(matcher.find_best_match("zzz", columns).is_none());
        let (name, _) = matcher.find_best_match("first name", columns).unwrap();
        assert_eq!(name, "FIRST_NAME");
    }
}
