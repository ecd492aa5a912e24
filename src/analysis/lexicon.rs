//! Weighted lexical rules
//!
//! A rule is a case-insensitive regex with a signed weight, optionally paired
//! with a guard: a match only counts when the text right after it does not
//! start with the guard (e.g. "interesting" followed by "because").

use regex::Regex;

/// One weighted lexical signal
pub struct LexicalRule {
    name: &'static str,
    pattern: Regex,
    unless_followed_by: Option<Regex>,
    weight: f32,
}

impl LexicalRule {
    /// Build a rule; `pattern` is compiled case-insensitively.
    ///
    /// Rules are static tables, so an invalid pattern is a programming error.
    pub fn new(name: &'static str, pattern: &str, weight: f32) -> Self {
        Self {
            name,
            pattern: compile(pattern),
            unless_followed_by: None,
            weight,
        }
    }

    /// Ignore matches immediately followed by `guard` (anchored at the match end)
    pub fn unless_followed_by(mut self, guard: &str) -> Self {
        self.unless_followed_by = Some(compile(&format!("^(?:{})", guard)));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Whether any unguarded match exists in `text`
    pub fn is_match(&self, text: &str) -> bool {
        self.count_matches(text) > 0
    }

    /// Number of non-overlapping unguarded matches
    pub fn count_matches(&self, text: &str) -> usize {
        match &self.unless_followed_by {
            None => self.pattern.find_iter(text).count(),
            Some(guard) => self
                .pattern
                .find_iter(text)
                .filter(|m| !guard.is_match(&text[m.end()..]))
                .count(),
        }
    }
}

impl std::fmt::Debug for LexicalRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexicalRule")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Sum the weights of every rule that fires on `text`
pub fn total_weight(rules: &[LexicalRule], text: &str) -> f32 {
    rules
        .iter()
        .filter(|rule| rule.is_match(text))
        .map(LexicalRule::weight)
        .sum()
}

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){}", pattern)).expect("Valid lexical rule regex")
}
