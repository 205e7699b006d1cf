//! Alternation pattern built from search terms.
//!
//! The same pattern is evaluated two ways: rendered as a POSIX regular
//! expression for the relational store's `~` operator, and matched directly
//! against lower-cased text by the in-memory store. Every term is a literal,
//! so both evaluations reduce to "contains any term".

use serde::{Deserialize, Serialize};

use crate::lexer::{tokenize, LexError, Term};

/// Characters with special meaning in POSIX ARE syntax.
const REGEX_META: &[char] = &[
    '\\', '.', '^', '$', '|', '?', '*', '+', '(', ')', '[', ']', '{', '}',
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPattern {
    terms: Vec<String>,
}

impl SearchPattern {
    /// Build a pattern from a raw free-text query.
    pub fn parse(query: &str) -> Result<Self, LexError> {
        let terms = tokenize(query)?;
        Ok(Self::from_terms(&terms))
    }

    pub fn from_terms(terms: &[Term]) -> Self {
        Self {
            terms: terms.iter().map(|t| t.text.clone()).collect(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Render as `(term1|term2|…)` with regex metacharacters escaped.
    pub fn to_regex(&self) -> String {
        let branches: Vec<String> = self.terms.iter().map(|t| escape(t)).collect();
        format!("({})", branches.join("|"))
    }

    /// Whether `text` (compared lower-cased) contains any of the terms.
    pub fn matches(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.terms.iter().any(|t| haystack.contains(t.as_str()))
    }
}

fn escape(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if REGEX_META.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn builds_alternation() {
        let p = SearchPattern::parse("Smelter array").unwrap();
        assert_eq!(p.to_regex(), "(smelter|array)");
    }

    #[test]
    fn escapes_metacharacters() {
        let p = SearchPattern::parse("a.b (c) x|y").unwrap();
        assert_eq!(p.to_regex(), r"(a\.b|\(c\)|x\|y)");
    }

    #[test]
    fn matches_any_term_case_insensitively() {
        let p = SearchPattern::parse("belt balancer").unwrap();
        assert!(p.matches("Compact BELT weaving"));
        assert!(p.matches("4x4 Balancer"));
        assert!(!p.matches("Smelter array"));
    }

    #[test]
    fn empty_query_is_rejected() {
        assert_eq!(SearchPattern::parse("  "), Err(LexError::Empty));
    }

    proptest! {
        #[test]
        fn every_term_matches_text_containing_it(
            words in proptest::collection::vec("[a-z]{1,8}", 1..6),
            prefix in "[a-z ]{0,10}",
        ) {
            let pattern = SearchPattern::parse(&words.join(" ")).unwrap();
            for w in &words {
                let text = format!("{prefix}{}", w.to_uppercase());
                prop_assert!(pattern.matches(&text));
            }
        }

        #[test]
        fn regex_has_one_branch_per_distinct_term(words in proptest::collection::vec("[a-z]{1,8}", 1..6)) {
            let pattern = SearchPattern::parse(&words.join(" ")).unwrap();
            let regex = pattern.to_regex();
            let inner = &regex[1..regex.len() - 1];
            prop_assert_eq!(inner.split('|').count(), pattern.terms().len());
        }
    }
}
