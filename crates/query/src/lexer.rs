use std::fmt;

use serde::{Deserialize, Serialize};

/// A single search term produced by the query lexer.
///
/// Terms are lower-cased on the way out so that matching against
/// lower-cased names, descriptions, change notes and tag names is a plain
/// comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub text: String,
    pub span: Span,
}

/// Byte span of a term in the original query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("no search terms given")]
    Empty,
    #[error("search query exceeds {max} terms")]
    TooManyTerms { max: usize },
}

/// Upper bound on distinct terms in one query. Each term becomes one branch
/// of the alternation pattern evaluated per row.
pub const MAX_TERMS: usize = 16;

/// Split a free-text query on whitespace into lower-cased terms.
///
/// Repeated terms are collapsed (first occurrence wins). A query consisting
/// only of whitespace yields [`LexError::Empty`].
pub fn tokenize(input: &str) -> Result<Vec<Term>, LexError> {
    let mut terms: Vec<Term> = Vec::new();
    let mut start: Option<usize> = None;

    for (pos, ch) in input.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(s)) => {
                push_term(&mut terms, &input[s..pos], s, pos)?;
                start = None;
            }
            (false, None) => start = Some(pos),
            _ => {}
        }
    }
    if let Some(s) = start {
        push_term(&mut terms, &input[s..], s, input.len())?;
    }

    if terms.is_empty() {
        return Err(LexError::Empty);
    }
    tracing::debug!(terms = terms.len(), "tokenized search query");
    Ok(terms)
}

fn push_term(terms: &mut Vec<Term>, word: &str, start: usize, end: usize) -> Result<(), LexError> {
    let text = word.to_lowercase();
    if terms.iter().any(|t| t.text == text) {
        return Ok(());
    }
    if terms.len() == MAX_TERMS {
        return Err(LexError::TooManyTerms { max: MAX_TERMS });
    }
    terms.push(Term {
        text,
        span: Span { start, end },
    });
    Ok(())
}
