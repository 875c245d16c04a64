//! Weighted keyword/phrase matching.
//!
//! Matching is case-insensitive, respects word boundaries, lets any run of
//! whitespace separate the words of a phrase, and tolerates a trailing plural
//! `s`/`es` so "free market" also hits "free markets".

use regex::{Regex, RegexSet};
use std::collections::BTreeSet;

use polis_common::config::MatchingConfig;
use polis_common::{Error, Result};

/// Whether a term is a single keyword or a multi-word phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Keyword,
    Phrase,
}

impl TermKind {
    /// Contribution of one hit of this kind.
    pub fn weight(self, weights: &MatchingConfig) -> f64 {
        match self {
            TermKind::Keyword => weights.keyword_weight,
            TermKind::Phrase => weights.phrase_weight,
        }
    }
}

/// Occurrences of one term in a text.
#[derive(Debug, Clone, PartialEq)]
pub struct TermHit<'a> {
    pub term: &'a str,
    pub kind: TermKind,
    pub count: usize,
}

impl TermHit<'_> {
    /// Weighted contribution of all occurrences.
    pub fn contribution(&self, weights: &MatchingConfig) -> f64 {
        self.kind.weight(weights) * self.count as f64
    }
}

#[derive(Debug, Clone)]
struct CompiledTerm {
    text: String,
    kind: TermKind,
    pattern: Regex,
}

/// Compiled matcher over one keyword set and one phrase set.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    terms: Vec<CompiledTerm>,
    /// Prefilter: one pass tells which terms occur at all
    set: RegexSet,
}

fn term_pattern(words: &[&str]) -> String {
    let body = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join(r"\s+");
    format!(r"(?i)\b{body}(?:s|es)?\b")
}

fn normalize(term: &str) -> String {
    term.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

impl TermMatcher {
    /// Compile a matcher.
    ///
    /// Keywords must be single tokens and phrases must have at least two
    /// words. Duplicates collapse to one term.
    pub fn new(keywords: &[String], phrases: &[String]) -> Result<Self> {
        let mut seen = BTreeSet::new();
        let mut terms = Vec::with_capacity(keywords.len() + phrases.len());

        for (raw, kind) in keywords
            .iter()
            .map(|k| (k, TermKind::Keyword))
            .chain(phrases.iter().map(|p| (p, TermKind::Phrase)))
        {
            let text = normalize(raw);
            let words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();

            match (kind, words.len()) {
                (_, 0) => {
                    return Err(Error::Validation("empty indicator term".to_string()));
                }
                (TermKind::Keyword, n) if n > 1 => {
                    return Err(Error::Validation(format!(
                        "keyword \"{text}\" has {n} words; list it as a phrase"
                    )));
                }
                (TermKind::Phrase, 1) => {
                    return Err(Error::Validation(format!(
                        "phrase \"{text}\" is a single word; list it as a keyword"
                    )));
                }
                _ => {}
            }

            if !seen.insert(text.clone()) {
                continue;
            }

            let pattern = Regex::new(&term_pattern(&words))
                .map_err(|e| Error::Validation(format!("term \"{text}\": {e}")))?;
            terms.push(CompiledTerm {
                text,
                kind,
                pattern,
            });
        }

        let set = RegexSet::new(terms.iter().map(|t| t.pattern.as_str()))
            .map_err(|e| Error::Validation(format!("indicator set: {e}")))?;

        Ok(Self { terms, set })
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether the matcher contains a term (normalized comparison).
    pub fn contains(&self, term: &str) -> bool {
        let needle = normalize(term);
        self.terms.iter().any(|t| t.text == needle)
    }

    /// Iterate the normalized terms.
    pub fn terms(&self) -> impl Iterator<Item = (&str, TermKind)> {
        self.terms.iter().map(|t| (t.text.as_str(), t.kind))
    }

    /// All terms occurring in `text`, in definition order.
    pub fn hits<'a>(&'a self, text: &str) -> Vec<TermHit<'a>> {
        if self.terms.is_empty() || text.is_empty() {
            return Vec::new();
        }

        self.set
            .matches(text)
            .into_iter()
            .filter_map(|i| {
                let term = &self.terms[i];
                let count = term.pattern.find_iter(text).count();
                (count > 0).then_some(TermHit {
                    term: &term.text,
                    kind: term.kind,
                    count,
                })
            })
            .collect()
    }

    /// Weighted hit total: keyword hits × keyword weight + phrase hits × phrase weight.
    pub fn weighted_total(&self, text: &str, weights: &MatchingConfig) -> f64 {
        self.hits(text).iter().map(|h| h.contribution(weights)).sum()
    }
}
