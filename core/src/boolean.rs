//! Boolean retrieval over the restricted four-shape grammar:
//! `t`, `not t`, `t1 and t2`, `t1 or t2`.

use crate::index::{DocId, InvertedIndex};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BooleanQuery {
    Term(String),
    Not(String),
    And(String, String),
    Or(String, String),
}

impl BooleanQuery {
    /// Parse a raw query. Terms are lowercased but otherwise taken verbatim.
    /// Returns `None` for anything outside the grammar.
    pub fn parse(query: &str) -> Option<Self> {
        let lowered = query.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();
        match tokens.as_slice() {
            [term] => Some(Self::Term(term.to_string())),
            ["not", term] => Some(Self::Not(term.to_string())),
            [left, "and", right] => Some(Self::And(left.to_string(), right.to_string())),
            [left, "or", right] => Some(Self::Or(left.to_string(), right.to_string())),
            _ => None,
        }
    }

    pub fn evaluate(&self, index: &InvertedIndex) -> BTreeSet<DocId> {
        match self {
            Self::Term(term) => term_docs(index, term),
            Self::Not(term) => {
                let excluded = term_docs(index, term);
                index.doc_ids().filter(|id| !excluded.contains(id)).collect()
            }
            Self::And(left, right) => {
                let right = term_docs(index, right);
                term_docs(index, left).intersection(&right).copied().collect()
            }
            Self::Or(left, right) => {
                let mut docs = term_docs(index, left);
                docs.extend(term_docs(index, right));
                docs
            }
        }
    }
}

/// Documents with a posting for `term`.
pub fn term_docs(index: &InvertedIndex, term: &str) -> BTreeSet<DocId> {
    index.postings(term).iter().map(|p| p.doc_id).collect()
}

/// Evaluate a raw boolean query; malformed input yields the empty set.
pub fn boolean_search(index: &InvertedIndex, query: &str) -> BTreeSet<DocId> {
    match BooleanQuery::parse(query) {
        Some(parsed) => parsed.evaluate(index),
        None => {
            tracing::debug!(query, "query outside boolean grammar");
            BTreeSet::new()
        }
    }
}
