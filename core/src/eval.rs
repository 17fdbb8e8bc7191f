//! Precision@k and average precision against static relevance judgments.
//!
//! `average_precision` is a single-query figure (the lyrics tooling historically
//! printed it as "MAP"). Averaging over several queries is a separate step,
//! [`mean_average_precision`].

use crate::index::{DocId, InvertedIndex};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Query label → relevant document labels (`"artist/title"`).
pub type Judgments = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelevanceSet {
    ids: HashSet<DocId>,
}

impl RelevanceSet {
    /// Resolve labels against the index. Labels that match no document are dropped.
    pub fn resolve<S: AsRef<str>>(index: &InvertedIndex, labels: &[S]) -> Self {
        let ids = labels
            .iter()
            .filter_map(|label| {
                let id = index.doc_id(label.as_ref());
                if id.is_none() {
                    tracing::debug!(label = label.as_ref(), "relevance label not in index");
                }
                id
            })
            .collect();
        Self { ids }
    }

    pub fn from_ids<I: IntoIterator<Item = DocId>>(ids: I) -> Self { Self { ids: ids.into_iter().collect() } }

    pub fn contains(&self, doc_id: DocId) -> bool { self.ids.contains(&doc_id) }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub precision_at_k: f64,
    pub average_precision: f64,
}

/// Relevant hits among the first `k` results, divided by `k`.
pub fn precision_at_k(ranked: &[(DocId, f64)], relevant: &RelevanceSet, k: usize) -> f64 {
    if relevant.is_empty() || k == 0 {
        return 0.0;
    }
    let hits = ranked.iter().take(k).filter(|(id, _)| relevant.contains(*id)).count();
    hits as f64 / k as f64
}

/// Mean of precision at the rank of every relevant hit, over the whole ranking.
pub fn average_precision(ranked: &[(DocId, f64)], relevant: &RelevanceSet) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (i, (id, _)) in ranked.iter().enumerate() {
        if relevant.contains(*id) {
            hits += 1;
            sum += hits as f64 / (i + 1) as f64;
        }
    }
    sum / relevant.len() as f64
}

pub fn evaluate(ranked: &[(DocId, f64)], relevant: &RelevanceSet, k: usize) -> Evaluation {
    Evaluation { precision_at_k: precision_at_k(ranked, relevant, k), average_precision: average_precision(ranked, relevant) }
}

/// Arithmetic mean of per-query average precision; 0.0 for no queries.
pub fn mean_average_precision(per_query: &[Evaluation]) -> f64 {
    if per_query.is_empty() {
        return 0.0;
    }
    per_query.iter().map(|e| e.average_precision).sum::<f64>() / per_query.len() as f64
}
