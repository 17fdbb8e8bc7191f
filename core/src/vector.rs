use crate::index::{DocId, InvertedIndex};
use crate::tfidf::{norm, TermWeights, TfIdfWeighter};
use std::cmp::Ordering;
use std::collections::HashMap;

/// `(doc_id, score)`, best first.
pub type Ranking = Vec<(DocId, f64)>;

/// Cosine similarity, defined as 0 when either vector has zero length.
pub fn cosine(dot: f64, a_norm: f64, b_norm: f64) -> f64 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let score = dot / (a_norm * b_norm);
    // fold -0.0 into 0.0 so it ties with other zero scores under total_cmp
    if score == 0.0 { 0.0 } else { score }
}

/// Score descending, then doc id ascending.
pub fn rank_order(a: &(DocId, f64), b: &(DocId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

pub fn sort_ranking(ranking: &mut Ranking) {
    ranking.sort_by(rank_order);
}

/// Ranks every indexed document by TF-IDF cosine similarity to a query.
pub struct VectorRanker<'a> {
    index: &'a InvertedIndex,
    weighter: &'a TfIdfWeighter,
}

impl<'a> VectorRanker<'a> {
    pub fn new(index: &'a InvertedIndex, weighter: &'a TfIdfWeighter) -> Self { Self { index, weighter } }

    pub fn rank(&self, query: &str) -> Ranking {
        self.rank_weights(&self.weighter.query_vector(query))
    }

    /// Documents sharing no term with the query are still listed, with score 0.
    pub fn rank_weights(&self, query: &TermWeights) -> Ranking {
        let q_norm = norm(query);

        // Dot products over the query/document term intersection
        let mut dots: HashMap<DocId, f64> = HashMap::new();
        for (term, q_w) in query {
            for p in self.index.postings(term) {
                *dots.entry(p.doc_id).or_insert(0.0) += q_w * self.weighter.weight(term, p.tf());
            }
        }

        let mut scored: Ranking = self
            .index
            .doc_ids()
            .map(|doc_id| {
                let dot = dots.get(&doc_id).copied().unwrap_or(0.0);
                (doc_id, cosine(dot, self.weighter.doc_norm(doc_id), q_norm))
            })
            .collect();
        sort_ranking(&mut scored);
        scored
    }
}
