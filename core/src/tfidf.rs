//! TF-IDF weighting with smoothed idf: `idf(t) = ln((1 + N) / (1 + df)) + 1`.
//!
//! Term frequency is the raw count. The smoothing keeps idf strictly positive,
//! including for query terms the corpus has never seen (`df = 0`).

use crate::index::{DocId, InvertedIndex};
use crate::latent::DenseMatrix;
use crate::tokenizer::tokenize;
use std::collections::{BTreeMap, HashMap};

/// Sparse weighted vector keyed by term, iterated in term order so sums are reproducible.
pub type TermWeights = BTreeMap<String, f64>;

pub fn smoothed_idf(num_docs: usize, df: u32) -> f64 {
    ((1.0 + num_docs as f64) / (1.0 + df as f64)).ln() + 1.0
}

/// Frozen corpus statistics: idf per indexed term and the L2 norm of every document vector.
#[derive(Debug, Clone)]
pub struct TfIdfWeighter {
    num_docs: usize,
    idf: HashMap<String, f64>,
    doc_norms: Vec<f64>, // slot doc_id - 1
}

impl TfIdfWeighter {
    pub fn new(index: &InvertedIndex) -> Self {
        let num_docs = index.num_docs();
        let mut idf: HashMap<String, f64> = HashMap::with_capacity(index.num_terms());
        let mut sums = vec![0.0f64; num_docs];
        for term in index.vocabulary() {
            let postings = index.postings(term);
            let term_idf = smoothed_idf(num_docs, postings.len() as u32);
            for p in postings {
                let w = p.tf() as f64 * term_idf;
                sums[p.doc_id as usize - 1] += w * w;
            }
            idf.insert(term.to_string(), term_idf);
        }
        let doc_norms = sums.into_iter().map(f64::sqrt).collect();
        Self { num_docs, idf, doc_norms }
    }

    pub fn num_docs(&self) -> usize { self.num_docs }

    pub fn idf(&self, term: &str) -> f64 {
        self.idf.get(term).copied().unwrap_or_else(|| smoothed_idf(self.num_docs, 0))
    }

    pub fn weight(&self, term: &str, tf: u32) -> f64 { tf as f64 * self.idf(term) }

    /// L2 norm of the document's weight vector, 0 for unknown ids.
    pub fn doc_norm(&self, doc_id: DocId) -> f64 {
        (doc_id as usize)
            .checked_sub(1)
            .and_then(|slot| self.doc_norms.get(slot))
            .copied()
            .unwrap_or(0.0)
    }

    /// Weighted query vector from raw query text, computed fresh per query.
    pub fn query_vector(&self, query: &str) -> TermWeights {
        self.weigh_tokens(&tokenize(query))
    }

    pub fn weigh_tokens(&self, tokens: &[String]) -> TermWeights {
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for token in tokens {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|(term, tf)| (term.to_string(), self.weight(term, tf)))
            .collect()
    }

    /// Dense `terms × docs` weight matrix. Rows follow the returned (sorted) vocabulary,
    /// columns follow ascending doc id.
    pub fn term_document_matrix(&self, index: &InvertedIndex) -> (Vec<String>, DenseMatrix) {
        let vocabulary = index.vocabulary();
        let mut matrix = DenseMatrix::zeros(vocabulary.len(), index.num_docs());
        for (row, term) in vocabulary.iter().enumerate() {
            let term_idf = self.idf(term);
            for p in index.postings(term) {
                matrix.set(row, p.doc_id as usize - 1, p.tf() as f64 * term_idf);
            }
        }
        let terms = vocabulary.into_iter().map(str::to_string).collect();
        (terms, matrix)
    }
}

pub fn norm(weights: &TermWeights) -> f64 {
    weights.values().map(|w| w * w).sum::<f64>().sqrt()
}
