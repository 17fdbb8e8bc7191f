//! Latent semantic indexing: rank queries in the space spanned by the top
//! singular vectors of the TF-IDF term-document matrix.
//!
//! Only this module knows about matrix factorization, and it reaches it
//! through the [`Factorizer`] trait.

mod handle;
mod jacobi;
mod matrix;

pub use handle::LatentHandle;
pub use jacobi::{JacobiSvd, RANK_TOL};
pub use matrix::DenseMatrix;

use crate::error::EngineError;
use crate::index::{DocId, InvertedIndex};
use crate::tfidf::{TermWeights, TfIdfWeighter};
use crate::vector::{cosine, sort_ranking, Ranking};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Singular values at or below this are treated as zero during query projection.
pub const SINGULAR_EPS: f64 = 1e-12;

/// Cooperative cancellation flag shared between a build job and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::Release); }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Acquire) }
}

/// Truncated SVD `A ≈ U diag(sigma) Vᵀ` with `sigma` in descending order.
#[derive(Debug, Clone)]
pub struct Factorization {
    /// rows × k
    pub u: DenseMatrix,
    pub sigma: Vec<f64>,
    /// k × cols
    pub vt: DenseMatrix,
}

/// Produces the top `k` components of a matrix, never more than its numerical rank.
///
/// Implementations should poll `cancel` and return [`EngineError::LatentCancelled`] when raised.
pub trait Factorizer: Send + Sync {
    fn factorize(&self, matrix: &DenseMatrix, k: usize, cancel: &CancelToken) -> Result<Factorization, EngineError>;
}

#[derive(Debug, Clone)]
pub struct LatentSemanticModel {
    term_rows: HashMap<String, usize>,
    u: DenseMatrix,
    sigma: Vec<f64>,
    doc_ids: Vec<DocId>,
    doc_latent: Vec<Vec<f64>>, // per document: diag(sigma) · Vᵀ column
    doc_norms: Vec<f64>,
}

impl LatentSemanticModel {
    /// Factorize the index's weighted term-document matrix.
    pub fn build(
        index: &InvertedIndex,
        weighter: &TfIdfWeighter,
        dimensions: usize,
        factorizer: &dyn Factorizer,
        cancel: &CancelToken,
    ) -> Result<Self, EngineError> {
        let (terms, matrix) = weighter.term_document_matrix(index);
        let doc_ids: Vec<DocId> = index.doc_ids().collect();
        tracing::info!(terms = matrix.rows(), docs = matrix.cols(), dimensions, "factorizing term-document matrix");
        Self::from_matrix(terms, doc_ids, &matrix, dimensions, factorizer, cancel)
    }

    /// Build from an explicit matrix whose rows are `terms` and columns `doc_ids`.
    pub fn from_matrix(
        terms: Vec<String>,
        doc_ids: Vec<DocId>,
        matrix: &DenseMatrix,
        dimensions: usize,
        factorizer: &dyn Factorizer,
        cancel: &CancelToken,
    ) -> Result<Self, EngineError> {
        if terms.len() != matrix.rows() || doc_ids.len() != matrix.cols() {
            return Err(EngineError::Factorization(format!(
                "matrix is {}x{} but {} terms and {} documents were given",
                matrix.rows(),
                matrix.cols(),
                terms.len(),
                doc_ids.len()
            )));
        }
        let Factorization { u, sigma, vt } = factorizer.factorize(matrix, dimensions, cancel)?;
        let k = sigma.len();
        if k > dimensions
            || u.rows() != matrix.rows()
            || u.cols() != k
            || vt.rows() != k
            || vt.cols() != matrix.cols()
        {
            return Err(EngineError::Factorization(format!(
                "factorizer returned u {}x{}, {} singular values and vt {}x{} for a {}x{} matrix",
                u.rows(),
                u.cols(),
                k,
                vt.rows(),
                vt.cols(),
                matrix.rows(),
                matrix.cols()
            )));
        }

        let doc_latent: Vec<Vec<f64>> = (0..doc_ids.len())
            .map(|d| sigma.iter().enumerate().map(|(j, s)| s * vt.get(j, d)).collect())
            .collect();
        let doc_norms = doc_latent.iter().map(|v| l2(v)).collect();
        let term_rows = terms.into_iter().enumerate().map(|(row, term)| (term, row)).collect();
        tracing::info!(k = sigma.len(), "latent space ready");
        Ok(Self { term_rows, u, sigma, doc_ids, doc_latent, doc_norms })
    }

    /// Effective number of latent dimensions.
    pub fn k(&self) -> usize { self.sigma.len() }

    pub fn singular_values(&self) -> &[f64] { &self.sigma }

    pub fn doc_latent(&self, doc_id: DocId) -> Option<&[f64]> {
        let slot = self.doc_ids.binary_search(&doc_id).ok()?;
        Some(&self.doc_latent[slot])
    }

    /// `q_latent = (U_kᵀ q) / Σ_k`, with a zero component wherever σ is numerically zero.
    pub fn project(&self, query: &TermWeights) -> Vec<f64> {
        let mut projected = vec![0.0; self.k()];
        for (term, weight) in query {
            let Some(&row) = self.term_rows.get(term) else { continue };
            for (j, slot) in projected.iter_mut().enumerate() {
                *slot += self.u.get(row, j) * weight;
            }
        }
        for (value, &s) in projected.iter_mut().zip(&self.sigma) {
            *value = if s.abs() <= SINGULAR_EPS { 0.0 } else { *value / s };
        }
        projected
    }

    pub fn rank_weights(&self, query: &TermWeights) -> Ranking {
        let q = self.project(query);
        let q_norm = l2(&q);
        let mut scored: Ranking = self
            .doc_ids
            .iter()
            .zip(self.doc_latent.iter().zip(&self.doc_norms))
            .map(|(&doc_id, (d, &d_norm))| {
                let dot: f64 = q.iter().zip(d).map(|(a, b)| a * b).sum();
                (doc_id, cosine(dot, d_norm, q_norm))
            })
            .collect();
        sort_ranking(&mut scored);
        scored
    }

    pub fn rank(&self, weighter: &TfIdfWeighter, query: &str) -> Ranking {
        self.rank_weights(&weighter.query_vector(query))
    }
}

fn l2(v: &[f64]) -> f64 { v.iter().map(|x| x * x).sum::<f64>().sqrt() }

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(pairs: &[(&str, f64)]) -> TermWeights {
        pairs.iter().map(|(t, w)| (t.to_string(), *w)).collect()
    }

    fn model(rows: &[Vec<f64>], k: usize) -> LatentSemanticModel {
        let m = DenseMatrix::from_rows(rows);
        let terms = (0..m.rows()).map(|r| format!("t{r}")).collect();
        let docs = (1..=m.cols() as DocId).collect();
        LatentSemanticModel::from_matrix(terms, docs, &m, k, &JacobiSvd, &CancelToken::new()).unwrap()
    }

    #[test]
    fn diagonal_matrix_hand_computed_ranking() {
        // U = V = I, sigma = (2, 1, 0.5); k = 2 keeps the first two axes.
        // doc_latent: d1 = (2, 0), d2 = (0, 1), d3 = (0, 0)
        // q = (1, 1, 1) projects to (1/2, 1/1) = (0.5, 1)
        let lsi = model(&[vec![2.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 0.5]], 2);
        assert_eq!(lsi.k(), 2);
        let ranked = lsi.rank_weights(&weights(&[("t0", 1.0), ("t1", 1.0), ("t2", 1.0)]));
        let q_norm = 1.25f64.sqrt();
        assert_eq!(ranked.iter().map(|r| r.0).collect::<Vec<_>>(), vec![2, 1, 3]);
        assert!((ranked[0].1 - 1.0 / q_norm).abs() < 1e-6);
        assert!((ranked[1].1 - 0.5 / q_norm).abs() < 1e-6);
        assert_eq!(ranked[2].1, 0.0);
    }

    #[test]
    fn co_occurring_documents_collapse_onto_one_axis() {
        // Terms t0, t1 always co-occur in d1, d2; t2 only in d3.
        // sigma = (2, 1), u1 = (1, 1, 0)/√2, so d1 and d2 both sit at (√2, 0).
        let lsi = model(&[vec![1.0, 1.0, 0.0], vec![1.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]], 2);
        assert!((lsi.singular_values()[0] - 2.0).abs() < 1e-9);
        let d1 = lsi.doc_latent(1).unwrap();
        assert!((d1[0] - 2f64.sqrt()).abs() < 1e-9);
        assert!(d1[1].abs() < 1e-9);

        let ranked = lsi.rank_weights(&weights(&[("t0", 1.0)]));
        assert_eq!(ranked[0].0, 1);
        assert_eq!(ranked[1].0, 2);
        assert!((ranked[0].1 - 1.0).abs() < 1e-6);
        assert!((ranked[1].1 - 1.0).abs() < 1e-6);
        assert!(ranked[2].1.abs() < 1e-6);
    }

    #[test]
    fn dimensions_are_capped_by_rank() {
        let lsi = model(&[vec![1.0, 2.0], vec![2.0, 4.0]], 10);
        assert_eq!(lsi.k(), 1);
    }

    #[test]
    fn unknown_query_terms_score_zero() {
        let lsi = model(&[vec![1.0, 0.0], vec![0.0, 1.0]], 2);
        let ranked = lsi.rank_weights(&weights(&[("nope", 3.0)]));
        assert_eq!(ranked, vec![(1, 0.0), (2, 0.0)]);
    }

    #[test]
    fn zero_singular_value_projects_to_zero() {
        struct WithZero;
        impl Factorizer for WithZero {
            fn factorize(&self, _: &DenseMatrix, _: usize, _: &CancelToken) -> Result<Factorization, EngineError> {
                Ok(Factorization {
                    u: DenseMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]),
                    sigma: vec![1.0, 0.0],
                    vt: DenseMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]),
                })
            }
        }
        let m = DenseMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 0.0]]);
        let lsi = LatentSemanticModel::from_matrix(
            vec!["a".into(), "b".into()],
            vec![1, 2],
            &m,
            2,
            &WithZero,
            &CancelToken::new(),
        )
        .unwrap();
        let q = lsi.project(&weights(&[("a", 2.0), ("b", 5.0)]));
        assert_eq!(q, vec![2.0, 0.0]);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let m = DenseMatrix::from_rows(&[vec![1.0, 0.0]]);
        let err = LatentSemanticModel::from_matrix(vec![], vec![1, 2], &m, 1, &JacobiSvd, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::Factorization(_)));
    }

    /// Returns fixed factors regardless of the input matrix.
    struct Fixed(Factorization);

    impl Factorizer for Fixed {
        fn factorize(&self, _: &DenseMatrix, _: usize, _: &CancelToken) -> Result<Factorization, EngineError> {
            Ok(self.0.clone())
        }
    }

    fn from_factors(u: DenseMatrix, sigma: Vec<f64>, vt: DenseMatrix) -> Result<LatentSemanticModel, EngineError> {
        let m = DenseMatrix::from_rows(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]]);
        let terms = vec!["a".into(), "b".into(), "c".into()];
        let fixed = Fixed(Factorization { u, sigma, vt });
        LatentSemanticModel::from_matrix(terms, vec![1, 2, 3], &m, 3, &fixed, &CancelToken::new())
    }

    #[test]
    fn mis_shaped_factors_are_rejected() {
        let one = || DenseMatrix::from_rows(&[vec![1.0]]);
        let column = || DenseMatrix::from_rows(&[vec![1.0], vec![0.0], vec![0.0]]);
        let row = || DenseMatrix::from_rows(&[vec![1.0, 0.0, 0.0]]);

        // u and vt too small for a 3x3 matrix
        let err = from_factors(one(), vec![1.0], one()).unwrap_err();
        assert!(matches!(err, EngineError::Factorization(_)));
        // u has too few rows
        assert!(matches!(from_factors(one(), vec![1.0], row()), Err(EngineError::Factorization(_))));
        // vt has too few columns
        assert!(matches!(from_factors(column(), vec![1.0], one()), Err(EngineError::Factorization(_))));
        // more singular values than factor columns
        assert!(matches!(from_factors(column(), vec![1.0, 0.5], row()), Err(EngineError::Factorization(_))));

        let lsi = from_factors(column(), vec![1.0], row()).unwrap();
        assert_eq!(lsi.k(), 1);
    }
}
