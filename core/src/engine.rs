use crate::boolean::boolean_search;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::eval::{evaluate, Evaluation, RelevanceSet};
use crate::index::{DocId, InvertedIndex};
use crate::latent::{Factorizer, JacobiSvd, LatentHandle};
use crate::phrase::phrase_search;
use crate::tfidf::TfIdfWeighter;
use crate::vector::{Ranking, VectorRanker};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Query front end over one immutable corpus snapshot.
///
/// Building the engine indexes the corpus and immediately starts the latent
/// factorization in the background. Boolean, phrase and vector queries are
/// available at once; latent queries wait for (or report) the SVD job.
#[derive(Clone)]
pub struct SearchEngine {
    index: Arc<InvertedIndex>,
    weighter: Arc<TfIdfWeighter>,
    latent: LatentHandle,
    config: EngineConfig,
}

impl SearchEngine {
    pub fn build(corpus: Vec<(String, String)>, config: EngineConfig) -> Self {
        Self::build_with(corpus, config, Arc::new(JacobiSvd))
    }

    pub fn build_with(corpus: Vec<(String, String)>, config: EngineConfig, factorizer: Arc<dyn Factorizer>) -> Self {
        let index = Arc::new(build_index(corpus, config.parallel_build));
        let weighter = Arc::new(TfIdfWeighter::new(&index));
        let latent =
            LatentHandle::spawn_with(Arc::clone(&index), Arc::clone(&weighter), config.latent_dimensions, factorizer);
        Self { index, weighter, latent, config }
    }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn weighter(&self) -> &TfIdfWeighter { &self.weighter }

    pub fn latent(&self) -> &LatentHandle { &self.latent }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn label(&self, doc_id: DocId) -> Option<&str> { self.index.label(doc_id) }

    pub fn submit_boolean(&self, query: &str) -> BTreeSet<DocId> { boolean_search(&self.index, query) }

    pub fn submit_phrase(&self, phrase: &str) -> BTreeSet<DocId> { phrase_search(&self.index, phrase) }

    /// `"quoted text"` runs a phrase search, anything else a boolean query.
    pub fn submit_exact(&self, query: &str) -> BTreeSet<DocId> {
        let trimmed = query.trim();
        match trimmed.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
            Some(phrase) => self.submit_phrase(phrase),
            None => self.submit_boolean(trimmed),
        }
    }

    pub fn submit_vector(&self, query: &str) -> Ranking { VectorRanker::new(&self.index, &self.weighter).rank(query) }

    /// Latent ranking, blocking until the model is built.
    pub fn submit_latent(&self, query: &str) -> Result<Ranking, EngineError> {
        Ok(self.latent.wait()?.rank(&self.weighter, query))
    }

    /// Latent ranking, failing with `LatentNotReady` while the model is still being built.
    pub fn try_submit_latent(&self, query: &str) -> Result<Ranking, EngineError> {
        Ok(self.latent.try_get()?.rank(&self.weighter, query))
    }

    pub fn relevant_ids<S: AsRef<str>>(&self, labels: &[S]) -> RelevanceSet { RelevanceSet::resolve(&self.index, labels) }

    pub fn evaluate<S: AsRef<str>>(&self, ranked: &[(DocId, f64)], relevant_labels: &[S], k: usize) -> Evaluation {
        evaluate(ranked, &self.relevant_ids(relevant_labels), k)
    }
}

#[cfg(feature = "parallel")]
fn build_index(corpus: Vec<(String, String)>, parallel: bool) -> InvertedIndex {
    if parallel {
        InvertedIndex::build_parallel(corpus)
    } else {
        InvertedIndex::build(corpus)
    }
}

#[cfg(not(feature = "parallel"))]
fn build_index(corpus: Vec<(String, String)>, parallel: bool) -> InvertedIndex {
    if parallel {
        tracing::warn!("built without the `parallel` feature, indexing sequentially");
    }
    InvertedIndex::build(corpus)
}
