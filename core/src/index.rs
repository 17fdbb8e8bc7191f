use crate::tokenizer::tokenize;
use serde::Serialize;
use std::collections::HashMap;

pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub id: DocId,
    /// "artist/title"
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    /// Offsets into the document's filtered token stream, strictly increasing.
    pub positions: Vec<usize>,
}

impl Posting {
    pub fn tf(&self) -> u32 { self.positions.len() as u32 }
}

/// Positional inverted index over a frozen corpus snapshot.
///
/// Built once, never mutated afterwards. Every lookup takes `&self`, so probing
/// for an unknown term or label cannot create entries.
#[derive(Debug, Default, PartialEq)]
pub struct InvertedIndex {
    docs: Vec<Document>,
    postings: HashMap<String, Vec<Posting>>, // postings sorted by doc_id
    label_ids: HashMap<String, DocId>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Build the index from `(label, raw_text)` pairs. Ids are assigned from 1 in input order.
    pub fn build<I, L, T>(corpus: I) -> Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: AsRef<str>,
    {
        let mut index = Self::new();
        for (label, text) in corpus {
            let doc_id = index.push_document(label.into());
            index.merge_document(doc_id, doc_postings(&tokenize(text.as_ref())));
        }
        tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "index built");
        index
    }

    /// Same result as [`InvertedIndex::build`], with tokenization fanned out over the rayon pool.
    #[cfg(feature = "parallel")]
    pub fn build_parallel<L, T>(corpus: Vec<(L, T)>) -> Self
    where
        L: Into<String> + Send,
        T: AsRef<str> + Sync + Send,
    {
        use rayon::prelude::*;

        // Map: one task per document
        let per_doc: Vec<(L, HashMap<String, Vec<usize>>)> = corpus
            .into_par_iter()
            .map(|(label, text)| {
                let terms = doc_postings(&tokenize(text.as_ref()));
                (label, terms)
            })
            .collect();

        // Reduce: merge in input order so ids and posting order match the sequential build
        let mut index = Self::new();
        for (label, terms) in per_doc {
            let doc_id = index.push_document(label.into());
            index.merge_document(doc_id, terms);
        }
        tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "index built (parallel)");
        index
    }

    fn push_document(&mut self, label: String) -> DocId {
        let doc_id = self.docs.len() as DocId + 1;
        self.label_ids.entry(label.clone()).or_insert(doc_id);
        self.docs.push(Document { id: doc_id, label });
        doc_id
    }

    // Documents arrive with increasing ids, so pushing keeps each posting list sorted.
    fn merge_document(&mut self, doc_id: DocId, terms: HashMap<String, Vec<usize>>) {
        for (term, positions) in terms {
            self.postings.entry(term).or_default().push(Posting { doc_id, positions });
        }
    }

    pub fn num_docs(&self) -> usize { self.docs.len() }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn documents(&self) -> &[Document] { &self.docs }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ { self.docs.iter().map(|d| d.id) }

    pub fn label(&self, doc_id: DocId) -> Option<&str> {
        let slot = (doc_id as usize).checked_sub(1)?;
        self.docs.get(slot).map(|d| d.label.as_str())
    }

    pub fn doc_id(&self, label: &str) -> Option<DocId> { self.label_ids.get(label).copied() }

    /// Postings for `term`, empty when the term was never indexed.
    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn posting(&self, term: &str, doc_id: DocId) -> Option<&Posting> {
        let list = self.postings(term);
        list.binary_search_by_key(&doc_id, |p| p.doc_id).ok().map(|i| &list[i])
    }

    pub fn positions(&self, term: &str, doc_id: DocId) -> Option<&[usize]> {
        self.posting(term, doc_id).map(|p| p.positions.as_slice())
    }

    pub fn contains_term(&self, term: &str) -> bool { self.postings.contains_key(term) }

    pub fn df(&self, term: &str) -> u32 { self.postings(term).len() as u32 }

    pub fn tf(&self, term: &str, doc_id: DocId) -> u32 { self.posting(term, doc_id).map_or(0, Posting::tf) }

    /// All indexed terms in lexicographic order.
    pub fn vocabulary(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = self.postings.keys().map(String::as_str).collect();
        terms.sort_unstable();
        terms
    }
}

fn doc_postings(tokens: &[String]) -> HashMap<String, Vec<usize>> {
    let mut terms: HashMap<String, Vec<usize>> = HashMap::new();
    for (pos, token) in tokens.iter().enumerate() {
        terms.entry(token.clone()).or_default().push(pos);
    }
    terms
}
