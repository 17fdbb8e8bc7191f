//! Lyrics retrieval engine: positional inverted index with boolean, phrase,
//! TF-IDF cosine and latent semantic (SVD) ranking, plus precision metrics
//! for comparing rankings against relevance judgments.

pub mod boolean;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod eval;
pub mod index;
pub mod latent;
pub mod phrase;
pub mod tfidf;
pub mod tokenizer;
pub mod vector;

pub use config::EngineConfig;
pub use engine::SearchEngine;
pub use error::EngineError;
pub use eval::{Evaluation, Judgments, RelevanceSet};
pub use index::{DocId, Document, InvertedIndex, Posting};
pub use vector::Ranking;
