use crate::index::{DocId, InvertedIndex};
use crate::tokenizer::tokenize;
use std::collections::BTreeSet;

/// Documents where the phrase's tokens occur at consecutive positions.
///
/// The phrase goes through the regular tokenizer, stopwords included, so
/// adjacency is checked on the filtered token stream: "love of my life"
/// matches wherever "love my life" are consecutive index positions.
pub fn phrase_search(index: &InvertedIndex, phrase: &str) -> BTreeSet<DocId> {
    let words = tokenize(phrase);
    let Some((first, rest)) = words.split_first() else {
        return BTreeSet::new();
    };

    let mut result = BTreeSet::new();
    for posting in index.postings(first) {
        let matched = posting.positions.iter().any(|&pos| {
            rest.iter().enumerate().all(|(i, word)| {
                index
                    .positions(word, posting.doc_id)
                    .is_some_and(|positions| positions.binary_search(&(pos + i + 1)).is_ok())
            })
        });
        if matched {
            result.insert(posting.doc_id);
        }
    }
    result
}
