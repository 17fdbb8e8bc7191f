use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^a-z0-9\s]").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a", "an", "the", "is", "are", "was", "were", "am", "be", "been", "being",
            "and", "or", "but", "if", "then", "this", "that", "these", "those",
            "in", "on", "at", "for", "with", "of", "to", "by", "as", "from",
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text: lowercase, strip everything but `[a-z0-9]` and whitespace, split, drop stopwords.
///
/// A token's position is its index in the returned vector.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = NON_WORD.replace_all(&lowered, "");
    cleaned
        .split_whitespace()
        .filter(|token| !is_stopword(token))
        .map(str::to_string)
        .collect()
}
