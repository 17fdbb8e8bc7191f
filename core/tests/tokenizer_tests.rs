use lyricsir_core::tokenizer::{is_stopword, tokenize};
use proptest::prelude::*;

#[test]
fn it_lowercases_and_strips_punctuation() {
    let words = tokenize("Hey JUDE, don't make it bad!");
    assert_eq!(words, vec!["hey", "jude", "dont", "make", "it", "bad"]);
}

#[test]
fn it_filters_stopwords() {
    let words = tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert_eq!(words, vec!["quick", "brown", "fox", "lazy", "dog"]);
}

#[test]
fn empty_and_stopword_only_input() {
    assert!(tokenize("").is_empty());
    assert!(tokenize("   \n\t ").is_empty());
    assert!(tokenize("To be, or not to be").iter().all(|w| w == "not"));
    assert!(tokenize("the a an of").is_empty());
}

#[test]
fn digits_survive() {
    assert_eq!(tokenize("99 Luftballons (1983)"), vec!["99", "luftballons", "1983"]);
}

proptest! {
    #[test]
    fn tokenize_is_deterministic(text in ".{0,200}") {
        prop_assert_eq!(tokenize(&text), tokenize(&text));
    }

    #[test]
    fn tokenize_is_idempotent(text in ".{0,200}") {
        let once = tokenize(&text);
        let twice = tokenize(&once.join(" "));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn output_has_no_stopwords_or_foreign_chars(text in "[A-Za-z0-9 ,.'!?-]{0,200}") {
        for token in tokenize(&text) {
            prop_assert!(!token.is_empty());
            prop_assert!(!is_stopword(&token));
            prop_assert!(token.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}
