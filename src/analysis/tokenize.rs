// Tokenizer for n-gram counting.
//
// Text is lower-cased, split on whitespace, and stripped of punctuation.
// Hyphens and apostrophes survive only between two retained characters, so
// "e-commerce" and "don't" stay whole while "-sale-" becomes "sale".

use std::collections::HashSet;

use stop_words::{get, LANGUAGE};

fn is_joiner(c: char) -> bool {
    matches!(c, '-' | '\'' | '\u{2019}')
}

/// Clean one whitespace-delimited chunk of text into a token.
fn clean_token(raw: &str) -> Option<String> {
    let kept: Vec<char> = raw
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || is_joiner(*c))
        .collect();

    let mut token = String::with_capacity(kept.len());
    for (i, &c) in kept.iter().enumerate() {
        if is_joiner(c) {
            let after_word = token.chars().last().is_some_and(char::is_alphanumeric);
            let before_word = kept.get(i + 1).is_some_and(|n| n.is_alphanumeric());
            if !(after_word && before_word) {
                continue;
            }
            // Typographic apostrophes count the same as ASCII ones
            token.push(if c == '\u{2019}' { '\'' } else { c });
        } else {
            token.push(c);
        }
    }

    (!token.is_empty()).then_some(token)
}

/// Split text into normalized tokens. Empty tokens are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().filter_map(clean_token).collect()
}

/// Tokenizer configuration shared by every record in a session.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    stop_words: Option<HashSet<String>>,
}

impl Tokenizer {
    /// Tokenizer that keeps every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizer that drops English stop words before windowing.
    pub fn without_stop_words() -> Self {
        let words: Vec<String> = get(LANGUAGE::English);
        Self {
            stop_words: Some(words.into_iter().collect()),
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let tokens = tokenize(text);
        match &self.stop_words {
            Some(stop) => tokens.into_iter().filter(|t| !stop.contains(t)).collect(),
            None => tokens,
        }
    }
}

/// Every contiguous window of `n` tokens. Yields `max(len - n + 1, 0)` items.
pub fn windows(tokens: &[String], n: usize) -> impl Iterator<Item = &[String]> {
    // `slice::windows` panics on zero; a zero size simply produces nothing.
    let usable = if n == 0 { &tokens[..0] } else { tokens };
    usable.windows(n.max(1))
}
