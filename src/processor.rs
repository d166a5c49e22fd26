//! C13 — Text Processor.
//!
//! A pure function from raw review text to a [`ProcessedDocument`]. Built
//! from the same char-slice cursor idiom the original lexer used
//! (`trim_left` / `chop` / `chop_while`), generalized with a minimum-length
//! filter, a caller-supplied stopword set, and optional Porter2 stemming.
//! The identical function, given the identical [`ProcessorConfig`], is
//! used at index time and at query time so terms are always comparable.

use std::collections::HashMap;

use rust_stemmers::{Algorithm, Stemmer};

use crate::config::ProcessorConfig;

/// A review after tokenization/normalization: term -> in-document frequency.
pub struct ProcessedDocument {
    pub review_id: String,
    /// Token count before the minimum-length/stopword filter, used as the
    /// raw document length for BM25.
    pub raw_token_count: usize,
    pub term_frequencies: HashMap<String, u32>,
}

struct Cursor<'a> {
    input: &'a [char],
}

impl<'a> Cursor<'a> {
    fn new(input: &'a [char]) -> Self {
        Self { input }
    }

    fn trim_left(&mut self) {
        while !self.input.is_empty() && self.input[0].is_whitespace() {
            self.input = &self.input[1..];
        }
    }

    fn chop(&mut self, n: usize) -> &'a [char] {
        let token = &self.input[0..n];
        self.input = &self.input[n..];
        token
    }

    fn chop_while<P>(&mut self, mut predicate: P) -> &'a [char]
    where
        P: FnMut(&char) -> bool,
    {
        let mut n = 0;
        while n < self.input.len() && predicate(&self.input[n]) {
            n += 1;
        }
        self.chop(n)
    }

    /// Raw tokens, before any length/stopword filtering. Numeric runs and
    /// alphabetic runs are each a token; any other character is chopped
    /// singly and discarded by the caller (it never survives the
    /// alphanumeric filter downstream).
    fn next_raw_token(&mut self) -> Option<String> {
        self.trim_left();

        if self.input.is_empty() {
            return None;
        }

        if self.input[0].is_numeric() {
            return Some(self.chop_while(|c| c.is_numeric()).iter().collect());
        }

        if self.input[0].is_alphabetic() {
            return Some(self.chop_while(|c| c.is_alphanumeric()).iter().collect());
        }

        self.chop(1);
        self.next_raw_token()
    }
}

fn stem(stemmer: &Stemmer, token: &str) -> String {
    stemmer.stem(token).to_string()
}

/// Processes one review into a [`ProcessedDocument`]. Pure: depends only
/// on its arguments.
pub fn process(review_id: &str, text: &str, config: &ProcessorConfig) -> ProcessedDocument {
    let lowercase = text.to_lowercase();
    let chars: Vec<char> = lowercase.chars().collect();
    let mut cursor = Cursor::new(&chars);

    let stemmer = config
        .use_stemmer
        .then(|| Stemmer::create(Algorithm::English));

    let mut raw_token_count = 0usize;
    let mut term_frequencies: HashMap<String, u32> = HashMap::new();

    while let Some(raw) = cursor.next_raw_token() {
        raw_token_count += 1;

        if raw.chars().count() < config.min_token_length {
            continue;
        }
        if config.stopwords.contains(&raw) {
            continue;
        }

        let term = match &stemmer {
            Some(s) => stem(s, &raw),
            None => raw,
        };

        *term_frequencies.entry(term).or_insert(0) += 1;
    }

    ProcessedDocument {
        review_id: review_id.to_string(),
        raw_token_count,
        term_frequencies,
    }
}
