//! C2 — Postings Dictionary.
//!
//! In-memory mapping: term -> per-document term-frequency postings for
//! the block currently being built. Owned exclusively by the SPIMI
//! Indexer; flushing consumes it.

use std::collections::BTreeMap;

use crate::processor::ProcessedDocument;

pub type DocumentOrdinal = u32;
pub type RawTermFrequency = u32;

/// A `BTreeMap` keeps terms naturally sorted, so `sorted_terms` is a plain
/// iteration rather than a sort pass on every flush.
#[derive(Default)]
pub struct PostingsDictionary {
    terms: BTreeMap<String, Vec<(DocumentOrdinal, RawTermFrequency)>>,
}

impl PostingsDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Appends a posting for every distinct term in `document`. The
    /// caller guarantees `ordinal` is strictly greater than any ordinal
    /// previously passed to this dictionary, so each per-term posting
    /// list stays sorted by construction.
    pub fn add_document(&mut self, ordinal: DocumentOrdinal, document: &ProcessedDocument) {
        for (term, tf) in &document.term_frequencies {
            self.terms.entry(term.clone()).or_default().push((ordinal, *tf));
        }
    }

    /// Yields `(term, postings)` pairs in ascending byte order.
    pub fn sorted_terms(
        &self,
    ) -> impl Iterator<Item = (&str, &[(DocumentOrdinal, RawTermFrequency)])> {
        self.terms.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }
}
