//! C8 — Scoring Formats.
//!
//! Two weighting schemes share one interface so the SPIMI Indexer, the
//! External Merger, and the Query Evaluator each dispatch on the active
//! format exactly once (per document, per merged term, per query term)
//! rather than per posting, keeping the inner posting-list loops free of
//! virtual calls.

use std::collections::HashMap;

use crate::config::{Bm25Params, ScoringFormatTag};

#[derive(Debug, Clone, Copy)]
pub enum ScoringFormat {
    TfIdf,
    Bm25(Bm25Params),
}

impl ScoringFormat {
    pub fn new(tag: ScoringFormatTag, bm25: Bm25Params) -> Self {
        match tag {
            ScoringFormatTag::TfIdf => ScoringFormat::TfIdf,
            ScoringFormatTag::Bm25 => ScoringFormat::Bm25(bm25),
        }
    }

    pub fn tag(&self) -> ScoringFormatTag {
        match self {
            ScoringFormat::TfIdf => ScoringFormatTag::TfIdf,
            ScoringFormat::Bm25(_) => ScoringFormatTag::Bm25,
        }
    }

    /// The per-document statistic recorded in the `DocumentLengthTable`
    /// at ingestion time: the lnc weight vector's Euclidean norm for
    /// TF-IDF, or the raw token count for BM25.
    pub fn document_length_stat(
        &self,
        term_frequencies: &HashMap<String, u32>,
        raw_token_count: usize,
    ) -> f64 {
        match self {
            ScoringFormat::TfIdf => {
                let sum_sq: f64 = term_frequencies
                    .values()
                    .map(|&tf| {
                        let w = 1.0 + (tf as f64).log10();
                        w * w
                    })
                    .sum();
                sum_sq.sqrt()
            }
            ScoringFormat::Bm25(_) => raw_token_count as f64,
        }
    }

    /// The scored weight stored in the posting's payload at merge time,
    /// given the raw in-document term frequency, the document's recorded
    /// length statistic, and the collection's average document length
    /// (BM25 only; ignored by TF-IDF).
    pub fn posting_payload(&self, tf: RawTf, doc_length_stat: f64, avgdl: f64) -> f64 {
        match self {
            ScoringFormat::TfIdf => {
                let w = 1.0 + (tf as f64).log10();
                if doc_length_stat == 0.0 {
                    0.0
                } else {
                    w / doc_length_stat
                }
            }
            ScoringFormat::Bm25(Bm25Params { k1, b }) => {
                let tf = tf as f64;
                let len_norm = if avgdl == 0.0 {
                    1.0
                } else {
                    1.0 - b + b * (doc_length_stat / avgdl)
                };
                (tf * (k1 + 1.0)) / (tf + k1 * len_norm)
            }
        }
    }

    /// Per-query-term weights. TF-IDF returns ltc weights normalized to
    /// unit Euclidean length; BM25 returns `idf(t)` with no
    /// normalization, matching "Score(d,q) = Σ idf(t)·payload" exactly.
    pub fn query_term_weights(
        &self,
        query_term_frequencies: &HashMap<String, u32>,
        total_docs: u64,
        document_frequency: impl Fn(&str) -> Option<u64>,
    ) -> HashMap<String, f64> {
        match self {
            ScoringFormat::TfIdf => {
                let mut weights = HashMap::new();
                for (term, &tf_q) in query_term_frequencies {
                    let Some(df) = document_frequency(term) else {
                        continue;
                    };
                    if df == 0 {
                        continue;
                    }
                    let idf = (total_docs as f64 / df as f64).log10();
                    let w = (1.0 + (tf_q as f64).log10()) * idf;
                    weights.insert(term.clone(), w);
                }
                let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for w in weights.values_mut() {
                        *w /= norm;
                    }
                }
                weights
            }
            ScoringFormat::Bm25(_) => {
                // Robertson/Sparck-Jones IDF with +1 smoothing: stays
                // non-negative by construction even when a term appears
                // in every document (df == N), instead of the raw
                // `log10((N-df+0.5)/(df+0.5))` clamped at zero, which
                // would tie every such term at an idf of exactly 0 and
                // erase length normalization from the ranking entirely.
                let mut weights = HashMap::new();
                for term in query_term_frequencies.keys() {
                    let Some(df) = document_frequency(term) else {
                        continue;
                    };
                    let numerator = total_docs as f64 - df as f64 + 0.5;
                    let denominator = df as f64 + 0.5;
                    let idf = (1.0 + numerator / denominator).log10();
                    weights.insert(term.clone(), idf);
                }
                weights
            }
        }
    }
}

pub type RawTf = u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tfidf_document_norm_matches_definition() {
        let mut tf = HashMap::new();
        tf.insert("alpha".to_string(), 2);
        tf.insert("beta".to_string(), 1);
        let norm = ScoringFormat::TfIdf.document_length_stat(&tf, 3);

        let w_alpha = 1.0 + 2f64.log10();
        let w_beta = 1.0 + 1f64.log10();
        let expected = (w_alpha * w_alpha + w_beta * w_beta).sqrt();
        assert!((norm - expected).abs() < 1e-12);
    }

    #[test]
    fn bm25_payload_saturates_with_term_frequency() {
        let format = ScoringFormat::Bm25(Bm25Params { k1: 1.2, b: 0.75 });
        let low = format.posting_payload(1, 5.0, 5.0);
        let high = format.posting_payload(10, 5.0, 5.0);
        assert!(high > low);
        assert!(high < 11.0); // bounded by k1+1 scaling, never runs away
    }

    #[test]
    fn bm25_idf_stays_nonnegative_when_term_is_universal() {
        // With the raw (unsmoothed) formula, df == N drives idf to
        // exactly zero; the +1-smoothed variant keeps a small positive
        // signal instead so universal terms don't all tie at zero.
        let weights = ScoringFormat::Bm25(Bm25Params::default()).query_term_weights(
            &HashMap::from([("common".to_string(), 1)]),
            10,
            |_| Some(10), // df == N
        );
        assert!(*weights.get("common").unwrap() > 0.0);
    }

    #[test]
    fn tfidf_query_vector_is_unit_length_when_nonzero() {
        let weights = ScoringFormat::TfIdf.query_term_weights(
            &HashMap::from([("a".to_string(), 1), ("b".to_string(), 1)]),
            100,
            |t| if t == "a" { Some(5) } else { Some(50) },
        );
        let norm: f64 = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }
}
