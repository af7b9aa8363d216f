/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Ranking functions. A [`Scorer`] instantiates, for each query term, a
//! [`TermScorer`] mapping `(freq, norm_len)` to the term's impact on a
//! document of normalized length `norm_len = len / avg_len`. Term-level
//! factors (inverse document frequency, collection statistics) are baked
//! into the term scorer once, so the per-posting evaluation stays a few
//! flops.

use std::f32::consts::{E, PI};

/// Collection-level statistics recorded in the WAND data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectionStatistics {
    pub num_docs: u64,
    /// Average document length in tokens.
    pub avg_len: f32,
    /// Total number of tokens in the collection.
    pub collection_len: u64,
}

/// Per-term statistics needed by the scoring functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermStatistics {
    /// Number of documents containing the term.
    pub doc_freq: u64,
    /// Total occurrences of the term in the collection.
    pub occurrences: u64,
}

/// The per-posting scoring function of one term, for unit query weight.
pub trait TermScorer: Clone {
    fn score(&self, freq: u64, norm_len: f32) -> f32;
}

/// A ranking model; produces one [`TermScorer`] per query term.
pub trait Scorer: Sync {
    type Term: TermScorer;

    fn term_scorer(&self, term: TermStatistics, collection: CollectionStatistics) -> Self::Term;
}

/// Okapi BM25.
#[derive(Debug, Clone, Copy)]
pub struct Bm25 {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25 {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.5 }
    }
}

const EPSILON_SCORE: f32 = 1.0e-6;

impl Scorer for Bm25 {
    type Term = Bm25TermScorer;

    fn term_scorer(&self, term: TermStatistics, collection: CollectionStatistics) -> Self::Term {
        let num_docs = collection.num_docs as f32;
        let doc_freq = term.doc_freq as f32;
        let idf = ((num_docs - doc_freq + 0.5) / (doc_freq + 0.5)).ln();
        Bm25TermScorer {
            weight: idf.max(EPSILON_SCORE) * (1.0 + self.k1),
            k1: self.k1,
            b: self.b,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Bm25TermScorer {
    weight: f32,
    k1: f32,
    b: f32,
}

impl TermScorer for Bm25TermScorer {
    #[inline(always)]
    fn score(&self, freq: u64, norm_len: f32) -> f32 {
        let f = freq as f32;
        self.weight * f / (f + self.k1 * (1.0 - self.b + self.b * norm_len))
    }
}

/// DPH, a parameter-free divergence-from-randomness model.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dph;

impl Scorer for Dph {
    type Term = DphTermScorer;

    fn term_scorer(&self, term: TermStatistics, collection: CollectionStatistics) -> Self::Term {
        DphTermScorer {
            occurrences: term.occurrences.max(1) as f32,
            num_docs: collection.num_docs as f32,
            avg_len: collection.avg_len,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DphTermScorer {
    occurrences: f32,
    num_docs: f32,
    avg_len: f32,
}

impl TermScorer for DphTermScorer {
    fn score(&self, freq: u64, norm_len: f32) -> f32 {
        let freq = freq as f32;
        let len = norm_len * self.avg_len;
        let f = (freq / len).min(1.0 - f32::EPSILON);
        let norm = (1.0 - f) * (1.0 - f) / (freq + 1.0);
        norm
            * (freq * (freq * self.avg_len / len * self.num_docs / self.occurrences).log2()
                + 0.5 * (2.0 * PI * freq * (1.0 - f)).log2())
    }
}

/// PL2, a divergence-from-randomness model with Laplace aftereffect and
/// Poisson randomness.
#[derive(Debug, Clone, Copy)]
pub struct Pl2 {
    pub c: f32,
}

impl Default for Pl2 {
    fn default() -> Self {
        Self { c: 1.0 }
    }
}

impl Scorer for Pl2 {
    type Term = Pl2TermScorer;

    fn term_scorer(&self, term: TermStatistics, collection: CollectionStatistics) -> Self::Term {
        Pl2TermScorer {
            c: self.c,
            lambda: term.occurrences.max(1) as f32 / collection.num_docs as f32,
            avg_len: collection.avg_len,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Pl2TermScorer {
    c: f32,
    lambda: f32,
    avg_len: f32,
}

impl TermScorer for Pl2TermScorer {
    fn score(&self, freq: u64, norm_len: f32) -> f32 {
        let freq = freq as f32;
        let len = norm_len * self.avg_len;
        let tfn = freq * (1.0 + self.c * self.avg_len / len).log2();
        if tfn <= 0.0 {
            return 0.0;
        }
        let norm = 1.0 / (tfn + 1.0);
        norm
            * (tfn * (tfn / self.lambda).log2()
                + (self.lambda - tfn) * E.log2()
                + 0.5 * (2.0 * PI * tfn).log2()
                + E.log2() / (12.0 * tfn))
    }
}

/// Query likelihood with Dirichlet smoothing.
#[derive(Debug, Clone, Copy)]
pub struct Qld {
    pub mu: f32,
}

impl Default for Qld {
    fn default() -> Self {
        Self { mu: 1000.0 }
    }
}

impl Scorer for Qld {
    type Term = QldTermScorer;

    fn term_scorer(&self, term: TermStatistics, collection: CollectionStatistics) -> Self::Term {
        QldTermScorer {
            mu: self.mu,
            collection_prior: term.occurrences.max(1) as f32 / collection.collection_len as f32,
            avg_len: collection.avg_len,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QldTermScorer {
    mu: f32,
    collection_prior: f32,
    avg_len: f32,
}

impl TermScorer for QldTermScorer {
    fn score(&self, freq: u64, norm_len: f32) -> f32 {
        let freq = freq as f32;
        let len = norm_len * self.avg_len;
        (1.0 + freq / (self.mu * self.collection_prior)).ln() + (self.mu / (len + self.mu)).ln()
    }
}

/// Pass-through scorer for indexes whose "frequencies" are precomputed
/// quantized impacts: the stored integer is the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantized;

impl Scorer for Quantized {
    type Term = QuantizedTermScorer;

    fn term_scorer(&self, _term: TermStatistics, _collection: CollectionStatistics) -> Self::Term {
        QuantizedTermScorer
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QuantizedTermScorer;

impl TermScorer for QuantizedTermScorer {
    #[inline(always)]
    fn score(&self, freq: u64, _norm_len: f32) -> f32 {
        freq as f32
    }
}

/// Runtime selection of the scoring model by name, for the tools.
#[derive(Debug, Clone, Copy)]
pub enum ScorerKind {
    Bm25(Bm25),
    Dph(Dph),
    Pl2(Pl2),
    Qld(Qld),
    Quantized(Quantized),
}

impl ScorerKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bm25" => Some(Self::Bm25(Bm25::default())),
            "dph" => Some(Self::Dph(Dph)),
            "pl2" => Some(Self::Pl2(Pl2::default())),
            "qld" => Some(Self::Qld(Qld::default())),
            "quantized" => Some(Self::Quantized(Quantized)),
            _ => None,
        }
    }
}

/// Type-erased term scorer used where static dispatch is impractical.
#[derive(Debug, Clone, Copy)]
pub enum AnyTermScorer {
    Bm25(Bm25TermScorer),
    Dph(DphTermScorer),
    Pl2(Pl2TermScorer),
    Qld(QldTermScorer),
    Quantized(QuantizedTermScorer),
}

impl TermScorer for AnyTermScorer {
    #[inline]
    fn score(&self, freq: u64, norm_len: f32) -> f32 {
        match self {
            AnyTermScorer::Bm25(s) => s.score(freq, norm_len),
            AnyTermScorer::Dph(s) => s.score(freq, norm_len),
            AnyTermScorer::Pl2(s) => s.score(freq, norm_len),
            AnyTermScorer::Qld(s) => s.score(freq, norm_len),
            AnyTermScorer::Quantized(s) => s.score(freq, norm_len),
        }
    }
}

impl Scorer for ScorerKind {
    type Term = AnyTermScorer;

    fn term_scorer(&self, term: TermStatistics, collection: CollectionStatistics) -> Self::Term {
        match self {
            ScorerKind::Bm25(s) => AnyTermScorer::Bm25(s.term_scorer(term, collection)),
            ScorerKind::Dph(s) => AnyTermScorer::Dph(s.term_scorer(term, collection)),
            ScorerKind::Pl2(s) => AnyTermScorer::Pl2(s.term_scorer(term, collection)),
            ScorerKind::Qld(s) => AnyTermScorer::Qld(s.term_scorer(term, collection)),
            ScorerKind::Quantized(s) => AnyTermScorer::Quantized(s.term_scorer(term, collection)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> CollectionStatistics {
        CollectionStatistics {
            num_docs: 1000,
            avg_len: 50.0,
            collection_len: 50_000,
        }
    }

    #[test]
    fn test_bm25_monotone_in_freq() {
        let scorer = Bm25::default().term_scorer(
            TermStatistics {
                doc_freq: 10,
                occurrences: 30,
            },
            collection(),
        );
        let mut prev = 0.0;
        for freq in 1..20 {
            let score = scorer.score(freq, 1.0);
            assert!(score > prev);
            prev = score;
        }
        // longer documents score lower
        assert!(scorer.score(3, 2.0) < scorer.score(3, 0.5));
    }

    #[test]
    fn test_bm25_rare_terms_weigh_more() {
        let rare = Bm25::default().term_scorer(
            TermStatistics {
                doc_freq: 2,
                occurrences: 2,
            },
            collection(),
        );
        let common = Bm25::default().term_scorer(
            TermStatistics {
                doc_freq: 500,
                occurrences: 5000,
            },
            collection(),
        );
        assert!(rare.score(1, 1.0) > common.score(1, 1.0));
    }

    #[test]
    fn test_scorers_are_finite() {
        let term = TermStatistics {
            doc_freq: 10,
            occurrences: 30,
        };
        let coll = collection();
        for freq in [1u64, 2, 5, 100] {
            for norm_len in [0.1f32, 1.0, 3.0] {
                assert!(Bm25::default()
                    .term_scorer(term, coll)
                    .score(freq, norm_len)
                    .is_finite());
                assert!(Dph.term_scorer(term, coll).score(freq, norm_len).is_finite());
                assert!(Pl2::default()
                    .term_scorer(term, coll)
                    .score(freq, norm_len)
                    .is_finite());
                assert!(Qld::default()
                    .term_scorer(term, coll)
                    .score(freq, norm_len)
                    .is_finite());
            }
        }
    }
}
