/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::cursor::{make_max_scored_cursors, LookupTransform, ScoredPostingCursor};
use crate::index::{PostingCursor, PostingIndex};
use crate::intersection::BigramIndex;
use crate::query::{query_freqs, TopKQueue};
use crate::scorer::Scorer;
use crate::wand::{WandData, WandDataVariant};
use crate::TermId;
use anyhow::{Context, Result};

/// A precomputed per-query selection: which terms stay essential and
/// which two-term intersections were materialized for the rest.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub selected_terms: Vec<TermId>,
    pub selected_pairs: Vec<(TermId, TermId)>,
}

/// Selection-aware MaxScore: the candidate stream is the union of the
/// essential unigram cursors and the materialized bigram cursors; every
/// candidate is completed by lookups into the non-essential unigram
/// cursors under the usual `would_enter(score + UB)` short circuit.
///
/// A selected pair missing from the bigram index is an error scoped to
/// this query.
pub fn maxscore_inter_query<'a, I, V, S>(
    index: &I,
    wand: &WandData<'a, V>,
    scorer: &S,
    query_terms: &[TermId],
    selection: &Selection,
    bigrams: &BigramIndex,
    topk: &mut TopKQueue,
) -> Result<()>
where
    I: PostingIndex<'a>,
    V: WandDataVariant<'a>,
    S: Scorer,
{
    let max_docid = index.num_docs();
    let term_freqs = query_freqs(query_terms);

    let essential_terms: Vec<(TermId, u64)> = term_freqs
        .iter()
        .copied()
        .filter(|(term, _)| selection.selected_terms.contains(term))
        .collect();
    let non_essential_terms: Vec<(TermId, u64)> = term_freqs
        .iter()
        .copied()
        .filter(|(term, _)| !selection.selected_terms.contains(term))
        .collect();

    let mut essential = make_max_scored_cursors(index, wand, scorer, &essential_terms)?;
    let mut lookups = LookupTransform::new(make_max_scored_cursors(
        index,
        wand,
        scorer,
        &non_essential_terms,
    )?);

    // one bigram cursor per selected pair, each with lookups into the
    // non-essential terms outside the pair
    let mut bigram_cursors = Vec::with_capacity(selection.selected_pairs.len());
    for &(left, right) in &selection.selected_pairs {
        let cursor = bigrams
            .cursor(left, right)
            .with_context(|| format!("pair <{}, {}> not in the bigram index", left, right))?;
        let others: Vec<(TermId, u64)> = non_essential_terms
            .iter()
            .copied()
            .filter(|&(term, _)| term != left && term != right)
            .collect();
        let transform =
            LookupTransform::new(make_max_scored_cursors(index, wand, scorer, &others)?);
        bigram_cursors.push((cursor, transform));
    }

    loop {
        let mut cur_doc = essential
            .iter()
            .map(|c| c.docid())
            .min()
            .unwrap_or(max_docid);
        for (cursor, _) in bigram_cursors.iter() {
            cur_doc = cur_doc.min(cursor.docid());
        }
        if cur_doc >= max_docid {
            break;
        }

        let mut essential_score = None;
        for cursor in essential.iter_mut() {
            if cursor.docid() == cur_doc {
                *essential_score.get_or_insert(0.0) += cursor.score();
                cursor.next();
            }
        }

        match essential_score {
            Some(base) => {
                // unigram candidate: look up every non-essential term
                let score =
                    lookups.apply(cur_doc, base, |bound| topk.would_enter(bound));
                topk.insert(score, cur_doc);
                for (cursor, _) in bigram_cursors.iter_mut() {
                    if cursor.docid() == cur_doc {
                        cursor.next();
                    }
                }
            }
            None => {
                // only bigram cursors are here; the first one computes
                // the full score, the rest just advance
                let mut inserted = false;
                for (cursor, transform) in bigram_cursors.iter_mut() {
                    if cursor.docid() != cur_doc {
                        continue;
                    }
                    if !inserted {
                        let base = cursor.score();
                        let score =
                            transform.apply(cur_doc, base, |bound| topk.would_enter(bound));
                        topk.insert(score, cur_doc);
                        inserted = true;
                    }
                    cursor.next();
                }
            }
        }
    }

    topk.finalize();
    Ok(())
}
