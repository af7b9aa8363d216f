/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::cursor::ScoredPostingCursor;
use crate::query::TopKQueue;

/// Exhaustive ranked disjunction: scores every document of the union.
/// This is the reference the pruned operators are checked against.
pub fn ranked_or_query<C: ScoredPostingCursor>(
    cursors: &mut [C],
    max_docid: u64,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        topk.finalize();
        return;
    }

    let mut cur_doc = cursors.iter().map(|c| c.docid()).min().unwrap_or(max_docid);
    while cur_doc < max_docid {
        let mut score = 0.0;
        let mut next_doc = max_docid;
        for cursor in cursors.iter_mut() {
            if cursor.docid() == cur_doc {
                score += cursor.score();
                cursor.next();
            }
            if cursor.docid() < next_doc {
                next_doc = cursor.docid();
            }
        }

        topk.insert(score, cur_doc);
        cur_doc = next_doc;
    }

    topk.finalize();
}

/// Ranked conjunction: the AND candidate loop with full scoring of
/// every match.
pub fn ranked_and_query<C: ScoredPostingCursor>(
    cursors: &mut Vec<C>,
    max_docid: u64,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        topk.finalize();
        return;
    }
    // sort by increasing length
    cursors.sort_by_key(|cursor| cursor.size());

    let mut candidate = cursors[0].docid();
    let mut i = 1;
    'candidates: while candidate < max_docid {
        while i < cursors.len() {
            cursors[i].next_geq(candidate);
            if cursors[i].docid() != candidate {
                candidate = cursors[i].docid();
                i = 0;
                continue 'candidates;
            }
            i += 1;
        }

        let mut score = 0.0;
        for cursor in cursors.iter_mut() {
            score += cursor.score();
        }
        topk.insert(score, candidate);

        cursors[0].next();
        candidate = cursors[0].docid();
        i = 1;
    }

    topk.finalize();
}
