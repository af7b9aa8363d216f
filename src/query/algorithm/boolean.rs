/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::index::PostingCursor;

/// Unscored conjunction: the shortest list drives, the others are
/// probed with `next_geq`, restarting the probe on every mismatch.
/// Returns the matching documents.
///
/// `with_freqs` additionally touches every frequency, so that benchmark
/// runs measure frequency decoding too.
pub fn and_query<C: PostingCursor>(
    cursors: &mut Vec<C>,
    max_docid: u64,
    with_freqs: bool,
) -> Vec<u64> {
    if cursors.is_empty() {
        return Vec::new();
    }
    // sort by increasing length
    cursors.sort_by_key(|cursor| cursor.size());

    let mut results = Vec::new();
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

        results.push(candidate);
        if with_freqs {
            for cursor in cursors.iter_mut() {
                std::hint::black_box(cursor.freq());
            }
        }
        cursors[0].next();
        candidate = cursors[0].docid();
        i = 1;
    }
    results
}

/// Unscored disjunction: repeatedly emits the minimum document across
/// the cursors and advances every cursor positioned on it.
pub fn or_query<C: PostingCursor>(
    cursors: &mut [C],
    max_docid: u64,
    with_freqs: bool,
) -> Vec<u64> {
    if cursors.is_empty() {
        return Vec::new();
    }
    let mut results = Vec::new();
    let mut cur_doc = cursors.iter().map(|c| c.docid()).min().unwrap_or(max_docid);

    while cur_doc < max_docid {
        results.push(cur_doc);
        let mut next_doc = max_docid;
        for cursor in cursors.iter_mut() {
            if cursor.docid() == cur_doc {
                if with_freqs {
                    std::hint::black_box(cursor.freq());
                }
                cursor.next();
            }
            if cursor.docid() < next_doc {
                next_doc = cursor.docid();
            }
        }
        cur_doc = next_doc;
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::algorithm::tests::vec_cursors;

    #[test]
    fn test_and_or() {
        let lists: Vec<Vec<(u64, u64)>> = vec![
            vec![(1, 1), (3, 1), (5, 1), (8, 1)],
            vec![(3, 1), (5, 1), (9, 1)],
            vec![(0, 1), (3, 1), (5, 1), (8, 1), (9, 1)],
        ];
        let mut cursors = vec_cursors(&lists, 20);
        assert_eq!(and_query(&mut cursors, 20, true), vec![3, 5]);

        let mut cursors = vec_cursors(&lists, 20);
        assert_eq!(or_query(&mut cursors, 20, false), vec![0, 1, 3, 5, 8, 9]);
    }
}
