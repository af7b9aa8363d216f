/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Query parsing, the top-k queue, and the document-at-a-time
//! operators.

pub mod algorithm;
mod topk_queue;

pub use algorithm::*;
pub use topk_queue::TopKQueue;

use crate::TermId;
use anyhow::{ensure, Context, Result};
use itertools::Itertools;
use std::io::Write;

/// A parsed query: an optional identifier and its term IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub id: Option<String>,
    pub terms: Vec<TermId>,
}

/// Parses one query line: space-separated term IDs, optionally preceded
/// by a query identifier and a colon.
pub fn parse_query(line: &str) -> Result<Query> {
    let (id, rest) = match line.split_once(':') {
        Some((id, rest)) => (Some(id.trim().to_string()), rest),
        None => (None, line),
    };
    let terms = rest
        .split_whitespace()
        .map(|token| {
            token
                .parse::<TermId>()
                .with_context(|| format!("cannot parse term id {:?}", token))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Query { id, terms })
}

/// Parses one query per line, skipping blank lines.
pub fn parse_queries(input: &str) -> Result<Vec<Query>> {
    input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_query)
        .collect()
}

/// Deduplicates query terms into `(term, multiplicity)` pairs, sorted
/// by term ID.
pub fn query_freqs(terms: &[TermId]) -> Vec<(TermId, u64)> {
    let mut terms = terms.to_vec();
    terms.sort_unstable();
    terms
        .into_iter()
        .dedup_with_count()
        .map(|(count, term)| (term, count as u64))
        .collect()
}

/// Parses one selection line for a query: space-separated integer
/// bitmasks over the query's term positions. A mask with one bit set
/// selects an essential unigram, one with two bits a materialized pair;
/// wider masks are not supported.
pub fn parse_selection(line: &str, terms: &[TermId]) -> Result<Selection> {
    let mut selection = Selection::default();
    for token in line.split_whitespace() {
        let mask: u64 = token
            .parse()
            .with_context(|| format!("cannot parse intersection mask {:?}", token))?;
        ensure!(mask != 0, "empty intersection mask");
        ensure!(
            mask.count_ones() <= 2,
            "intersections of more than 2 terms are not supported"
        );
        let positions: Vec<usize> = (0..64).filter(|&i| mask >> i & 1 == 1).collect();
        for &position in &positions {
            ensure!(
                position < terms.len(),
                "selection bit {} beyond the query length",
                position
            );
        }
        match positions.as_slice() {
            [single] => selection.selected_terms.push(terms[*single]),
            [left, right] => selection.selected_pairs.push((terms[*left], terms[*right])),
            _ => unreachable!(),
        }
    }
    Ok(selection)
}

/// Writes ranked results in TREC run format:
/// `qid \t iter \t docid \t rank \t score \t run_id`, rank from zero.
pub fn write_trec_run(
    out: &mut impl Write,
    query_id: &str,
    results: &[(f32, u64)],
    run_id: &str,
) -> Result<()> {
    for (rank, &(score, docid)) in results.iter().enumerate() {
        writeln!(out, "{}\tQ0\t{}\t{}\t{}\t{}", query_id, docid, rank, score, run_id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        assert_eq!(
            parse_query("3 17 3 9").unwrap(),
            Query {
                id: None,
                terms: vec![3, 17, 3, 9]
            }
        );
        assert_eq!(
            parse_query("q7: 1 2").unwrap(),
            Query {
                id: Some("q7".to_string()),
                terms: vec![1, 2]
            }
        );
        assert!(parse_query("1 foo").is_err());
    }

    #[test]
    fn test_query_freqs() {
        assert_eq!(query_freqs(&[5, 3, 5, 5, 1]), vec![(1, 1), (3, 1), (5, 3)]);
    }

    #[test]
    fn test_parse_selection() {
        let terms = [7u64, 3, 9];
        let selection = parse_selection("1 6", &terms).unwrap();
        assert_eq!(selection.selected_terms, vec![7]);
        assert_eq!(selection.selected_pairs, vec![(3, 9)]);
        assert!(parse_selection("7", &terms).is_err()); // three bits
        assert!(parse_selection("8", &terms).is_err()); // beyond the query
    }

    #[test]
    fn test_trec_output() {
        let mut out = Vec::new();
        write_trec_run(&mut out, "q1", &[(1.5, 42), (0.75, 7)], "test").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "q1\tQ0\t42\t0\t1.5\ttest\nq1\tQ0\t7\t1\t0.75\ttest\n");
    }
}
