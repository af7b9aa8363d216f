/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{Context, Result};
use clap::Parser;
use efsearch::index::INDEX_TYPES;
use efsearch::intersection::Intersection;
use efsearch::mapper::load_words;
use efsearch::query::parse_queries;
use efsearch::scorer::ScorerKind;
use efsearch::wand::{WandData, WandDataRaw};
use efsearch::with_index_type;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    about = "Computes the length and maximal score of term-subset intersections",
    long_about = "For each query, enumerates term subsets (whole query only, or every subset \
                  up to --combinations terms) and reports the intersection length and the \
                  maximal sum of scores: the statistics the posting-list selection planner \
                  consumes."
)]
struct Args {
    /// Index type
    #[arg(short = 't', long = "type", value_parser = clap::builder::PossibleValuesParser::new(INDEX_TYPES))]
    type_name: String,

    /// Index filename
    #[arg(short, long)]
    index: PathBuf,

    /// WAND data filename (raw variant)
    #[arg(short, long)]
    wand: PathBuf,

    /// Queries filename (default: standard input)
    #[arg(short, long)]
    queries: Option<PathBuf>,

    /// Enumerate all subsets of at most this many terms
    #[arg(long)]
    combinations: Option<u32>,

    /// Scoring model
    #[arg(short, long, default_value = "bm25")]
    scorer: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let input = match &args.queries {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin())?,
    };
    let queries = parse_queries(&input)?;
    let scorer = ScorerKind::from_name(&args.scorer)
        .with_context(|| format!("unknown scorer {}", args.scorer))?;

    let index_words = load_words(&args.index)?;
    let wand_words = load_words(&args.wand)?;

    let mut out = std::io::BufWriter::new(std::io::stdout());
    with_index_type!(args.type_name.as_str(), &index_words, |index| {
        let wand = WandData::<WandDataRaw>::parse(&wand_words)?;
        for (position, query) in queries.iter().enumerate() {
            let qid = query
                .id
                .clone()
                .unwrap_or_else(|| position.to_string());
            match args.combinations {
                Some(max_terms) => {
                    if query.terms.len() > 20 {
                        log::error!("query {}: too many terms to enumerate subsets", qid);
                        continue;
                    }
                    for subset in 1u64..1 << query.terms.len() {
                        if subset.count_ones() > max_terms {
                            continue;
                        }
                        let stats = Intersection::compute(
                            &index,
                            &wand,
                            &scorer,
                            &query.terms,
                            Some(subset),
                        )?;
                        writeln!(
                            out,
                            "{}\t{}\t{}\t{}",
                            qid, subset, stats.length, stats.max_score
                        )?;
                    }
                }
                None => {
                    let stats =
                        Intersection::compute(&index, &wand, &scorer, &query.terms, None)?;
                    writeln!(out, "{}\t{}\t{}", qid, stats.length, stats.max_score)?;
                }
            }
        }
    });
    out.flush()?;
    Ok(())
}
