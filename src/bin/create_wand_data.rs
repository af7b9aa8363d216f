/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{Context, Result};
use clap::Parser;
use efsearch::collection::{read_sizes, BinaryFreqCollection};
use efsearch::config::{GlobalParameters, IndexConfig};
use efsearch::scorer::ScorerKind;
use efsearch::wand::{build_wand_data_compressed, build_wand_data_raw, BlockPartition};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Builds WAND data (score upper bounds) for a collection", long_about = None)]
struct Args {
    /// Collection basename (expects .docs, .freqs and .sizes)
    #[arg(short, long)]
    collection: PathBuf,

    /// Output filename
    #[arg(short, long)]
    output: PathBuf,

    /// Scoring model
    #[arg(short, long, default_value = "bm25")]
    scorer: String,

    /// Use the score-aware variable block partitioning
    #[arg(long)]
    variable_blocks: bool,

    /// Fixed block size in postings
    #[arg(short, long)]
    block_size: Option<u64>,

    /// Quantize block maxima and compress the block channel
    #[arg(long)]
    compress: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let collection = BinaryFreqCollection::open(&args.collection)
        .with_context(|| format!("cannot open collection {}", args.collection.display()))?;
    let sizes = read_sizes(&args.collection, collection.num_docs())?;
    let scorer = ScorerKind::from_name(&args.scorer)
        .with_context(|| format!("unknown scorer {}", args.scorer))?;

    let params = GlobalParameters::default();
    let mut config = IndexConfig::default();
    if let Some(block_size) = args.block_size {
        config.wand_block_size = block_size;
    }
    let partition = if args.variable_blocks {
        BlockPartition::Variable
    } else {
        BlockPartition::Fixed
    };

    let sink = if args.compress {
        build_wand_data_compressed(&collection, &sizes, &scorer, partition, &config, &params)?
    } else {
        build_wand_data_raw(&collection, &sizes, &scorer, partition, &config, &params)?
    };
    sink.store(&args.output)
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    Ok(())
}
