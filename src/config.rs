/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Global parameters of the encoded formats and build-time tuning knobs.
//!
//! [`GlobalParameters`] is part of the on-disk format: it is serialized in
//! the index header and must match between writer and reader.
//! [`IndexConfig`] only affects how the writer chooses partitions and block
//! boundaries; any choice decodes correctly.

/// Sampling parameters of the succinct sequence representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalParameters {
    /// Log₂ of the zero-run sampling stride of the Elias–Fano high bits.
    pub ef_log_sampling0: u8,
    /// Log₂ of the one sampling stride of the Elias–Fano high bits.
    pub ef_log_sampling1: u8,
    /// Log₂ of the rank-sample stride of the ranked bitmap.
    pub rb_log_rank1_sampling: u8,
    /// Log₂ of the select-sample stride of the ranked bitmap.
    pub rb_log_sampling1: u8,
    /// Log₂ of the partition size of uniformly partitioned sequences.
    pub log_partition_size: u8,
}

impl Default for GlobalParameters {
    fn default() -> Self {
        Self {
            ef_log_sampling0: 9,
            ef_log_sampling1: 8,
            rb_log_rank1_sampling: 9,
            rb_log_sampling1: 8,
            log_partition_size: 7,
        }
    }
}

/// Tuning knobs of the index builder, replacing the environment-variable
/// configuration of older engines with an explicit value threaded through
/// the builders.
#[derive(Debug, Clone, Copy)]
pub struct IndexConfig {
    /// Approximation factor of the partition DP: windows cover costs up to
    /// `cost_lb / eps1`.
    pub eps1: f64,
    /// Geometric growth factor of the DP window ladder.
    pub eps2: f64,
    /// Superblock approximation factor: lists longer than
    /// `fix_cost / eps3` run the DP in parallel per superblock.
    pub eps3: f64,
    /// Fixed cost in bits charged to every partition.
    pub fix_cost: u64,
    /// Number of postings per fixed WAND block.
    pub wand_block_size: u64,
    /// DP approximation factors and fixed cost of variable WAND blocks.
    pub eps1_wand: f32,
    pub eps2_wand: f32,
    pub fixed_cost_wand_partition: f32,
    /// Number of low bits carrying the quantized score in the compressed
    /// WAND channel; quantized scores use `2^quantization_bits − 1` bins.
    pub quantization_bits: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            eps1: 0.03,
            eps2: 0.3,
            eps3: 0.01,
            fix_cost: 64,
            wand_block_size: 64,
            eps1_wand: 0.01,
            eps2_wand: 0.4,
            fixed_cost_wand_partition: 12.0,
            quantization_bits: 8,
        }
    }
}
