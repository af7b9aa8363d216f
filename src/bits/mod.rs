/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Bit-level building blocks: a growable bit vector with word-level access,
//! unary enumeration with broadword selection, γ/δ codes, and the 32-bit
//! little-endian bit stream used by binary interpolative coding.

mod bit_stream;
mod bit_vector;
mod codes;

pub use bit_stream::{BitReader, BitWriter};
pub use bit_vector::{BitEnumerator, BitVector, BitVectorBuilder, BitsRef, UnaryEnumerator};
pub use codes::{
    read_delta, read_gamma, read_gamma_nonzero, write_delta, write_gamma, write_gamma_nonzero,
};
