/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{Context, Result};
use mmap_rs::{Mmap, MmapFlags, MmapOptions};
use std::{mem::size_of, path::Path, sync::Arc};

/// A read-only memory mapping with typed `&[W]` access.
///
/// The parameter `W` defines the granularity at which the mapping is
/// accessed; index and collection files are streams of little-endian words,
/// so `W` is `u32` for binary collections and `u64` for frozen index blobs.
///
/// If the length of the file is not a multiple of the size of `W`, the
/// mapping is zero-extended to the smallest length that is a multiple of
/// the size of `W`: serializers in this crate always pad their output, so
/// the extension is never observable.
///
/// The mapping is reference-counted: cloning an [`MmapHelper`] is cheap and
/// the clones share the same pages, which is how a frozen index is shared
/// among query threads.
#[derive(Clone)]
pub struct MmapHelper<W> {
    mmap: Arc<Mmap>,
    /// The length of the mapping in `W`'s.
    len: usize,
    _marker: core::marker::PhantomData<W>,
}

impl<W> core::fmt::Debug for MmapHelper<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MmapHelper")
            .field("mmap", &self.mmap.as_ptr())
            .field("len", &self.len)
            .finish()
    }
}

impl<W> MmapHelper<W> {
    /// Returns the size of the memory mapping in `W`'s.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the memory mapping is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maps a file into memory (read-only).
    pub fn mmap(path: impl AsRef<Path>, flags: MmapFlags) -> Result<Self> {
        let file_len: usize = path
            .as_ref()
            .metadata()
            .with_context(|| format!("Cannot stat {}", path.as_ref().display()))?
            .len()
            .try_into()
            .context("Cannot convert file length to usize")?;
        let mmap_len = file_len.div_ceil(size_of::<W>()) * size_of::<W>();

        let file = std::fs::File::open(path.as_ref())
            .with_context(|| format!("Cannot open {}", path.as_ref().display()))?;

        let mmap = unsafe {
            // Length must be > 0, or mmap will panic.
            MmapOptions::new(mmap_len.max(size_of::<W>()))
                .context("Cannot initialize mmap")?
                .with_flags(flags)
                .with_file(&file, 0)
                .map()
                .with_context(|| format!("Cannot mmap {}", path.as_ref().display()))?
        };

        Ok(Self {
            len: mmap_len / size_of::<W>(),
            mmap: Arc::new(mmap),
            _marker: core::marker::PhantomData,
        })
    }
}

impl<W> AsRef<[W]> for MmapHelper<W> {
    #[inline(always)]
    fn as_ref(&self) -> &[W] {
        unsafe {
            // Alignment: mmap pages are page-aligned, which is stricter
            // than any word alignment we use.
            std::slice::from_raw_parts(self.mmap.as_ptr() as *const W, self.len)
        }
    }
}
