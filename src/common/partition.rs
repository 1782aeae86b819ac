//! Source block partitioning.
//!
//! Splits the `t = ceil(F / T)` symbols of an object into `n` blocks using
//! the algorithm of RFC 5052 §9.1: `nb_large` blocks of `a_large` symbols
//! followed by smaller blocks of `a_small` symbols. The transmitter derives
//! `n` from a maximum block length, the receiver takes `n` straight from the
//! OTI, and both end up with identical per-block symbol counts.

use num_integer::{div_ceil, div_floor};

/// Per-object block layout shared by encoder and decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockPartition {
    a_large: u64,
    a_small: u64,
    nb_large: u64,
    nb_blocks: u64,
}

impl BlockPartition {
    /// Partition `total_symbols` into `nb_blocks` blocks.
    pub fn new(total_symbols: u64, nb_blocks: u64) -> BlockPartition {
        if total_symbols == 0 || nb_blocks == 0 {
            return BlockPartition {
                a_large: 0,
                a_small: 0,
                nb_large: 0,
                nb_blocks: 0,
            };
        }

        let a_large = div_ceil(total_symbols, nb_blocks);
        let a_small = div_floor(total_symbols, nb_blocks);
        let nb_large = total_symbols - a_small * nb_blocks;

        BlockPartition {
            a_large,
            a_small,
            nb_large,
            nb_blocks,
        }
    }

    /// Number of source blocks.
    pub fn nb_blocks(&self) -> u64 {
        self.nb_blocks
    }

    /// Number of source symbols in block `sbn`.
    pub fn symbols(&self, sbn: u32) -> u64 {
        if (sbn as u64) < self.nb_large {
            self.a_large
        } else {
            self.a_small
        }
    }

    /// Byte offset of block `sbn` within the object.
    pub fn offset(&self, sbn: u32, symbol_size: u64) -> u64 {
        let sbn = sbn as u64;
        let large = sbn.min(self.nb_large);
        let small = sbn - large;
        large * self.a_large * symbol_size + small * self.a_small * symbol_size
    }

    /// Number of object bytes covered by block `sbn`. The final symbol of
    /// the final block is usually shorter than the symbol size; the encoder
    /// pads it, the decoder truncates it back using this length.
    pub fn bytes(&self, sbn: u32, transfer_length: u64, symbol_size: u64) -> u64 {
        let offset = self.offset(sbn, symbol_size);
        if offset >= transfer_length {
            return 0;
        }
        (transfer_length - offset).min(self.symbols(sbn) * symbol_size)
    }
}
