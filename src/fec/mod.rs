//! Per-block RaptorQ engine.
//!
//! Each source block is encoded and decoded as a standalone single-block
//! RaptorQ object of `K · T` bytes; the object-level layout above it comes
//! from the block partition. Wire ESIs are the payload identifiers produced
//! by the codec, so tags round-trip exactly between the two sides.

use crate::common::oti::Oti;

use std::collections::BTreeMap;

/// Outcome of feeding one symbol to a [`BlockDecoder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolStatus {
    /// New symbol, stored.
    Added,
    /// Symbol with this ESI was already stored, nothing changed.
    Duplicate,
    /// Malformed symbol, dropped.
    Error,
}

fn block_config(oti: &Oti, nb_source_symbols: u64) -> raptorq::ObjectTransmissionInformation {
    raptorq::ObjectTransmissionInformation::new(
        nb_source_symbols * oti.encoding_symbol_length as u64,
        oti.encoding_symbol_length,
        1,
        oti.sub_blocks,
        oti.symbol_alignment,
    )
}

/// Fountain encoder for one source block.
///
/// The K source packets are generated up front; repair packets are derived
/// on demand, one per call, so a carousel can run indefinitely without
/// holding more than the intermediate symbols in memory.
pub struct BlockEncoder {
    nb_source_symbols: u32,
    encoder: raptorq::SourceBlockEncoder,
    source_packets: Vec<raptorq::EncodingPacket>,
}

impl BlockEncoder {
    /// Build the encoder for block `sbn` over `data`, padding the final
    /// symbol up to the symbol length.
    pub fn new(sbn: u8, oti: &Oti, data: &[u8]) -> BlockEncoder {
        let symbol_size = oti.encoding_symbol_length as usize;
        let nb_source_symbols = num_integer::div_ceil(data.len(), symbol_size);

        let mut padded = data.to_vec();
        padded.resize(nb_source_symbols * symbol_size, 0);

        let config = block_config(oti, nb_source_symbols as u64);
        let encoder = raptorq::SourceBlockEncoder::new(sbn, &config, &padded);
        let source_packets = encoder.source_packets();

        BlockEncoder {
            nb_source_symbols: nb_source_symbols as u32,
            encoder,
            source_packets,
        }
    }

    /// Number of source symbols K of this block.
    pub fn nb_source_symbols(&self) -> u32 {
        self.nb_source_symbols
    }

    /// The `index`-th encoding packet of the block: the source symbols in
    /// order, then an endless run of repair symbols. Returns the wire ESI
    /// together with the symbol payload.
    pub fn symbol(&self, index: u32) -> (u32, Vec<u8>) {
        if index < self.nb_source_symbols {
            let pkt = &self.source_packets[index as usize];
            (pkt.payload_id().encoding_symbol_id(), pkt.data().to_vec())
        } else {
            let pkt = self
                .encoder
                .repair_packets(index - self.nb_source_symbols, 1)
                .remove(0);
            (pkt.payload_id().encoding_symbol_id(), pkt.data().to_vec())
        }
    }
}

impl std::fmt::Debug for BlockEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockEncoder")
            .field("nb_source_symbols", &self.nb_source_symbols)
            .finish()
    }
}

/// Fountain decoder for one source block.
///
/// Symbols accumulate in an ESI-keyed shard store; duplicates never touch
/// the store, so re-fed frames are harmless. Once at least K shards are
/// present a decode is attempted; on failure the shards are kept and the
/// decode retried as further symbols arrive.
pub struct BlockDecoder {
    sbn: u8,
    config: raptorq::ObjectTransmissionInformation,
    nb_source_symbols: u32,
    shards: BTreeMap<u32, Vec<u8>>,
    data: Option<Vec<u8>>,
    completed: bool,
}

impl BlockDecoder {
    /// Decoder for block `sbn` of `nb_source_symbols` symbols.
    pub fn new(sbn: u8, oti: &Oti, nb_source_symbols: u32) -> BlockDecoder {
        BlockDecoder {
            sbn,
            config: block_config(oti, nb_source_symbols as u64),
            nb_source_symbols,
            shards: BTreeMap::new(),
            data: None,
            completed: false,
        }
    }

    /// Whether the block has been fully decoded.
    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Symbols stored so far.
    pub fn nb_symbols(&self) -> u32 {
        self.shards.len() as u32
    }

    /// Store one symbol.
    pub fn push(&mut self, esi: u32, symbol: &[u8]) -> SymbolStatus {
        if self.completed {
            return SymbolStatus::Duplicate;
        }
        if symbol.len() != self.config.symbol_size() as usize {
            log::warn!(
                "sbn {} esi {}: symbol of {} bytes, expected {}",
                self.sbn,
                esi,
                symbol.len(),
                self.config.symbol_size()
            );
            return SymbolStatus::Error;
        }

        if self.shards.contains_key(&esi) {
            log::debug!("sbn/esi {}/{} already received", self.sbn, esi);
            return SymbolStatus::Duplicate;
        }

        self.shards.insert(esi, symbol.to_vec());
        SymbolStatus::Added
    }

    /// Whether enough symbols are stored for a decode attempt.
    pub fn can_decode(&self) -> bool {
        self.shards.len() as u32 >= self.nb_source_symbols
    }

    /// Run the codec over the stored shards. Returns true when the block
    /// decoded; the shards are then released and the block data retained
    /// until taken by the writer.
    pub fn try_decode(&mut self) -> bool {
        if self.completed {
            return true;
        }

        let block_length = self.nb_source_symbols as u64 * self.config.symbol_size() as u64;
        let mut decoder = raptorq::SourceBlockDecoder::new(self.sbn, &self.config, block_length);

        let packets = self.shards.iter().map(|(esi, shard)| {
            raptorq::EncodingPacket::new(raptorq::PayloadId::new(self.sbn, *esi), shard.clone())
        });

        match decoder.decode(packets) {
            Some(data) => {
                self.data = Some(data);
                self.completed = true;
                self.shards.clear();
                true
            }
            None => {
                log::debug!(
                    "sbn {}: decode failed with {} symbols, waiting for more",
                    self.sbn,
                    self.shards.len()
                );
                false
            }
        }
    }

    /// Take the decoded block data.
    pub fn take_data(&mut self) -> Option<Vec<u8>> {
        self.data.take()
    }
}

impl std::fmt::Debug for BlockDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockDecoder")
            .field("sbn", &self.sbn)
            .field("nb_source_symbols", &self.nb_source_symbols)
            .field("nb_shards", &self.shards.len())
            .field("completed", &self.completed)
            .finish()
    }
}
