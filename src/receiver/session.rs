//! Receive session: one object being reconstructed from inbound symbols.

use super::writer::{output_path, BlockWriter};
use crate::common::frame::FrameParams;
use crate::common::oti::{Oti, MAX_TRANSFER_LENGTH};
use crate::fec::{BlockDecoder, SymbolStatus};
use crate::tools::error::{Result, RqcastError};

use std::path::Path;

///
/// Decoder state of the object currently being received, keyed by its OTI
/// word pair. Blocks decode independently and are committed to the output
/// file in order.
///
pub struct RxSession {
    words: (u64, u32),
    blocks: Vec<BlockDecoder>,
    writer: BlockWriter,
}

impl RxSession {
    /// Start a session for the object described by the OTI words of an
    /// inbound frame. Creates the output file immediately; every error
    /// path abandons the partial state so a later frame can retry.
    pub fn start(rx_dir: &Path, params: &FrameParams, common: u64, scheme: u32) -> Result<RxSession> {
        let oti = Oti::from_words(common, scheme);

        if oti.encoding_symbol_length != params.symbol_size {
            return Err(RqcastError::new(format!(
                "RX: symbol size {} of inbound OTI does not match mode ({} expected)",
                oti.encoding_symbol_length, params.symbol_size
            )));
        }
        if oti.transfer_length == 0 || oti.transfer_length > MAX_TRANSFER_LENGTH {
            return Err(RqcastError::new(format!(
                "RX: implausible transfer length {}",
                oti.transfer_length
            )));
        }
        if oti.source_blocks == 0 {
            return Err(RqcastError::new("RX: OTI with zero source blocks"));
        }

        let partition = oti.partition();
        if partition.nb_blocks() != oti.source_blocks as u64 {
            return Err(RqcastError::new(format!(
                "RX: OTI block count {} does not match transfer length",
                oti.source_blocks
            )));
        }

        let blocks = (0..oti.source_blocks as u32)
            .map(|sbn| BlockDecoder::new(sbn as u8, &oti, partition.symbols(sbn) as u32))
            .collect();

        let writer = BlockWriter::create(output_path(rx_dir)?, oti.transfer_length)?;
        log::info!(
            "RX: new session -> {:?} (blocks={})",
            writer.path(),
            oti.source_blocks
        );

        Ok(RxSession {
            words: (common, scheme),
            blocks,
            writer,
        })
    }

    /// Identity of the object this session is reconstructing.
    pub fn oti_words(&self) -> (u64, u32) {
        self.words
    }

    /// Output file of this session.
    pub fn out_path(&self) -> &Path {
        self.writer.path()
    }

    /// Number of source blocks.
    pub fn nb_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Absorb one symbol. Returns true once the whole object has been
    /// decoded and written out.
    pub fn push(&mut self, sbn: u8, esi: u32, symbol: &[u8]) -> Result<bool> {
        let Some(block) = self.blocks.get_mut(sbn as usize) else {
            log::warn!(
                "RX: sbn {} outside the {} blocks of this object",
                sbn,
                self.blocks.len()
            );
            return Ok(false);
        };

        match block.push(esi, symbol) {
            SymbolStatus::Added => {}
            SymbolStatus::Duplicate | SymbolStatus::Error => return Ok(false),
        }

        if !block.completed() && block.can_decode() {
            let symbols_seen = block.nb_symbols();
            if block.try_decode() {
                log::debug!("RX: block {} decoded from {} symbols", sbn, symbols_seen);
                self.writer.push_blocks(&mut self.blocks)?;
            }
        }

        Ok(self.writer.is_completed())
    }

    /// Number of blocks decoded so far, for progress logging.
    pub fn blocks_decoded(&self) -> usize {
        self.blocks.iter().filter(|block| block.completed()).count()
    }
}

impl std::fmt::Debug for RxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RxSession")
            .field("out_path", &self.writer.path())
            .field("blocks", &self.blocks.len())
            .finish()
    }
}
