//! Joint configuration+payload frame codec.
//!
//! Every frame is exactly the modem payload size W of the selected mode and
//! fuses the RaptorQ OTI with one encoding symbol:
//!
//! | offset | size   | field                                     |
//! |--------|--------|-------------------------------------------|
//! | 0      | 1      | packet type (bits 7..6), CRC-6 (bits 5..0)|
//! | 1      | 8      | reduced OTI body                          |
//! | 9      | 3      | tag: SBN, then ESI little-endian          |
//! | 12     | W − 12 | encoding symbol                           |
//!
//! Carrying the OTI in-band means a receiver can start decoding from any
//! frame, without a handshake.

use crate::common::crc6::crc6_0x6f;
use crate::common::oti::{Oti, REDUCED_BODY_SIZE};
use crate::tools::error::{Result, RqcastError};

/// Modem payload size per mode, in bytes.
///
/// Mode 0: DATAC1, 1: DATAC3, 2: DATAC0, 3: DATAC4, 4: DATAC13,
/// 5: DATAC14, 6: FSK_LDPC.
pub const MODEM_FRAME_SIZES: [usize; 7] = [510, 126, 14, 54, 14, 3, 30];

/// Header byte.
pub const HEADER_SIZE: usize = 1;
/// SBN + 16-bit ESI.
pub const TAG_SIZE: usize = 3;
/// Bytes of every frame not carrying symbol payload.
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + REDUCED_BODY_SIZE + TAG_SIZE;

/// Largest ESI that fits the 16-bit wire tag.
pub const MAX_ESI: u32 = 65_535;

const CRC_SEED: u8 = 1;

///
/// Code occupying the two high bits of the header byte.
///
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketType {
    /// Unframed modem data.
    Raw = 0,
    /// UUCP tunnel traffic.
    Uucp = 1,
    /// Joint OTI + symbol frame; the only type this daemon emits.
    RqConfig = 2,
    /// Symbol-only side information, logged and skipped on receive.
    RqPayload = 3,
}

impl From<u8> for PacketType {
    fn from(v: u8) -> Self {
        match v & 0x3 {
            0 => PacketType::Raw,
            1 => PacketType::Uucp,
            2 => PacketType::RqConfig,
            _ => PacketType::RqPayload,
        }
    }
}

///
/// Frame geometry of one modem mode.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameParams {
    /// Modem mode, 0..6.
    pub mode: u8,
    /// Total frame size W.
    pub frame_size: usize,
    /// Symbol payload size T = W − 12.
    pub symbol_size: u16,
}

impl FrameParams {
    /// Look up the frame geometry of `mode`.
    ///
    /// Modes whose payload cannot hold the header, OTI and tag are
    /// rejected (mode 5 at 3 bytes).
    pub fn new(mode: u8) -> Result<FrameParams> {
        let frame_size = *MODEM_FRAME_SIZES
            .get(mode as usize)
            .ok_or_else(|| RqcastError::new(format!("invalid mode {}", mode)))?;

        if frame_size <= FRAME_OVERHEAD {
            return Err(RqcastError::new(format!(
                "mode {} frame of {} bytes is too small for a joint configuration+payload frame",
                mode, frame_size
            )));
        }

        Ok(FrameParams {
            mode,
            frame_size,
            symbol_size: (frame_size - FRAME_OVERHEAD) as u16,
        })
    }
}

/// Assemble an RQ_CONFIG frame. The header byte is written last, with the
/// CRC-6 of bytes [1..W) in its low bits.
pub fn build_config_frame(
    params: &FrameParams,
    oti_body: &[u8; REDUCED_BODY_SIZE],
    sbn: u8,
    esi: u16,
    symbol: &[u8],
) -> Vec<u8> {
    debug_assert_eq!(symbol.len(), params.symbol_size as usize);

    let mut frame = vec![0u8; params.frame_size];
    frame[HEADER_SIZE..HEADER_SIZE + REDUCED_BODY_SIZE].copy_from_slice(oti_body);
    frame[9] = sbn;
    frame[10..12].copy_from_slice(&esi.to_le_bytes());
    frame[FRAME_OVERHEAD..].copy_from_slice(symbol);

    frame[0] = (PacketType::RqConfig as u8) << 6;
    frame[0] |= crc6_0x6f(CRC_SEED, &frame[HEADER_SIZE..]);
    frame
}

/// Packet type of a frame.
pub fn packet_type(frame: &[u8]) -> PacketType {
    PacketType::from((frame[0] >> 6) & 0x3)
}

/// Check the stored CRC-6 against bytes [1..W).
pub fn verify_crc(frame: &[u8]) -> bool {
    frame[0] & 0x3f == crc6_0x6f(CRC_SEED, &frame[HEADER_SIZE..])
}

/// OTI word pair of an RQ_CONFIG frame.
pub fn parse_oti_words(frame: &[u8]) -> (u64, u32) {
    Oti::words_from_reduced(&frame[HEADER_SIZE..HEADER_SIZE + REDUCED_BODY_SIZE])
}

/// (SBN, ESI) tag of an RQ_CONFIG frame.
pub fn parse_tag(frame: &[u8]) -> (u8, u16) {
    (frame[9], u16::from_le_bytes([frame[10], frame[11]]))
}

/// Symbol payload of an RQ_CONFIG frame.
pub fn symbol(frame: &[u8]) -> &[u8] {
    &frame[FRAME_OVERHEAD..]
}
