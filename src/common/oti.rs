//! Object Transmission Information.
//!
//! The RaptorQ parameters a decoder needs to reconstruct an object:
//! transfer length F, symbol size T, source blocks Z, sub-blocks N and the
//! symbol alignment Al (fixed at 1 on this link). Every frame carries the
//! reduced 8-byte form, so a receiver can join a broadcast at any point and
//! start a session from whichever frame arrives first.
//!
//! Two objects with identical `(common, scheme)` words are the same session;
//! the words double as the session identity on the receive side.

use crate::common::partition::BlockPartition;
use crate::tools::error::{Result, RqcastError};

use num_integer::div_ceil;

/// Objects larger than this cannot be described by the 24-bit transfer
/// length carried on the wire.
pub const MAX_TRANSFER_LENGTH: u64 = 16_777_215;

/// Largest number of source symbols per block, K'_max of RFC 6330.
pub const MAX_SOURCE_BLOCK_SYMBOLS: u64 = 56_403;

/// Size of the reduced OTI body carried in every frame.
pub const REDUCED_BODY_SIZE: usize = 8;

///
/// RaptorQ Object Transmission Information with the fixed parameters of the
/// broadcast link (Al = 1, whole object ≤ 16 MiB − 1).
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Oti {
    /// Transfer length F of the object, in bytes.
    pub transfer_length: u64,
    /// Encoding symbol length T, in bytes.
    pub encoding_symbol_length: u16,
    /// The number of source blocks (Z): 8-bit unsigned integer.
    pub source_blocks: u8,
    /// The number of sub-blocks (N): 16-bit unsigned integer.
    pub sub_blocks: u16,
    /// A symbol alignment parameter (Al): 8-bit unsigned integer.
    pub symbol_alignment: u8,
}

impl Oti {
    /// Derive the OTI of an object about to be transmitted.
    ///
    /// Z follows deterministically from (F, T), so two objects of equal
    /// size sent under the same modem mode share their OTI pair.
    pub fn for_object(transfer_length: u64, encoding_symbol_length: u16) -> Result<Oti> {
        if transfer_length == 0 {
            return Err(RqcastError::new("cannot encode an empty object"));
        }
        if transfer_length > MAX_TRANSFER_LENGTH {
            return Err(RqcastError::new(format!(
                "object of {} bytes exceeds the {} byte limit",
                transfer_length, MAX_TRANSFER_LENGTH
            )));
        }

        let total_symbols = div_ceil(transfer_length, encoding_symbol_length as u64);
        let nb_blocks = div_ceil(total_symbols, MAX_SOURCE_BLOCK_SYMBOLS);
        debug_assert!(nb_blocks <= u8::MAX as u64);

        Ok(Oti {
            transfer_length,
            encoding_symbol_length,
            source_blocks: nb_blocks as u8,
            sub_blocks: 1,
            symbol_alignment: 1,
        })
    }

    /// Rebuild an OTI from the packed word pair of an inbound frame.
    pub fn from_words(common: u64, scheme: u32) -> Oti {
        Oti {
            transfer_length: (common >> 24) & 0xff_ffff_ffff,
            encoding_symbol_length: (common & 0xffff) as u16,
            source_blocks: (scheme >> 24) as u8,
            sub_blocks: ((scheme >> 8) & 0xffff) as u16,
            symbol_alignment: (scheme & 0xff) as u8,
        }
    }

    /// Packed 48-bit common word: F in the high bits, T in the low 16.
    pub fn common(&self) -> u64 {
        (self.transfer_length << 24) | self.encoding_symbol_length as u64
    }

    /// Packed 24-bit scheme-specific word: Z, N and Al.
    pub fn scheme(&self) -> u32 {
        ((self.source_blocks as u32) << 24)
            | ((self.sub_blocks as u32) << 8)
            | self.symbol_alignment as u32
    }

    /// The identity of the session this OTI describes.
    pub fn words(&self) -> (u64, u32) {
        (self.common(), self.scheme())
    }

    /// Serialize to the reduced 8-byte on-wire body: 5 bytes of common
    /// (24-bit F then 16-bit T, both little-endian) followed by 3 bytes of
    /// scheme-specific (Z, then 16-bit N little-endian; Al is implicit).
    pub fn reduced_body(&self) -> [u8; REDUCED_BODY_SIZE] {
        let common = self.common();
        let scheme = self.scheme();
        [
            (common >> 24) as u8,
            (common >> 32) as u8,
            (common >> 40) as u8,
            common as u8,
            (common >> 8) as u8,
            (scheme >> 24) as u8,
            (scheme >> 8) as u8,
            (scheme >> 16) as u8,
        ]
    }

    /// Unpack a reduced body back into the word pair, ORing in the implicit
    /// Al = 1. The layout is the wire contract and must stay bit-exact.
    pub fn words_from_reduced(body: &[u8]) -> (u64, u32) {
        debug_assert!(body.len() >= REDUCED_BODY_SIZE);
        let common = ((body[0] as u64) << 24)
            | ((body[1] as u64) << 32)
            | ((body[2] as u64) << 40)
            | (body[3] as u64)
            | ((body[4] as u64) << 8);
        let scheme = ((body[5] as u32) << 24) | ((body[6] as u32) << 8) | ((body[7] as u32) << 16) | 1;
        (common, scheme)
    }

    /// Block layout of the object this OTI describes.
    pub fn partition(&self) -> BlockPartition {
        let total_symbols = div_ceil(self.transfer_length, self.encoding_symbol_length as u64);
        BlockPartition::new(total_symbols, self.source_blocks as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::Oti;

    #[test]
    fn reduced_body_roundtrip() {
        let oti = Oti::for_object(10_000, 498).unwrap();
        let body = oti.reduced_body();
        let (common, scheme) = Oti::words_from_reduced(&body);
        assert_eq!(common, oti.common());
        assert_eq!(scheme, oti.scheme());
        assert_eq!(Oti::from_words(common, scheme), oti);
    }

    #[test]
    fn identity_depends_on_size_and_symbol_length_only() {
        let a = Oti::for_object(1024, 498).unwrap();
        let b = Oti::for_object(1024, 498).unwrap();
        assert_eq!(a.words(), b.words());

        let c = Oti::for_object(2048, 498).unwrap();
        assert_ne!(a.words(), c.words());

        let d = Oti::for_object(1024, 114).unwrap();
        assert_ne!(a.words(), d.words());
    }

    #[test]
    fn alignment_is_implicit_on_the_wire() {
        let oti = Oti::for_object(3, 114).unwrap();
        let (_, scheme) = Oti::words_from_reduced(&oti.reduced_body());
        assert_eq!(scheme & 0xff, 1);
    }

    #[test]
    fn rejects_oversized_and_empty_objects() {
        assert!(Oti::for_object(0, 498).is_err());
        assert!(Oti::for_object(16_777_216, 498).is_err());
        assert!(Oti::for_object(16_777_215, 498).is_ok());
    }

    #[test]
    fn worst_case_block_count_fits_the_wire() {
        // Largest object under the smallest usable symbol size.
        let oti = Oti::for_object(16_777_215, 2).unwrap();
        assert!(oti.source_blocks as u64 >= 1);
        let p = oti.partition();
        assert_eq!(p.nb_blocks(), oti.source_blocks as u64);
        assert!(p.symbols(0) <= super::MAX_SOURCE_BLOCK_SYMBOLS);
    }
}
