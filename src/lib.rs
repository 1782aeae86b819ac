//! # rqcast - one-way broadcast file transfer over a RaptorQ fountain code
//!
//! A daemon for lossy one-way links: files dropped into a queue directory
//! are fountain-encoded (RFC 6330 RaptorQ) into an endless carousel of
//! self-describing frames, KISS-framed and handed to a modem over TCP. In
//! parallel, inbound frames are decoded back into files. Every frame
//! carries the full Object Transmission Information next to its symbol, so
//! a receiver can tune in at any moment without a handshake.
//!
//! | RFC      | Title      | Link       |
//! | ------------- | ------------- | ------------- |
//! | RFC 6330 | RaptorQ Forward Error Correction Scheme for Object Delivery | <https://www.rfc-editor.org/rfc/rfc6330.html> |
//! | RFC 5052 | Forward Error Correction (FEC) Building Block | <https://www.rfc-editor.org/rfc/rfc5052> |
//!

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(test, deny(warnings))]

mod common;
mod fec;
mod tools;

pub mod daemon;
pub mod receiver;
pub mod sender;
pub mod transport;

pub use crate::tools::error;

///
/// Frame geometry and object parameters shared by both directions
///
pub mod core {
    pub use crate::common::frame::{
        build_config_frame, packet_type, parse_oti_words, parse_tag, symbol, verify_crc,
        FrameParams, PacketType, FRAME_OVERHEAD, MAX_ESI, MODEM_FRAME_SIZES,
    };
    pub use crate::common::oti::{Oti, MAX_TRANSFER_LENGTH};
}

#[cfg(test)]
mod tests {
    pub fn init() {
        env_logger::builder().is_test(true).try_init().ok();
    }
}
