//! Receive side: frame dispatch and the inbound loop.

mod session;
mod writer;

pub use session::RxSession;
pub use writer::output_path;

use crate::common::frame::{self, FrameParams, PacketType};
use crate::transport::kiss::MAX_PAYLOAD;
use crate::transport::FrameReceiver;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

///
/// Inbound frame dispatcher.
///
/// Gates each frame through length, packet-type and CRC checks, identifies
/// the session by the OTI word pair and drives the active [`RxSession`].
/// A one-element memo of the last completed object suppresses re-opening an
/// output file when the same broadcast keeps cycling.
///
pub struct Receiver {
    params: FrameParams,
    rx_dir: PathBuf,
    session: Option<RxSession>,
    last_completed: Option<(u64, u32)>,
    frames_rx: u64,
    crc_errors: u64,
}

impl Receiver {
    /// Return a new `Receiver` writing reconstructed objects to `rx_dir`.
    pub fn new(params: &FrameParams, rx_dir: &Path) -> Receiver {
        Receiver {
            params: *params,
            rx_dir: rx_dir.to_path_buf(),
            session: None,
            last_completed: None,
            frames_rx: 0,
            crc_errors: 0,
        }
    }

    /// Frames seen, including dropped ones.
    pub fn frames_received(&self) -> u64 {
        self.frames_rx
    }

    /// Frames dropped on a CRC mismatch.
    pub fn crc_errors(&self) -> u64 {
        self.crc_errors
    }

    /// Whether an object is currently being reconstructed.
    pub fn session_active(&self) -> bool {
        self.session.is_some()
    }

    /// Absorb one modem frame. Returns the output path when this frame
    /// completed an object.
    pub fn push(&mut self, data: &[u8]) -> Option<PathBuf> {
        self.frames_rx += 1;
        if self.frames_rx % 200 == 0 {
            log::debug!(
                "RX: frames={} crc_errors={}",
                self.frames_rx,
                self.crc_errors
            );
        }

        if data.len() != self.params.frame_size {
            log::debug!(
                "RX: dropping frame len={} expected={}",
                data.len(),
                self.params.frame_size
            );
            return None;
        }

        match frame::packet_type(data) {
            PacketType::RqConfig => {}
            PacketType::RqPayload => {
                log::info!("RX: side-info packet len={}", data.len());
                return None;
            }
            _ => return None,
        }

        if !frame::verify_crc(data) {
            self.crc_errors += 1;
            return None;
        }

        let (common, scheme) = frame::parse_oti_words(data);

        // A finished object keeps being re-broadcast; do not open a new
        // output for it.
        if self.session.is_none() && self.last_completed == Some((common, scheme)) {
            return None;
        }

        let mismatch = self
            .session
            .as_ref()
            .map_or(true, |active| active.oti_words() != (common, scheme));
        if mismatch {
            self.session = None;
            match RxSession::start(&self.rx_dir, &self.params, common, scheme) {
                Ok(started) => {
                    self.session = Some(started);
                    self.last_completed = None;
                }
                Err(_) => return None,
            }
        }

        let (sbn, esi) = frame::parse_tag(data);
        let active = self.session.as_mut()?;
        match active.push(sbn, esi as u32, frame::symbol(data)) {
            Ok(true) => {
                let path = active.out_path().to_path_buf();
                log::info!("RX: FILE RECEIVED -> {:?}", path);
                self.last_completed = Some((common, scheme));
                self.session = None;
                Some(path)
            }
            Ok(false) => None,
            Err(_) => {
                // Output I/O failed; drop the session and let a later
                // frame start over.
                self.session = None;
                None
            }
        }
    }
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("rx_dir", &self.rx_dir)
            .field("session", &self.session)
            .field("frames_rx", &self.frames_rx)
            .field("crc_errors", &self.crc_errors)
            .finish()
    }
}

/// The receive loop: block on the link, hand every completed KISS frame to
/// the dispatcher. A closed or failed link clears `running` and stops the
/// daemon.
pub fn run(params: &FrameParams, rx_dir: &Path, link: &mut FrameReceiver, running: &AtomicBool) {
    let mut receiver = Receiver::new(params, rx_dir);
    let mut buf = [0u8; MAX_PAYLOAD];

    while running.load(Ordering::SeqCst) {
        match link.recv_frame(&mut buf) {
            Ok(len) => {
                receiver.push(&buf[..len]);
            }
            Err(err) => {
                log::error!("RX: modem read error/disconnect: {}", err);
                running.store(false, Ordering::SeqCst);
                break;
            }
        }
    }
}
