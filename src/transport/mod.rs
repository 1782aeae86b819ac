//! TCP link to the modem.
//!
//! The daemon holds one bidirectional TCP connection and splits it into a
//! send handle and a receive handle, one per direction of the broadcast.
//! Sends are serialised under a mutex since both could in principle share
//! the socket; the receive path is single-reader by construction and owns
//! the KISS decoder state plus a carry buffer for bytes read past a frame
//! boundary.

pub mod kiss;

use crate::tools::error::{Result, RqcastError};

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Mutex;

const RECV_CHUNK_SIZE: usize = 8192;

///
/// Connection to the modem.
///
#[derive(Debug)]
pub struct Transport {
    stream: TcpStream,
}

impl Transport {
    /// Connect to the modem at `ip:port`.
    pub fn connect(ip: &str, port: u16) -> Result<Transport> {
        let stream = TcpStream::connect((ip, port))?;
        log::info!("connected to modem at {}:{}", ip, port);
        Ok(Transport { stream })
    }

    /// Split into the two per-direction capability handles.
    pub fn split(&self) -> Result<(FrameSender, FrameReceiver)> {
        Ok((
            FrameSender {
                stream: Mutex::new(self.stream.try_clone()?),
            },
            FrameReceiver {
                stream: self.stream.try_clone()?,
                decoder: kiss::Decoder::new(),
                pending: Vec::new(),
                pos: 0,
            },
        ))
    }

    /// Shut the socket down both ways, unblocking a receiver stuck in
    /// `recv_frame`.
    pub fn shutdown(&self) {
        self.stream.shutdown(Shutdown::Both).ok();
    }
}

///
/// Send half of the link. KISS-encodes and writes whole frames.
///
#[derive(Debug)]
pub struct FrameSender {
    stream: Mutex<TcpStream>,
}

impl FrameSender {
    /// Encode `frame` with KISS framing and write it out. A short write is
    /// logged but not retried; on TCP it only happens while the peer is
    /// going away.
    pub fn send_frame(&self, frame: &[u8]) -> Result<()> {
        let encoded = kiss::encode(frame);
        let sent = {
            let mut stream = self
                .stream
                .lock()
                .map_err(|_| RqcastError::new("transport send lock poisoned"))?;
            stream.write(&encoded)?
        };
        if sent < encoded.len() {
            log::warn!("partial send: {} of {} bytes", sent, encoded.len());
        }
        Ok(())
    }
}

///
/// Receive half of the link. Reassembles KISS frames from the byte stream.
///
#[derive(Debug)]
pub struct FrameReceiver {
    stream: TcpStream,
    decoder: kiss::Decoder,
    pending: Vec<u8>,
    pos: usize,
}

impl FrameReceiver {
    /// Block until one complete KISS frame has been received; returns its
    /// length in `frame_buffer`. Err on a closed or failed connection.
    pub fn recv_frame(&mut self, frame_buffer: &mut [u8]) -> Result<usize> {
        loop {
            while self.pos < self.pending.len() {
                let byte = self.pending[self.pos];
                self.pos += 1;
                if let Some(len) = self.decoder.push(byte, frame_buffer) {
                    return Ok(len);
                }
            }

            self.pending.resize(RECV_CHUNK_SIZE, 0);
            self.pos = 0;
            let received = self.stream.read(&mut self.pending)?;
            self.pending.truncate(received);
            if received == 0 {
                return Err(RqcastError::new_kind(
                    std::io::ErrorKind::UnexpectedEof,
                    "modem connection closed",
                ));
            }
        }
    }
}
