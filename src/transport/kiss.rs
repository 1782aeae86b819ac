//! KISS framing over the modem byte stream.
//!
//! <https://en.wikipedia.org/wiki/KISS_(amateur_radio_protocol)>
//!
//! Used purely as a record delimiter: one KISS DATA frame per modem frame.

/// Frame delimiter.
pub const FEND: u8 = 0xc0;
/// Escape marker.
pub const FESC: u8 = 0xdb;
/// Escaped FEND.
pub const TFEND: u8 = 0xdc;
/// Escaped FESC.
pub const TFESC: u8 = 0xdd;

/// Unformatted data frame command.
pub const CMD_DATA: u8 = 0x02;
const CMD_UNKNOWN: u8 = 0xfe;

/// Upper bound on the payload of one KISS frame.
pub const MAX_PAYLOAD: usize = 756;

/// Escape and delimit one frame.
pub fn encode(frame: &[u8]) -> Vec<u8> {
    // Worst case: every byte escaped, plus delimiters and command.
    let mut out = Vec::with_capacity(frame.len() * 2 + 3);
    out.push(FEND);
    out.push(CMD_DATA);
    for &byte in frame {
        match byte {
            FEND => out.extend([FESC, TFEND]),
            FESC => out.extend([FESC, TFESC]),
            byte => out.push(byte),
        }
    }
    out.push(FEND);
    out
}

///
/// Reentrant KISS decoder, driven one byte at a time.
///
/// Frames with a command other than [`CMD_DATA`] are consumed and
/// discarded; payload beyond [`MAX_PAYLOAD`] is dropped.
///
#[derive(Debug, Default)]
pub struct Decoder {
    in_frame: bool,
    escape: bool,
    command: u8,
    len: usize,
}

impl Decoder {
    /// Return a new `Decoder` in the idle state.
    pub fn new() -> Decoder {
        Decoder {
            in_frame: false,
            escape: false,
            command: CMD_UNKNOWN,
            len: 0,
        }
    }

    /// Feed one byte; on frame completion, return the payload length
    /// written into `frame_buffer`.
    pub fn push(&mut self, mut sbyte: u8, frame_buffer: &mut [u8]) -> Option<usize> {
        if self.in_frame && sbyte == FEND && self.command == CMD_DATA {
            self.in_frame = false;
            return Some(self.len);
        }
        if sbyte == FEND {
            self.in_frame = true;
            self.escape = false;
            self.command = CMD_UNKNOWN;
            self.len = 0;
            return None;
        }
        if self.in_frame && self.len < MAX_PAYLOAD {
            // The first byte after FEND is the command; the port nibble is
            // stripped off.
            if self.len == 0 && self.command == CMD_UNKNOWN {
                self.command = sbyte & 0x0f;
                return None;
            }
            if self.command != CMD_DATA {
                return None;
            }
            if sbyte == FESC {
                self.escape = true;
                return None;
            }
            if self.escape {
                if sbyte == TFEND {
                    sbyte = FEND;
                }
                if sbyte == TFESC {
                    sbyte = FESC;
                }
                self.escape = false;
            }
            if self.len < frame_buffer.len() {
                frame_buffer[self.len] = sbyte;
                self.len += 1;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut decoder = Decoder::new();
        let mut buf = [0u8; MAX_PAYLOAD];
        let mut frames = Vec::new();
        for &b in bytes {
            if let Some(len) = decoder.push(b, &mut buf) {
                frames.push(buf[..len].to_vec());
            }
        }
        frames
    }

    #[test]
    fn encode_escapes_delimiters() {
        let encoded = encode(&[b'f', b'o', FEND, b'o', FESC]);
        assert_eq!(
            encoded,
            [FEND, CMD_DATA, b'f', b'o', FESC, TFEND, b'o', FESC, TFESC, FEND]
        );
    }

    #[test]
    fn roundtrip() {
        let payload: Vec<u8> = (0u16..512).map(|i| (i % 256) as u8).collect();
        let frames = decode_all(&encode(&payload));
        assert_eq!(frames, vec![payload]);
    }

    #[test]
    fn back_to_back_frames() {
        let mut stream = encode(&[1, 2, 3]);
        stream.extend(encode(&[FEND, FESC, 0xff]));
        let frames = decode_all(&stream);
        assert_eq!(frames, vec![vec![1, 2, 3], vec![FEND, FESC, 0xff]]);
    }

    #[test]
    fn garbage_between_frames_is_ignored() {
        let mut stream = vec![0x55, 0xaa, 0x13];
        stream.extend(encode(&[9, 9, 9]));
        let frames = decode_all(&stream);
        assert_eq!(frames, vec![vec![9, 9, 9]]);
    }

    #[test]
    fn non_data_commands_are_discarded() {
        let mut stream = vec![FEND, 0x00, 1, 2, 3, FEND];
        stream.extend(encode(&[4, 5]));
        let frames = decode_all(&stream);
        assert_eq!(frames, vec![vec![4, 5]]);
    }

    #[test]
    fn oversize_payload_is_truncated() {
        let payload = vec![0x42u8; MAX_PAYLOAD + 100];
        let frames = decode_all(&encode(&payload));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), MAX_PAYLOAD);
    }
}
