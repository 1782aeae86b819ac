//! Transmit session: one queued file, fountain-encoded into an endless
//! carousel of RQ_CONFIG frames.

use crate::common::frame::{self, FrameParams, MAX_ESI};
use crate::common::oti::{Oti, REDUCED_BODY_SIZE};
use crate::fec::BlockEncoder;
use crate::tools::error::{Result, RqcastError};

use std::path::{Path, PathBuf};
use std::time::SystemTime;

///
/// Encoder state of the file currently being broadcast.
///
/// Frames interleave blocks round-robin: the block cursor advances by one
/// per frame, so losses spread uniformly across blocks and every block
/// keeps receiving coverage no matter when a receiver tunes in.
///
pub struct TxSession {
    path: PathBuf,
    mtime: SystemTime,
    frames_limit: Option<u64>,
    frames_sent: u64,
    next_sbn: usize,
    esi: Vec<u32>,
    oti: Oti,
    oti_body: [u8; REDUCED_BODY_SIZE],
    blocks: Vec<BlockEncoder>,
    params: FrameParams,
}

impl TxSession {
    /// Load `path` and build the per-block encoders. Fails on unreadable or
    /// oversized files; the caller skips the file and retries later.
    pub fn open(params: &FrameParams, path: &Path, mtime: SystemTime) -> Result<TxSession> {
        let metadata = std::fs::metadata(path)?;
        if metadata.len() > crate::common::oti::MAX_TRANSFER_LENGTH {
            return Err(RqcastError::new(format!(
                "TX: file too large (>16MB): {:?}",
                path
            )));
        }

        let data = std::fs::read(path)?;
        let oti = Oti::for_object(data.len() as u64, params.symbol_size)?;

        let partition = oti.partition();
        let symbol_size = oti.encoding_symbol_length as u64;
        let mut blocks = Vec::with_capacity(oti.source_blocks as usize);
        for sbn in 0..oti.source_blocks as u32 {
            let start = partition.offset(sbn, symbol_size) as usize;
            let end = start + partition.bytes(sbn, oti.transfer_length, symbol_size) as usize;
            blocks.push(BlockEncoder::new(sbn as u8, &oti, &data[start..end]));
        }

        let frames_limit = frames_limit_from_name(path);
        log::info!(
            "TX: loaded file {:?} (frames_limit={:?}, symbol_size={}, blocks={}, symbols={})",
            path,
            frames_limit,
            params.symbol_size,
            oti.source_blocks,
            blocks
                .iter()
                .map(|block| block.nb_source_symbols())
                .sum::<u32>()
        );

        Ok(TxSession {
            path: path.to_path_buf(),
            mtime,
            frames_limit,
            frames_sent: 0,
            next_sbn: 0,
            esi: vec![0; oti.source_blocks as usize],
            oti_body: oti.reduced_body(),
            oti,
            blocks,
            params: *params,
        })
    }

    /// File being broadcast.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time observed at open; a later change means the file
    /// was overwritten and the session must be rebuilt.
    pub fn mtime(&self) -> SystemTime {
        self.mtime
    }

    /// OTI of the object on the wire.
    pub fn oti(&self) -> &Oti {
        &self.oti
    }

    /// Frames emitted so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Whether the filename frame budget has been used up.
    pub fn budget_reached(&self) -> bool {
        match self.frames_limit {
            Some(limit) => self.frames_sent >= limit,
            None => false,
        }
    }

    /// Produce the next RQ_CONFIG frame of the carousel.
    pub fn read(&mut self) -> Vec<u8> {
        let sbn = self.next_sbn;
        self.next_sbn = (self.next_sbn + 1) % self.blocks.len();

        let (mut esi, mut symbol) = self.blocks[sbn].symbol(self.esi[sbn]);
        if esi > MAX_ESI {
            // ESI wrap: restart the block cycle; receivers see the repeat
            // as duplicates.
            self.esi[sbn] = 0;
            let restart = self.blocks[sbn].symbol(0);
            esi = restart.0;
            symbol = restart.1;
        }
        self.esi[sbn] += 1;
        self.frames_sent += 1;

        frame::build_config_frame(&self.params, &self.oti_body, sbn as u8, esi as u16, &symbol)
    }
}

impl std::fmt::Debug for TxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxSession")
            .field("path", &self.path)
            .field("frames_limit", &self.frames_limit)
            .field("frames_sent", &self.frames_sent)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

/// Parse the `-<N>_frames` filename suffix capping the number of emitted
/// frames. The digits must immediately precede `_frames` and follow a dash;
/// anything else means the file is broadcast until removed.
pub fn frames_limit_from_name(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let head = &name[..name.find("_frames")?];
    let stripped = head.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &head[stripped.len()..];
    if digits.is_empty() || !stripped.ends_with('-') {
        return None;
    }
    digits.parse::<u64>().ok().filter(|n| *n > 0)
}

/// Pick the next queue entry: the lexicographically smallest regular file
/// whose name does not start with a dot.
pub fn find_first_regular_file(dir: &Path) -> Option<(PathBuf, SystemTime)> {
    let mut best: Option<(String, PathBuf)> = None;
    for entry in std::fs::read_dir(dir).ok()? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if name.starts_with('.') {
            continue;
        }
        match entry.metadata() {
            Ok(md) if md.is_file() => {}
            _ => continue,
        }
        if best.as_ref().map_or(true, |(b, _)| name < *b) {
            best = Some((name, entry.path()));
        }
    }

    let (_, path) = best?;
    let mtime = std::fs::metadata(&path).ok()?.modified().ok()?;
    Some((path, mtime))
}
