//! Output file handling on the receive side.
//!
//! Decoded blocks are committed to disk in SBN order as they become
//! available; no atomic rename is performed, so a partially received
//! object shows up as a growing file.

use crate::fec::BlockDecoder;
use crate::tools::error::{Result, RqcastError};

use std::io::Write;
use std::path::{Path, PathBuf};

/// Build a fresh output path `broadcast_YYYYMMDD_HHMMSS.bin` in local
/// time, probing `_001`..`_999` when the base name is taken.
pub fn output_path(rx_dir: &Path) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    for attempt in 0..1000 {
        let name = if attempt == 0 {
            format!("broadcast_{}.bin", stamp)
        } else {
            format!("broadcast_{}_{:03}.bin", stamp, attempt)
        };
        let candidate = rx_dir.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(RqcastError::new("RX: failed to create output file path"))
}

///
/// Sequential block-to-file writer. Tracks how many object bytes are still
/// owed so the padded final symbol of the last block gets truncated back to
/// the transfer length.
///
#[derive(Debug)]
pub struct BlockWriter {
    file: std::fs::File,
    path: PathBuf,
    next_sbn: u32,
    bytes_left: u64,
}

impl BlockWriter {
    /// Create the output file for an object of `transfer_length` bytes.
    pub fn create(path: PathBuf, transfer_length: u64) -> Result<BlockWriter> {
        let file = std::fs::File::create(&path)?;
        Ok(BlockWriter {
            file,
            path,
            next_sbn: 0,
            bytes_left: transfer_length,
        })
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Commit every decoded block that extends the contiguous prefix,
    /// releasing block memory as it lands on disk.
    pub fn push_blocks(&mut self, blocks: &mut [BlockDecoder]) -> Result<()> {
        while (self.next_sbn as usize) < blocks.len() {
            let block = &mut blocks[self.next_sbn as usize];
            if !block.completed() {
                break;
            }
            let data = block
                .take_data()
                .ok_or_else(|| RqcastError::new("decoded block lost its data"))?;

            let take = (self.bytes_left as usize).min(data.len());
            self.file.write_all(&data[..take])?;
            self.bytes_left -= take as u64;
            self.next_sbn += 1;
        }

        if self.is_completed() {
            self.file.flush()?;
        }
        Ok(())
    }

    /// Whether the whole object has been written out.
    pub fn is_completed(&self) -> bool {
        self.bytes_left == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_then_numbered_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        // Retry in the unlikely case a second boundary lands between the
        // two calls and changes the timestamp.
        for _ in 0..3 {
            let first = output_path(dir.path()).unwrap();
            std::fs::write(&first, b"x").unwrap();
            let second = output_path(dir.path()).unwrap();
            assert_ne!(first, second);
            assert!(!second.exists());

            let stem = first.file_name().unwrap().to_str().unwrap();
            let stem = stem.strip_suffix(".bin").unwrap();
            let name = second.file_name().unwrap().to_str().unwrap();
            if name.starts_with(stem) {
                assert_eq!(name, format!("{}_001.bin", stem));
                return;
            }
        }
        panic!("never observed a same-second collision");
    }
}
