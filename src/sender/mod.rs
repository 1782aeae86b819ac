//! Transmit side: queue scanning and the broadcast loop.

mod session;

pub use session::{find_first_regular_file, frames_limit_from_name, TxSession};

use crate::common::frame::FrameParams;
use crate::tools::error::Result;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Idle time between queue scans and while a frame budget is exhausted.
const QUEUE_POLL: Duration = Duration::from_millis(200);
/// Backoff after a failed session open, so a broken file does not spin.
const OPEN_RETRY: Duration = Duration::from_millis(500);

/// Where outgoing frames go. The daemon hands the loop a transport send
/// handle; tests hand it a buffer.
pub trait FrameSink {
    /// Emit one frame. An error is fatal to the broadcast.
    fn send_frame(&self, frame: &[u8]) -> Result<()>;
}

impl FrameSink for crate::transport::FrameSender {
    fn send_frame(&self, frame: &[u8]) -> Result<()> {
        crate::transport::FrameSender::send_frame(self, frame)
    }
}

/// The transmit loop. Watches `tx_dir`, opens a session on the first file
/// in queue order and pumps one frame per iteration until the file goes
/// away, changes, or runs out of budget. A send failure clears `running`
/// and stops the daemon.
pub fn run(params: &FrameParams, tx_dir: &Path, sink: &dyn FrameSink, running: &AtomicBool) {
    let mut session: Option<TxSession> = None;

    while running.load(Ordering::SeqCst) {
        if let Some(active) = session.as_ref() {
            match std::fs::metadata(active.path()).and_then(|md| md.modified()) {
                Err(_) => {
                    log::info!("TX: file removed, stopping {:?}", active.path());
                    session = None;
                    continue;
                }
                Ok(mtime) if mtime != active.mtime() => {
                    log::info!("TX: file changed, reloading {:?}", active.path());
                    let path = active.path().to_path_buf();
                    session = TxSession::open(params, &path, mtime).ok();
                    continue;
                }
                Ok(_) => {}
            }
        }

        if session.is_none() {
            let Some((path, mtime)) = find_first_regular_file(tx_dir) else {
                std::thread::sleep(QUEUE_POLL);
                continue;
            };
            match TxSession::open(params, &path, mtime) {
                Ok(opened) => session = Some(opened),
                Err(_) => {
                    std::thread::sleep(OPEN_RETRY);
                    continue;
                }
            }
        }

        let Some(active) = session.as_mut() else {
            continue;
        };

        if active.budget_reached() {
            std::thread::sleep(QUEUE_POLL);
            continue;
        }

        let frame = active.read();
        if let Err(err) = sink.send_frame(&frame) {
            log::error!("TX: failed to send frame to modem: {}", err);
            running.store(false, Ordering::SeqCst);
            break;
        }

        if active.frames_sent() % 100 == 0 {
            log::debug!(
                "TX: sent={} file={:?}",
                active.frames_sent(),
                active.path()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    struct CollectSink {
        frames: Mutex<Vec<Vec<u8>>>,
    }

    impl FrameSink for CollectSink {
        fn send_frame(&self, frame: &[u8]) -> Result<()> {
            self.frames.lock().unwrap().push(frame.to_vec());
            Ok(())
        }
    }

    fn wait_for<F: Fn() -> bool>(cond: F) {
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while !cond() {
            assert!(std::time::Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn budget_caps_the_carousel_until_the_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file-5_frames.bin");
        std::fs::write(&path, vec![1u8; 600]).unwrap();

        let params = FrameParams::new(1).unwrap();
        let sink = CollectSink {
            frames: Mutex::new(Vec::new()),
        };
        let running = AtomicBool::new(true);

        std::thread::scope(|scope| {
            scope.spawn(|| run(&params, dir.path(), &sink, &running));

            wait_for(|| sink.frames.lock().unwrap().len() == 5);
            // Budget reached: the session idles without closing.
            std::thread::sleep(Duration::from_millis(500));
            assert_eq!(sink.frames.lock().unwrap().len(), 5);

            // Replacing the file bumps the mtime and restarts the budget.
            // Write-then-rename so the loop never observes a half-written
            // queue entry.
            let staging = dir.path().join(".staging");
            let mut file = std::fs::File::create(&staging).unwrap();
            file.write_all(&vec![2u8; 600]).unwrap();
            file.sync_all().unwrap();
            drop(file);
            std::fs::rename(&staging, &path).unwrap();
            wait_for(|| sink.frames.lock().unwrap().len() >= 10);

            running.store(false, Ordering::SeqCst);
        });

        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames.len(), 10);
    }

    #[test]
    fn queue_is_drained_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b-2_frames.bin"), vec![0xbbu8; 200]).unwrap();
        std::fs::write(dir.path().join("a-2_frames.bin"), vec![0xaau8; 300]).unwrap();

        let params = FrameParams::new(1).unwrap();
        let sink = CollectSink {
            frames: Mutex::new(Vec::new()),
        };
        let running = AtomicBool::new(true);

        std::thread::scope(|scope| {
            scope.spawn(|| run(&params, dir.path(), &sink, &running));

            wait_for(|| sink.frames.lock().unwrap().len() >= 2);
            // "a" exhausted its budget; remove it so "b" gets picked up.
            std::fs::remove_file(dir.path().join("a-2_frames.bin")).unwrap();
            wait_for(|| sink.frames.lock().unwrap().len() >= 4);
            running.store(false, Ordering::SeqCst);
        });

        let frames = sink.frames.lock().unwrap();
        let oti_a = crate::common::oti::Oti::for_object(300, params.symbol_size)
            .unwrap()
            .words();
        let oti_b = crate::common::oti::Oti::for_object(200, params.symbol_size)
            .unwrap()
            .words();
        assert_eq!(crate::common::frame::parse_oti_words(&frames[0]), oti_a);
        assert_eq!(crate::common::frame::parse_oti_words(&frames[1]), oti_a);
        assert_eq!(crate::common::frame::parse_oti_words(&frames[2]), oti_b);
        assert_eq!(crate::common::frame::parse_oti_words(&frames[3]), oti_b);
    }

    #[test]
    fn send_failure_stops_the_daemon() {
        struct FailSink;
        impl FrameSink for FailSink {
            fn send_frame(&self, _: &[u8]) -> Result<()> {
                Err(crate::tools::error::RqcastError::new_kind(
                    std::io::ErrorKind::BrokenPipe,
                    "gone",
                ))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file.bin"), vec![3u8; 100]).unwrap();

        let params = FrameParams::new(1).unwrap();
        let running = AtomicBool::new(true);
        run(&params, dir.path(), &FailSink, &running);
        assert!(!running.load(Ordering::SeqCst));
    }
}
