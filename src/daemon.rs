//! Daemon supervisor: owns the modem link and the two direction loops.

use crate::common::frame::FrameParams;
use crate::tools::error::Result;
use crate::transport::Transport;
use crate::{receiver, sender};

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

///
/// Daemon configuration.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Modem mode, 0..6, selecting the frame size.
    pub mode: u8,
    /// Directory scanned for files to broadcast.
    pub tx_dir: PathBuf,
    /// Directory receiving reconstructed files.
    pub rx_dir: PathBuf,
    /// Modem IP address.
    pub ip: String,
    /// Modem TCP port.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: 0,
            tx_dir: PathBuf::from("./tx"),
            rx_dir: PathBuf::from("./rx"),
            ip: "127.0.0.1".to_owned(),
            port: 8100,
        }
    }
}

/// Run the daemon until `running` is cleared, by a signal handler or by
/// either loop hitting a fatal transport error.
///
/// Connects to the modem, spawns the TX and RX loops as threads sharing
/// nothing but the link, then supervises: once `running` drops, the socket
/// is shut down to unblock the receive loop and both threads are joined.
/// Errors are only returned for failures before the loops start.
pub fn run(config: &Config, running: Arc<AtomicBool>) -> Result<()> {
    let params = FrameParams::new(config.mode)?;

    let transport = Transport::connect(&config.ip, config.port)?;
    let (send_half, mut recv_half) = transport.split()?;

    log::info!(
        "rqcast: mode={} frame_size={} symbol_size={} tx_dir={:?} rx_dir={:?}",
        config.mode,
        params.frame_size,
        params.symbol_size,
        config.tx_dir,
        config.rx_dir
    );

    let tx_thread = {
        let running = Arc::clone(&running);
        let tx_dir = config.tx_dir.clone();
        std::thread::spawn(move || sender::run(&params, &tx_dir, &send_half, &running))
    };
    let rx_thread = {
        let running = Arc::clone(&running);
        let rx_dir = config.rx_dir.clone();
        std::thread::spawn(move || receiver::run(&params, &rx_dir, &mut recv_half, &running))
    };

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(500));
    }

    transport.shutdown();
    tx_thread.join().ok();
    rx_thread.join().ok();
    Ok(())
}
