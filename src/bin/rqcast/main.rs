use clap::Parser;
use rqcast::daemon;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Broadcast TX/RX daemon with joint RaptorQ configuration and payload
/// frames.
///
/// Files dropped into the TX directory are broadcast continuously until
/// removed. A filename suffix "-N_frames" (e.g. file-500_frames.bin) caps
/// the number of frames emitted for that file.
#[derive(Parser, Debug)]
#[command(version, about, verbatim_doc_comment)]
struct Args {
    /// Modem mode 0..6
    #[arg(short, long, default_value_t = 0)]
    mode: u8,

    /// TX queue directory
    #[arg(short, long, default_value = "./tx")]
    tx_dir: PathBuf,

    /// RX output directory
    #[arg(short, long, default_value = "./rx")]
    rx_dir: PathBuf,

    /// Modem IP
    #[arg(short, long, default_value = "127.0.0.1")]
    ip: String,

    /// Modem TCP port
    #[arg(short, long, default_value_t = 8100)]
    port: u16,

    /// Verbose logs
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_owned()))
        .try_init()
        .ok();

    let config = daemon::Config {
        mode: args.mode,
        tx_dir: args.tx_dir,
        rx_dir: args.rx_dir,
        ip: args.ip,
        port: args.port,
    };

    std::fs::create_dir_all(&config.tx_dir).ok();
    std::fs::create_dir_all(&config.rx_dir).ok();

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .expect("failed to install signal handler");
    }

    if let Err(err) = daemon::run(&config, running) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
