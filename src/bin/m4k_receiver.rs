//! Device-side receiver: accepts one archive from `m4k build --upload`,
//! stores it, and exits.
//!
//! Meant to be started on demand (for example from a launcher menu on the
//! reader). It waits for a sender until the accept timeout, SIGINT or
//! SIGTERM, whichever comes first. Running it permanently needs an external
//! supervisor that restarts it after each run.

use clap::Parser;
use env_logger::{Builder, Env};
use log::{error, info, warn};
use m4k::config;
use m4k::protocol::{ReceiveOutcome, Receiver};
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "m4k-receiver")]
#[command(about = "Receive one archive from m4k and store it for the reader")]
#[command(version)]
struct Cli {
    /// File the process id is written to while running
    #[arg(long)]
    pidfile: PathBuf,

    /// Port to listen on [default: transfer.port from the config]
    #[arg(long)]
    port: Option<u16>,

    /// Where received archives are stored [default: receiver.destination]
    #[arg(long)]
    destdir: Option<PathBuf>,

    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::CONFIG_FILE_NAME)]
    config: PathBuf,
}

/// Holds the pid file for the lifetime of the process.
struct PidFile {
    path: PathBuf,
}

impl PidFile {
    fn create(path: &Path) -> std::io::Result<Self> {
        fs::write(path, process::id().to_string())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Cannot remove pid file {}: {e}", self.path.display());
        }
    }
}

fn main() {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(&cli.config)?;
    let port = cli.port.unwrap_or(config.transfer.port);
    let destination =
        resolve_destination(cli.destdir.unwrap_or_else(|| config.receiver.destination.clone()))?;

    let _pidfile = PidFile::create(&cli.pidfile)
        .map_err(|e| format!("Cannot create pid file {}: {e}", cli.pidfile.display()))?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })?;

    let receiver = Receiver::bind(
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        &destination,
        config.receiver.timeouts(),
    )?;
    info!(
        "Listening on {}, destination directory {}",
        receiver.local_addr()?,
        destination.display()
    );

    match receiver.run(&shutdown_rx)? {
        ReceiveOutcome::Received(path) => info!("Stored {}", path.display()),
        ReceiveOutcome::TimedOut => info!("Hit timeout"),
        ReceiveOutcome::Shutdown => info!("Received exit signal"),
    }
    info!("Exiting");
    Ok(())
}

/// Absolute destination directory, created if missing.
fn resolve_destination(dir: PathBuf) -> std::io::Result<PathBuf> {
    fs::create_dir_all(&dir)?;
    std::path::absolute(&dir)
}
