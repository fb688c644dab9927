mod config;
mod daemon;
mod error;
mod geometry;
mod gesture;
mod ipc;
mod keyboard_monitor;
mod render;
mod session;
mod socket_client;
mod socket_server;
mod sway_client;
mod window_directory;
mod window_source;

use anyhow::{Context, Result};
use config::Config;
use daemon::Daemon;
use gesture::GestureDetector;
use ipc::IpcCommand;
use keyboard_monitor::{DeviceCapture, KeyboardMonitor};
use render::TerminalRenderer;
use session::SwitcherSession;
use std::fs;
use std::path::PathBuf;
use sway_client::RealSwayClient;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use window_directory::WindowDirectory;

/// Get the path to the pidfile
fn get_pidfile_path() -> Result<PathBuf> {
    // Try to use XDG_RUNTIME_DIR, fall back to ~/.cache
    let runtime_dir = dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .context("Could not determine runtime directory")?;

    Ok(runtime_dir.join("pane.pid"))
}

/// Check if another instance is already running
fn check_pidfile() -> Result<()> {
    let pidfile = get_pidfile_path()?;

    if pidfile.exists() {
        let pid_str = fs::read_to_string(&pidfile).context("Failed to read pidfile")?;
        let pid: u32 = pid_str.trim().parse().context("Invalid PID in pidfile")?;

        if process_exists(pid) {
            anyhow::bail!(
                "Another instance of pane is already running (PID: {}). \
                 If this is incorrect, remove the pidfile at: {}",
                pid,
                pidfile.display()
            );
        } else {
            info!("Removing stale pidfile (PID {} not found)", pid);
            if let Err(e) = fs::remove_file(&pidfile) {
                warn!("Failed to remove stale pidfile: {}", e);
            }
        }
    }

    Ok(())
}

/// Check if a process with the given PID exists
fn process_exists(pid: u32) -> bool {
    PathBuf::from(format!("/proc/{}", pid)).exists()
}

/// Create the pidfile
fn create_pidfile() -> Result<PidfileGuard> {
    let pidfile = get_pidfile_path()?;
    let pid = std::process::id();

    fs::write(&pidfile, pid.to_string()).context("Failed to write pidfile")?;

    info!("Created pidfile at {} with PID {}", pidfile.display(), pid);

    Ok(PidfileGuard { path: pidfile })
}

/// Guard that removes the pidfile when dropped
struct PidfileGuard {
    path: PathBuf,
}

impl Drop for PidfileGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            error!("Failed to remove pidfile: {}", e);
        } else {
            info!("Removed pidfile at {}", self.path.display());
        }
    }
}

fn main() -> Result<()> {
    let config = Config::parse();

    let log_level = if config.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if let Some(command) = IpcCommand::from_cli(&config.command()) {
        socket_client::send_command_and_exit(command);
    }

    info!("Starting pane daemon");

    check_pidfile()?;

    // Removed when the guard is dropped
    let _pidfile_guard = create_pidfile()?;

    let (input_tx, input_rx) = mpsc::unbounded_channel();

    let (capture, input_access) = if keyboard_monitor::check_permissions(config.device.as_deref())
    {
        match KeyboardMonitor::new(config.device.as_deref()) {
            Ok((monitor, capture)) => {
                // evdev reads block, so the monitor gets its own thread
                std::thread::spawn(move || {
                    if let Err(e) = monitor.monitor_blocking(input_tx) {
                        error!("Keyboard monitor error: {}", e);
                    }
                });
                (capture, true)
            }
            Err(e) => {
                warn!("Keyboard monitor unavailable: {:#}", e);
                (DeviceCapture::disabled(), false)
            }
        }
    } else {
        (DeviceCapture::disabled(), false)
    };

    let sway = RealSwayClient::new().context("Failed to connect to Sway")?;
    let mut session = SwitcherSession::new(
        WindowDirectory::new(sway),
        Box::new(capture),
        config.recapture_delay(),
    );
    session.add_observer(Box::new(TerminalRenderer::new()));

    let detector = GestureDetector::new(config.tap_timing());
    info!(
        "Tap timing: gap {:?}, hold {:?}",
        detector.timing().max_tap_gap,
        detector.timing().max_hold
    );
    let daemon = Daemon::new(detector, session, input_access);

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(async move {
        let (ipc_rx, _socket_guard) = socket_server::start_server().await?;

        tokio::select! {
            result = daemon.run(input_rx, ipc_rx) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                Ok(())
            }
        }
    })?;

    info!("Daemon exited normally");
    Ok(())
}
