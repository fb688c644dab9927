use crate::ipc::{get_socket_path, IpcCommand, IpcResponse};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// A parsed client command and where the daemon sends its answer.
pub type IpcRequest = (IpcCommand, oneshot::Sender<IpcResponse>);

/// Unlinks the socket path on drop.
pub struct SocketGuard {
    path: PathBuf,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Unlinked {}", self.path.display()),
            Err(e) if self.path.exists() => error!("Could not unlink {}: {}", self.path.display(), e),
            Err(_) => {}
        }
    }
}

/// Bind the control socket and forward every request to the returned receiver.
pub async fn start_server() -> Result<(mpsc::UnboundedReceiver<IpcRequest>, SocketGuard)> {
    let path = get_socket_path()?;

    // Only one daemon passes the pidfile check, so a leftover socket is stale.
    if path.exists() {
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove stale socket {}", path.display()))?;
    }

    let listener = UnixListener::bind(&path)
        .with_context(|| format!("Failed to bind socket at {}", path.display()))?;
    info!("Control socket at {}", path.display());

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(accept_loop(listener, tx));

    Ok((rx, SocketGuard { path }))
}

async fn accept_loop(listener: UnixListener, requests: mpsc::UnboundedSender<IpcRequest>) {
    loop {
        let stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(e) => {
                error!("Accept on control socket failed: {}", e);
                continue;
            }
        };

        let requests = requests.clone();
        tokio::spawn(async move {
            if let Err(e) = serve(stream, requests).await {
                debug!("Control client dropped: {}", e);
            }
        });
    }
}

/// One command line in, one JSON line out.
async fn serve(stream: UnixStream, requests: mpsc::UnboundedSender<IpcRequest>) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut line = String::new();
    BufReader::new(read_half).read_line(&mut line).await?;

    let response = match line.parse::<IpcCommand>() {
        Ok(command) => dispatch(command, &requests).await,
        Err(e) => {
            warn!("Rejected control command {:?}", line.trim());
            IpcResponse::Error(format!("{}: {}", e, line.trim()))
        }
    };

    let mut reply = serde_json::to_vec(&response)?;
    reply.push(b'\n');
    write_half.write_all(&reply).await?;
    write_half.flush().await?;
    Ok(())
}

/// Hand a command to the daemon loop and wait for its verdict.
async fn dispatch(command: IpcCommand, requests: &mpsc::UnboundedSender<IpcRequest>) -> IpcResponse {
    debug!("Control command: {}", command);
    let (reply_tx, reply_rx) = oneshot::channel();

    if requests.send((command, reply_tx)).is_err() {
        return IpcResponse::Error("Daemon is shutting down".to_string());
    }
    reply_rx
        .await
        .unwrap_or_else(|_| IpcResponse::Error("Daemon dropped the request".to_string()))
}
