use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::Command;

/// Commands sent from CLI client to daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IpcCommand {
    /// Open the switcher
    Show,
    /// Close the switcher
    Hide,
    /// Open or close the switcher
    Toggle,
    /// Move selection down
    Next,
    /// Move selection up
    Prev,
    /// Focus the selected window and close the switcher
    Select,
    /// Same as Escape: clear search, else close
    Cancel,
    /// Move the selected window to a one-based screen number
    Screen(u8),
    /// Query daemon status
    Status,
    /// Shutdown the daemon gracefully
    Shutdown,
}

/// Response from daemon to CLI client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IpcResponse {
    /// Command executed successfully
    Ok,
    /// Error occurred
    Error(String),
    /// Status response
    Status {
        open: bool,
        window_count: usize,
        selected_index: Option<usize>,
        search_text: String,
        input_access: bool,
        window_access: bool,
    },
}

/// Get the path to the Unix socket
pub fn get_socket_path() -> Result<PathBuf> {
    let runtime_dir = dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .context("Could not determine runtime directory")?;

    Ok(runtime_dir.join("pane.sock"))
}

/// Error returned when parsing an invalid IpcCommand string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIpcCommandError;

impl fmt::Display for ParseIpcCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid IPC command")
    }
}

impl std::error::Error for ParseIpcCommandError {}

impl FromStr for IpcCommand {
    type Err = ParseIpcCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim().to_lowercase();
        let mut parts = line.split_whitespace();
        let command = match (parts.next(), parts.next()) {
            (Some("show"), None) => IpcCommand::Show,
            (Some("hide"), None) => IpcCommand::Hide,
            (Some("toggle"), None) => IpcCommand::Toggle,
            (Some("next"), None) => IpcCommand::Next,
            (Some("prev"), None) => IpcCommand::Prev,
            (Some("select"), None) => IpcCommand::Select,
            (Some("cancel"), None) => IpcCommand::Cancel,
            (Some("screen"), Some(n)) => match n.parse::<u8>() {
                Ok(n @ 1..=9) => IpcCommand::Screen(n),
                _ => return Err(ParseIpcCommandError),
            },
            (Some("status"), None) => IpcCommand::Status,
            (Some("shutdown"), None) => IpcCommand::Shutdown,
            _ => return Err(ParseIpcCommandError),
        };

        if parts.next().is_some() {
            return Err(ParseIpcCommandError);
        }
        Ok(command)
    }
}

impl fmt::Display for IpcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpcCommand::Show => write!(f, "show"),
            IpcCommand::Hide => write!(f, "hide"),
            IpcCommand::Toggle => write!(f, "toggle"),
            IpcCommand::Next => write!(f, "next"),
            IpcCommand::Prev => write!(f, "prev"),
            IpcCommand::Select => write!(f, "select"),
            IpcCommand::Cancel => write!(f, "cancel"),
            IpcCommand::Screen(n) => write!(f, "screen {}", n),
            IpcCommand::Status => write!(f, "status"),
            IpcCommand::Shutdown => write!(f, "shutdown"),
        }
    }
}

impl IpcCommand {
    /// Map a CLI subcommand to the command sent over the socket.
    /// `None` for `daemon`, which is not a client command.
    pub fn from_cli(command: &Command) -> Option<Self> {
        let ipc = match command {
            Command::Daemon => return None,
            Command::Show => IpcCommand::Show,
            Command::Hide => IpcCommand::Hide,
            Command::Toggle => IpcCommand::Toggle,
            Command::Next => IpcCommand::Next,
            Command::Prev => IpcCommand::Prev,
            Command::Select => IpcCommand::Select,
            Command::Cancel => IpcCommand::Cancel,
            Command::Screen { number } => IpcCommand::Screen(*number),
            Command::Status => IpcCommand::Status,
            Command::Shutdown => IpcCommand::Shutdown,
        };
        Some(ipc)
    }
}
