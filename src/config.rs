use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::gesture::TapTiming;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run as daemon (default if no command specified)
    Daemon,
    /// Open the window switcher
    Show,
    /// Close the window switcher
    Hide,
    /// Open the switcher if closed, close it if open
    Toggle,
    /// Move the selection down
    Next,
    /// Move the selection up
    Prev,
    /// Focus the selected window and close the switcher
    Select,
    /// Clear the search, or close the switcher if the search is empty
    Cancel,
    /// Move the selected window to screen N (1-9)
    Screen {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=9))]
        number: u8,
    },
    /// Query daemon status
    Status,
    /// Shutdown the daemon
    Shutdown,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "pane")]
#[command(about = "Double-tap Super to switch, search and move windows", long_about = None)]
pub struct Config {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Keyboard device to read (default: first device with Super and letter keys)
    #[arg(short, long)]
    pub device: Option<PathBuf>,

    /// Longest pause between the first release and the second press, in milliseconds
    #[arg(long, default_value_t = 400)]
    pub max_tap_gap_ms: u64,

    /// Longest Super may be held for a press to count as a tap, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub max_hold_ms: u64,

    /// Delay before re-grabbing the keyboard after moving a window, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub recapture_delay_ms: u64,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Config {
    pub fn parse() -> Self {
        <Config as Parser>::parse()
    }

    /// Get the command, defaulting to Daemon if none specified
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Daemon)
    }

    pub fn tap_timing(&self) -> TapTiming {
        TapTiming {
            max_tap_gap: Duration::from_millis(self.max_tap_gap_ms),
            max_hold: Duration::from_millis(self.max_hold_ms),
        }
    }

    pub fn recapture_delay(&self) -> Duration {
        Duration::from_millis(self.recapture_delay_ms)
    }
}
