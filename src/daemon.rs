use crate::gesture::GestureDetector;
use crate::ipc::{IpcCommand, IpcResponse};
use crate::keyboard_monitor::InputEvent;
use crate::session::{CommandOutcome, SessionCommand, SwitcherSession};
use crate::socket_server::IpcRequest;
use crate::window_source::WindowBackend;
use anyhow::Result;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Whether the event loop keeps going after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

pub struct Daemon<B: WindowBackend> {
    detector: GestureDetector,
    session: SwitcherSession<B>,
    input_access: bool,
}

impl<B: WindowBackend> Daemon<B> {
    pub fn new(detector: GestureDetector, session: SwitcherSession<B>, input_access: bool) -> Self {
        Daemon {
            detector,
            session,
            input_access,
        }
    }

    /// Main event loop
    pub async fn run(
        mut self,
        mut input_rx: mpsc::UnboundedReceiver<InputEvent>,
        mut ipc_rx: mpsc::UnboundedReceiver<IpcRequest>,
    ) -> Result<()> {
        info!("Starting daemon event loop");

        loop {
            let deadline = self.session.next_deadline();
            let sleep = tokio::time::sleep_until(
                deadline
                    .map(tokio::time::Instant::from_std)
                    .unwrap_or_else(tokio::time::Instant::now),
            );

            tokio::select! {
                Some(event) = input_rx.recv() => {
                    self.handle_input(event, Instant::now());
                }
                Some((command, reply)) = ipc_rx.recv() => {
                    let (response, flow) = self.handle_ipc(command, Instant::now());
                    if reply.send(response).is_err() {
                        debug!("IPC client went away before the reply");
                    }
                    if flow == Flow::Stop {
                        info!("Shutdown requested");
                        break;
                    }
                }
                _ = sleep, if deadline.is_some() => {
                    self.session.fire_due(Instant::now());
                }
                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }
        }

        self.session.close();
        Ok(())
    }

    fn handle_input(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::Gesture(modifier_event) => {
                if let Some(signal) = self.detector.process(modifier_event) {
                    debug!("Double tap at {:?}", signal.at);
                    self.session.toggle();
                }
            }
            InputEvent::Command(command) => {
                if self.session.is_open() {
                    let outcome = self.session.handle(command, now);
                    log_outcome(outcome);
                }
            }
        }
    }

    fn handle_ipc(&mut self, command: IpcCommand, now: Instant) -> (IpcResponse, Flow) {
        let session_command = match command {
            IpcCommand::Show => {
                self.session.open();
                return (IpcResponse::Ok, Flow::Continue);
            }
            IpcCommand::Hide => {
                self.session.close();
                return (IpcResponse::Ok, Flow::Continue);
            }
            IpcCommand::Toggle => {
                self.session.toggle();
                return (IpcResponse::Ok, Flow::Continue);
            }
            IpcCommand::Status => return (self.status(), Flow::Continue),
            IpcCommand::Shutdown => return (IpcResponse::Ok, Flow::Stop),
            IpcCommand::Next => SessionCommand::MoveSelection(1),
            IpcCommand::Prev => SessionCommand::MoveSelection(-1),
            IpcCommand::Select => SessionCommand::Enter,
            IpcCommand::Cancel => SessionCommand::Escape,
            IpcCommand::Screen(number) => SessionCommand::MoveToScreen(number),
        };

        if !self.session.is_open() {
            return (
                IpcResponse::Error("Switcher is not open".to_string()),
                Flow::Continue,
            );
        }

        let outcome = self.session.handle(session_command, now);
        let response = match &outcome {
            CommandOutcome::Failed(e) => IpcResponse::Error(e.to_string()),
            _ => IpcResponse::Ok,
        };
        log_outcome(outcome);
        (response, Flow::Continue)
    }

    fn status(&self) -> IpcResponse {
        let status = self.session.status();
        IpcResponse::Status {
            open: status.open,
            window_count: status.window_count,
            selected_index: status.selected_index,
            search_text: status.search_text,
            input_access: self.input_access,
            window_access: status.windows_accessible,
        }
    }
}

fn log_outcome(outcome: CommandOutcome) {
    match outcome {
        CommandOutcome::Focused(identity) => info!("Focused {}", identity),
        CommandOutcome::Moved {
            identity,
            screen,
            position,
        } => info!(
            "Moved {} to screen {} at {:.0},{:.0}",
            identity,
            screen + 1,
            position.x,
            position.y
        ),
        CommandOutcome::Failed(e) => warn!("Command failed: {}", e),
        CommandOutcome::Ignored | CommandOutcome::Updated | CommandOutcome::Closed => {}
    }
}
