use anyhow::{Context, Result};
use evdev::uinput::VirtualDevice;
use evdev::{Device, EventType, KeyCode};
use std::collections::HashSet;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::gesture::ModifierEvent;
use crate::session::{InputCapture, SessionCommand};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const REOPEN_INTERVAL: Duration = Duration::from_secs(1);
const VIRTUAL_KEYBOARD_NAME: &str = "pane passthrough keyboard";

const LETTERS: [(KeyCode, char); 26] = [
    (KeyCode::KEY_A, 'a'),
    (KeyCode::KEY_B, 'b'),
    (KeyCode::KEY_C, 'c'),
    (KeyCode::KEY_D, 'd'),
    (KeyCode::KEY_E, 'e'),
    (KeyCode::KEY_F, 'f'),
    (KeyCode::KEY_G, 'g'),
    (KeyCode::KEY_H, 'h'),
    (KeyCode::KEY_I, 'i'),
    (KeyCode::KEY_J, 'j'),
    (KeyCode::KEY_K, 'k'),
    (KeyCode::KEY_L, 'l'),
    (KeyCode::KEY_M, 'm'),
    (KeyCode::KEY_N, 'n'),
    (KeyCode::KEY_O, 'o'),
    (KeyCode::KEY_P, 'p'),
    (KeyCode::KEY_Q, 'q'),
    (KeyCode::KEY_R, 'r'),
    (KeyCode::KEY_S, 's'),
    (KeyCode::KEY_T, 't'),
    (KeyCode::KEY_U, 'u'),
    (KeyCode::KEY_V, 'v'),
    (KeyCode::KEY_W, 'w'),
    (KeyCode::KEY_X, 'x'),
    (KeyCode::KEY_Y, 'y'),
    (KeyCode::KEY_Z, 'z'),
];

const DIGITS: [(KeyCode, u8); 10] = [
    (KeyCode::KEY_0, 0),
    (KeyCode::KEY_1, 1),
    (KeyCode::KEY_2, 2),
    (KeyCode::KEY_3, 3),
    (KeyCode::KEY_4, 4),
    (KeyCode::KEY_5, 5),
    (KeyCode::KEY_6, 6),
    (KeyCode::KEY_7, 7),
    (KeyCode::KEY_8, 8),
    (KeyCode::KEY_9, 9),
];

/// What the keyboard thread hands to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Fed to the double-tap detector, always.
    Gesture(ModifierEvent),
    /// Only meaningful while the switcher is open.
    Command(SessionCommand),
}

/// Held modifier keys, tracked per side so releasing one of a pair is not a full release.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModifierState {
    left_meta: bool,
    right_meta: bool,
    left_shift: bool,
    right_shift: bool,
    left_ctrl: bool,
    right_ctrl: bool,
    left_alt: bool,
    right_alt: bool,
}

impl ModifierState {
    /// Returns false if `key` is not a modifier.
    pub fn update_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        let slot = match key {
            KeyCode::KEY_LEFTMETA => &mut self.left_meta,
            KeyCode::KEY_RIGHTMETA => &mut self.right_meta,
            KeyCode::KEY_LEFTSHIFT => &mut self.left_shift,
            KeyCode::KEY_RIGHTSHIFT => &mut self.right_shift,
            KeyCode::KEY_LEFTCTRL => &mut self.left_ctrl,
            KeyCode::KEY_RIGHTCTRL => &mut self.right_ctrl,
            KeyCode::KEY_LEFTALT => &mut self.left_alt,
            KeyCode::KEY_RIGHTALT => &mut self.right_alt,
            _ => return false,
        };
        *slot = pressed;
        true
    }

    /// Super plays the role of the command key.
    pub fn command(&self) -> bool {
        self.left_meta || self.right_meta
    }

    pub fn shift(&self) -> bool {
        self.left_shift || self.right_shift
    }

    pub fn ctrl(&self) -> bool {
        self.left_ctrl || self.right_ctrl
    }

    pub fn alt(&self) -> bool {
        self.left_alt || self.right_alt
    }

    pub fn other(&self) -> bool {
        self.shift() || self.ctrl() || self.alt()
    }

    fn flags_event(&self, at: Instant) -> ModifierEvent {
        ModifierEvent::FlagsChanged {
            at,
            command_pressed: self.command(),
            other_modifier_pressed: self.other(),
        }
    }
}

/// Map a non-modifier key press to a session command.
///
/// Strokes with Super or Ctrl held belong to the system and are not translated.
pub fn translate_key(key: KeyCode, modifiers: &ModifierState) -> Option<SessionCommand> {
    if modifiers.command() || modifiers.ctrl() {
        return None;
    }

    if let Some(&(_, digit)) = DIGITS.iter().find(|(code, _)| *code == key) {
        if modifiers.alt() {
            return (digit >= 1).then_some(SessionCommand::MoveToScreen(digit));
        }
        return Some(SessionCommand::AppendSearchChar(char::from(b'0' + digit)));
    }

    if modifiers.alt() {
        return None;
    }

    if let Some(&(_, letter)) = LETTERS.iter().find(|(code, _)| *code == key) {
        let c = if modifiers.shift() {
            letter.to_ascii_uppercase()
        } else {
            letter
        };
        return Some(SessionCommand::AppendSearchChar(c));
    }

    match key {
        KeyCode::KEY_UP => Some(SessionCommand::MoveSelection(-1)),
        KeyCode::KEY_DOWN => Some(SessionCommand::MoveSelection(1)),
        KeyCode::KEY_ENTER | KeyCode::KEY_KPENTER => Some(SessionCommand::Enter),
        KeyCode::KEY_ESC => Some(SessionCommand::Escape),
        KeyCode::KEY_BACKSPACE => Some(SessionCommand::Backspace),
        KeyCode::KEY_SPACE => Some(SessionCommand::AppendSearchChar(' ')),
        _ => None,
    }
}

fn is_modifier(key: KeyCode) -> bool {
    matches!(
        key,
        KeyCode::KEY_LEFTMETA
            | KeyCode::KEY_RIGHTMETA
            | KeyCode::KEY_LEFTSHIFT
            | KeyCode::KEY_RIGHTSHIFT
            | KeyCode::KEY_LEFTCTRL
            | KeyCode::KEY_RIGHTCTRL
            | KeyCode::KEY_LEFTALT
            | KeyCode::KEY_RIGHTALT
    )
}

/// Turn one key transition into detector and session input.
/// `value` is 0 for release, 1 for press, 2 for autorepeat.
fn classify(modifiers: &mut ModifierState, key: KeyCode, value: i32, now: Instant) -> Vec<InputEvent> {
    let mut out = Vec::new();

    if is_modifier(key) {
        if value != 2 {
            let before = *modifiers;
            modifiers.update_key(key, value == 1);
            if *modifiers != before {
                out.push(InputEvent::Gesture(modifiers.flags_event(now)));
            }
        }
        return out;
    }

    if value == 0 {
        return out;
    }

    out.push(InputEvent::Gesture(ModifierEvent::KeyDown { at: now }));
    if let Some(command) = translate_key(key, modifiers) {
        out.push(InputEvent::Command(command));
    }
    out
}

/// Input derived from one key transition, and whether the compositor still needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Routed {
    events: Vec<InputEvent>,
    forward: bool,
}

/// Classifies key transitions and, while the keyboard is grabbed, picks the
/// ones to replay: everything the switcher did not turn into a command.
#[derive(Debug, Default)]
struct KeyRouter {
    modifiers: ModifierState,
    /// Keys whose press the switcher kept; their repeats and release stay with it.
    consumed: HashSet<KeyCode>,
}

impl KeyRouter {
    fn route(&mut self, key: KeyCode, value: i32, now: Instant, grabbed: bool) -> Routed {
        let events = classify(&mut self.modifiers, key, value, now);
        let forward = grabbed && self.passes_through(key, value, &events);
        Routed { events, forward }
    }

    fn passes_through(&mut self, key: KeyCode, value: i32, events: &[InputEvent]) -> bool {
        if value == 0 {
            return !self.consumed.remove(&key);
        }

        let translated = events.iter().any(|e| matches!(e, InputEvent::Command(_)));
        if translated || self.consumed.contains(&key) {
            self.consumed.insert(key);
            return false;
        }
        true
    }

    fn release_consumed(&mut self) {
        self.consumed.clear();
    }
}

/// uinput mirror of the grabbed keyboard, used to hand keys back to the compositor.
struct VirtualKeyboard {
    device: VirtualDevice,
}

impl VirtualKeyboard {
    fn mirror(source: &Device) -> Result<Self> {
        let keys = source
            .supported_keys()
            .context("Keyboard reports no keys")?;
        let device = VirtualDevice::builder()
            .context("Failed to open /dev/uinput")?
            .name(VIRTUAL_KEYBOARD_NAME)
            .with_keys(keys)?
            .build()
            .context("Failed to create virtual keyboard")?;
        Ok(VirtualKeyboard { device })
    }

    fn forward(&mut self, key: KeyCode, value: i32) -> std::io::Result<()> {
        self.device
            .emit(&[evdev::InputEvent::new(EventType::KEY.0, key.code(), value)])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureRequest {
    Grab,
    Ungrab,
}

/// [`InputCapture`] backed by an exclusive grab of the keyboard device.
///
/// The grab itself happens on the monitor thread; this only queues requests.
pub struct DeviceCapture {
    tx: Option<std_mpsc::Sender<CaptureRequest>>,
}

impl DeviceCapture {
    /// Capture that does nothing, for running without keyboard access.
    pub fn disabled() -> Self {
        DeviceCapture { tx: None }
    }

    fn send(&self, request: CaptureRequest) -> Result<(), CaptureError> {
        match &self.tx {
            Some(tx) => tx
                .send(request)
                .map_err(|_| CaptureError::Lost("keyboard monitor stopped".to_string())),
            None => Ok(()),
        }
    }
}

impl InputCapture for DeviceCapture {
    fn acquire(&mut self) -> Result<(), CaptureError> {
        self.send(CaptureRequest::Grab)
    }

    fn release(&mut self) {
        if let Err(e) = self.send(CaptureRequest::Ungrab) {
            debug!("Release ignored: {}", e);
        }
    }
}

pub struct KeyboardMonitor {
    device: Device,
    path: PathBuf,
    router: KeyRouter,
    passthrough: Option<VirtualKeyboard>,
    grabbed: bool,
    capture_rx: std_mpsc::Receiver<CaptureRequest>,
}

impl KeyboardMonitor {
    /// Open the keyboard device and the capture handle that controls it.
    pub fn new(explicit: Option<&Path>) -> Result<(Self, DeviceCapture)> {
        let (path, device) =
            Self::find_keyboard_device(explicit).context("Failed to find keyboard device")?;
        set_nonblocking(&device)?;

        info!("Using keyboard device: {:?} ({})", device.name(), path.display());

        // Without a way to replay keys, grabbing would swallow system shortcuts.
        let passthrough = match VirtualKeyboard::mirror(&device) {
            Ok(keyboard) => Some(keyboard),
            Err(e) => {
                warn!("Exclusive keyboard capture disabled: {:#}", e);
                None
            }
        };

        let (tx, capture_rx) = std_mpsc::channel();
        let monitor = KeyboardMonitor {
            device,
            path,
            router: KeyRouter::default(),
            passthrough,
            grabbed: false,
            capture_rx,
        };
        Ok((monitor, DeviceCapture { tx: Some(tx) }))
    }

    /// Find a keyboard under /dev/input/event* that has Super, letters and Enter.
    fn find_keyboard_device(explicit: Option<&Path>) -> Result<(PathBuf, Device)> {
        if let Some(path) = explicit {
            let device = Device::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            return Ok((path.to_path_buf(), device));
        }

        for (path, device) in evdev::enumerate() {
            if device.name() == Some(VIRTUAL_KEYBOARD_NAME) {
                continue;
            }
            if let Some(keys) = device.supported_keys()
                && keys.contains(KeyCode::KEY_LEFTMETA)
                && keys.contains(KeyCode::KEY_A)
                && keys.contains(KeyCode::KEY_ENTER)
            {
                debug!("Found suitable keyboard: {:?}", device.name());
                return Ok((path, device));
            }
        }

        anyhow::bail!("No suitable keyboard device found. Make sure you have permission to read /dev/input/event* devices.")
    }

    /// Read events until the receiver goes away. Runs on a dedicated thread.
    pub fn monitor_blocking(mut self, tx: mpsc::UnboundedSender<InputEvent>) -> Result<()> {
        info!("Starting keyboard monitoring");

        loop {
            self.apply_capture_requests();

            let fetched = self
                .device
                .fetch_events()
                .map(|events| events.collect::<Vec<_>>());

            match fetched {
                Ok(events) => {
                    let now = Instant::now();
                    for event in events {
                        if event.event_type() != EventType::KEY {
                            continue;
                        }
                        let key = KeyCode::new(event.code());
                        let routed = self.router.route(key, event.value(), now, self.grabbed);
                        if routed.forward {
                            self.forward(key, event.value());
                        }
                        for input in routed.events {
                            if tx.send(input).is_err() {
                                warn!("Failed to send input event, receiver dropped");
                                return Ok(());
                            }
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    warn!("Keyboard read failed: {}; re-arming", e);
                    let interrupted = InputEvent::Gesture(ModifierEvent::TapInterrupted {
                        at: Instant::now(),
                    });
                    if tx.send(interrupted).is_err() {
                        return Ok(());
                    }
                    self.reopen();
                }
            }
        }
    }

    fn forward(&mut self, key: KeyCode, value: i32) {
        if let Some(keyboard) = &mut self.passthrough
            && let Err(e) = keyboard.forward(key, value)
        {
            warn!("Failed to replay key {:?}: {}", key, e);
        }
    }

    fn apply_capture_requests(&mut self) {
        while let Ok(request) = self.capture_rx.try_recv() {
            match request {
                CaptureRequest::Grab if self.passthrough.is_none() => {
                    debug!("Grab skipped, no virtual keyboard to replay keys");
                }
                CaptureRequest::Grab if !self.grabbed => match self.device.grab() {
                    Ok(()) => {
                        debug!("Keyboard grabbed");
                        self.grabbed = true;
                    }
                    Err(e) => warn!("Failed to grab keyboard: {}", e),
                },
                CaptureRequest::Ungrab if self.grabbed => {
                    if let Err(e) = self.device.ungrab() {
                        warn!("Failed to release keyboard: {}", e);
                    }
                    debug!("Keyboard released");
                    self.grabbed = false;
                    self.router.release_consumed();
                }
                _ => {}
            }
        }
    }

    /// Reopen the device after a read error, retrying until it comes back.
    fn reopen(&mut self) {
        loop {
            match Device::open(&self.path).and_then(|device| {
                set_nonblocking(&device)?;
                Ok(device)
            }) {
                Ok(device) => {
                    self.device = device;
                    self.router = KeyRouter::default();
                    let regrab = std::mem::take(&mut self.grabbed);
                    if regrab {
                        self.apply_grab_after_reopen();
                    }
                    info!("Keyboard device {} reopened", self.path.display());
                    return;
                }
                Err(e) => {
                    debug!("Reopen of {} failed: {}", self.path.display(), e);
                    std::thread::sleep(REOPEN_INTERVAL);
                }
            }
        }
    }

    fn apply_grab_after_reopen(&mut self) {
        match self.device.grab() {
            Ok(()) => self.grabbed = true,
            Err(e) => warn!("Failed to re-grab keyboard: {}", e),
        }
    }
}

fn set_nonblocking(device: &Device) -> std::io::Result<()> {
    let fd = device.as_raw_fd();
    // SAFETY: fd is a valid descriptor owned by `device` for the duration of the call.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Check if the current user can read a keyboard device.
///
/// Prints remediation hints once and returns the capability flag.
pub fn check_permissions(explicit: Option<&Path>) -> bool {
    match KeyboardMonitor::find_keyboard_device(explicit) {
        Ok(_) => {
            info!("Keyboard device access OK");
            true
        }
        Err(e) => {
            warn!("Keyboard access unavailable: {:#}", e);
            eprintln!("ERROR: Cannot access keyboard devices.");
            eprintln!("The double-tap gesture needs permission to read /dev/input/event* devices.");
            eprintln!("\nTo fix this, add your user to the 'input' group:");
            eprintln!("  sudo usermod -aG input $USER");
            eprintln!("  (then log out and log back in)");
            eprintln!("\nUntil then the switcher can still be opened with `pane show`.");
            false
        }
    }
}
