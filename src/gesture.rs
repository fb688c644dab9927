//! Double-tap detection for the command modifier.
//!
//! [`GestureDetector`] classifies a stream of modifier transitions into a
//! single [`DoubleTapSignal`]. It is a pure state machine: the caller supplies
//! a monotonic timestamp with every event and nothing here blocks or sleeps.

use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Raw modifier-relevant input, as delivered by the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierEvent {
    /// A non-modifier key went down.
    KeyDown { at: Instant },
    /// The modifier flags changed.
    FlagsChanged {
        at: Instant,
        command_pressed: bool,
        /// Shift, control or option/alt is held.
        other_modifier_pressed: bool,
    },
    /// The host revoked the input capture; the source re-arms it.
    TapInterrupted { at: Instant },
}

impl ModifierEvent {
    pub fn at(&self) -> Instant {
        match *self {
            ModifierEvent::KeyDown { at }
            | ModifierEvent::FlagsChanged { at, .. }
            | ModifierEvent::TapInterrupted { at } => at,
        }
    }
}

/// Emitted once per qualifying double tap. Means "toggle the switcher".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleTapSignal {
    pub at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    CmdDown,
    AwaitingSecondTap,
}

/// Timing thresholds for a tap. Empirical UX tuning, not derived values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapTiming {
    /// Longest allowed pause between the first release and the second press.
    pub max_tap_gap: Duration,
    /// Longest the key may be held for a press to count as a tap.
    pub max_hold: Duration,
}

impl TapTiming {
    /// Window between the first and the second release.
    pub fn combined_window(&self) -> Duration {
        self.max_tap_gap + self.max_hold
    }
}

impl Default for TapTiming {
    fn default() -> Self {
        TapTiming {
            max_tap_gap: Duration::from_millis(400),
            max_hold: Duration::from_millis(500),
        }
    }
}

pub struct GestureDetector {
    timing: TapTiming,
    command_down: bool,
    tap_count: u8,
    press_start: Option<Instant>,
    last_release: Option<Instant>,
    interfered: bool,
    last_event: Option<Instant>,
}

impl GestureDetector {
    pub fn new(timing: TapTiming) -> Self {
        GestureDetector {
            timing,
            command_down: false,
            tap_count: 0,
            press_start: None,
            last_release: None,
            interfered: false,
            last_event: None,
        }
    }

    pub fn timing(&self) -> TapTiming {
        self.timing
    }

    pub fn state(&self) -> GestureState {
        if self.command_down {
            GestureState::CmdDown
        } else if self.tap_count == 1 {
            GestureState::AwaitingSecondTap
        } else {
            GestureState::Idle
        }
    }

    /// Feed one event. Returns a signal when this event completes a double tap.
    pub fn process(&mut self, event: ModifierEvent) -> Option<DoubleTapSignal> {
        let now = event.at();

        if let Some(last) = self.last_event
            && now < last
        {
            debug!("Non-monotonic timestamp, resetting gesture");
            self.reset();
            if let ModifierEvent::FlagsChanged { command_pressed, .. } = event {
                self.command_down = command_pressed;
            }
            // A press straddling the reset must not count as a tap.
            self.interfered = self.command_down;
            self.last_event = Some(now);
            return None;
        }
        self.last_event = Some(now);

        match event {
            ModifierEvent::TapInterrupted { .. } => {
                debug!("Input capture interrupted, gesture state kept");
                None
            }
            ModifierEvent::KeyDown { .. } => {
                if self.command_down {
                    debug!("Key pressed while command held, discarding sequence");
                    self.reset();
                    self.interfered = true;
                }
                None
            }
            ModifierEvent::FlagsChanged {
                command_pressed,
                other_modifier_pressed,
                ..
            } => {
                if other_modifier_pressed {
                    debug!("Other modifier involved, discarding sequence");
                    self.reset();
                    self.command_down = command_pressed;
                    self.interfered = command_pressed;
                    return None;
                }

                match (self.command_down, command_pressed) {
                    (false, true) => {
                        self.on_press(now);
                        None
                    }
                    (true, false) => self.on_release(now),
                    _ => None,
                }
            }
        }
    }

    fn on_press(&mut self, now: Instant) {
        if self.tap_count == 1 && self.since_last_release(now) > self.timing.max_tap_gap {
            debug!("Second press too late, dropping first tap");
            self.tap_count = 0;
        }
        self.command_down = true;
        self.press_start = Some(now);
        self.interfered = false;
    }

    fn on_release(&mut self, now: Instant) -> Option<DoubleTapSignal> {
        self.command_down = false;
        let hold = self
            .press_start
            .take()
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or(Duration::MAX);

        if hold >= self.timing.max_hold || self.interfered {
            debug!("Release disqualified (hold {:?}, interfered {})", hold, self.interfered);
            self.reset();
            return None;
        }

        if self.tap_count == 1 && self.since_last_release(now) < self.timing.combined_window() {
            info!("Double tap detected");
            self.reset();
            return Some(DoubleTapSignal { at: now });
        }

        // First tap, or a second one too slow to pair: either way it opens a sequence.
        self.tap_count = 1;
        self.last_release = Some(now);
        debug!("Tap recorded, now {:?}", self.state());
        None
    }

    fn since_last_release(&self, now: Instant) -> Duration {
        self.last_release
            .map(|release| now.saturating_duration_since(release))
            .unwrap_or(Duration::MAX)
    }

    fn reset(&mut self) {
        self.tap_count = 0;
        self.interfered = false;
        self.press_start = None;
        self.last_release = None;
    }
}

impl Default for GestureDetector {
    fn default() -> Self {
        GestureDetector::new(TapTiming::default())
    }
}
