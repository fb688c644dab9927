//! Switcher session: the open/closed lifecycle, search text and selection cursor.
//!
//! The session owns the [`WindowDirectory`] and is the only thing input and
//! presentation layers talk to. Every mutation is pushed to registered
//! [`SessionObserver`]s.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{CaptureError, DirectoryError};
use crate::geometry::Point;
use crate::window_directory::{WindowDirectory, WindowIdentity, WindowRecord};
use crate::window_source::WindowBackend;

/// Inset of the panel anchor from the top-left of the visible frame.
const PANEL_MARGIN: f64 = 20.0;

/// Discrete input the session reacts to while open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    MoveSelection(isize),
    AppendSearchChar(char),
    Backspace,
    Escape,
    Enter,
    /// One-based screen number, 1..=9.
    MoveToScreen(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Ignored,
    Updated,
    Closed,
    Focused(WindowIdentity),
    Moved {
        identity: WindowIdentity,
        screen: usize,
        position: Point,
    },
    Failed(DirectoryError),
}

/// Exclusive keyboard capture held while the session is open.
pub trait InputCapture {
    fn acquire(&mut self) -> Result<(), CaptureError>;

    fn release(&mut self);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub search_text: String,
    pub selected_index: usize,
}

/// Where the presentation layer should place its panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelAnchor {
    pub screen_index: usize,
    pub origin: Point,
}

/// Read-only snapshot handed to observers.
pub struct SessionView<'a, H> {
    pub open: bool,
    pub search_text: &'a str,
    pub selected_index: usize,
    pub windows: &'a [&'a WindowRecord<H>],
    pub anchor: Option<PanelAnchor>,
    pub screen_count: usize,
}

impl<H> SessionView<'_, H> {
    pub fn selected(&self) -> Option<&WindowRecord<H>> {
        self.windows.get(self.selected_index).copied()
    }

    /// Placeholder text when there is nothing to list.
    pub fn empty_message(&self) -> Option<String> {
        if !self.windows.is_empty() {
            None
        } else if self.search_text.is_empty() {
            Some("No windows".to_string())
        } else {
            Some(format!("No matches for '{}'", self.search_text))
        }
    }
}

pub trait SessionObserver<H> {
    fn session_changed(&mut self, view: &SessionView<'_, H>);
}

/// Summary for status queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub open: bool,
    pub window_count: usize,
    pub selected_index: Option<usize>,
    pub search_text: String,
    pub windows_accessible: bool,
}

pub struct SwitcherSession<B: WindowBackend> {
    directory: WindowDirectory<B>,
    capture: Box<dyn InputCapture>,
    observers: Vec<Box<dyn SessionObserver<B::Handle>>>,
    open: bool,
    state: SessionState,
    anchor: Option<PanelAnchor>,
    recapture_delay: Duration,
    pending_recapture: Option<Instant>,
}

impl<B: WindowBackend> SwitcherSession<B> {
    pub fn new(
        directory: WindowDirectory<B>,
        capture: Box<dyn InputCapture>,
        recapture_delay: Duration,
    ) -> Self {
        SwitcherSession {
            directory,
            capture,
            observers: Vec::new(),
            open: false,
            state: SessionState::default(),
            anchor: None,
            recapture_delay,
            pending_recapture: None,
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn SessionObserver<B::Handle>>) {
        self.observers.push(observer);
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    #[cfg(test)]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[cfg(test)]
    pub fn anchor(&self) -> Option<PanelAnchor> {
        self.anchor
    }

    #[cfg(test)]
    pub fn directory(&self) -> &WindowDirectory<B> {
        &self.directory
    }

    /// The list currently shown: the sorted view narrowed by the search text.
    pub fn filtered(&self) -> Vec<&WindowRecord<B::Handle>> {
        self.directory.filtered(&self.state.search_text)
    }

    pub fn status(&self) -> SessionStatus {
        let window_count = if self.open { self.filtered().len() } else { 0 };
        SessionStatus {
            open: self.open,
            window_count,
            selected_index: (self.open && window_count > 0).then_some(self.state.selected_index),
            search_text: self.state.search_text.clone(),
            windows_accessible: self.directory.accessible(),
        }
    }

    /// Open the switcher. Returns false if it was already open.
    pub fn open(&mut self) -> bool {
        if self.open {
            debug!("Session already open");
            return false;
        }

        self.state = SessionState::default();
        self.directory.refresh();
        self.anchor = self.compute_anchor();

        if let Err(e) = self.capture.acquire() {
            warn!("Could not capture input: {}", e);
        }

        self.open = true;
        info!(
            "Session opened with {} windows on screen {:?}",
            self.directory.windows().len(),
            self.anchor.map(|a| a.screen_index)
        );
        self.notify();
        true
    }

    /// Close the switcher. Returns false if it was not open.
    pub fn close(&mut self) -> bool {
        if !self.open {
            return false;
        }

        self.open = false;
        self.pending_recapture = None;
        self.capture.release();
        info!("Session closed");
        self.notify();
        true
    }

    pub fn toggle(&mut self) {
        if self.open {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn handle(&mut self, command: SessionCommand, now: Instant) -> CommandOutcome {
        if !self.open {
            return CommandOutcome::Ignored;
        }

        debug!("Session command: {:?}", command);
        let outcome = match command {
            SessionCommand::MoveSelection(delta) => self.move_selection(delta),
            SessionCommand::AppendSearchChar(c) => self.append_search_char(c),
            SessionCommand::Backspace => self.backspace(),
            SessionCommand::Escape => self.escape(),
            SessionCommand::Enter => self.select_current(),
            SessionCommand::MoveToScreen(number) => self.move_current_to_screen(number, now),
        };

        // close() already notified
        if matches!(outcome, CommandOutcome::Updated | CommandOutcome::Moved { .. }) {
            self.notify();
        }
        outcome
    }

    /// Deadline of the pending input re-capture, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_recapture
    }

    /// Run the re-capture if it is due. Returns true if it fired.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.pending_recapture {
            Some(deadline) if now >= deadline => {
                self.pending_recapture = None;
                if self.open {
                    debug!("Re-acquiring input capture after move");
                    if let Err(e) = self.capture.acquire() {
                        warn!("Could not re-capture input: {}", e);
                    }
                }
                true
            }
            _ => false,
        }
    }

    fn move_selection(&mut self, delta: isize) -> CommandOutcome {
        let count = self.filtered().len();
        let target = self.state.selected_index as isize + delta;
        if target < 0 || target as usize >= count {
            return CommandOutcome::Ignored;
        }
        self.state.selected_index = target as usize;
        CommandOutcome::Updated
    }

    fn append_search_char(&mut self, c: char) -> CommandOutcome {
        if !(c.is_alphanumeric() || c == ' ') {
            return CommandOutcome::Ignored;
        }
        self.state.search_text.push(c);
        self.state.selected_index = 0;
        CommandOutcome::Updated
    }

    fn backspace(&mut self) -> CommandOutcome {
        if self.state.search_text.pop().is_none() {
            return CommandOutcome::Ignored;
        }
        self.state.selected_index = 0;
        CommandOutcome::Updated
    }

    fn escape(&mut self) -> CommandOutcome {
        if self.state.search_text.is_empty() {
            self.close();
            return CommandOutcome::Closed;
        }
        self.state.search_text.clear();
        self.state.selected_index = 0;
        CommandOutcome::Updated
    }

    fn selected_identity(&self) -> Option<WindowIdentity> {
        self.filtered()
            .get(self.state.selected_index)
            .map(|w| w.identity)
    }

    fn select_current(&mut self) -> CommandOutcome {
        let Some(identity) = self.selected_identity() else {
            return CommandOutcome::Ignored;
        };

        self.pending_recapture = None;
        match self.directory.focus(identity) {
            Ok(()) => {
                self.close();
                CommandOutcome::Focused(identity)
            }
            Err(e) => {
                warn!("Focus failed: {}", e);
                CommandOutcome::Failed(e)
            }
        }
    }

    fn move_current_to_screen(&mut self, number: u8, now: Instant) -> CommandOutcome {
        if !(1..=9).contains(&number) {
            return CommandOutcome::Ignored;
        }
        let Some(identity) = self.selected_identity() else {
            return CommandOutcome::Ignored;
        };

        let screen = usize::from(number - 1);
        self.pending_recapture = None;
        match self.directory.move_to_screen(identity, screen) {
            Ok(position) => {
                self.follow_selection(identity);
                // Repositioning can steal keyboard focus from us.
                self.pending_recapture = Some(now + self.recapture_delay);
                CommandOutcome::Moved {
                    identity,
                    screen,
                    position,
                }
            }
            Err(e) => {
                debug!("Move rejected: {}", e);
                CommandOutcome::Failed(e)
            }
        }
    }

    /// Keep the cursor on `identity` after a refresh, or clamp it into range.
    fn follow_selection(&mut self, identity: WindowIdentity) {
        let filtered = self.filtered();
        let index = filtered
            .iter()
            .position(|w| w.identity == identity)
            .unwrap_or_else(|| self.state.selected_index.min(filtered.len().saturating_sub(1)));
        self.state.selected_index = index;
    }

    fn compute_anchor(&mut self) -> Option<PanelAnchor> {
        let pointer = self.directory.pointer_location();
        let screen_index = pointer
            .and_then(|p| self.directory.screen_at(p))
            .unwrap_or(0);
        let screen = self.directory.screens().get(screen_index)?;
        Some(PanelAnchor {
            screen_index,
            origin: Point::new(
                screen.visible_frame.origin.x + PANEL_MARGIN,
                screen.visible_frame.origin.y + PANEL_MARGIN,
            ),
        })
    }

    fn notify(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let windows = self.directory.filtered(&self.state.search_text);
        let view = SessionView {
            open: self.open,
            search_text: &self.state.search_text,
            selected_index: self.state.selected_index,
            windows: &windows,
            anchor: self.anchor,
            screen_count: self.directory.screens().len(),
        };
        for observer in &mut self.observers {
            observer.session_changed(&view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window_source::fake::{app, screen, window, ControlCall, FakeBackend};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    struct RecordingCapture {
        log: Log,
    }

    impl InputCapture for RecordingCapture {
        fn acquire(&mut self) -> Result<(), CaptureError> {
            self.log.borrow_mut().push("acquire");
            Ok(())
        }

        fn release(&mut self) {
            self.log.borrow_mut().push("release");
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Seen {
        open: bool,
        search: String,
        selected: usize,
        count: usize,
    }

    struct RecordingObserver {
        seen: Rc<RefCell<Vec<Seen>>>,
    }

    impl SessionObserver<i64> for RecordingObserver {
        fn session_changed(&mut self, view: &SessionView<'_, i64>) {
            self.seen.borrow_mut().push(Seen {
                open: view.open,
                search: view.search_text.to_string(),
                selected: view.selected_index,
                count: view.windows.len(),
            });
        }
    }

    const DELAY: Duration = Duration::from_millis(100);

    fn backend() -> FakeBackend {
        FakeBackend::new(vec![
            app(10, "Terminal", vec![window(1, "bash", false), window(2, "htop", false)]),
            app(20, "Firefox", vec![window(3, "Docs", false)]),
        ])
        .with_screens(vec![
            screen(0.0, 0.0, 1920.0, 1080.0),
            screen(1920.0, 0.0, 1920.0, 1080.0),
        ])
    }

    fn session_with(backend: FakeBackend) -> (SwitcherSession<FakeBackend>, Log) {
        let log: Log = Rc::default();
        let capture = RecordingCapture { log: log.clone() };
        let session = SwitcherSession::new(WindowDirectory::new(backend), Box::new(capture), DELAY);
        (session, log)
    }

    fn open_session() -> (SwitcherSession<FakeBackend>, Log) {
        let (mut session, log) = session_with(backend());
        assert!(session.open());
        (session, log)
    }

    fn type_text(session: &mut SwitcherSession<FakeBackend>, text: &str, now: Instant) {
        for c in text.chars() {
            session.handle(SessionCommand::AppendSearchChar(c), now);
        }
    }

    // ==================== lifecycle ====================

    #[test]
    fn test_open_refreshes_and_captures() {
        let (session, log) = open_session();
        assert!(session.is_open());
        assert_eq!(session.filtered().len(), 3);
        assert_eq!(session.directory().backend().enumerations, 1);
        assert_eq!(*log.borrow(), vec!["acquire"]);
    }

    #[test]
    fn test_second_open_is_noop() {
        let (mut session, log) = open_session();
        assert!(!session.open());
        assert_eq!(session.directory().backend().enumerations, 1);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_open_resets_state() {
        let (mut session, _) = open_session();
        let now = Instant::now();
        type_text(&mut session, "ba", now);
        session.close();
        session.open();
        assert_eq!(session.state(), &SessionState::default());
    }

    #[test]
    fn test_close_releases_capture() {
        let (mut session, log) = open_session();
        assert!(session.close());
        assert!(!session.close());
        assert_eq!(*log.borrow(), vec!["acquire", "release"]);
    }

    #[test]
    fn test_toggle() {
        let (mut session, _) = session_with(backend());
        session.toggle();
        assert!(session.is_open());
        session.toggle();
        assert!(!session.is_open());
    }

    #[test]
    fn test_commands_ignored_when_closed() {
        let (mut session, _) = session_with(backend());
        let now = Instant::now();
        assert_eq!(
            session.handle(SessionCommand::AppendSearchChar('a'), now),
            CommandOutcome::Ignored
        );
        assert_eq!(session.handle(SessionCommand::Enter, now), CommandOutcome::Ignored);
        assert!(session.state().search_text.is_empty());
    }

    // ==================== anchor ====================

    #[test]
    fn test_anchor_follows_pointer_screen() {
        let mut backend = backend();
        backend.pointer = Some(Point::new(2500.0, 400.0));
        let (mut session, _) = session_with(backend);
        session.open();

        let anchor = session.anchor().unwrap();
        assert_eq!(anchor.screen_index, 1);
        assert_eq!(anchor.origin, Point::new(1940.0, 50.0));
    }

    #[test]
    fn test_anchor_falls_back_to_primary() {
        let mut backend = backend();
        backend.pointer = Some(Point::new(-100.0, -100.0));
        let (mut session, _) = session_with(backend);
        session.open();
        assert_eq!(session.anchor().unwrap().screen_index, 0);
    }

    // ==================== selection & search ====================

    #[test]
    fn test_move_selection_clamps() {
        let (mut session, _) = open_session();
        let now = Instant::now();

        assert_eq!(session.handle(SessionCommand::MoveSelection(-1), now), CommandOutcome::Ignored);
        assert_eq!(session.handle(SessionCommand::MoveSelection(1), now), CommandOutcome::Updated);
        assert_eq!(session.handle(SessionCommand::MoveSelection(1), now), CommandOutcome::Updated);
        assert_eq!(session.state().selected_index, 2);
        // Already on the last entry.
        assert_eq!(session.handle(SessionCommand::MoveSelection(1), now), CommandOutcome::Ignored);
        assert_eq!(session.state().selected_index, 2);
    }

    #[test]
    fn test_move_selection_on_empty_view() {
        let (mut session, _) = open_session();
        let now = Instant::now();
        type_text(&mut session, "zzz", now);
        assert!(session.filtered().is_empty());
        assert_eq!(session.handle(SessionCommand::MoveSelection(1), now), CommandOutcome::Ignored);
        assert_eq!(session.state().selected_index, 0);
    }

    #[test]
    fn test_append_search_char_filters_and_resets_selection() {
        let (mut session, _) = open_session();
        let now = Instant::now();
        session.handle(SessionCommand::MoveSelection(1), now);

        assert_eq!(
            session.handle(SessionCommand::AppendSearchChar('T'), now),
            CommandOutcome::Updated
        );
        assert_eq!(session.state().selected_index, 0);
        assert_eq!(session.state().search_text, "T");
        // Both Terminal windows match on the owner name; Firefox/Docs has no 't'.
        assert_eq!(session.filtered().len(), 2);
    }

    #[test]
    fn test_append_search_char_rejects_punctuation() {
        let (mut session, _) = open_session();
        let now = Instant::now();
        for c in ['.', '-', '/', '\t'] {
            assert_eq!(
                session.handle(SessionCommand::AppendSearchChar(c), now),
                CommandOutcome::Ignored
            );
        }
        assert_eq!(
            session.handle(SessionCommand::AppendSearchChar(' '), now),
            CommandOutcome::Updated
        );
        assert_eq!(
            session.handle(SessionCommand::AppendSearchChar('7'), now),
            CommandOutcome::Updated
        );
        assert_eq!(session.state().search_text, " 7");
    }

    #[test]
    fn test_backspace() {
        let (mut session, _) = open_session();
        let now = Instant::now();
        assert_eq!(session.handle(SessionCommand::Backspace, now), CommandOutcome::Ignored);

        type_text(&mut session, "fir", now);
        assert_eq!(session.filtered().len(), 1);
        assert_eq!(session.handle(SessionCommand::Backspace, now), CommandOutcome::Updated);
        assert_eq!(session.state().search_text, "fi");
    }

    #[test]
    fn test_escape_clears_then_closes() {
        let (mut session, _) = open_session();
        let now = Instant::now();
        type_text(&mut session, "doc", now);

        assert_eq!(session.handle(SessionCommand::Escape, now), CommandOutcome::Updated);
        assert!(session.state().search_text.is_empty());
        assert!(session.is_open());

        assert_eq!(session.handle(SessionCommand::Escape, now), CommandOutcome::Closed);
        assert!(!session.is_open());
    }

    // ==================== enter ====================

    #[test]
    fn test_enter_focuses_selected_and_closes() {
        let (mut session, log) = open_session();
        let now = Instant::now();
        type_text(&mut session, "docs", now);

        let outcome = session.handle(SessionCommand::Enter, now);

        let firefox = WindowIdentity {
            pid: 20,
            window_id: 3,
        };
        assert_eq!(outcome, CommandOutcome::Focused(firefox));
        assert!(!session.is_open());
        assert_eq!(session.directory().focus_order().position(firefox), Some(0));
        assert!(session.directory().backend().calls.contains(&ControlCall::Raise(3)));
        assert_eq!(*log.borrow(), vec!["acquire", "release"]);
    }

    #[test]
    fn test_enter_on_empty_view_is_noop() {
        let (mut session, _) = open_session();
        let now = Instant::now();
        type_text(&mut session, "nomatch", now);
        assert_eq!(session.handle(SessionCommand::Enter, now), CommandOutcome::Ignored);
        assert!(session.is_open());
        assert!(session.directory().backend().calls.is_empty());
    }

    #[test]
    fn test_focused_window_ranks_first_next_time() {
        let (mut session, _) = open_session();
        let now = Instant::now();
        session.handle(SessionCommand::MoveSelection(1), now);
        session.handle(SessionCommand::MoveSelection(1), now);
        session.handle(SessionCommand::Enter, now);

        session.open();
        assert_eq!(session.filtered()[0].title, "Docs");
    }

    // ==================== move to screen ====================

    #[test]
    fn test_move_to_screen_schedules_recapture() {
        let (mut session, log) = open_session();
        let now = Instant::now();

        let outcome = session.handle(SessionCommand::MoveToScreen(2), now);

        assert!(matches!(outcome, CommandOutcome::Moved { screen: 1, .. }));
        assert!(session.is_open());
        assert_eq!(session.next_deadline(), Some(now + DELAY));

        assert!(!session.fire_due(now + Duration::from_millis(50)));
        assert_eq!(log.borrow().len(), 1);

        assert!(session.fire_due(now + DELAY));
        assert_eq!(*log.borrow(), vec!["acquire", "acquire"]);
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_move_to_screen_keeps_selection_on_moved_window() {
        let (mut session, _) = open_session();
        let now = Instant::now();
        session.handle(SessionCommand::MoveSelection(1), now);
        let selected = session.filtered()[1].identity;

        session.handle(SessionCommand::MoveToScreen(2), now);

        assert_eq!(session.filtered()[session.state().selected_index].identity, selected);
        assert_eq!(session.directory().get(selected).unwrap().screen_index, 1);
    }

    #[test]
    fn test_move_to_screen_out_of_range() {
        let (mut session, _) = open_session();
        let now = Instant::now();

        let outcome = session.handle(SessionCommand::MoveToScreen(3), now);

        assert_eq!(
            outcome,
            CommandOutcome::Failed(DirectoryError::OutOfRange { index: 2, screens: 2 })
        );
        assert_eq!(session.next_deadline(), None);
        assert!(session.directory().backend().calls.is_empty());
    }

    #[test]
    fn test_move_to_screen_invalid_numbers_ignored() {
        let (mut session, _) = open_session();
        let now = Instant::now();
        assert_eq!(session.handle(SessionCommand::MoveToScreen(0), now), CommandOutcome::Ignored);
        assert_eq!(session.handle(SessionCommand::MoveToScreen(10), now), CommandOutcome::Ignored);
    }

    #[test]
    fn test_close_cancels_pending_recapture() {
        let (mut session, log) = open_session();
        let now = Instant::now();
        session.handle(SessionCommand::MoveToScreen(2), now);
        session.close();

        assert_eq!(session.next_deadline(), None);
        assert!(!session.fire_due(now + DELAY));
        assert_eq!(*log.borrow(), vec!["acquire", "release"]);
    }

    #[test]
    fn test_new_move_reschedules_recapture() {
        let (mut session, _) = open_session();
        let now = Instant::now();
        session.handle(SessionCommand::MoveToScreen(2), now);
        let later = now + Duration::from_millis(60);
        session.handle(SessionCommand::MoveToScreen(1), later);
        assert_eq!(session.next_deadline(), Some(later + DELAY));
    }

    #[test]
    fn test_enter_cancels_pending_recapture() {
        let (mut session, _) = open_session();
        let now = Instant::now();
        session.handle(SessionCommand::MoveToScreen(2), now);
        session.handle(SessionCommand::Enter, now);
        assert_eq!(session.next_deadline(), None);
    }

    // ==================== observers & status ====================

    #[test]
    fn test_observers_see_every_mutation() {
        let (mut session, _) = session_with(backend());
        let seen = Rc::new(RefCell::new(Vec::new()));
        session.add_observer(Box::new(RecordingObserver { seen: seen.clone() }));
        let now = Instant::now();

        session.open();
        session.handle(SessionCommand::MoveSelection(1), now);
        session.handle(SessionCommand::AppendSearchChar('h'), now);
        session.handle(SessionCommand::MoveSelection(-1), now); // ignored, no notification
        session.handle(SessionCommand::Escape, now);
        session.handle(SessionCommand::Escape, now);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 5);
        assert_eq!(
            seen[0],
            Seen {
                open: true,
                search: String::new(),
                selected: 0,
                count: 3
            }
        );
        assert_eq!(seen[1].selected, 1);
        assert_eq!(seen[2].search, "h");
        assert_eq!(seen[2].count, 2);
        assert_eq!(seen[3].search, "");
        assert!(!seen[4].open);
    }

    #[test]
    fn test_empty_message() {
        let view: SessionView<'_, i64> = SessionView {
            open: true,
            search_text: "",
            selected_index: 0,
            windows: &[],
            anchor: None,
            screen_count: 1,
        };
        assert_eq!(view.empty_message(), Some("No windows".to_string()));

        let view: SessionView<'_, i64> = SessionView {
            search_text: "vim",
            ..view
        };
        assert_eq!(view.empty_message(), Some("No matches for 'vim'".to_string()));
    }

    #[test]
    fn test_status() {
        let (mut session, _) = session_with(backend());
        assert_eq!(session.status().window_count, 0);
        assert_eq!(session.status().selected_index, None);

        session.open();
        let status = session.status();
        assert!(status.open);
        assert_eq!(status.window_count, 3);
        assert_eq!(status.selected_index, Some(0));
        assert!(status.windows_accessible);
    }
}
