//! Collaborator interfaces the window directory is built on.
//!
//! The directory never talks to a compositor directly. Enumeration, screen
//! layout and window manipulation are delegated to implementations of these
//! traits; `sway_client` provides the real one, tests provide fakes.

use crate::error::BackendError;
use crate::geometry::{Point, Rect, Size};

/// Opaque reference to an application icon (an icon-theme name or path).
/// The core only carries it through to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IconRef(pub String);

/// One window as reported by a [`WindowSource`].
#[derive(Debug, Clone)]
pub struct SourceWindow<H> {
    pub window_id: i64,
    pub title: String,
    pub minimized: bool,
    pub position: Point,
    pub size: Size,
    pub handle: H,
}

/// An application and the result of reading its windows.
///
/// `windows` is an `Err` when that one application could not be inspected;
/// the directory skips it and keeps the rest.
#[derive(Debug, Clone)]
pub struct AppWindows<H> {
    pub pid: i32,
    pub name: Option<String>,
    pub icon: Option<IconRef>,
    pub windows: Result<Vec<SourceWindow<H>>, BackendError>,
}

/// One physical display. `visible_frame` excludes bars and docks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screen {
    pub frame: Rect,
    pub visible_frame: Rect,
}

pub trait WindowSource {
    /// Platform token used to manipulate a window later on.
    type Handle: Clone + std::fmt::Debug;

    /// List regular, on-screen windows grouped by owning application.
    ///
    /// An `Err` means nothing could be read at all (no connection, no permission).
    fn enumerate(&mut self) -> Result<Vec<AppWindows<Self::Handle>>, BackendError>;
}

pub trait ScreenLayoutSource {
    /// Displays in their stable order; index 0 is the primary display.
    fn screens(&mut self) -> Result<Vec<Screen>, BackendError>;

    /// Current pointer location, if the platform exposes one.
    fn pointer_location(&mut self) -> Option<Point> {
        None
    }
}

pub trait WindowController<H> {
    fn raise(&mut self, handle: &H) -> Result<(), BackendError>;

    fn activate_owning_app(&mut self, pid: i32) -> Result<(), BackendError>;

    fn set_minimized(&mut self, handle: &H, minimized: bool) -> Result<(), BackendError>;

    fn set_position(&mut self, handle: &H, position: Point) -> Result<(), BackendError>;
}

/// Everything the directory needs from one backend.
pub trait WindowBackend:
    WindowSource + ScreenLayoutSource + WindowController<<Self as WindowSource>::Handle>
{
}

impl<T> WindowBackend for T where
    T: WindowSource + ScreenLayoutSource + WindowController<<T as WindowSource>::Handle>
{
}

/// In-memory backend for tests. Handles are the window ids.
#[cfg(test)]
pub mod fake {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum ControlCall {
        Raise(i64),
        Activate(i32),
        SetMinimized(i64, bool),
        SetPosition(i64, Point),
    }

    #[derive(Default)]
    pub struct FakeBackend {
        pub apps: Vec<AppWindows<i64>>,
        pub screens: Vec<Screen>,
        pub pointer: Option<Point>,
        pub calls: Vec<ControlCall>,
        pub enumerate_error: Option<BackendError>,
        pub control_error: Option<BackendError>,
        pub enumerations: usize,
    }

    impl FakeBackend {
        pub fn new(apps: Vec<AppWindows<i64>>) -> Self {
            FakeBackend {
                apps,
                screens: vec![screen(0.0, 0.0, 1920.0, 1080.0)],
                ..Default::default()
            }
        }

        pub fn with_screens(mut self, screens: Vec<Screen>) -> Self {
            self.screens = screens;
            self
        }

        fn control(&mut self, call: ControlCall) -> Result<(), BackendError> {
            self.calls.push(call);
            match &self.control_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        fn window_mut(&mut self, id: i64) -> Option<&mut SourceWindow<i64>> {
            self.apps
                .iter_mut()
                .filter_map(|app| app.windows.as_mut().ok())
                .flat_map(|windows| windows.iter_mut())
                .find(|w| w.handle == id)
        }
    }

    pub fn screen(x: f64, y: f64, width: f64, height: f64) -> Screen {
        let frame = Rect::new(x, y, width, height);
        // 30px bar along the top
        let visible_frame = Rect::new(x, y + 30.0, width, height - 30.0);
        Screen {
            frame,
            visible_frame,
        }
    }

    pub fn app(pid: i32, name: &str, windows: Vec<SourceWindow<i64>>) -> AppWindows<i64> {
        AppWindows {
            pid,
            name: Some(name.to_string()),
            icon: Some(IconRef(name.to_lowercase())),
            windows: Ok(windows),
        }
    }

    pub fn window(id: i64, title: &str, minimized: bool) -> SourceWindow<i64> {
        window_at(id, title, minimized, 100.0, 100.0)
    }

    pub fn window_at(id: i64, title: &str, minimized: bool, x: f64, y: f64) -> SourceWindow<i64> {
        SourceWindow {
            window_id: id,
            title: title.to_string(),
            minimized,
            position: Point::new(x, y),
            size: Size::new(800.0, 600.0),
            handle: id,
        }
    }

    impl WindowSource for FakeBackend {
        type Handle = i64;

        fn enumerate(&mut self) -> Result<Vec<AppWindows<i64>>, BackendError> {
            self.enumerations += 1;
            match &self.enumerate_error {
                Some(e) => Err(e.clone()),
                None => Ok(self.apps.clone()),
            }
        }
    }

    impl ScreenLayoutSource for FakeBackend {
        fn screens(&mut self) -> Result<Vec<Screen>, BackendError> {
            Ok(self.screens.clone())
        }

        fn pointer_location(&mut self) -> Option<Point> {
            self.pointer
        }
    }

    impl WindowController<i64> for FakeBackend {
        fn raise(&mut self, handle: &i64) -> Result<(), BackendError> {
            self.control(ControlCall::Raise(*handle))
        }

        fn activate_owning_app(&mut self, pid: i32) -> Result<(), BackendError> {
            self.control(ControlCall::Activate(pid))
        }

        fn set_minimized(&mut self, handle: &i64, minimized: bool) -> Result<(), BackendError> {
            self.control(ControlCall::SetMinimized(*handle, minimized))
        }

        fn set_position(&mut self, handle: &i64, position: Point) -> Result<(), BackendError> {
            let result = self.control(ControlCall::SetPosition(*handle, position));
            if result.is_ok()
                && let Some(window) = self.window_mut(*handle)
            {
                window.position = position;
            }
            result
        }
    }
}
