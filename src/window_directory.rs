use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{BackendError, DirectoryError};
use crate::geometry::{Point, Rect};
use crate::window_source::{IconRef, Screen, WindowBackend};

/// Stale focus-history entries tolerated before a refresh prunes them.
const PRUNE_SLACK: usize = 32;

/// Unique key of a window: owning process plus the backend's window id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowIdentity {
    pub pid: i32,
    pub window_id: i64,
}

impl fmt::Display for WindowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pid, self.window_id)
    }
}

#[derive(Debug, Clone)]
pub struct WindowRecord<H> {
    pub identity: WindowIdentity,
    pub title: String,
    pub owner_name: String,
    pub icon: Option<IconRef>,
    pub minimized: bool,
    pub screen_index: usize,
    pub frame: Rect,
    pub handle: H,
}

impl<H> WindowRecord<H> {
    /// `needle` must already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.owner_name.to_lowercase().contains(needle)
    }
}

/// Recency-ranked window identities, most recently focused first.
///
/// Identities of closed windows linger until a refresh finds too many of them;
/// lookups simply never match them.
#[derive(Debug, Clone, Default)]
pub struct FocusOrder {
    order: Vec<WindowIdentity>,
}

impl FocusOrder {
    /// Move `identity` to the front.
    pub fn promote(&mut self, identity: WindowIdentity) {
        if self.order.first() == Some(&identity) {
            return;
        }
        self.order.retain(|id| *id != identity);
        self.order.insert(0, identity);
    }

    #[cfg(test)]
    pub fn position(&self, identity: WindowIdentity) -> Option<usize> {
        self.order.iter().position(|id| *id == identity)
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[WindowIdentity] {
        &self.order
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn ranks(&self) -> HashMap<WindowIdentity, usize> {
        self.order.iter().enumerate().map(|(rank, id)| (*id, rank)).collect()
    }

    fn prune_if_stale(&mut self, live: &HashSet<WindowIdentity>) {
        if self.order.len() <= live.len() + PRUNE_SLACK {
            return;
        }
        let before = self.order.len();
        self.order.retain(|id| live.contains(id));
        debug!("Pruned {} stale focus-order entries", before - self.order.len());
    }
}

struct Snapshot<H> {
    windows: Vec<WindowRecord<H>>,
    screens: Vec<Screen>,
}

impl<H> Default for Snapshot<H> {
    fn default() -> Self {
        Snapshot {
            windows: Vec::new(),
            screens: Vec::new(),
        }
    }
}

/// Current window set, its focus-order ranking, and the focus/move operations.
pub struct WindowDirectory<B: WindowBackend> {
    backend: B,
    snapshot: Snapshot<B::Handle>,
    focus_order: FocusOrder,
    accessible: bool,
}

impl<B: WindowBackend> WindowDirectory<B> {
    /// The directory starts empty; call [`refresh`](Self::refresh) to populate it.
    pub fn new(backend: B) -> Self {
        WindowDirectory {
            backend,
            snapshot: Snapshot::default(),
            focus_order: FocusOrder::default(),
            accessible: true,
        }
    }

    /// Re-read windows and screens from the backend and replace the snapshot.
    ///
    /// Applications that cannot be read are skipped. If nothing can be read at
    /// all the snapshot becomes empty and [`accessible`](Self::accessible) turns false.
    pub fn refresh(&mut self) {
        let screens = match self.backend.screens() {
            Ok(screens) => screens,
            Err(e) => {
                warn!("Could not read screen layout: {}", e);
                Vec::new()
            }
        };

        let apps = match self.backend.enumerate() {
            Ok(apps) => {
                self.set_accessible(true, None);
                apps
            }
            Err(e) => {
                self.set_accessible(false, Some(&e));
                self.snapshot = Snapshot {
                    windows: Vec::new(),
                    screens,
                };
                return;
            }
        };

        let mut seen = HashSet::new();
        let mut windows = Vec::new();
        let mut skipped = 0;

        for app in apps {
            let owner_name = app
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Unknown".to_string());

            let app_windows = match app.windows {
                Ok(app_windows) => app_windows,
                Err(e) => {
                    warn!("Skipping {} (pid {}): {}", owner_name, app.pid, e);
                    skipped += 1;
                    continue;
                }
            };

            for window in app_windows {
                let identity = WindowIdentity {
                    pid: app.pid,
                    window_id: window.window_id,
                };
                if !seen.insert(identity) {
                    debug!("Duplicate window {} from source, keeping the first", identity);
                    continue;
                }

                let title = if window.title.is_empty() {
                    owner_name.clone()
                } else {
                    window.title
                };

                windows.push(WindowRecord {
                    identity,
                    title,
                    owner_name: owner_name.clone(),
                    icon: app.icon.clone(),
                    minimized: window.minimized,
                    screen_index: screen_index_for(&screens, window.position),
                    frame: Rect {
                        origin: window.position,
                        size: window.size,
                    },
                    handle: window.handle,
                });
            }
        }

        sort_by_focus_order(&mut windows, &self.focus_order);
        self.focus_order.prune_if_stale(&seen);

        debug!(
            "Refreshed to {} windows on {} screens ({} apps skipped)",
            windows.len(),
            screens.len(),
            skipped
        );
        self.snapshot = Snapshot { windows, screens };
    }

    /// The sorted view: visible windows before minimized ones, each group by focus order.
    pub fn windows(&self) -> &[WindowRecord<B::Handle>] {
        &self.snapshot.windows
    }

    pub fn screens(&self) -> &[Screen] {
        &self.snapshot.screens
    }

    /// Sorted windows whose title or owner name contains `query`, ignoring case.
    pub fn filtered(&self, query: &str) -> Vec<&WindowRecord<B::Handle>> {
        if query.is_empty() {
            return self.snapshot.windows.iter().collect();
        }

        let needle = query.to_lowercase();
        let matches: Vec<_> = self
            .snapshot
            .windows
            .iter()
            .filter(|w| w.matches(&needle))
            .collect();
        debug!(
            "Search '{}' in {} windows -> {} results",
            query,
            self.snapshot.windows.len(),
            matches.len()
        );
        matches
    }

    #[cfg(test)]
    pub fn get(&self, identity: WindowIdentity) -> Option<&WindowRecord<B::Handle>> {
        self.snapshot.windows.iter().find(|w| w.identity == identity)
    }

    #[cfg(test)]
    pub fn focus_order(&self) -> &FocusOrder {
        &self.focus_order
    }

    /// False once the backend refused enumeration entirely.
    pub fn accessible(&self) -> bool {
        self.accessible
    }

    /// Raise and activate a window, unminimizing it if needed, and make it
    /// the most recently focused one.
    ///
    /// Backend failures are logged and do not stop the focus-order update.
    pub fn focus(&mut self, identity: WindowIdentity) -> Result<(), DirectoryError> {
        let record = self
            .snapshot
            .windows
            .iter()
            .find(|w| w.identity == identity)
            .ok_or(DirectoryError::NotFound(identity))?;

        info!("Focusing '{}' ({})", record.title, identity);

        if let Err(e) = self.backend.raise(&record.handle) {
            warn!("Failed to raise {}: {}", identity, e);
        }
        if let Err(e) = self.backend.activate_owning_app(identity.pid) {
            warn!("Failed to activate pid {}: {}", identity.pid, e);
        }
        if record.minimized
            && let Err(e) = self.backend.set_minimized(&record.handle, false)
        {
            warn!("Failed to unminimize {}: {}", identity, e);
        }

        self.focus_order.promote(identity);
        Ok(())
    }

    /// Centre a window on the visible area of screen `target`, then refresh.
    ///
    /// Returns the position the window was sent to.
    pub fn move_to_screen(
        &mut self,
        identity: WindowIdentity,
        target: usize,
    ) -> Result<Point, DirectoryError> {
        let screen = *self
            .snapshot
            .screens
            .get(target)
            .ok_or(DirectoryError::OutOfRange {
                index: target,
                screens: self.snapshot.screens.len(),
            })?;

        let record = self
            .snapshot
            .windows
            .iter()
            .find(|w| w.identity == identity)
            .ok_or(DirectoryError::NotFound(identity))?;

        let position = screen.visible_frame.centered_origin(record.frame.size);
        info!("Moving '{}' to screen {} at {:?}", record.title, target, position);

        if let Err(e) = self.backend.set_position(&record.handle, position) {
            warn!("Failed to move {}: {}", identity, e);
        }

        self.refresh();
        Ok(position)
    }

    /// Index of the first screen containing `point`.
    pub fn screen_at(&self, point: Point) -> Option<usize> {
        self.snapshot.screens.iter().position(|s| s.frame.contains(point))
    }

    pub fn pointer_location(&mut self) -> Option<Point> {
        self.backend.pointer_location()
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn set_accessible(&mut self, accessible: bool, error: Option<&BackendError>) {
        if self.accessible == accessible {
            return;
        }
        self.accessible = accessible;
        match error {
            Some(e) => warn!("Window inspection unavailable: {}", e),
            None => info!("Window inspection available again"),
        }
    }
}

/// Screen whose frame contains `position`, defaulting to the primary one.
fn screen_index_for(screens: &[Screen], position: Point) -> usize {
    screens
        .iter()
        .position(|s| s.frame.contains(position))
        .unwrap_or(0)
}

/// Stable sort: visible before minimized, then by focus rank.
/// Windows missing from the focus order keep their enumeration order at the end of their group.
fn sort_by_focus_order<H>(windows: &mut [WindowRecord<H>], focus_order: &FocusOrder) {
    let ranks = focus_order.ranks();
    windows.sort_by_key(|w| {
        let rank = ranks.get(&w.identity).copied().unwrap_or(usize::MAX);
        (w.minimized, rank)
    });
}
