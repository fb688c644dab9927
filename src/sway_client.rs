//! Sway implementation of the window collaborators.
//!
//! Windows come from the IPC tree, screens from outputs and workspaces.
//! Sway has no minimize; windows parked in the scratchpad are reported as
//! minimized and restoring one brings it back to the current workspace.

use std::borrow::Cow;
use std::collections::HashMap;
use swayipc::{Connection, Node, NodeType};
use tracing::debug;

use crate::error::BackendError;
use crate::geometry::{Point, Rect};
use crate::window_source::{
    AppWindows, IconRef, Screen, ScreenLayoutSource, SourceWindow, WindowController, WindowSource,
};

const SCRATCHPAD_WORKSPACE: &str = "__i3_scratch";

/// Sway container id of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub i64);

/// A window found in the tree, before grouping by application.
#[derive(Debug, Clone, PartialEq)]
struct SwayWindow {
    id: i64,
    pid: i32,
    app: Option<String>,
    title: String,
    scratchpad: bool,
    rect: Rect,
}

pub struct RealSwayClient {
    connection: Connection,
}

impl RealSwayClient {
    /// Create a new connection to Sway
    pub fn new() -> anyhow::Result<Self> {
        let connection = Connection::new()?;
        Ok(RealSwayClient { connection })
    }

    fn run(&mut self, command: String) -> Result<(), BackendError> {
        debug!("sway: {}", command);
        let outcomes = self.connection.run_command(&command).map_err(backend_error)?;
        match outcomes.into_iter().next() {
            Some(Err(e)) => Err(BackendError::NotFound(e.to_string())),
            _ => Ok(()),
        }
    }
}

impl WindowSource for RealSwayClient {
    type Handle = ContainerId;

    fn enumerate(&mut self) -> Result<Vec<AppWindows<ContainerId>>, BackendError> {
        let tree = self.connection.get_tree().map_err(backend_error)?;
        Ok(group_by_app(collect_windows(&tree, Cow::Borrowed(""))))
    }
}

impl ScreenLayoutSource for RealSwayClient {
    fn screens(&mut self) -> Result<Vec<Screen>, BackendError> {
        let outputs = self.connection.get_outputs().map_err(backend_error)?;
        let workspaces = self.connection.get_workspaces().map_err(backend_error)?;

        Ok(outputs
            .iter()
            .filter(|output| output.active)
            .map(|output| {
                let frame = to_rect(&output.rect);
                // A workspace rect excludes the bars on its output.
                let visible_frame = workspaces
                    .iter()
                    .find(|ws| ws.visible && ws.output == output.name)
                    .map(|ws| to_rect(&ws.rect))
                    .unwrap_or(frame);
                Screen {
                    frame,
                    visible_frame,
                }
            })
            .collect())
    }

    /// Sway does not expose the cursor over IPC; the focused workspace is
    /// where the pointer was last used, so its centre stands in for it.
    fn pointer_location(&mut self) -> Option<Point> {
        let workspaces = self.connection.get_workspaces().ok()?;
        workspaces
            .iter()
            .find(|ws| ws.focused)
            .map(|ws| to_rect(&ws.rect).center())
    }
}

impl WindowController<ContainerId> for RealSwayClient {
    fn raise(&mut self, handle: &ContainerId) -> Result<(), BackendError> {
        self.run(format!("[con_id={}] focus", handle.0))
    }

    fn activate_owning_app(&mut self, pid: i32) -> Result<(), BackendError> {
        // Focusing a container already activates its client.
        debug!("No separate activation needed for pid {}", pid);
        Ok(())
    }

    fn set_minimized(&mut self, handle: &ContainerId, minimized: bool) -> Result<(), BackendError> {
        self.run(minimize_command(*handle, minimized))
    }

    fn set_position(&mut self, handle: &ContainerId, position: Point) -> Result<(), BackendError> {
        let outputs = self.connection.get_outputs().map_err(backend_error)?;
        let output = outputs
            .iter()
            .filter(|output| output.active)
            .find(|output| to_rect(&output.rect).contains(position))
            .ok_or_else(|| BackendError::NotFound(format!("no output at {:?}", position)))?;

        self.run(move_command(*handle, &output.name, position))
    }
}

fn backend_error(e: swayipc::Error) -> BackendError {
    match e {
        swayipc::Error::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
            BackendError::PermissionDenied(io.to_string())
        }
        other => BackendError::Unavailable(other.to_string()),
    }
}

fn to_rect(rect: &swayipc::Rect) -> Rect {
    Rect::new(
        f64::from(rect.x),
        f64::from(rect.y),
        f64::from(rect.width),
        f64::from(rect.height),
    )
}

fn minimize_command(handle: ContainerId, minimized: bool) -> String {
    if minimized {
        format!("[con_id={}] move scratchpad", handle.0)
    } else {
        format!("[con_id={}] move container to workspace current, focus", handle.0)
    }
}

/// Move to the output first; the absolute position only applies to floating
/// containers, and tiled ones report an error for that second step alone.
fn move_command(handle: ContainerId, output: &str, position: Point) -> String {
    format!(
        "[con_id={}] move container to output \"{}\", move absolute position {} {}",
        handle.0,
        output,
        position.x.round() as i64,
        position.y.round() as i64
    )
}

/// Group windows by owning process, keeping tree order for apps and windows.
fn group_by_app(windows: Vec<SwayWindow>) -> Vec<AppWindows<ContainerId>> {
    let mut apps: Vec<AppWindows<ContainerId>> = Vec::new();
    let mut by_pid: HashMap<i32, usize> = HashMap::new();

    for window in windows {
        let index = *by_pid.entry(window.pid).or_insert_with(|| {
            apps.push(AppWindows {
                pid: window.pid,
                name: window.app.clone(),
                icon: window.app.as_ref().map(|app| IconRef(app.to_lowercase())),
                windows: Ok(Vec::new()),
            });
            apps.len() - 1
        });

        if let Ok(app_windows) = &mut apps[index].windows {
            app_windows.push(SourceWindow {
                window_id: window.id,
                title: window.title,
                minimized: window.scratchpad,
                position: window.rect.origin,
                size: window.rect.size,
                handle: ContainerId(window.id),
            });
        }
    }

    apps
}

/// Recursively collect all windows from a Sway node tree.
///
/// Uses `Cow<str>` to avoid cloning workspace names during traversal.
fn collect_windows<'a>(node: &'a Node, current_workspace: Cow<'a, str>) -> Vec<SwayWindow> {
    let mut windows = Vec::new();

    let workspace: Cow<'a, str> = if node.node_type == NodeType::Workspace {
        node.name
            .as_deref()
            .map(Cow::Borrowed)
            .unwrap_or(current_workspace)
    } else {
        current_workspace
    };

    // Windows have a pid, containers don't
    if matches!(node.node_type, NodeType::Con | NodeType::FloatingCon)
        && let Some(pid) = node.pid
    {
        // app_id for Wayland clients, WM_CLASS for XWayland
        let app = node.app_id.clone().or_else(|| {
            node.window_properties
                .as_ref()
                .and_then(|props| props.class.clone())
        });

        windows.push(SwayWindow {
            id: node.id,
            pid,
            app,
            title: node.name.clone().unwrap_or_default(),
            scratchpad: workspace == SCRATCHPAD_WORKSPACE,
            rect: to_rect(&node.rect),
        });
    }

    for child in &node.nodes {
        windows.extend(collect_windows(child, Cow::Borrowed(&workspace)));
    }
    for child in &node.floating_nodes {
        windows.extend(collect_windows(child, Cow::Borrowed(&workspace)));
    }

    windows
}

// swayipc::Node is #[non_exhaustive], so tree traversal is covered by running
// against a live Sway session. The tests below exercise the pure helpers.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    fn make_window(id: i64, pid: i32, app: Option<&str>, title: &str) -> SwayWindow {
        SwayWindow {
            id,
            pid,
            app: app.map(str::to_string),
            title: title.to_string(),
            scratchpad: false,
            rect: Rect::new(10.0, 20.0, 640.0, 480.0),
        }
    }

    #[test]
    fn test_group_by_app_keeps_tree_order() {
        let apps = group_by_app(vec![
            make_window(1, 100, Some("foot"), "shell"),
            make_window(2, 200, Some("firefox"), "Docs"),
            make_window(3, 100, Some("foot"), "logs"),
        ]);

        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].pid, 100);
        assert_eq!(apps[0].name.as_deref(), Some("foot"));
        let foot: Vec<_> = apps[0]
            .windows
            .as_ref()
            .unwrap()
            .iter()
            .map(|w| w.window_id)
            .collect();
        assert_eq!(foot, vec![1, 3]);
        assert_eq!(apps[1].icon, Some(IconRef("firefox".to_string())));
    }

    #[test]
    fn test_group_by_app_maps_geometry_and_scratchpad() {
        let mut hidden = make_window(7, 300, None, "notes");
        hidden.scratchpad = true;

        let apps = group_by_app(vec![hidden]);
        let window = &apps[0].windows.as_ref().unwrap()[0];

        assert!(apps[0].name.is_none());
        assert!(apps[0].icon.is_none());
        assert!(window.minimized);
        assert_eq!(window.position, Point::new(10.0, 20.0));
        assert_eq!(window.size, Size::new(640.0, 480.0));
        assert_eq!(window.handle, ContainerId(7));
    }

    #[test]
    fn test_backend_error_classifies_permission() {
        let denied = swayipc::Error::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(matches!(backend_error(denied), BackendError::PermissionDenied(_)));

        let refused = swayipc::Error::Io(std::io::Error::from(std::io::ErrorKind::ConnectionRefused));
        assert!(matches!(backend_error(refused), BackendError::Unavailable(_)));
    }

    #[test]
    fn test_minimize_command() {
        assert_eq!(
            minimize_command(ContainerId(5), true),
            "[con_id=5] move scratchpad"
        );
        assert_eq!(
            minimize_command(ContainerId(5), false),
            "[con_id=5] move container to workspace current, focus"
        );
    }

    #[test]
    fn test_move_command_rounds_position() {
        assert_eq!(
            move_command(ContainerId(9), "DP-2", Point::new(2800.4, 435.6)),
            "[con_id=9] move container to output \"DP-2\", move absolute position 2800 436"
        );
    }
}
