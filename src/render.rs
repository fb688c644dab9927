//! Plain-text presentation of the switcher on stderr.

use crate::session::{SessionObserver, SessionView};
use crate::window_directory::WindowRecord;

const CIRCLED_DIGITS: [char; 9] = ['①', '②', '③', '④', '⑤', '⑥', '⑦', '⑧', '⑨'];

/// Badge for a zero-based screen index.
pub fn screen_badge(index: usize) -> String {
    CIRCLED_DIGITS
        .get(index)
        .map(|c| c.to_string())
        .unwrap_or_else(|| (index + 1).to_string())
}

/// Prints the switcher list every time the session changes.
#[derive(Debug, Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    pub fn new() -> Self {
        TerminalRenderer
    }
}

impl<H> SessionObserver<H> for TerminalRenderer {
    fn session_changed(&mut self, view: &SessionView<'_, H>) {
        for line in render_lines(view) {
            eprintln!("{}", line);
        }
    }
}

fn render_lines<H>(view: &SessionView<'_, H>) -> Vec<String> {
    if !view.open {
        return vec!["=== Window Switcher closed ===".to_string()];
    }

    let mut lines = vec![String::new(), "=== Window Switcher ===".to_string()];
    if let Some(anchor) = view.anchor {
        lines.push(format!(
            "  (screen {} at {:.0},{:.0})",
            anchor.screen_index + 1,
            anchor.origin.x,
            anchor.origin.y
        ));
    }
    lines.push(format!("Search: {}", view.search_text));

    match view.empty_message() {
        Some(message) => lines.push(format!("    {}", message)),
        None => {
            let show_badges = view.screen_count > 1;
            for (i, window) in view.windows.iter().enumerate() {
                let marker = if i == view.selected_index { ">>>" } else { "   " };
                lines.push(format!("{} {}", marker, window_line(window, show_badges)));
            }
            if let Some(selected) = view.selected() {
                lines.push(format!("Enter: focus '{}'", selected.title));
            }
        }
    }

    lines.push("=======================".to_string());
    lines.push(String::new());
    lines
}

fn window_line<H>(window: &WindowRecord<H>, show_badge: bool) -> String {
    let mut line = String::new();
    if show_badge {
        line.push_str(&screen_badge(window.screen_index));
        line.push(' ');
    }
    if let Some(icon) = &window.icon {
        line.push_str(&format!("[{}] ", icon.0));
    }
    line.push_str(&format!("{} - {}", window.owner_name, window.title));
    if window.minimized {
        line.push_str(" (minimized)");
    }
    line
}
