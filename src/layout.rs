//! Layout helpers shared by the screens.

use ratatui::prelude::*;

/// The three vertical regions of every screen.
pub struct MainLayout {
    /// Job table + side panel.
    pub body: Rect,
    /// Help bar.
    pub help_bar: Rect,
    /// Status bar.
    pub status_bar: Rect,
}

/// The two body regions.
pub struct BodyLayout {
    /// Job table.
    pub jobs_table: Rect,
    /// Detail/log panel.
    pub info_panel: Rect,
}

/// Split a screen into body, help and status regions.
pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    MainLayout {
        body: chunks[0],
        help_bar: chunks[1],
        status_bar: chunks[2],
    }
}

/// Split the body into the job table (65%) and the detail panel (35%).
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    BodyLayout {
        jobs_table: chunks[0],
        info_panel: chunks[1],
    }
}
