//! UI state shared between the key handlers and the renderer.

/// Screen currently shown in the TUI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    /// E-mail/password sign-in (and registration).
    Login,
    /// Active jobs with the finish/cancel actions.
    Active,
    /// Finished and cancelled jobs, overdue first.
    History,
    /// New-job form, also used when editing an existing job.
    Entry,
    /// Price table editor.
    Settings,
}

/// Render-side UI state.
#[derive(Clone, Debug)]
pub struct UiState {
    /// Current screen.
    pub screen: Screen,
    /// Selected row in the job list of the current screen.
    pub selected: usize,
    /// Log shown in the side panel.
    pub log: Vec<String>,
    /// Status line at the bottom.
    pub status: String,
    /// Highlighted field in the entry form and settings list.
    pub editing_field_idx: usize,
    /// Error message, rendered emphasized.
    pub error: Option<String>,
}
