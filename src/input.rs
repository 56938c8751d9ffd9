//! Popup text-input component (InputBox).

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// State of the popup input.
#[derive(Clone, Debug)]
pub struct InputBoxState {
    /// Prompt message.
    pub prompt: String,
    /// Current value.
    pub value: String,
    /// Cursor position, in characters.
    pub cursor: usize,
    /// Where the confirmed value goes.
    pub callback_id: InputCallbackId,
    /// Render the value as asterisks (passwords).
    pub masked: bool,
}

/// Identifies which buffer a confirmed input updates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputCallbackId {
    LoginEmail,
    LoginPassword,
    /// One field of the entry form, by field index.
    EntryField(usize),
    /// Final odometer reading asked when finishing a job.
    FinishKm,
    /// One price row of the settings editor, by row index.
    PriceValue(usize),
    /// Name of a client to add to the price table.
    AddClient,
}

impl InputBoxState {
    pub fn new(prompt: impl Into<String>, value: impl Into<String>, id: InputCallbackId) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self {
            prompt: prompt.into(),
            value,
            cursor,
            callback_id: id,
            masked: false,
        }
    }

    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    /// Insert a character at the cursor.
    pub fn insert_char(&mut self, c: char) {
        let chars: Vec<char> = self.value.chars().collect();
        let mut new_chars = chars[..self.cursor].to_vec();
        new_chars.push(c);
        new_chars.extend_from_slice(&chars[self.cursor..]);
        self.value = new_chars.iter().collect();
        self.cursor += 1;
    }

    /// Remove the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let chars: Vec<char> = self.value.chars().collect();
            self.value = chars
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != self.cursor - 1)
                .map(|(_, c)| c)
                .collect();
            self.cursor -= 1;
        }
    }

    /// Remove the character under the cursor.
    pub fn delete(&mut self) {
        let char_count = self.value.chars().count();
        if self.cursor < char_count {
            let chars: Vec<char> = self.value.chars().collect();
            self.value = chars
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != self.cursor)
                .map(|(_, c)| c)
                .collect();
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_right(&mut self) {
        let char_count = self.value.chars().count();
        if self.cursor < char_count {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

/// Render the input as a centered popup.
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    let popup_area = centered_popup(f.area(), 70, 7);

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Entrada")
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    let inner_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // prompt
            Constraint::Length(1), // input field
            Constraint::Length(1), // spacer
            Constraint::Length(1), // help
        ])
        .split(popup_area);

    let prompt_widget = Paragraph::new(state.prompt.clone()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(prompt_widget, inner_layout[0]);

    let shown: String = if state.masked {
        std::iter::repeat_n('*', state.value.chars().count()).collect()
    } else {
        state.value.clone()
    };

    // Horizontal scroll so the cursor stays visible on long values.
    let display_width = inner_layout[1].width as usize;
    let scroll_offset = if state.cursor > display_width.saturating_sub(2) {
        state.cursor.saturating_sub(display_width - 2)
    } else {
        0
    };

    let chars: Vec<char> = shown.chars().collect();
    let visible_text: String = chars
        .iter()
        .skip(scroll_offset)
        .take(display_width)
        .collect();

    // The cursor is drawn as an inserted bar.
    let cursor_pos_in_visible = state.cursor.saturating_sub(scroll_offset);
    let visible_with_cursor = if cursor_pos_in_visible <= visible_text.chars().count() {
        let visible_chars: Vec<char> = visible_text.chars().collect();
        let before: String = visible_chars[..cursor_pos_in_visible.min(visible_chars.len())]
            .iter()
            .collect();
        let after: String = visible_chars[cursor_pos_in_visible.min(visible_chars.len())..]
            .iter()
            .collect();
        format!("{}|{}", before, after)
    } else {
        format!("{}|", visible_text)
    };

    let input_widget = Paragraph::new(visible_with_cursor).style(Style::default().fg(Color::Green));
    f.render_widget(input_widget, inner_layout[1]);

    let help = Paragraph::new("Enter=confirmar | ESC=cancelar | Ctrl+U=limpar")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, inner_layout[3]);
}

/// Compute a centered popup rectangle.
fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
