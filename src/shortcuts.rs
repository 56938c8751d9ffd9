//! Configurable key bindings (`shortcut.toml`).

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// All key bindings, one group per screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortcuts {
    pub login: LoginShortcuts,
    pub active: ActiveShortcuts,
    pub history: HistoryShortcuts,
    pub entry: EntryShortcuts,
    pub settings: SettingsShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// Login screen bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginShortcuts {
    pub quit: Vec<String>,
    pub email: Vec<String>,
    pub password: Vec<String>,
    pub submit: Vec<String>,
    pub register: Vec<String>,
}

/// Active-jobs screen bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveShortcuts {
    pub quit: Vec<String>,
    pub history: Vec<String>,
    pub new_job: Vec<String>,
    pub settings: Vec<String>,
    pub refresh: Vec<String>,
    pub finish: Vec<String>,
    pub edit: Vec<String>,
    pub delete: Vec<String>,
    pub sign_out: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
}

/// History screen bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryShortcuts {
    pub back: Vec<String>,
    pub refresh: Vec<String>,
    pub toggle_paid: Vec<String>,
    pub message: Vec<String>,
    pub edit: Vec<String>,
    pub delete: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
}

/// Entry-form bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryShortcuts {
    pub cancel: Vec<String>,
    pub next_field: Vec<String>,
    pub prev_field: Vec<String>,
    pub edit_field: Vec<String>,
    pub toggle_payment: Vec<String>,
    pub submit: Vec<String>,
}

/// Price-table editor bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsShortcuts {
    pub cancel: Vec<String>,
    pub save: Vec<String>,
    pub edit_price: Vec<String>,
    pub add_client: Vec<String>,
    pub remove_client: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
}

/// Input popup bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

impl Shortcuts {
    /// Load from TOML, falling back to the defaults when the file is absent.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let shortcuts: Shortcuts = toml::from_str(&content)?;
            Ok(shortcuts)
        } else {
            Ok(Self::default())
        }
    }

    /// Save as TOML.
    #[allow(dead_code)]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            login: LoginShortcuts {
                quit: vec!["q".into(), "Esc".into()],
                email: vec!["e".into()],
                password: vec!["p".into()],
                submit: vec!["Enter".into()],
                register: vec!["r".into()],
            },
            active: ActiveShortcuts {
                quit: vec!["q".into()],
                history: vec!["h".into()],
                new_job: vec!["n".into()],
                settings: vec!["t".into()],
                refresh: vec!["r".into()],
                finish: vec!["f".into()],
                edit: vec!["e".into()],
                delete: vec!["x".into()],
                sign_out: vec!["o".into()],
                down: vec!["Down".into(), "j".into()],
                up: vec!["Up".into(), "k".into()],
            },
            history: HistoryShortcuts {
                back: vec!["Esc".into(), "h".into()],
                refresh: vec!["r".into()],
                toggle_paid: vec!["p".into()],
                message: vec!["m".into()],
                edit: vec!["e".into()],
                delete: vec!["x".into()],
                down: vec!["Down".into(), "j".into()],
                up: vec!["Up".into(), "k".into()],
            },
            entry: EntryShortcuts {
                cancel: vec!["Esc".into()],
                next_field: vec!["Tab".into(), "Down".into()],
                prev_field: vec!["Up".into()],
                edit_field: vec!["Enter".into(), "e".into()],
                toggle_payment: vec!["p".into()],
                submit: vec!["s".into()],
            },
            settings: SettingsShortcuts {
                cancel: vec!["Esc".into()],
                save: vec!["s".into()],
                edit_price: vec!["Enter".into(), "e".into()],
                add_client: vec!["a".into()],
                remove_client: vec!["x".into()],
                down: vec!["Down".into(), "j".into()],
                up: vec!["Up".into(), "k".into()],
            },
            input_box: InputBoxShortcuts {
                confirm: vec!["Enter".into()],
                cancel: vec!["Esc".into()],
                backspace: vec!["Backspace".into()],
                delete: vec!["Delete".into()],
                left: vec!["Left".into()],
                right: vec!["Right".into()],
                home: vec!["Home".into()],
                end: vec!["End".into()],
                clear_line: vec!["Ctrl+u".into()],
            },
        }
    }
}

/// Whether a key event matches any of the configured bindings.
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts.iter().any(|s| matches_single_shortcut(key, s))
}

/// Whether a key event matches one binding string (e.g. "Ctrl+u", "Enter").
fn matches_single_shortcut(key: &KeyEvent, shortcut: &str) -> bool {
    let parts: Vec<&str> = shortcut.split('+').collect();

    let (modifiers_str, key_str) = if parts.len() > 1 {
        (&parts[0..parts.len() - 1], parts[parts.len() - 1])
    } else {
        (&[][..], parts[0])
    };

    let mut expected_modifiers = KeyModifiers::empty();
    for modifier in modifiers_str {
        match *modifier {
            "Ctrl" | "ctrl" => expected_modifiers |= KeyModifiers::CONTROL,
            "Alt" | "alt" => expected_modifiers |= KeyModifiers::ALT,
            "Shift" | "shift" => expected_modifiers |= KeyModifiers::SHIFT,
            _ => return false,
        }
    }

    if key.modifiers != expected_modifiers {
        return false;
    }

    match key_str {
        "Enter" | "enter" => key.code == KeyCode::Enter,
        "Esc" | "esc" => key.code == KeyCode::Esc,
        "Tab" | "tab" => key.code == KeyCode::Tab,
        "Backspace" | "backspace" => key.code == KeyCode::Backspace,
        "Delete" | "delete" => key.code == KeyCode::Delete,
        "Up" | "up" => key.code == KeyCode::Up,
        "Down" | "down" => key.code == KeyCode::Down,
        "Left" | "left" => key.code == KeyCode::Left,
        "Right" | "right" => key.code == KeyCode::Right,
        "Home" | "home" => key.code == KeyCode::Home,
        "End" | "end" => key.code == KeyCode::End,
        s if s.len() == 1 => {
            if let Some(c) = s.chars().next() {
                key.code == KeyCode::Char(c)
            } else {
                false
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_shortcut_simple_char() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::empty());
        assert!(matches_shortcut(&key, &[String::from("q")]));
        assert!(!matches_shortcut(&key, &[String::from("w")]));
    }

    #[test]
    fn test_matches_shortcut_special_key() {
        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::empty());
        assert!(matches_shortcut(&key, &[String::from("Enter")]));
        assert!(!matches_shortcut(&key, &[String::from("Esc")]));
    }

    #[test]
    fn test_matches_shortcut_with_modifier() {
        let key = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert!(matches_shortcut(&key, &[String::from("Ctrl+u")]));
        assert!(!matches_shortcut(&key, &[String::from("u")]));
    }

    #[test]
    fn test_matches_shortcut_arrow_keys() {
        let key = KeyEvent::new(KeyCode::Up, KeyModifiers::empty());
        assert!(matches_shortcut(&key, &[String::from("Up")]));
        assert!(!matches_shortcut(&key, &[String::from("Down")]));
    }

    #[test]
    fn test_matches_shortcut_multiple_keys() {
        let key_up = KeyEvent::new(KeyCode::Up, KeyModifiers::empty());
        let key_k = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::empty());
        let shortcuts = vec![String::from("Up"), String::from("k")];

        assert!(matches_shortcut(&key_up, &shortcuts));
        assert!(matches_shortcut(&key_k, &shortcuts));

        let key_j = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::empty());
        assert!(!matches_shortcut(&key_j, &shortcuts));
    }
}
