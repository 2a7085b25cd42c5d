//! Key bindings — maps terminal key events to playback actions.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Actions the player can trigger from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Register a hit at the current audio time.
    Hit,
    /// (Re)start playback from the configured block.
    Start,
    /// Stop playback.
    Reset,
    /// Toggle auto-listen mode.
    ToggleListen,
    Quit,
}

/// Parse a key name from the settings file.
///
/// Accepts a single character (case-insensitive) or one of `Space`,
/// `Enter`, `Tab`.
pub fn parse_key(name: &str) -> Option<KeyCode> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeyCode::Char(c.to_ascii_lowercase())),
        _ => match name.to_ascii_lowercase().as_str() {
            "space" => Some(KeyCode::Char(' ')),
            "enter" => Some(KeyCode::Enter),
            "tab" => Some(KeyCode::Tab),
            _ => None,
        },
    }
}

/// The hit keys plus the fixed control keys.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMap {
    hits: Vec<KeyCode>,
}

impl KeyMap {
    /// Build from configured key names. Unknown names are skipped with a warning.
    pub fn new<S: AsRef<str>>(keybinds: &[S]) -> Self {
        let hits = keybinds
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let key = parse_key(name);
                if key.is_none() {
                    log::warn!("unknown key binding {name:?}");
                }
                key
            })
            .collect();
        Self { hits }
    }

    pub fn hit_keys(&self) -> &[KeyCode] {
        &self.hits
    }

    /// Map a key press. Hit keys take precedence over control keys.
    pub fn map(&self, key: KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            return Some(Action::Quit);
        }

        let code = match key.code {
            KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
            other => other,
        };
        if self.hits.contains(&code) {
            return Some(Action::Hit);
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('r') => Some(Action::Reset),
            KeyCode::Char('l') => Some(Action::ToggleListen),
            KeyCode::Enter => Some(Action::Start),
            _ => None,
        }
    }
}
