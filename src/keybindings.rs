//! Keybinding registry: maps keys to grid actions with config overrides.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavUp,
    NavDown,
    NavLeft,
    NavRight,
    PageUp,
    PageDown,
    ToggleDetails,
    LoadMore,
    ReEnrich,
    OpenImage,
    CycleTheme,
    ShowHelp,
    Back,
}

impl Action {
    /// Every action, in help-screen order.
    pub const ALL: [Action; 14] = [
        Action::NavUp,
        Action::NavDown,
        Action::NavLeft,
        Action::NavRight,
        Action::PageUp,
        Action::PageDown,
        Action::ToggleDetails,
        Action::LoadMore,
        Action::ReEnrich,
        Action::OpenImage,
        Action::CycleTheme,
        Action::ShowHelp,
        Action::Back,
        Action::Quit,
    ];

    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit",
            Self::NavUp => "Move up a row",
            Self::NavDown => "Move down a row",
            Self::NavLeft => "Move to left column",
            Self::NavRight => "Move to right column",
            Self::PageUp => "Page up",
            Self::PageDown => "Page down",
            Self::ToggleDetails => "Show/hide character details",
            Self::LoadMore => "Load more characters",
            Self::ReEnrich => "Re-resolve every last episode",
            Self::OpenImage => "Open character image in browser",
            Self::CycleTheme => "Cycle theme",
            Self::ShowHelp => "Show help",
            Self::Back => "Dismiss overlay",
        }
    }

    /// Name used in the `[keybindings]` config table.
    pub fn config_name(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::NavUp => "nav_up",
            Self::NavDown => "nav_down",
            Self::NavLeft => "nav_left",
            Self::NavRight => "nav_right",
            Self::PageUp => "page_up",
            Self::PageDown => "page_down",
            Self::ToggleDetails => "toggle_details",
            Self::LoadMore => "load_more",
            Self::ReEnrich => "re_enrich",
            Self::OpenImage => "open_image",
            Self::CycleTheme => "cycle_theme",
            Self::ShowHelp => "show_help",
            Self::Back => "back",
        }
    }

    fn from_config_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.config_name() == name)
    }
}

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    /// Shift is dropped for characters: the case already carries it.
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let modifiers = match code {
            KeyCode::Char(_) => modifiers.difference(KeyModifiers::SHIFT),
            _ => modifiers,
        };
        Self { code, modifiers }
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Supported formats:
/// - Single char: "q", "n", "?"
/// - Named keys: "Enter", "Esc", "Tab", "Space", arrows, "PageUp", "PageDown"
/// - Ctrl combos: "Ctrl+d"
/// - Function keys: "F1" through "F12"
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let mut chars = rest.trim().chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => Some(KeySpec::ctrl(c)),
            _ => None,
        };
    }

    let named = match s.to_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "space" => Some(KeyCode::Char(' ')),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "pageup" => Some(KeyCode::PageUp),
        "pagedown" => Some(KeyCode::PageDown),
        "home" => Some(KeyCode::Home),
        "end" => Some(KeyCode::End),
        _ => None,
    };
    if let Some(code) = named {
        return Some(KeySpec::plain(code));
    }

    if let Some(n) = s
        .strip_prefix(['F', 'f'])
        .and_then(|n| n.parse::<u8>().ok())
    {
        return (1..=12)
            .contains(&n)
            .then(|| KeySpec::plain(KeyCode::F(n)));
    }

    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeySpec::plain(KeyCode::Char(c))),
        _ => None,
    }
}

/// Format a KeySpec as a human-readable string for the help screen.
fn format_key(key: &KeySpec) -> String {
    let modifier = if key.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else {
        ""
    };

    let key_name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };

    format!("{}{}", modifier, key_name)
}

/// Registry of keybindings, supporting default bindings and config overrides.
pub struct KeybindingRegistry {
    lookup: HashMap<KeySpec, Action>,
    /// Insertion order, for the help screen.
    bindings: Vec<(KeySpec, Action)>,
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::new(),
        };
        registry.register_defaults();
        registry
    }

    fn bind(&mut self, key: KeySpec, action: Action) {
        self.lookup.insert(key, action);
        self.bindings.push((key, action));
    }

    fn register_defaults(&mut self) {
        use KeyCode::*;

        self.bind(KeySpec::plain(Char('k')), Action::NavUp);
        self.bind(KeySpec::plain(Up), Action::NavUp);
        self.bind(KeySpec::plain(Char('j')), Action::NavDown);
        self.bind(KeySpec::plain(Down), Action::NavDown);
        self.bind(KeySpec::plain(Char('h')), Action::NavLeft);
        self.bind(KeySpec::plain(Left), Action::NavLeft);
        self.bind(KeySpec::plain(Char('l')), Action::NavRight);
        self.bind(KeySpec::plain(Right), Action::NavRight);
        self.bind(KeySpec::plain(PageUp), Action::PageUp);
        self.bind(KeySpec::ctrl('u'), Action::PageUp);
        self.bind(KeySpec::plain(PageDown), Action::PageDown);
        self.bind(KeySpec::ctrl('d'), Action::PageDown);

        self.bind(KeySpec::plain(Enter), Action::ToggleDetails);
        self.bind(KeySpec::plain(Char(' ')), Action::ToggleDetails);
        self.bind(KeySpec::plain(Char('n')), Action::LoadMore);
        self.bind(KeySpec::plain(Char('E')), Action::ReEnrich);
        self.bind(KeySpec::plain(Char('o')), Action::OpenImage);

        self.bind(KeySpec::plain(Char('T')), Action::CycleTheme);
        self.bind(KeySpec::plain(Char('?')), Action::ShowHelp);
        self.bind(KeySpec::plain(Esc), Action::Back);
        self.bind(KeySpec::plain(Char('q')), Action::Quit);
    }

    /// Apply user overrides from the config keybindings map.
    ///
    /// An override replaces every default key of its action. Returns
    /// warnings for unknown action names and unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        for (action_name, key_str) in overrides {
            let Some(action) = Action::from_config_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };
            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, a)| *a != action);
            // The key may have belonged to another action
            self.bindings.retain(|(k, _)| *k != key);
            self.bind(key, action);

            tracing::info!(action = %action_name, key = %key_str, "Applied keybinding override");
        }

        warnings
    }

    pub fn action_for_key(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
        self.lookup.get(&KeySpec::new(code, modifiers)).copied()
    }

    /// `(key, description)` rows for the help screen, grouped by action.
    pub fn help_rows(&self) -> Vec<(String, &'static str)> {
        Action::ALL
            .iter()
            .filter_map(|action| {
                let keys: Vec<String> = self
                    .bindings
                    .iter()
                    .filter(|(_, a)| a == action)
                    .map(|(k, _)| format_key(k))
                    .collect();
                (!keys.is_empty()).then(|| (keys.join(" / "), action.describe()))
            })
            .collect()
    }

    /// First key bound to `action`, for status-bar hints.
    pub fn key_hint(&self, action: Action) -> Option<String> {
        self.bindings
            .iter()
            .find(|(_, a)| *a == action)
            .map(|(k, _)| format_key(k))
    }
}
