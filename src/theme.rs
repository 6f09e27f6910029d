//! Theme system for the TUI.
//!
//! Provides semantic color roles that map to ratatui `Style` values.
//! The `ThemeVariant` enum selects between Dark and Light palettes.

use ratatui::style::{Color, Modifier, Style};

// ============================================================================
// Theme Variant
// ============================================================================

/// Available theme variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeVariant {
    #[default]
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name from a string (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    /// Build the `ColorPalette` for this variant.
    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }

    /// Cycle to the next variant: Dark → Light → Dark.
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    /// Human-readable name for status display.
    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }
}

// ============================================================================
// Color Palette
// ============================================================================

/// A complete color palette mapping every semantic UI role to a `Style`.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    // -- Cards --
    pub card_border: Style,
    pub card_border_selected: Style,
    pub card_name: Style,
    pub card_label: Style,
    pub card_value: Style,
    pub card_hint: Style,

    // -- Status values --
    pub status_alive: Style,
    pub status_dead: Style,
    pub status_unknown: Style,

    // -- Chrome --
    pub status_bar: Style,
    pub status_error: Style,
    pub loading: Style,
    pub empty_message: Style,

    // -- Help overlay --
    pub help_border: Style,
    pub help_key: Style,
}

impl ColorPalette {
    fn dark() -> Self {
        Self {
            card_border: Style::default().fg(Color::DarkGray),
            card_border_selected: Style::default().fg(Color::Cyan),
            card_name: Style::default().add_modifier(Modifier::BOLD),
            card_label: Style::default().fg(Color::DarkGray),
            card_value: Style::default(),
            card_hint: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),

            status_alive: Style::default().fg(Color::Green),
            status_dead: Style::default().fg(Color::Red),
            status_unknown: Style::default().fg(Color::Gray),

            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            status_error: Style::default().bg(Color::DarkGray).fg(Color::LightRed),
            loading: Style::default().fg(Color::Yellow),
            empty_message: Style::default().fg(Color::DarkGray),

            help_border: Style::default().fg(Color::Cyan),
            help_key: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Adapted for light terminal backgrounds.
    fn light() -> Self {
        Self {
            card_border: Style::default().fg(Color::Gray),
            card_border_selected: Style::default().fg(Color::Blue),
            card_name: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            card_label: Style::default().fg(Color::DarkGray),
            card_value: Style::default().fg(Color::Black),
            card_hint: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),

            status_alive: Style::default().fg(Color::Green),
            status_dead: Style::default().fg(Color::Red),
            status_unknown: Style::default().fg(Color::DarkGray),

            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            status_error: Style::default().bg(Color::White).fg(Color::Red),
            loading: Style::default().fg(Color::Magenta),
            empty_message: Style::default().fg(Color::DarkGray),

            help_border: Style::default().fg(Color::Blue),
            help_key: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Style for a character's life status ("Alive", "Dead", anything else).
    pub fn life_status(&self, status: &str) -> Style {
        if status.eq_ignore_ascii_case("alive") {
            self.status_alive
        } else if status.eq_ignore_ascii_case("dead") {
            self.status_dead
        } else {
            self.status_unknown
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
