//! Keyboard input handling.

use crate::app::{App, AppEvent};
use crate::feed::EnrichPolicy;
use crate::keybindings::Action as KbAction;
use crate::util::validate_url_for_open;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{spawn_enrichment, spawn_page_fetch};
use super::Action;

/// Route a key press to the help overlay or the grid.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    // Help overlay captures all keys when visible
    if app.show_help {
        return handle_help_input(app, code);
    }
    handle_grid_input(app, code, modifiers, event_tx)
}

/// Handle input while the help overlay is visible.
///
/// j/k/Up/Down scroll, Esc/q/? dismiss.
fn handle_help_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
    Action::Continue
}

fn handle_grid_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let Some(action) = app.keybindings.action_for_key(code, modifiers) else {
        return Action::Continue;
    };

    match action {
        KbAction::Quit => return Action::Quit,
        KbAction::NavUp => app.nav_up(),
        KbAction::NavDown => app.nav_down(),
        KbAction::NavLeft => app.nav_left(),
        KbAction::NavRight => app.nav_right(),
        KbAction::PageUp => app.page_up(),
        KbAction::PageDown => app.page_down(),
        KbAction::ToggleDetails => {
            app.toggle_selected_details();
        }
        KbAction::LoadMore => {
            if spawn_page_fetch(app, true, event_tx) {
                app.last_error = None;
            }
        }
        KbAction::ReEnrich => {
            if spawn_enrichment(app, Some(EnrichPolicy::All), event_tx) {
                app.set_status("Resolving last episodes...");
            } else {
                app.set_status("Nothing to resolve yet");
            }
        }
        KbAction::OpenImage => open_selected_image(app),
        KbAction::CycleTheme => app.cycle_theme(),
        KbAction::ShowHelp => app.show_help = true,
        KbAction::Back => {
            app.status_message = None;
            app.last_error = None;
        }
    }

    // Navigation may have brought the selection near the end
    if app.should_prefetch() {
        spawn_page_fetch(app, false, event_tx);
    }
    Action::Continue
}

fn open_selected_image(app: &mut App) {
    let Some(character) = app.selected_character() else {
        return;
    };
    if character.image.is_empty() {
        app.set_status("This character has no image");
        return;
    }
    let url = character.image.clone();
    let name = character.name.clone();
    // SEC: Validate URL before open::that() to prevent command injection
    if let Err(e) = validate_url_for_open(&url) {
        app.set_status(e.to_string());
    } else if let Err(e) = open::that(&url) {
        app.set_status(format!("Failed to open browser: {}", e));
    } else {
        app.set_status(format!("Opening image of {}...", name));
    }
}
