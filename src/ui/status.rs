use crate::app::App;
use crate::keybindings::Action;
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    // EDGE-001: Guard against zero-width/height areas
    if area.width < 1 || area.height < 1 {
        return;
    }

    let (text, style) = if let Some(error) = &app.last_error {
        (Cow::Borrowed(error.as_str()), app.theme.status_error)
    } else if let Some((msg, _)) = &app.status_message {
        (Cow::Borrowed(&**msg), app.theme.status_bar)
    } else {
        (Cow::Owned(summary(app)), app.theme.status_bar)
    };

    f.render_widget(Paragraph::new(text).style(style), area);
}

/// Default status line: activity, counts, position and a key hint.
fn summary(app: &App) -> String {
    let state = app.controller.state();
    let mut parts: Vec<String> = Vec::with_capacity(4);

    if app.controller.is_fetching() {
        parts.push(format!(
            "{} Loading page {}",
            SPINNER[app.spinner_frame % SPINNER.len()],
            state.cursor()
        ));
    } else if app.enrichments_running > 0 {
        parts.push(format!(
            "{} Resolving episodes",
            SPINNER[app.spinner_frame % SPINNER.len()]
        ));
    }

    if state.is_empty() {
        parts.push("No characters".to_string());
    } else {
        parts.push(format!(
            "{}/{} characters",
            app.selected.saturating_add(1),
            state.len()
        ));
    }

    if state.is_end_of_data() {
        parts.push("end of data".to_string());
    } else {
        let hint = app
            .keybindings
            .key_hint(Action::LoadMore)
            .unwrap_or_default();
        parts.push(format!("next page {} [{}]", state.cursor(), hint));
    }

    if let Some(help) = app.keybindings.key_hint(Action::ShowHelp) {
        parts.push(format!("[{}] help", help));
    }

    format!(" {}", parts.join(" | "))
}
