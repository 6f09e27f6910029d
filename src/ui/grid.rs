//! Two-column character card grid.

use crate::api::Character;
use crate::app::{App, CARD_HEIGHT, CARD_HEIGHT_EXPANDED, GRID_COLUMNS};
use crate::theme::ColorPalette;
use crate::util::{sanitize, truncate_to_width};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Width of the field label column inside an expanded card.
const LABEL_WIDTH: usize = 14;

pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    // Scroll state depends on the space we actually got
    app.grid_height = area.height;
    app.ensure_selection_visible();

    let state = app.controller.state();
    if state.is_empty() {
        let msg = if app.controller.is_fetching() {
            Paragraph::new("Loading characters...").style(app.theme.loading)
        } else {
            Paragraph::new("No characters loaded").style(app.theme.empty_message)
        };
        f.render_widget(msg.alignment(Alignment::Center), area);
        return;
    }

    let rows: Vec<usize> = (app.scroll_row..app.scroll_row + app.visible_rows()).collect();
    let constraints: Vec<Constraint> = rows
        .iter()
        .map(|&row| Constraint::Length(app.row_height(row)))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let state = app.controller.state();
    for (&row, row_area) in rows.iter().zip(row_areas.iter()) {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, GRID_COLUMNS as u32); GRID_COLUMNS])
            .split(*row_area);

        for (col, cell) in cells.iter().enumerate() {
            let index = row * GRID_COLUMNS + col;
            let Some(character) = state.get(index) else {
                continue;
            };
            let expanded = state.is_expanded(character.id);
            let height = if expanded {
                CARD_HEIGHT_EXPANDED
            } else {
                CARD_HEIGHT
            };
            let card_area = Rect {
                height: height.min(cell.height),
                ..*cell
            };
            render_card(
                f,
                &app.theme,
                character,
                expanded,
                index == app.selected,
                card_area,
            );
        }
    }
}

fn render_card(
    f: &mut Frame,
    theme: &ColorPalette,
    character: &Character,
    expanded: bool,
    selected: bool,
    area: Rect,
) {
    let inner_width = usize::from(area.width.saturating_sub(2));
    let name = sanitize(&character.name);
    let title = truncate_to_width(&name, inner_width.saturating_sub(2));

    let border = if selected {
        theme.card_border_selected
    } else {
        theme.card_border
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(format!(" {} ", title), theme.card_name));

    let lines = if expanded {
        let value_width = inner_width.saturating_sub(LABEL_WIDTH);
        vec![
            field(
                theme,
                "Status",
                sanitize(&character.status).into_owned(),
                theme.life_status(&character.status),
                value_width,
            ),
            field(
                theme,
                "Gender",
                sanitize(&character.gender).into_owned(),
                theme.card_value,
                value_width,
            ),
            field(
                theme,
                "Last episode",
                sanitize(&character.last_episode).into_owned(),
                theme.card_value,
                value_width,
            ),
            field(
                theme,
                "Episodes",
                character.episode.len().to_string(),
                theme.card_value,
                value_width,
            ),
            field(
                theme,
                "Image",
                sanitize(&character.image).into_owned(),
                theme.card_hint,
                value_width,
            ),
        ]
    } else {
        vec![
            Line::from(Span::styled(
                truncate_to_width(&sanitize(&character.status), inner_width).into_owned(),
                theme.life_status(&character.status),
            )),
            Line::from(Span::styled("Enter for details", theme.card_hint)),
        ]
    };

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn field(
    theme: &ColorPalette,
    label: &'static str,
    value: String,
    style: ratatui::style::Style,
    width: usize,
) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<w$}", label, w = LABEL_WIDTH), theme.card_label),
        Span::styled(truncate_to_width(&value, width).into_owned(), style),
    ])
}
