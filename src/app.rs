use crate::api::Character;
use crate::feed::{
    EnrichPolicy, EnrichmentJob, EnrichmentResult, FeedController, FetchOutcome, FetchSkipped,
    PageRequest, PageResponse,
};
use crate::keybindings::KeybindingRegistry;
use crate::theme::{ColorPalette, ThemeVariant};
use std::borrow::Cow;
use tokio::time::Instant;

/// Cards per grid row.
pub const GRID_COLUMNS: usize = 2;
/// Height of a collapsed card, borders included.
pub const CARD_HEIGHT: u16 = 4;
/// Height of a card showing its details.
pub const CARD_HEIGHT_EXPANDED: u16 = 8;

/// Seconds before a status message disappears.
const STATUS_TTL_SECS: u64 = 3;

// ============================================================================
// Background Events
// ============================================================================

/// Completion events sent from background tasks to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    /// A character page request finished (successfully or not).
    PageLoaded(PageResponse),
    /// An enrichment pass finished.
    Enriched(EnrichmentResult),
    /// A background task panicked.
    ///
    /// Fields:
    /// - `task`: Name of the task that panicked ("page_fetch", "enrichment")
    /// - `error`: The panic message extracted from the panic payload
    TaskPanicked { task: &'static str, error: String },
}

// ============================================================================
// App State
// ============================================================================

pub struct App {
    pub controller: FeedController,

    // Theme
    pub theme_variant: ThemeVariant,
    pub theme: ColorPalette,

    pub keybindings: KeybindingRegistry,

    // Grid
    /// Index of the selected card in the accumulated list.
    pub selected: usize,
    /// First grid row on screen.
    pub scroll_row: usize,
    /// Lines available to the grid, updated by the renderer.
    pub grid_height: u16,
    /// Fraction of the visible rows that may remain below the selection
    /// before the next page is fetched.
    pub prefetch_threshold: f64,
    /// Set after a failed fetch; proximity prefetch waits for an explicit load.
    pub auto_fetch_paused: bool,

    // Background work
    pub enrichments_running: usize,
    pub last_error: Option<String>,

    // Chrome
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub show_help: bool,
    pub help_scroll_offset: usize,
    pub needs_redraw: bool,
    pub spinner_frame: usize,
}

impl App {
    pub fn new(controller: FeedController, keybindings: KeybindingRegistry) -> Self {
        let theme_variant = ThemeVariant::default();
        Self {
            controller,
            theme_variant,
            theme: theme_variant.palette(),
            keybindings,
            selected: 0,
            scroll_row: 0,
            grid_height: 0,
            prefetch_threshold: 0.5,
            auto_fetch_paused: false,
            enrichments_running: 0,
            last_error: None,
            status_message: None,
            show_help: false,
            help_scroll_offset: 0,
            needs_redraw: true,
            spinner_frame: 0,
        }
    }

    pub fn set_theme(&mut self, variant: ThemeVariant) {
        self.theme_variant = variant;
        self.theme = variant.palette();
    }

    pub fn cycle_theme(&mut self) {
        self.set_theme(self.theme_variant.next());
        self.set_status(format!("Theme: {}", self.theme_variant.name()));
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    /// Set status message (will auto-expire after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired.
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_fetching() || self.enrichments_running > 0
    }

    // ------------------------------------------------------------------
    // Grid geometry
    // ------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.controller.state().len()
    }

    pub fn is_empty(&self) -> bool {
        self.controller.state().is_empty()
    }

    pub fn selected_character(&self) -> Option<&Character> {
        self.controller.state().get(self.selected)
    }

    pub fn row_count(&self) -> usize {
        self.len().div_ceil(GRID_COLUMNS)
    }

    pub fn selected_row(&self) -> usize {
        self.selected / GRID_COLUMNS
    }

    /// Height of a grid row: the tallest card in it.
    pub fn row_height(&self, row: usize) -> u16 {
        let state = self.controller.state();
        let start = row * GRID_COLUMNS;
        (start..(start + GRID_COLUMNS).min(state.len()))
            .filter_map(|i| state.get(i))
            .map(|c| {
                if state.is_expanded(c.id) {
                    CARD_HEIGHT_EXPANDED
                } else {
                    CARD_HEIGHT
                }
            })
            .max()
            .unwrap_or(CARD_HEIGHT)
    }

    /// Number of rows that fit on screen starting at `scroll_row`.
    pub fn visible_rows(&self) -> usize {
        let mut used = 0u16;
        let mut rows = 0;
        for row in self.scroll_row..self.row_count() {
            let h = self.row_height(row);
            if used + h > self.grid_height && rows > 0 {
                break;
            }
            used = used.saturating_add(h);
            rows += 1;
        }
        rows
    }

    /// Rows the viewport could hold if every card were collapsed.
    fn viewport_capacity(&self) -> usize {
        usize::from(self.grid_height / CARD_HEIGHT).max(1)
    }

    /// Adjust `scroll_row` so the selected row is fully on screen.
    pub fn ensure_selection_visible(&mut self) {
        let row = self.selected_row();
        if row < self.scroll_row {
            self.scroll_row = row;
            return;
        }
        loop {
            let used: u16 = (self.scroll_row..=row)
                .map(|r| self.row_height(r))
                .fold(0u16, u16::saturating_add);
            if used <= self.grid_height || self.scroll_row >= row {
                break;
            }
            self.scroll_row += 1;
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    fn select(&mut self, index: usize) {
        if index != self.selected {
            self.selected = index;
            self.ensure_selection_visible();
        }
    }

    pub fn nav_down(&mut self) {
        let len = self.len();
        if len == 0 {
            return;
        }
        let target = self.selected + GRID_COLUMNS;
        if target < len {
            self.select(target);
        } else if (len - 1) / GRID_COLUMNS > self.selected_row() {
            // Last row is shorter than this column
            self.select(len - 1);
        }
    }

    pub fn nav_up(&mut self) {
        if self.selected >= GRID_COLUMNS {
            self.select(self.selected - GRID_COLUMNS);
        }
    }

    pub fn nav_left(&mut self) {
        if self.selected % GRID_COLUMNS > 0 {
            self.select(self.selected - 1);
        }
    }

    pub fn nav_right(&mut self) {
        if self.selected % GRID_COLUMNS < GRID_COLUMNS - 1 && self.selected + 1 < self.len() {
            self.select(self.selected + 1);
        }
    }

    pub fn page_down(&mut self) {
        let len = self.len();
        if len == 0 {
            return;
        }
        let step = self.visible_rows().max(1) * GRID_COLUMNS;
        self.select((self.selected + step).min(len - 1));
    }

    pub fn page_up(&mut self) {
        let step = self.visible_rows().max(1) * GRID_COLUMNS;
        self.select(self.selected.saturating_sub(step));
    }

    /// Toggle details of the selected card. Returns the new flag.
    pub fn toggle_selected_details(&mut self) -> Option<bool> {
        let id = self.selected_character()?.id;
        let expanded = self.controller.toggle_details(id);
        self.ensure_selection_visible();
        Some(expanded)
    }

    // ------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------

    /// Whether scroll proximity (or an unfilled screen) calls for the next page.
    pub fn should_prefetch(&self) -> bool {
        let state = self.controller.state();
        if self.auto_fetch_paused || state.is_end_of_data() || self.controller.is_fetching() {
            return false;
        }
        if state.is_empty() {
            return true;
        }
        let rows = self.row_count();
        if rows.saturating_sub(self.scroll_row) < self.viewport_capacity() {
            return true;
        }
        let remaining = rows.saturating_sub(self.selected_row() + 1);
        let visible = self.visible_rows().max(1);
        remaining as f64 <= visible as f64 * self.prefetch_threshold
    }

    /// Claim the next page fetch. `explicit` requests report why nothing
    /// happened and lift the pause left by a failure.
    pub fn begin_fetch(&mut self, explicit: bool) -> Option<PageRequest> {
        if explicit {
            self.auto_fetch_paused = false;
        }
        match self.controller.begin_fetch() {
            Ok(request) => Some(request),
            Err(skipped) => {
                if explicit {
                    match skipped {
                        FetchSkipped::EndOfData => self.set_status("No more characters"),
                        FetchSkipped::InFlight => self.set_status("Already loading..."),
                        FetchSkipped::Stale => {}
                    }
                }
                None
            }
        }
    }

    /// Merge a page response. Returns true when an enrichment pass is due.
    pub fn apply_page(&mut self, response: PageResponse) -> bool {
        match self.controller.apply_page(response) {
            FetchOutcome::Appended {
                count, end_of_data, ..
            } => {
                self.last_error = None;
                if end_of_data {
                    self.set_status(format!("Loaded {} characters, that's all of them", count));
                }
            }
            FetchOutcome::Failed(e) => {
                self.auto_fetch_paused = true;
                let key = self
                    .keybindings
                    .key_hint(crate::keybindings::Action::LoadMore)
                    .unwrap_or_else(|| "load".to_string());
                self.last_error = Some(format!("Load failed: {} (press {} to retry)", e, key));
            }
            FetchOutcome::Skipped(_) => {}
        }
        self.controller.needs_enrichment()
    }

    pub fn begin_enrichment(&mut self, policy: Option<EnrichPolicy>) -> Option<EnrichmentJob> {
        let job = match policy {
            Some(policy) => self.controller.begin_enrichment_with(policy),
            None => self.controller.begin_enrichment(),
        }?;
        self.enrichments_running += 1;
        Some(job)
    }

    pub fn apply_enrichment(&mut self, result: EnrichmentResult) -> usize {
        self.enrichments_running = self.enrichments_running.saturating_sub(1);
        self.controller.apply_enrichment(result)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, CharacterPage, PageInfo, RetryPolicy, UNKNOWN_EPISODE};
    use crate::feed::ControllerSettings;
    use std::time::Duration;
    use tokio::time;

    fn test_app() -> App {
        let client = ApiClient::with_client(
            reqwest::Client::new(),
            "http://127.0.0.1:9/api",
            RetryPolicy::none(),
        )
        .unwrap();
        let controller = FeedController::new(client, ControllerSettings::default());
        let mut app = App::new(controller, KeybindingRegistry::new());
        app.grid_height = CARD_HEIGHT * 3;
        app
    }

    fn add_characters(app: &mut App, ids: std::ops::Range<i64>, next: bool) {
        let page = CharacterPage {
            info: PageInfo {
                next: next.then(|| "next".to_string()),
            },
            results: ids
                .map(|id| Character {
                    id,
                    name: format!("Character {}", id),
                    status: "Alive".to_string(),
                    gender: "Male".to_string(),
                    image: String::new(),
                    episode: vec![],
                    last_episode: UNKNOWN_EPISODE.to_string(),
                })
                .collect(),
        };
        app.controller.state_mut().append_page(page);
    }

    #[test]
    fn test_nav_empty_list() {
        let mut app = test_app();
        app.nav_down();
        app.nav_right();
        app.page_down();
        assert_eq!(app.selected, 0);
        assert!(app.selected_character().is_none());
        assert_eq!(app.toggle_selected_details(), None);
    }

    #[test]
    fn test_grid_navigation() {
        let mut app = test_app();
        add_characters(&mut app, 1..6, true);

        app.nav_right();
        assert_eq!(app.selected, 1);
        app.nav_right();
        assert_eq!(app.selected, 1);
        app.nav_down();
        assert_eq!(app.selected, 3);
        // Row 2 has a single card in column 0
        app.nav_down();
        assert_eq!(app.selected, 4);
        app.nav_down();
        assert_eq!(app.selected, 4);
        app.nav_up();
        assert_eq!(app.selected, 2);
        app.nav_left();
        assert_eq!(app.selected, 2);
    }

    #[test]
    fn test_scroll_follows_selection() {
        let mut app = test_app();
        add_characters(&mut app, 1..21, true);
        for _ in 0..5 {
            app.nav_down();
        }
        assert_eq!(app.selected_row(), 5);
        assert_eq!(app.scroll_row, 3);
        for _ in 0..5 {
            app.nav_up();
        }
        assert_eq!(app.scroll_row, 0);
    }

    #[test]
    fn test_expanded_rows_are_taller() {
        let mut app = test_app();
        add_characters(&mut app, 1..5, true);
        assert_eq!(app.row_height(0), CARD_HEIGHT);
        app.toggle_selected_details();
        assert_eq!(app.row_height(0), CARD_HEIGHT_EXPANDED);
        assert_eq!(app.row_height(1), CARD_HEIGHT);
        assert!(app.controller.state().is_expanded(1));
    }

    #[test]
    fn test_prefetch_when_empty() {
        let app = test_app();
        assert!(app.should_prefetch());
    }

    #[test]
    fn test_prefetch_near_end_only() {
        let mut app = test_app();
        add_characters(&mut app, 1..21, true);
        // 10 rows, 3 visible, selection at the top
        assert!(!app.should_prefetch());
        for _ in 0..8 {
            app.nav_down();
        }
        assert!(app.should_prefetch());
    }

    #[test]
    fn test_no_prefetch_after_end_or_failure() {
        let mut app = test_app();
        add_characters(&mut app, 1..3, false);
        assert!(!app.should_prefetch());

        let mut app = test_app();
        app.auto_fetch_paused = true;
        assert!(!app.should_prefetch());
    }

    #[test]
    fn test_explicit_fetch_at_end_sets_status() {
        let mut app = test_app();
        add_characters(&mut app, 1..3, false);
        assert!(app.begin_fetch(true).is_none());
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert_eq!(msg, "No more characters");
    }

    #[test]
    fn test_explicit_fetch_lifts_pause() {
        let mut app = test_app();
        app.auto_fetch_paused = true;
        let request = app.begin_fetch(true);
        assert!(request.is_some());
        assert!(!app.auto_fetch_paused);
        assert!(app.begin_fetch(false).is_none());
    }

    #[test]
    fn test_cycle_theme() {
        let mut app = test_app();
        app.cycle_theme();
        assert_eq!(app.theme_variant, ThemeVariant::Light);
        assert!(app.status_message.is_some());
    }

    #[tokio::test]
    async fn test_status_expires_after_3_seconds() {
        time::pause();
        let mut app = test_app();
        app.set_status("Test message");

        time::advance(Duration::from_secs(2)).await;
        assert!(!app.clear_expired_status());
        assert!(app.status_message.is_some());

        time::advance(Duration::from_secs(2)).await;
        assert!(app.clear_expired_status());
        assert!(app.status_message.is_none());
    }
}
