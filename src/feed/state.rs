use crate::api::{Character, CharacterPage};
use std::collections::HashMap;
use std::sync::Arc;

/// Accumulated feed state for one session.
///
/// Invariants, all enforced by the mutators being crate-private and only
/// called from [`FeedController`](super::FeedController):
///
/// - `characters` only grows, in fetch order; duplicates are kept
/// - `cursor` starts at 1 and advances once per successful page
/// - `end_of_data` is sticky
/// - `details` only gains keys
///
/// Readers get `Arc` snapshots: cloning the list for a render or a
/// background job is a refcount bump, and a later append copies on write.
#[derive(Debug, Clone)]
pub struct FeedState {
    characters: Arc<Vec<Character>>,
    cursor: u32,
    end_of_data: bool,
    details: HashMap<i64, bool>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedState {
    pub fn new() -> Self {
        Self {
            characters: Arc::new(Vec::new()),
            cursor: 1,
            end_of_data: false,
            details: HashMap::new(),
        }
    }

    /// Read-only snapshot of the accumulated list.
    pub fn characters(&self) -> Arc<Vec<Character>> {
        Arc::clone(&self.characters)
    }

    pub fn get(&self, index: usize) -> Option<&Character> {
        self.characters.get(index)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Number of the next page to request (1-based).
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn is_end_of_data(&self) -> bool {
        self.end_of_data
    }

    /// Whether the card for `id` is expanded. Unknown ids are collapsed.
    pub fn is_expanded(&self, id: i64) -> bool {
        self.details.get(&id).copied().unwrap_or(false)
    }

    /// Number of ids that have ever been toggled.
    pub fn toggled_count(&self) -> usize {
        self.details.len()
    }

    /// Count of characters whose last episode has resolved to a real name.
    pub fn enriched_count(&self) -> usize {
        self.characters.iter().filter(|c| c.is_enriched()).count()
    }

    /// Merge a fetched page: append its records, advance the cursor, and
    /// latch end-of-data when the page has no `next`.
    ///
    /// Returns the number of records appended.
    pub(crate) fn append_page(&mut self, page: CharacterPage) -> usize {
        let has_next = page.has_next();
        let count = page.results.len();
        if count > 0 {
            Arc::make_mut(&mut self.characters).extend(page.results);
        }
        self.cursor = self.cursor.saturating_add(1);
        if !has_next {
            self.end_of_data = true;
        }
        count
    }

    /// Write an enriched copy of the window starting at `start` back into
    /// the list.
    ///
    /// Entries are matched by position and id. Anything appended after the
    /// window was snapshotted is left untouched, so the list never shrinks.
    /// Returns the number of entries replaced.
    pub(crate) fn replace(&mut self, start: usize, enriched: Vec<Character>) -> usize {
        if enriched.is_empty() || start >= self.characters.len() {
            return 0;
        }
        let characters = Arc::make_mut(&mut self.characters);
        let mut replaced = 0;
        for (slot, update) in characters[start..].iter_mut().zip(enriched) {
            if slot.id != update.id {
                tracing::warn!(
                    expected = slot.id,
                    got = update.id,
                    "Enriched record does not line up with accumulated list, skipping"
                );
                continue;
            }
            *slot = update;
            replaced += 1;
        }
        replaced
    }

    /// Flip the detail flag for `id`, creating it (collapsed) first if
    /// absent. Returns the new value.
    pub(crate) fn toggle_details(&mut self, id: i64) -> bool {
        let flag = self.details.entry(id).or_insert(false);
        *flag = !*flag;
        *flag
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::{PageInfo, UNKNOWN_EPISODE};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    pub(crate) fn character(id: i64) -> Character {
        Character {
            id,
            name: format!("Character {}", id),
            status: "Alive".to_string(),
            gender: "Female".to_string(),
            image: format!("https://example.com/avatar/{}.jpeg", id),
            episode: vec![format!("https://example.com/api/episode/{}", id)],
            last_episode: UNKNOWN_EPISODE.to_string(),
        }
    }

    fn page(ids: std::ops::Range<i64>, next: bool) -> CharacterPage {
        CharacterPage {
            info: PageInfo {
                next: next.then(|| "https://example.com/api/character?page=2".to_string()),
            },
            results: ids.map(character).collect(),
        }
    }

    #[test]
    fn test_new_state() {
        let state = FeedState::new();
        assert!(state.is_empty());
        assert_eq!(state.cursor(), 1);
        assert!(!state.is_end_of_data());
        assert_eq!(state.toggled_count(), 0);
    }

    #[test]
    fn test_append_advances_cursor() {
        let mut state = FeedState::new();
        assert_eq!(state.append_page(page(1..21, true)), 20);
        assert_eq!(state.len(), 20);
        assert_eq!(state.cursor(), 2);
        assert!(!state.is_end_of_data());
    }

    #[test]
    fn test_append_without_next_latches_end() {
        let mut state = FeedState::new();
        state.append_page(page(1..3, false));
        assert!(state.is_end_of_data());
        // A later page with `next` does not clear it
        state.append_page(page(3..5, true));
        assert!(state.is_end_of_data());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut state = FeedState::new();
        state.append_page(page(1..3, true));
        state.append_page(page(2..4, true));
        let ids: Vec<i64> = state.characters().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 2, 3]);
    }

    #[test]
    fn test_snapshot_is_unaffected_by_append() {
        let mut state = FeedState::new();
        state.append_page(page(1..3, true));
        let snapshot = state.characters();
        state.append_page(page(3..5, true));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(state.len(), 4);
    }

    #[test]
    fn test_replace_keeps_tail_appended_after_snapshot() {
        let mut state = FeedState::new();
        state.append_page(page(1..3, true));
        let mut enriched: Vec<Character> = state.characters().iter().cloned().collect();
        for c in &mut enriched {
            c.last_episode = "Pilot".to_string();
        }
        state.append_page(page(3..5, true));

        assert_eq!(state.replace(0, enriched), 2);
        assert_eq!(state.len(), 4);
        assert_eq!(state.get(0).unwrap().last_episode, "Pilot");
        assert_eq!(state.get(1).unwrap().last_episode, "Pilot");
        assert_eq!(state.get(2).unwrap().last_episode, UNKNOWN_EPISODE);
        assert_eq!(state.enriched_count(), 2);
    }

    #[test]
    fn test_replace_with_offset() {
        let mut state = FeedState::new();
        state.append_page(page(1..5, true));
        let mut tail = vec![character(3), character(4)];
        tail[1].last_episode = "Close Rick-counters".to_string();
        assert_eq!(state.replace(2, tail), 2);
        assert_eq!(state.get(3).unwrap().last_episode, "Close Rick-counters");
    }

    #[test]
    fn test_replace_skips_misaligned_ids() {
        let mut state = FeedState::new();
        state.append_page(page(1..3, true));
        let mut wrong = character(99);
        wrong.last_episode = "Pilot".to_string();
        assert_eq!(state.replace(0, vec![wrong]), 0);
        assert_eq!(state.get(0).unwrap().id, 1);
    }

    #[test]
    fn test_replace_out_of_range_is_noop() {
        let mut state = FeedState::new();
        assert_eq!(state.replace(0, vec![character(1)]), 0);
        assert!(state.is_empty());
    }

    #[test]
    fn test_toggle_creates_entry() {
        let mut state = FeedState::new();
        assert!(!state.is_expanded(7));
        assert!(state.toggle_details(7));
        assert!(state.is_expanded(7));
        assert!(!state.toggle_details(7));
        assert_eq!(state.toggled_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_toggle_twice_restores(ids in proptest::collection::vec(0i64..50, 0..20), target in 0i64..50) {
            let mut state = FeedState::new();
            for id in ids {
                state.toggle_details(id);
            }
            let before = state.is_expanded(target);
            state.toggle_details(target);
            state.toggle_details(target);
            prop_assert_eq!(state.is_expanded(target), before);
        }

        #[test]
        fn prop_length_is_sum_of_pages(sizes in proptest::collection::vec(0usize..25, 1..8)) {
            let mut state = FeedState::new();
            let mut next_id = 1i64;
            let mut total = 0;
            for (k, size) in sizes.iter().enumerate() {
                let start = next_id;
                next_id += *size as i64;
                state.append_page(page(start..next_id, true));
                total += size;
                prop_assert_eq!(state.len(), total);
                prop_assert_eq!(state.cursor() as usize, k + 2);
            }
        }

        #[test]
        fn prop_toggle_map_only_grows(ids in proptest::collection::vec(0i64..30, 0..40)) {
            let mut state = FeedState::new();
            let mut seen = 0;
            for id in ids {
                state.toggle_details(id);
                prop_assert!(state.toggled_count() >= seen);
                seen = state.toggled_count();
            }
        }
    }
}
