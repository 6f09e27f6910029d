use crate::api::{ApiClient, ApiError, Character, CharacterPage};
use crate::feed::episodes::EpisodeResolver;
use crate::feed::state::FeedState;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which characters an enrichment pass resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichPolicy {
    /// Every character in the list, on every change.
    #[default]
    All,
    /// Only characters appended since the last pass was issued.
    Appended,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub policy: EnrichPolicy,
    /// Max episode lookups in flight during one pass.
    pub concurrency: usize,
    /// LRU capacity for episode names; 0 (the default) disables the cache
    /// so every whole-list pass asks the API again.
    pub episode_cache_size: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            policy: EnrichPolicy::All,
            concurrency: 20,
            episode_cache_size: 0,
        }
    }
}

/// Why a fetch request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSkipped {
    /// Another fetch holds the in-flight claim.
    InFlight,
    /// The upstream already reported its last page.
    EndOfData,
    /// The response was for a page other than the current cursor.
    Stale,
}

/// Result of one fetch attempt, as seen by the caller.
///
/// Failures have already been logged and left the state untouched; the
/// error is returned only so a UI can mention it.
#[derive(Debug)]
pub enum FetchOutcome {
    Appended {
        page: u32,
        count: usize,
        end_of_data: bool,
    },
    Skipped(FetchSkipped),
    Failed(ApiError),
}

impl FetchOutcome {
    /// True when the accumulated list grew.
    pub fn changed(&self) -> bool {
        matches!(self, FetchOutcome::Appended { count, .. } if *count > 0)
    }
}

/// Holds the in-flight claim; releasing it on drop covers panics and
/// dropped events as well as the normal apply path.
#[derive(Debug)]
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A claimed page fetch, ready to run on any task.
#[derive(Debug)]
pub struct PageRequest {
    client: ApiClient,
    page: u32,
    guard: InFlightGuard,
}

impl PageRequest {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub async fn run(self) -> PageResponse {
        tracing::debug!(page = self.page, "Requesting character page");
        let result = self.client.fetch_character_page(self.page).await;
        PageResponse {
            page: self.page,
            result,
            guard: self.guard,
        }
    }
}

/// Raw response of a [`PageRequest`]. Carries the in-flight claim until
/// [`FeedController::apply_page`] consumes it.
#[derive(Debug)]
pub struct PageResponse {
    page: u32,
    result: Result<CharacterPage, ApiError>,
    guard: InFlightGuard,
}

impl PageResponse {
    pub fn page(&self) -> u32 {
        self.page
    }
}

/// Snapshot of a window of characters to enrich.
#[derive(Debug)]
pub struct EnrichmentJob {
    generation: u64,
    policy: EnrichPolicy,
    start: usize,
    characters: Vec<Character>,
    resolver: EpisodeResolver,
    concurrency: usize,
}

impl EnrichmentJob {
    /// Characters in the snapshot window.
    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    /// Resolve every character's last episode concurrently and wait for
    /// all of them. Individual failures become `"Unknown"`.
    pub async fn run(self) -> EnrichmentResult {
        let EnrichmentJob {
            generation,
            policy,
            start,
            characters,
            resolver,
            concurrency,
        } = self;
        let total = characters.len();
        tracing::debug!(generation, start, total, ?policy, "Enrichment pass started");

        let enriched: Vec<Character> = stream::iter(characters)
            .map(|mut character| {
                let resolver = resolver.clone();
                async move {
                    character.last_episode = resolver
                        .resolve_optional(character.last_episode_url())
                        .await;
                    character
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let resolved = enriched.iter().filter(|c| c.is_enriched()).count();
        tracing::debug!(
            generation,
            total,
            resolved,
            unresolved = total - resolved,
            "Enrichment pass finished"
        );

        EnrichmentResult {
            generation,
            policy,
            start,
            enriched,
        }
    }
}

/// Output of [`EnrichmentJob::run`], applied with
/// [`FeedController::apply_enrichment`].
#[derive(Debug)]
pub struct EnrichmentResult {
    generation: u64,
    policy: EnrichPolicy,
    start: usize,
    enriched: Vec<Character>,
}

/// Owns the [`FeedState`] and is its only writer.
///
/// Every operation comes in two shapes. The one-call forms
/// ([`fetch_next_page`](Self::fetch_next_page),
/// [`enrich_all_characters`](Self::enrich_all_characters)) suit scripts and
/// tests. The split forms (`begin_*`, `run`, `apply_*`) let an event loop
/// keep the state on its own task and ship only the network part to a
/// background task.
pub struct FeedController {
    client: ApiClient,
    resolver: EpisodeResolver,
    state: FeedState,
    in_flight: Arc<AtomicBool>,
    policy: EnrichPolicy,
    concurrency: usize,
    /// List changed since the last enrichment was issued.
    dirty: bool,
    /// Last issued enrichment generation.
    generation: u64,
    /// Generation of the newest whole-list pass applied; older results are stale.
    applied_full_generation: u64,
    /// Prefix of the list already handed to an enrichment pass.
    issued_upto: usize,
}

impl FeedController {
    pub fn new(client: ApiClient, settings: ControllerSettings) -> Self {
        let resolver = EpisodeResolver::new(client.clone(), settings.episode_cache_size);
        Self {
            client,
            resolver,
            state: FeedState::new(),
            in_flight: Arc::new(AtomicBool::new(false)),
            policy: settings.policy,
            concurrency: settings.concurrency.max(1),
            dirty: false,
            generation: 0,
            applied_full_generation: 0,
            issued_upto: 0,
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut FeedState {
        &mut self.state
    }

    pub fn resolver(&self) -> &EpisodeResolver {
        &self.resolver
    }

    /// A page fetch currently holds the in-flight claim.
    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// The list changed and no enrichment has been issued for it yet.
    pub fn needs_enrichment(&self) -> bool {
        self.dirty && !self.state.is_empty()
    }

    // ------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------

    /// Claim the right to fetch the page at the cursor.
    ///
    /// The claim is a compare-and-swap made before any await, so two
    /// triggers in the same tick (explicit load plus scroll proximity)
    /// cannot both start a request.
    pub fn begin_fetch(&self) -> Result<PageRequest, FetchSkipped> {
        if self.state.is_end_of_data() {
            return Err(FetchSkipped::EndOfData);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FetchSkipped::InFlight);
        }
        Ok(PageRequest {
            client: self.client.clone(),
            page: self.state.cursor(),
            guard: InFlightGuard(Arc::clone(&self.in_flight)),
        })
    }

    /// Merge a page response into the state and release the in-flight claim.
    ///
    /// On failure nothing changes: the cursor stays put and end-of-data is
    /// not set, so the next trigger retries the same page.
    pub fn apply_page(&mut self, response: PageResponse) -> FetchOutcome {
        let PageResponse {
            page,
            result,
            guard,
        } = response;

        let outcome = if page != self.state.cursor() {
            tracing::debug!(page, cursor = self.state.cursor(), "Discarding stale page");
            FetchOutcome::Skipped(FetchSkipped::Stale)
        } else {
            match result {
                Ok(body) => {
                    let count = self.state.append_page(body);
                    if count > 0 {
                        self.dirty = true;
                    }
                    tracing::info!(
                        page,
                        count,
                        total = self.state.len(),
                        end_of_data = self.state.is_end_of_data(),
                        "Appended character page"
                    );
                    FetchOutcome::Appended {
                        page,
                        count,
                        end_of_data: self.state.is_end_of_data(),
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        page,
                        error = %e,
                        parse = e.is_parse(),
                        "Character page fetch failed, state unchanged"
                    );
                    FetchOutcome::Failed(e)
                }
            }
        };

        drop(guard);
        outcome
    }

    /// Fetch the next page and, if the list grew, run the enrichment pass
    /// that reacts to it.
    ///
    /// A no-op when a fetch is already in flight or the upstream has no
    /// more pages.
    pub async fn fetch_next_page(&mut self) -> FetchOutcome {
        let request = match self.begin_fetch() {
            Ok(request) => request,
            Err(skipped) => {
                tracing::trace!(?skipped, "Fetch request ignored");
                return FetchOutcome::Skipped(skipped);
            }
        };
        let response = request.run().await;
        let outcome = self.apply_page(response);
        if self.needs_enrichment() {
            self.enrich_all_characters().await;
        }
        outcome
    }

    // ------------------------------------------------------------------
    // Enrichment
    // ------------------------------------------------------------------

    /// Name of the episode at `episode_url`, or `"Unknown"` on any failure.
    pub async fn resolve_last_episode_name(&self, episode_url: &str) -> String {
        self.resolver.resolve(episode_url).await
    }

    /// Snapshot the characters the configured policy says to enrich.
    pub fn begin_enrichment(&mut self) -> Option<EnrichmentJob> {
        self.begin_enrichment_with(self.policy)
    }

    /// Snapshot for an explicit policy; `EnrichPolicy::All` forces a
    /// whole-list pass regardless of configuration.
    pub fn begin_enrichment_with(&mut self, policy: EnrichPolicy) -> Option<EnrichmentJob> {
        let snapshot = self.state.characters();
        if snapshot.is_empty() {
            return None;
        }
        let start = match policy {
            EnrichPolicy::All => 0,
            EnrichPolicy::Appended => self.issued_upto.min(snapshot.len()),
        };
        self.dirty = false;
        if start == snapshot.len() {
            return None;
        }

        self.generation += 1;
        self.issued_upto = snapshot.len();
        Some(EnrichmentJob {
            generation: self.generation,
            policy,
            start,
            characters: snapshot[start..].to_vec(),
            resolver: self.resolver.clone(),
            concurrency: self.concurrency,
        })
    }

    /// Write an enrichment result back. Returns how many characters were
    /// updated; 0 when the result was superseded by a newer whole-list pass.
    pub fn apply_enrichment(&mut self, result: EnrichmentResult) -> usize {
        if result.generation < self.applied_full_generation {
            tracing::debug!(
                generation = result.generation,
                newest = self.applied_full_generation,
                "Discarding superseded enrichment result"
            );
            return 0;
        }
        if result.policy == EnrichPolicy::All {
            self.applied_full_generation = result.generation;
        }
        self.state.replace(result.start, result.enriched)
    }

    /// Resolve the last episode of every character in the list (or the
    /// newly appended ones under [`EnrichPolicy::Appended`]) and replace the
    /// list with the enriched copy once all lookups finish.
    pub async fn enrich_all_characters(&mut self) -> usize {
        match self.begin_enrichment() {
            Some(job) => {
                let result = job.run().await;
                self.apply_enrichment(result)
            }
            None => 0,
        }
    }

    // ------------------------------------------------------------------
    // Details
    // ------------------------------------------------------------------

    /// Flip the detail visibility of `id`. Returns the new value.
    pub fn toggle_details(&mut self, id: i64) -> bool {
        self.state.toggle_details(id)
    }
}
