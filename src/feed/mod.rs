//! Character feed: pagination, accumulation, enrichment and detail toggles.
//!
//! - `state` - [`FeedState`], the append-only accumulated list with its
//!   page cursor, end-of-data flag and detail-visibility map
//! - `episodes` - [`EpisodeResolver`], last-episode name lookups, an optional
//!   LRU cache and the `"Unknown"` fallback
//! - `controller` - [`FeedController`], the only writer of `FeedState`
//!
//! # Example
//!
//! ```ignore
//! let mut feed = FeedController::new(client, ControllerSettings::default());
//! feed.fetch_next_page().await;   // page 1, then enrichment
//! feed.toggle_details(1);
//! for c in feed.state().characters().iter() {
//!     println!("{} - {}", c.name, c.last_episode);
//! }
//! ```

mod controller;
mod episodes;
mod state;

pub use controller::{
    ControllerSettings, EnrichPolicy, EnrichmentJob, EnrichmentResult, FeedController,
    FetchOutcome, FetchSkipped, PageRequest, PageResponse,
};
pub use episodes::EpisodeResolver;
pub use state::FeedState;
