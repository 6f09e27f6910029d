//! Client for the upstream character API.
//!
//! Two endpoints are consumed:
//!
//! - `GET {base}/character?page={n}` returning a [`CharacterPage`]
//! - `GET {episode_url}` returning an [`Episode`]
//!
//! [`ApiClient`] owns the pooled `reqwest::Client`, validates every URL before
//! use, retries rate-limited and 5xx responses with exponential backoff, and
//! caps response bodies. All failures surface as [`ApiError`]; turning them
//! into fallbacks is the caller's job (see [`crate::feed`]).

mod client;
mod types;

pub use client::{ApiClient, ApiError, ClientSettings, RetryPolicy, DEFAULT_BASE_URL};
pub use types::{Character, CharacterPage, Episode, PageInfo, UNKNOWN_EPISODE};
