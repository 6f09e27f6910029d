use crate::api::{ApiClient, UNKNOWN_EPISODE};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Resolves episode reference URIs to display names.
///
/// Resolution never fails: transport and parse errors are logged and come
/// back as [`UNKNOWN_EPISODE`]. With a non-zero cache size, successful names
/// are kept in an LRU keyed by URI so re-enriching the whole list does not
/// refetch episodes already seen. Failures are not cached; the next pass
/// retries them.
///
/// Clones share the cache.
#[derive(Clone)]
pub struct EpisodeResolver {
    client: ApiClient,
    cache: Option<Arc<Mutex<LruCache<String, String>>>>,
}

impl EpisodeResolver {
    /// `cache_size == 0` disables caching; every lookup hits the network.
    pub fn new(client: ApiClient, cache_size: usize) -> Self {
        let cache =
            NonZeroUsize::new(cache_size).map(|cap| Arc::new(Mutex::new(LruCache::new(cap))));
        Self { client, cache }
    }

    /// Name of the episode at `episode_url`, or `"Unknown"`.
    pub async fn resolve(&self, episode_url: &str) -> String {
        if let Some(name) = self.cached(episode_url) {
            tracing::trace!(url = episode_url, "Episode name cache hit");
            return name;
        }

        match self.client.fetch_episode(episode_url).await {
            Ok(episode) if episode.name.is_empty() => {
                tracing::debug!(url = episode_url, "Episode has empty name");
                UNKNOWN_EPISODE.to_string()
            }
            Ok(episode) => {
                self.remember(episode_url, &episode.name);
                episode.name
            }
            Err(e) => {
                tracing::warn!(
                    url = episode_url,
                    error = %e,
                    parse = e.is_parse(),
                    "Episode lookup failed, using fallback name"
                );
                UNKNOWN_EPISODE.to_string()
            }
        }
    }

    /// Like [`resolve`](Self::resolve) for a character that may have no
    /// episode references at all.
    pub async fn resolve_optional(&self, episode_url: Option<&str>) -> String {
        match episode_url {
            Some(url) => self.resolve(url).await,
            None => UNKNOWN_EPISODE.to_string(),
        }
    }

    /// Number of names currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache
            .as_ref()
            .and_then(|c| c.lock().ok().map(|c| c.len()))
            .unwrap_or(0)
    }

    fn cached(&self, url: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        let mut cache = cache.lock().ok()?;
        let name = cache.get(url).cloned();
        name
    }

    fn remember(&self, url: &str, name: &str) {
        if let Some(cache) = &self.cache {
            if let Ok(mut cache) = cache.lock() {
                cache.put(url.to_string(), name.to_string());
            }
        }
    }
}

impl std::fmt::Debug for EpisodeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpisodeResolver")
            .field("base_url", &self.client.base_url())
            .field("cached", &self.cached_len())
            .finish()
    }
}
