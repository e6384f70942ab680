// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::RepoError;
use crate::model::Show;
use crate::provider::{ShowDataSource, DEFAULT_PAGE_SIZE};
use crate::store::CacheStore;

/// The three operations the presentation layer consumes
#[async_trait]
pub trait ShowRepository: Send + Sync {
    /// Fetch one page (1-based) of trending shows
    async fn trending(&self, page: u32) -> Result<Vec<Show>, RepoError>;

    /// Search shows; failures are never masked by the cache
    async fn search(&self, query: &str, page: u32) -> Result<Vec<Show>, RepoError>;

    /// Fetch one show with its episode list
    async fn show_detail(&self, id: &str) -> Result<Show, RepoError>;
}

/// Repository coordinating a remote data source with the offline cache
///
/// The remote is always tried first, unconditionally. On success the
/// result is persisted to the cache; on failure the cache substitutes
/// only where a usable entry exists, otherwise the original remote error
/// propagates untouched.
pub struct CachingRepository<D, C> {
    source: D,
    cache: C,
    page_size: u32,
}

impl<D, C> CachingRepository<D, C>
where
    D: ShowDataSource,
    C: CacheStore,
{
    pub fn new(source: D, cache: C) -> Self {
        Self {
            source,
            cache,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    async fn fetch_and_cache_trending(&self, page: u32) -> Result<Vec<Show>, RepoError> {
        let shows = self.source.fetch_trending(page, self.page_size).await?;
        self.cache.upsert_shows(&shows)?;
        Ok(shows)
    }

    async fn fetch_and_cache_detail(&self, id: &str) -> Result<Show, RepoError> {
        let show = self.source.fetch_show_detail(id).await?;
        self.cache.upsert_episodes(id, &show.latest_episodes)?;
        Ok(show)
    }
}

#[async_trait]
impl<D, C> ShowRepository for CachingRepository<D, C>
where
    D: ShowDataSource,
    C: CacheStore,
{
    async fn trending(&self, page: u32) -> Result<Vec<Show>, RepoError> {
        match self.fetch_and_cache_trending(page).await {
            Ok(shows) => {
                debug!(page, count = shows.len(), "trending page cached");
                Ok(shows)
            }
            Err(err) => {
                warn!(page, error = %err, "trending fetch failed, trying cache");
                // The cache is unpaginated: the fallback returns everything
                // cached so far, regardless of the requested page. A cache
                // read failure is discarded in favor of the remote error.
                match self.cache.fetch_shows() {
                    Ok(cached) if !cached.is_empty() => Ok(cached),
                    _ => Err(err),
                }
            }
        }
    }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<Show>, RepoError> {
        // No caching, no fallback: a search failure always propagates
        self.source.search(query, page, self.page_size).await
    }

    async fn show_detail(&self, id: &str) -> Result<Show, RepoError> {
        match self.fetch_and_cache_detail(id).await {
            Ok(show) => Ok(show),
            Err(err) => {
                warn!(id, error = %err, "detail fetch failed, trying cache");
                let cached_show = self.cache.fetch_show(id);
                let cached_episodes = self.cache.fetch_episodes(id);

                match (cached_show, cached_episodes) {
                    (Ok(Some(mut show)), Ok(episodes)) if !episodes.is_empty() => {
                        show.latest_episodes = episodes;
                        Ok(show)
                    }
                    _ => Err(err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::model::Episode;
    use crate::store::MemoryCacheStore;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    fn show(id: &str, title: &str) -> Show {
        Show {
            id: id.to_string(),
            title: title.to_string(),
            publisher: "Pub".to_string(),
            image_url: None,
            thumbnail_url: None,
            total_episodes: 2,
            description: "desc".to_string(),
            rss: None,
            genres: vec![],
            latest_episodes: vec![],
        }
    }

    fn episode(id: &str, day: u32) -> Episode {
        Episode {
            id: id.to_string(),
            title: format!("Episode {id}"),
            audio_url: None,
            thumbnail_url: None,
            description: String::new(),
            duration: 60,
            publish_date: Some(Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap()),
            explicit: false,
        }
    }

    fn remote_error() -> RepoError {
        RepoError::Api(ApiError::Status {
            url: "https://example.com".to_string(),
            code: 500,
            body: "boom".to_string(),
        })
    }

    /// Data source whose responses and failures are scripted per test
    struct ScriptedSource {
        fail: AtomicBool,
        trending_pages: Mutex<Vec<Vec<Show>>>,
        detail: Option<Show>,
        search_results: Vec<Show>,
    }

    impl ScriptedSource {
        fn new() -> Self {
            Self {
                fail: AtomicBool::new(false),
                trending_pages: Mutex::new(vec![]),
                detail: None,
                search_results: vec![],
            }
        }

        fn failing() -> Self {
            let source = Self::new();
            source.fail.store(true, Ordering::SeqCst);
            source
        }

        fn with_trending_pages(self, pages: Vec<Vec<Show>>) -> Self {
            *self.trending_pages.lock().unwrap() = pages;
            self
        }

        fn with_detail(mut self, show: Show) -> Self {
            self.detail = Some(show);
            self
        }
    }

    #[async_trait]
    impl ShowDataSource for ScriptedSource {
        async fn fetch_trending(
            &self,
            page: u32,
            _page_size: u32,
        ) -> Result<Vec<Show>, RepoError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(remote_error());
            }
            let pages = self.trending_pages.lock().unwrap();
            Ok(pages
                .get((page as usize).saturating_sub(1))
                .cloned()
                .unwrap_or_default())
        }

        async fn search(
            &self,
            _query: &str,
            _page: u32,
            _page_size: u32,
        ) -> Result<Vec<Show>, RepoError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(remote_error());
            }
            Ok(self.search_results.clone())
        }

        async fn fetch_show_detail(&self, id: &str) -> Result<Show, RepoError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(remote_error());
            }
            self.detail
                .clone()
                .ok_or_else(|| RepoError::ShowNotFound { id: id.to_string() })
        }
    }

    #[tokio::test]
    async fn trending_success_returns_page_and_caches_union() {
        let source = ScriptedSource::new().with_trending_pages(vec![
            vec![show("s1", "Page1 Title"), show("s2", "Two")],
            vec![show("s2", "Updated Two"), show("s3", "Three")],
        ]);
        let repo = CachingRepository::new(source, MemoryCacheStore::new());

        let page1 = repo.trending(1).await.unwrap();
        assert_eq!(page1.len(), 2);

        let page2 = repo.trending(2).await.unwrap();
        assert_eq!(page2.len(), 2);

        // Cache holds the union by id, last write wins
        let mut cached = repo.cache.fetch_shows().unwrap();
        cached.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(cached.len(), 3);
        assert_eq!(cached[1].title, "Updated Two");
    }

    #[tokio::test]
    async fn trending_failure_with_cache_returns_full_cache() {
        let cache = MemoryCacheStore::new();
        cache
            .upsert_shows(&[show("s1", "One"), show("s2", "Two"), show("s3", "Three")])
            .unwrap();

        let repo = CachingRepository::new(ScriptedSource::failing(), cache);

        // The fallback is page-unaware: any page returns the whole cache
        let from_page_1 = repo.trending(1).await.unwrap();
        let from_page_9 = repo.trending(9).await.unwrap();
        assert_eq!(from_page_1.len(), 3);
        assert_eq!(from_page_9.len(), 3);
    }

    #[tokio::test]
    async fn trending_failure_with_empty_cache_propagates_remote_error() {
        let repo = CachingRepository::new(ScriptedSource::failing(), MemoryCacheStore::new());

        let err = repo.trending(1).await.unwrap_err();
        match err {
            RepoError::Api(ApiError::Status { code, .. }) => assert_eq!(code, 500),
            other => panic!("expected the original remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn search_never_falls_back_to_cache() {
        let cache = MemoryCacheStore::new();
        cache.upsert_shows(&[show("s1", "One")]).unwrap();

        let repo = CachingRepository::new(ScriptedSource::failing(), cache);

        let err = repo.search("news", 1).await.unwrap_err();
        assert!(matches!(err, RepoError::Api(ApiError::Status { .. })));
    }

    #[tokio::test]
    async fn detail_success_caches_episodes() {
        let mut detail = show("s1", "One");
        detail.latest_episodes = vec![episode("e2", 20), episode("e1", 10)];

        let source = ScriptedSource::new().with_detail(detail);
        let repo = CachingRepository::new(source, MemoryCacheStore::new());

        let fetched = repo.show_detail("s1").await.unwrap();
        assert_eq!(fetched.latest_episodes.len(), 2);

        let cached = repo.cache.fetch_episodes("s1").unwrap();
        let ids: Vec<&str> = cached.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1"]);
    }

    #[tokio::test]
    async fn detail_failure_substitutes_cached_show_and_episodes() {
        let cache = MemoryCacheStore::new();
        cache.upsert_shows(&[show("s1", "Cached One")]).unwrap();
        cache
            .upsert_episodes("s1", &[episode("e1", 10), episode("e2", 20)])
            .unwrap();

        let repo = CachingRepository::new(ScriptedSource::failing(), cache);

        let substituted = repo.show_detail("s1").await.unwrap();
        assert_eq!(substituted.title, "Cached One");
        let ids: Vec<&str> = substituted
            .latest_episodes
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["e2", "e1"]);
    }

    #[tokio::test]
    async fn detail_failure_without_cached_episodes_propagates() {
        let cache = MemoryCacheStore::new();
        cache.upsert_shows(&[show("s1", "Cached One")]).unwrap();
        // No episodes cached for s1

        let repo = CachingRepository::new(ScriptedSource::failing(), cache);
        let err = repo.show_detail("s1").await.unwrap_err();
        assert!(matches!(err, RepoError::Api(ApiError::Status { .. })));
    }

    #[tokio::test]
    async fn detail_failure_without_cached_show_propagates() {
        let cache = MemoryCacheStore::new();
        cache.upsert_episodes("s1", &[episode("e1", 10)]).unwrap();
        // No show record cached for s1

        let repo = CachingRepository::new(ScriptedSource::failing(), cache);
        let err = repo.show_detail("s1").await.unwrap_err();
        assert!(matches!(err, RepoError::Api(ApiError::Status { .. })));
    }
}
