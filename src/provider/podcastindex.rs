// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use url::Url;

use crate::error::{ApiError, RepoError};
use crate::http::{get_json, HttpClient};
use crate::model::{sort_newest_first, Episode, Show};
use crate::provider::ShowDataSource;

const BASE_URL: &str = "https://api.podcastindex.org/api/1.0/";
const USER_AGENT: &str = "podhub/0.3";

/// API key and shared secret for the Podcast Index API
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

/// Concatenation hashed into the `Authorization` header
fn signature_base(credentials: &Credentials, timestamp: i64) -> String {
    format!("{}{}{}", credentials.key, credentials.secret, timestamp)
}

/// Hex-encoded SHA-1 digest
///
/// SHA-1 is what this API's documented signing scheme requires; it is not
/// relied on for any security property here.
fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Build the signed header set for one request at the given unix timestamp
pub fn signed_headers(credentials: &Credentials, timestamp: i64) -> Vec<(String, String)> {
    vec![
        ("X-Auth-Key".to_string(), credentials.key.clone()),
        ("X-Auth-Date".to_string(), timestamp.to_string()),
        (
            "Authorization".to_string(),
            sha1_hex(&signature_base(credentials, timestamp)),
        ),
        ("User-Agent".to_string(), USER_AGENT.to_string()),
        ("Accept".to_string(), "application/json".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ]
}

/// Podcast Index API client (alternate provider)
///
/// Every request carries a keyed-hash signature derived from the API key,
/// the shared secret, and the current unix timestamp.
pub struct PodcastIndexSource<C> {
    client: C,
    base_url: Url,
    credentials: Credentials,
}

impl<C: HttpClient> PodcastIndexSource<C> {
    pub fn new(client: C, credentials: Credentials) -> Self {
        Self {
            client,
            base_url: Url::parse(BASE_URL).expect("static base URL"),
            credentials,
        }
    }

    /// Point the client at a different base URL (used by tests)
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    fn headers(&self) -> Vec<(String, String)> {
        signed_headers(&self.credentials, Utc::now().timestamp())
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.join(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    async fn fetch_feed(&self, feed_id: i64) -> Result<FeedDetailResponse, RepoError> {
        let url = self.endpoint("podcasts/byfeedid", &[("id", feed_id.to_string())])?;
        Ok(get_json(&self.client, &url, &self.headers()).await?)
    }

    async fn fetch_episodes(
        &self,
        feed_id: i64,
        max: u32,
    ) -> Result<EpisodeListResponse, RepoError> {
        let url = self.endpoint(
            "episodes/byfeedid",
            &[("id", feed_id.to_string()), ("max", max.to_string())],
        )?;
        Ok(get_json(&self.client, &url, &self.headers()).await?)
    }
}

#[async_trait]
impl<C: HttpClient> ShowDataSource for PodcastIndexSource<C> {
    async fn fetch_trending(&self, _page: u32, page_size: u32) -> Result<Vec<Show>, RepoError> {
        // The trending endpoint is not paginated; only `max` is honored
        let url = self.endpoint("podcasts/trending", &[("max", page_size.to_string())])?;
        let response: FeedListResponse = get_json(&self.client, &url, &self.headers()).await?;
        Ok(response
            .feeds
            .into_iter()
            .map(|feed| feed.into_show(vec![]))
            .collect())
    }

    async fn search(
        &self,
        query: &str,
        _page: u32,
        page_size: u32,
    ) -> Result<Vec<Show>, RepoError> {
        let url = self.endpoint(
            "search/byterm",
            &[
                ("q", query.to_string()),
                ("clean", "1".to_string()),
                ("max", page_size.to_string()),
            ],
        )?;
        let response: FeedListResponse = get_json(&self.client, &url, &self.headers()).await?;
        Ok(response
            .feeds
            .into_iter()
            .map(|feed| feed.into_show(vec![]))
            .collect())
    }

    async fn fetch_show_detail(&self, id: &str) -> Result<Show, RepoError> {
        let feed_id: i64 = id.parse().map_err(|_| RepoError::ShowNotFound {
            id: id.to_string(),
        })?;

        let (feed, episodes) = tokio::join!(
            self.fetch_feed(feed_id),
            self.fetch_episodes(feed_id, crate::provider::DEFAULT_PAGE_SIZE)
        );

        let mut mapped: Vec<Episode> = episodes?
            .items
            .into_iter()
            .map(ItemDto::into_episode)
            .collect();
        sort_newest_first(&mut mapped);

        Ok(feed?.feed.into_show(mapped))
    }
}

#[derive(Debug, Deserialize)]
struct FeedListResponse {
    feeds: Vec<FeedDto>,
}

#[derive(Debug, Deserialize)]
struct FeedDetailResponse {
    feed: FeedDto,
}

#[derive(Debug, Deserialize)]
struct EpisodeListResponse {
    items: Vec<ItemDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedDto {
    id: i64,
    title: String,
    author: Option<String>,
    description: Option<String>,
    image: Option<String>,
    artwork: Option<String>,
    url: Option<String>,
    feed_url: Option<String>,
    categories: Option<HashMap<String, String>>,
    episode_count: Option<u32>,
}

impl FeedDto {
    fn into_show(self, episodes: Vec<Episode>) -> Show {
        let image_url = parse_url(self.artwork.clone().or_else(|| self.image.clone()));
        let thumbnail_url = parse_url(self.image.or(self.artwork));

        Show {
            id: self.id.to_string(),
            title: self.title,
            publisher: self.author.unwrap_or_else(|| "Unknown publisher".to_string()),
            image_url,
            thumbnail_url,
            total_episodes: self.episode_count.unwrap_or(episodes.len() as u32),
            description: self.description.unwrap_or_default(),
            rss: self.feed_url.or(self.url),
            genres: self
                .categories
                .map(|map| map.into_values().collect())
                .unwrap_or_default(),
            latest_episodes: episodes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemDto {
    id: i64,
    title: String,
    description: Option<String>,
    enclosure_url: Option<String>,
    image: Option<String>,
    date_published: Option<i64>,
    duration: Option<u32>,
    explicit: Option<i32>,
}

impl ItemDto {
    fn into_episode(self) -> Episode {
        Episode {
            id: self.id.to_string(),
            title: self.title,
            audio_url: parse_url(self.enclosure_url),
            thumbnail_url: parse_url(self.image),
            description: self.description.unwrap_or_default(),
            duration: self.duration.unwrap_or(0),
            publish_date: self
                .date_published
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
            explicit: self.explicit.unwrap_or(0) == 1,
        }
    }
}

fn parse_url(value: Option<String>) -> Option<Url> {
    value.and_then(|s| Url::parse(&s).ok())
}
