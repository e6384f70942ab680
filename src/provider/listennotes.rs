// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use crate::error::{ApiError, RepoError};
use crate::http::{get_json, HttpClient};
use crate::model::{Episode, Show};
use crate::provider::ShowDataSource;

const BASE_URL: &str = "https://listen-api.listennotes.com/api/v2/";

/// Listen Notes API client (primary provider)
///
/// Unauthenticated by default; an optional API key is sent as the
/// `X-ListenAPI-Key` header when configured.
pub struct ListenNotesSource<C> {
    client: C,
    base_url: Url,
    api_key: Option<String>,
}

impl<C: HttpClient> ListenNotesSource<C> {
    pub fn new(client: C, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: Url::parse(BASE_URL).expect("static base URL"),
            api_key,
        }
    }

    /// Point the client at a different base URL (used by tests)
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            headers.push(("X-ListenAPI-Key".to_string(), key.to_string()));
        }
        headers
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
}

#[async_trait]
impl<C: HttpClient> ShowDataSource for ListenNotesSource<C> {
    async fn fetch_trending(&self, page: u32, page_size: u32) -> Result<Vec<Show>, RepoError> {
        let url = self.endpoint(
            "best_podcasts",
            &[
                ("page", page.to_string()),
                ("page_size", page_size.to_string()),
                ("region", "us".to_string()),
            ],
        )?;

        let response: ListResponse = get_json(&self.client, &url, &self.headers()).await?;
        Ok(response.into_shows())
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Show>, RepoError> {
        let offset = page.saturating_sub(1) * page_size;
        let url = self.endpoint(
            "search",
            &[
                ("q", query.to_string()),
                ("type", "podcast".to_string()),
                ("offset", offset.to_string()),
                ("len_min", "5".to_string()),
                ("len_max", "300".to_string()),
            ],
        )?;

        let response: ListResponse = get_json(&self.client, &url, &self.headers()).await?;
        Ok(response.into_shows())
    }

    async fn fetch_show_detail(&self, id: &str) -> Result<Show, RepoError> {
        let url = self.endpoint(
            &format!("podcasts/{id}"),
            &[("sort", "recent_first".to_string())],
        )?;

        let dto: ShowDto = get_json(&self.client, &url, &self.headers()).await?;
        Ok(dto.into_show())
    }
}

/// Response envelope: shows may appear under `podcasts` (trending) or
/// `results` (search); an envelope with neither decodes to an empty list
#[derive(Debug, Deserialize)]
struct ListResponse {
    podcasts: Option<Vec<ShowDto>>,
    results: Option<Vec<ShowDto>>,
}

impl ListResponse {
    fn into_shows(self) -> Vec<Show> {
        self.podcasts
            .or(self.results)
            .unwrap_or_default()
            .into_iter()
            .map(ShowDto::into_show)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ShowDto {
    id: String,
    title_original: String,
    publisher_original: String,
    image: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    total_episodes: u32,
    #[serde(default)]
    description_original: String,
    rss: Option<String>,
    #[serde(default)]
    genre_ids: Vec<i64>,
    #[serde(default)]
    latest_episodes: Vec<EpisodeDto>,
}

impl ShowDto {
    fn into_show(self) -> Show {
        Show {
            id: self.id,
            title: self.title_original,
            publisher: self.publisher_original,
            image_url: parse_url(self.image),
            thumbnail_url: parse_url(self.thumbnail),
            total_episodes: self.total_episodes,
            description: self.description_original,
            rss: self.rss,
            genres: self.genre_ids.iter().map(|id| id.to_string()).collect(),
            latest_episodes: self
                .latest_episodes
                .into_iter()
                .map(EpisodeDto::into_episode)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EpisodeDto {
    id: String,
    title_original: String,
    audio: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    description_original: String,
    #[serde(default)]
    audio_length_sec: u32,
    pub_date_ms: Option<i64>,
    #[serde(default)]
    explicit_content: bool,
}

impl EpisodeDto {
    fn into_episode(self) -> Episode {
        Episode {
            id: self.id,
            title: self.title_original,
            audio_url: parse_url(self.audio),
            thumbnail_url: parse_url(self.thumbnail),
            description: self.description_original,
            duration: self.audio_length_sec,
            // Epoch milliseconds, truncated to whole seconds
            publish_date: self
                .pub_date_ms
                .and_then(|ms| DateTime::<Utc>::from_timestamp(ms / 1000, 0)),
            explicit: self.explicit_content,
        }
    }
}

fn parse_url(value: Option<String>) -> Option<Url> {
    value.and_then(|s| Url::parse(&s).ok())
}
