// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use crate::error::RepoError;
use crate::model::{sort_newest_first, Episode, Show};
use crate::provider::ShowDataSource;

/// Demo dataset compiled into the binary, used when no API credentials
/// are configured
const BUNDLED_DATA: &str = include_str!("../../data/podcasts.json");

/// Static data source backed by the bundled demo dataset
///
/// Trending returns the whole dataset unfiltered on every page; search
/// filters by title or publisher, case- and diacritic-insensitively.
pub struct DemoSource {
    shows: Vec<Show>,
}

impl DemoSource {
    /// Load the dataset compiled into the binary
    pub fn bundled() -> Result<Self, serde_json::Error> {
        Self::from_json(BUNDLED_DATA)
    }

    /// Load a dataset from a JSON document with the demo schema
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let document: DemoDocument = serde_json::from_str(json)?;
        let shows = document
            .podcasts
            .into_iter()
            .map(DemoShow::into_show)
            .collect();
        Ok(Self { shows })
    }

    pub fn shows(&self) -> &[Show] {
        &self.shows
    }
}

#[async_trait]
impl ShowDataSource for DemoSource {
    async fn fetch_trending(&self, _page: u32, _page_size: u32) -> Result<Vec<Show>, RepoError> {
        Ok(self.shows.clone())
    }

    async fn search(
        &self,
        query: &str,
        _page: u32,
        _page_size: u32,
    ) -> Result<Vec<Show>, RepoError> {
        if query.is_empty() {
            return Ok(self.shows.clone());
        }

        let needle = normalize(query);
        Ok(self
            .shows
            .iter()
            .filter(|show| {
                let haystack = normalize(&format!("{} {}", show.title, show.publisher));
                haystack.contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn fetch_show_detail(&self, id: &str) -> Result<Show, RepoError> {
        self.shows
            .iter()
            .find(|show| show.id == id)
            .cloned()
            .ok_or_else(|| RepoError::ShowNotFound { id: id.to_string() })
    }
}

/// Lowercase and strip diacritics for matching
fn normalize(text: &str) -> String {
    text.to_lowercase().chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'ả' | 'ã' | 'ạ' | 'ă' | 'ằ' | 'ắ' | 'ẳ' | 'ẵ' | 'ặ' | 'â' | 'ầ' | 'ấ'
        | 'ẩ' | 'ẫ' | 'ậ' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ẻ' | 'ẽ' | 'ẹ' | 'ê' | 'ề' | 'ế' | 'ể' | 'ễ' | 'ệ' | 'ë' => 'e',
        'ì' | 'í' | 'ỉ' | 'ĩ' | 'ị' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ỏ' | 'õ' | 'ọ' | 'ô' | 'ồ' | 'ố' | 'ổ' | 'ỗ' | 'ộ' | 'ơ' | 'ờ' | 'ớ'
        | 'ở' | 'ỡ' | 'ợ' | 'ö' => 'o',
        'ù' | 'ú' | 'ủ' | 'ũ' | 'ụ' | 'ư' | 'ừ' | 'ứ' | 'ử' | 'ữ' | 'ự' | 'û' | 'ü' => 'u',
        'ỳ' | 'ý' | 'ỷ' | 'ỹ' | 'ỵ' => 'y',
        'đ' => 'd',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

#[derive(Debug, Deserialize)]
struct DemoDocument {
    podcasts: Vec<DemoShow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DemoShow {
    id: String,
    title: String,
    publisher: String,
    description: String,
    #[serde(rename = "imageURL")]
    image_url: String,
    #[serde(rename = "thumbnailURL")]
    thumbnail_url: String,
    rss: String,
    genres: Vec<String>,
    episodes: Vec<DemoEpisode>,
}

impl DemoShow {
    fn into_show(self) -> Show {
        let total_episodes = self.episodes.len() as u32;
        let mut episodes: Vec<Episode> = self
            .episodes
            .into_iter()
            .map(DemoEpisode::into_episode)
            .collect();
        sort_newest_first(&mut episodes);

        Show {
            id: self.id,
            title: self.title,
            publisher: self.publisher,
            image_url: Url::parse(&self.image_url).ok(),
            thumbnail_url: Url::parse(&self.thumbnail_url).ok(),
            total_episodes,
            description: self.description,
            rss: Some(self.rss),
            genres: self.genres,
            latest_episodes: episodes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DemoEpisode {
    id: String,
    title: String,
    #[serde(rename = "audioURL")]
    audio_url: String,
    #[serde(rename = "thumbnailURL")]
    thumbnail_url: String,
    description: String,
    duration: u32,
    publish_date: DateTime<Utc>,
    explicit: bool,
}

impl DemoEpisode {
    fn into_episode(self) -> Episode {
        Episode {
            id: self.id,
            title: self.title,
            audio_url: Url::parse(&self.audio_url).ok(),
            thumbnail_url: Url::parse(&self.thumbnail_url).ok(),
            description: self.description,
            duration: self.duration,
            publish_date: Some(self.publish_date),
            explicit: self.explicit,
        }
    }
}
