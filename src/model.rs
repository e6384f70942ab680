// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use url::Url;

/// A podcast series: metadata plus its latest episodes
///
/// Immutable value type. Shows are created fresh on every decode (remote)
/// or reconstruction (cache); an "update" is a full re-fetch producing a
/// new value.
#[derive(Debug, Clone)]
pub struct Show {
    /// Stable identifier, preserved across remote fetch and cache round-trip
    pub id: String,
    pub title: String,
    pub publisher: String,
    pub image_url: Option<Url>,
    pub thumbnail_url: Option<Url>,
    pub total_episodes: u32,
    pub description: String,
    pub rss: Option<String>,
    pub genres: Vec<String>,
    /// Newest-first by convention
    pub latest_episodes: Vec<Episode>,
}

/// One playable audio item belonging to a show
#[derive(Debug, Clone)]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub audio_url: Option<Url>,
    pub thumbnail_url: Option<Url>,
    pub description: String,
    /// Duration in whole seconds
    pub duration: u32,
    pub publish_date: Option<DateTime<Utc>>,
    pub explicit: bool,
}

// Identity is keyed by id for both types: two fetches of the same show may
// differ in episode lists or artwork but still denote the same show.

impl PartialEq for Show {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Show {}

impl Hash for Show {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialEq for Episode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Episode {}

impl Hash for Episode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Sort episodes newest-first; undated episodes sink to the end
pub fn sort_newest_first(episodes: &mut [Episode]) {
    episodes.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn episode(id: &str, date: Option<DateTime<Utc>>) -> Episode {
        Episode {
            id: id.to_string(),
            title: format!("Episode {id}"),
            audio_url: None,
            thumbnail_url: None,
            description: String::new(),
            duration: 0,
            publish_date: date,
            explicit: false,
        }
    }

    #[test]
    fn show_equality_is_keyed_by_id() {
        let a = Show {
            id: "s1".into(),
            title: "Old Title".into(),
            publisher: "Pub".into(),
            image_url: None,
            thumbnail_url: None,
            total_episodes: 10,
            description: "desc".into(),
            rss: None,
            genres: vec!["News".into()],
            latest_episodes: vec![],
        };
        let mut b = a.clone();
        b.title = "New Title".into();
        b.total_episodes = 11;

        assert_eq!(a, b);
    }

    #[test]
    fn sort_newest_first_puts_undated_last() {
        let d1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let mut episodes = vec![
            episode("a", Some(d1)),
            episode("b", None),
            episode("c", Some(d2)),
        ];
        sort_newest_first(&mut episodes);

        let ids: Vec<&str> = episodes.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
