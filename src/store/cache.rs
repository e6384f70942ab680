// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use url::Url;

use crate::error::StoreError;
use crate::model::{Episode, Show};

/// Offline fallback cache for shows and episodes
///
/// This is a single-slot resilience layer, not a source of truth: it keeps
/// the last successfully fetched content visible when the network is
/// unavailable. Writes are upserts keyed by primary id; callers must not
/// rely on `fetch_shows` ordering beyond last-write-wins per id.
pub trait CacheStore: Send + Sync {
    fn upsert_shows(&self, shows: &[Show]) -> Result<(), StoreError>;
    fn fetch_shows(&self) -> Result<Vec<Show>, StoreError>;
    fn fetch_show(&self, id: &str) -> Result<Option<Show>, StoreError>;
    fn upsert_episodes(&self, show_id: &str, episodes: &[Episode]) -> Result<(), StoreError>;
    /// Cached episodes for a show, ordered by publish date descending
    fn fetch_episodes(&self, show_id: &str) -> Result<Vec<Episode>, StoreError>;
}

/// Minimal projection of a show kept for offline fallback
///
/// Intentionally lossy: description, RSS, episode count and the episode
/// list are not persisted here.
#[derive(Debug, Clone)]
struct ShowRecord {
    id: String,
    title: String,
    publisher: String,
    image_url: Option<String>,
    genres: Vec<String>,
    last_updated: DateTime<Utc>,
}

impl ShowRecord {
    fn from_show(show: &Show) -> Self {
        Self {
            id: show.id.clone(),
            title: show.title.clone(),
            publisher: show.publisher.clone(),
            image_url: show.image_url.as_ref().map(|u| u.to_string()),
            genres: show.genres.clone(),
            last_updated: Utc::now(),
        }
    }

    fn into_show(self) -> Show {
        let image_url = self.image_url.and_then(|s| Url::parse(&s).ok());
        Show {
            id: self.id,
            title: self.title,
            publisher: self.publisher,
            thumbnail_url: image_url.clone(),
            image_url,
            total_episodes: 0,
            description: String::new(),
            rss: None,
            genres: self.genres,
            latest_episodes: vec![],
        }
    }
}

#[derive(Debug, Clone)]
struct EpisodeRecord {
    id: String,
    title: String,
    audio_url: Option<String>,
    thumbnail_url: Option<String>,
    duration: u32,
    publish_date: Option<DateTime<Utc>>,
    description: String,
}

impl EpisodeRecord {
    fn from_episode(episode: &Episode) -> Self {
        Self {
            id: episode.id.clone(),
            title: episode.title.clone(),
            audio_url: episode.audio_url.as_ref().map(|u| u.to_string()),
            thumbnail_url: episode.thumbnail_url.as_ref().map(|u| u.to_string()),
            duration: episode.duration,
            publish_date: episode.publish_date,
            description: episode.description.clone(),
        }
    }

    fn into_episode(self) -> Episode {
        Episode {
            id: self.id,
            title: self.title,
            audio_url: self.audio_url.and_then(|s| Url::parse(&s).ok()),
            thumbnail_url: self.thumbnail_url.and_then(|s| Url::parse(&s).ok()),
            description: self.description,
            duration: self.duration,
            publish_date: self.publish_date,
            // Not persisted in the cache projection
            explicit: false,
        }
    }
}

/// SQLite-backed cache store
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    /// Open (and initialize) the cache database at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory database, mainly for tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cached_shows (
                show_id      TEXT PRIMARY KEY,
                title        TEXT NOT NULL,
                publisher    TEXT NOT NULL,
                image_url    TEXT,
                genres       TEXT NOT NULL,
                last_updated TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS cached_episodes (
                episode_id    TEXT PRIMARY KEY,
                show_id       TEXT NOT NULL,
                title         TEXT NOT NULL,
                audio_url     TEXT,
                thumbnail_url TEXT,
                duration      INTEGER NOT NULL,
                publish_date  TEXT,
                description   TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_cached_episodes_show
                ON cached_episodes (show_id);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl CacheStore for SqliteCacheStore {
    fn upsert_shows(&self, shows: &[Show]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.transaction()?;
        for show in shows {
            let record = ShowRecord::from_show(show);
            tx.execute(
                "INSERT INTO cached_shows
                     (show_id, title, publisher, image_url, genres, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(show_id) DO UPDATE SET
                     title = excluded.title,
                     publisher = excluded.publisher,
                     image_url = excluded.image_url,
                     genres = excluded.genres,
                     last_updated = excluded.last_updated",
                params![
                    record.id,
                    record.title,
                    record.publisher,
                    record.image_url,
                    record.genres.join(","),
                    record.last_updated.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn fetch_shows(&self) -> Result<Vec<Show>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut statement = conn.prepare(
            "SELECT show_id, title, publisher, image_url, genres, last_updated
             FROM cached_shows",
        )?;
        let rows = statement.query_map([], row_to_show_record)?;

        let mut shows = Vec::new();
        for row in rows {
            shows.push(row?.into_show());
        }
        Ok(shows)
    }

    fn fetch_show(&self, id: &str) -> Result<Option<Show>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut statement = conn.prepare(
            "SELECT show_id, title, publisher, image_url, genres, last_updated
             FROM cached_shows WHERE show_id = ?1",
        )?;
        let mut rows = statement.query_map(params![id], row_to_show_record)?;

        match rows.next() {
            Some(row) => Ok(Some(row?.into_show())),
            None => Ok(None),
        }
    }

    fn upsert_episodes(&self, show_id: &str, episodes: &[Episode]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.transaction()?;
        for episode in episodes {
            let record = EpisodeRecord::from_episode(episode);
            tx.execute(
                "INSERT INTO cached_episodes
                     (episode_id, show_id, title, audio_url, thumbnail_url,
                      duration, publish_date, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(episode_id) DO UPDATE SET
                     show_id = excluded.show_id,
                     title = excluded.title,
                     audio_url = excluded.audio_url,
                     thumbnail_url = excluded.thumbnail_url,
                     duration = excluded.duration,
                     publish_date = excluded.publish_date,
                     description = excluded.description",
                params![
                    record.id,
                    show_id,
                    record.title,
                    record.audio_url,
                    record.thumbnail_url,
                    record.duration,
                    record.publish_date.map(|d| d.to_rfc3339()),
                    record.description,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn fetch_episodes(&self, show_id: &str) -> Result<Vec<Episode>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut statement = conn.prepare(
            "SELECT episode_id, title, audio_url, thumbnail_url,
                    duration, publish_date, description
             FROM cached_episodes
             WHERE show_id = ?1
             ORDER BY publish_date DESC",
        )?;
        let rows = statement.query_map(params![show_id], |row| {
            Ok(EpisodeRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                audio_url: row.get(2)?,
                thumbnail_url: row.get(3)?,
                duration: row.get(4)?,
                publish_date: parse_date(row.get::<_, Option<String>>(5)?),
                description: row.get(6)?,
            })
        })?;

        let mut episodes = Vec::new();
        for row in rows {
            episodes.push(row?.into_episode());
        }
        Ok(episodes)
    }
}

fn row_to_show_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ShowRecord> {
    let genres: String = row.get(4)?;
    Ok(ShowRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        publisher: row.get(2)?,
        image_url: row.get(3)?,
        genres: split_genres(&genres),
        last_updated: parse_date(row.get::<_, Option<String>>(5)?).unwrap_or_else(Utc::now),
    })
}

fn split_genres(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .filter(|g| !g.is_empty())
        .map(String::from)
        .collect()
}

fn parse_date(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// In-memory cache store with the same upsert/fetch contract
///
/// Stores the same lossy projections as the SQLite variant so that a
/// cache round-trip behaves identically under either implementation.
#[derive(Default)]
pub struct MemoryCacheStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    shows: HashMap<String, ShowRecord>,
    /// show id -> episode id -> record
    episodes: HashMap<String, HashMap<String, EpisodeRecord>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn upsert_shows(&self, shows: &[Show]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        for show in shows {
            inner
                .shows
                .insert(show.id.clone(), ShowRecord::from_show(show));
        }
        Ok(())
    }

    fn fetch_shows(&self) -> Result<Vec<Show>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner
            .shows
            .values()
            .cloned()
            .map(ShowRecord::into_show)
            .collect())
    }

    fn fetch_show(&self, id: &str) -> Result<Option<Show>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.shows.get(id).cloned().map(ShowRecord::into_show))
    }

    fn upsert_episodes(&self, show_id: &str, episodes: &[Episode]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        let bucket = inner.episodes.entry(show_id.to_string()).or_default();
        for episode in episodes {
            bucket.insert(episode.id.clone(), EpisodeRecord::from_episode(episode));
        }
        Ok(())
    }

    fn fetch_episodes(&self, show_id: &str) -> Result<Vec<Episode>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        let mut episodes: Vec<Episode> = inner
            .episodes
            .get(show_id)
            .map(|bucket| {
                bucket
                    .values()
                    .cloned()
                    .map(EpisodeRecord::into_episode)
                    .collect()
            })
            .unwrap_or_default();
        crate::model::sort_newest_first(&mut episodes);
        Ok(episodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn show(id: &str, title: &str) -> Show {
        Show {
            id: id.to_string(),
            title: title.to_string(),
            publisher: "Pub".to_string(),
            image_url: Some(Url::parse("https://example.com/img.jpg").unwrap()),
            thumbnail_url: None,
            total_episodes: 12,
            description: "full description".to_string(),
            rss: Some("https://example.com/feed.xml".to_string()),
            genres: vec!["News".to_string(), "Tech".to_string()],
            latest_episodes: vec![],
        }
    }

    fn episode(id: &str, day: u32) -> Episode {
        Episode {
            id: id.to_string(),
            title: format!("Episode {id}"),
            audio_url: Some(Url::parse("https://example.com/a.mp3").unwrap()),
            thumbnail_url: None,
            description: "ep".to_string(),
            duration: 100,
            publish_date: Some(Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap()),
            explicit: true,
        }
    }

    fn stores() -> Vec<Box<dyn CacheStore>> {
        vec![
            Box::new(SqliteCacheStore::open_in_memory().unwrap()),
            Box::new(MemoryCacheStore::new()),
        ]
    }

    #[test]
    fn upsert_is_keyed_by_show_id() {
        for store in stores() {
            store.upsert_shows(&[show("s1", "Old")]).unwrap();
            store
                .upsert_shows(&[show("s1", "New"), show("s2", "Other")])
                .unwrap();

            let mut shows = store.fetch_shows().unwrap();
            shows.sort_by(|a, b| a.id.cmp(&b.id));

            assert_eq!(shows.len(), 2);
            assert_eq!(shows[0].title, "New");
        }
    }

    #[test]
    fn cached_show_round_trip_is_lossy() {
        for store in stores() {
            store.upsert_shows(&[show("s1", "Title")]).unwrap();
            let cached = store.fetch_show("s1").unwrap().unwrap();

            assert_eq!(cached.id, "s1");
            assert_eq!(cached.title, "Title");
            assert_eq!(cached.genres, vec!["News", "Tech"]);
            // Not part of the cache projection
            assert_eq!(cached.description, "");
            assert_eq!(cached.total_episodes, 0);
            assert!(cached.rss.is_none());
            assert!(cached.latest_episodes.is_empty());
        }
    }

    #[test]
    fn fetch_show_miss_is_none() {
        for store in stores() {
            assert!(store.fetch_show("missing").unwrap().is_none());
        }
    }

    #[test]
    fn episodes_are_upserted_by_id_and_ordered_newest_first() {
        for store in stores() {
            store
                .upsert_episodes("s1", &[episode("e1", 1), episode("e2", 20)])
                .unwrap();
            // Re-upsert e1 with a newer date; no duplicate row
            store.upsert_episodes("s1", &[episode("e1", 25)]).unwrap();

            let episodes = store.fetch_episodes("s1").unwrap();
            let ids: Vec<&str> = episodes.iter().map(|e| e.id.as_str()).collect();
            assert_eq!(ids, vec!["e1", "e2"]);
        }
    }

    #[test]
    fn episodes_are_scoped_by_show_id() {
        for store in stores() {
            store.upsert_episodes("s1", &[episode("e1", 1)]).unwrap();
            store.upsert_episodes("s2", &[episode("e2", 2)]).unwrap();

            let episodes = store.fetch_episodes("s1").unwrap();
            assert_eq!(episodes.len(), 1);
            assert_eq!(episodes[0].id, "e1");
            assert!(store.fetch_episodes("s3").unwrap().is_empty());
        }
    }

    #[test]
    fn sqlite_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let store = SqliteCacheStore::open(&path).unwrap();
            store.upsert_shows(&[show("s1", "Persisted")]).unwrap();
            store.upsert_episodes("s1", &[episode("e1", 3)]).unwrap();
        }

        let store = SqliteCacheStore::open(&path).unwrap();
        assert_eq!(store.fetch_show("s1").unwrap().unwrap().title, "Persisted");
        assert_eq!(store.fetch_episodes("s1").unwrap().len(), 1);
    }
}
