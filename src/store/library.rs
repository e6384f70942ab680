// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::error::StoreError;
use crate::model::Show;

/// The three independent library collections
///
/// Membership in each is tracked separately; a show may be in all three
/// at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Saved,
    Favorited,
    Downloaded,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Saved,
        Collection::Favorited,
        Collection::Downloaded,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Collection::Saved => "saved",
            Collection::Favorited => "favorited",
            Collection::Downloaded => "downloaded",
        }
    }

    fn table(&self) -> &'static str {
        match self {
            Collection::Saved => "library_saved",
            Collection::Favorited => "library_favorited",
            Collection::Downloaded => "library_downloaded",
        }
    }
}

/// Denormalized snapshot of a show kept in a library collection
///
/// No foreign-key relation to a live show; episodes are intentionally not
/// persisted.
#[derive(Debug, Clone)]
pub struct LibraryEntry {
    pub show_id: String,
    pub title: String,
    pub publisher: String,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub description: String,
    pub rss: Option<String>,
    pub genres: Vec<String>,
    pub total_episodes: u32,
    pub added_at: DateTime<Utc>,
}

impl LibraryEntry {
    fn from_show(show: &Show, added_at: DateTime<Utc>) -> Self {
        Self {
            show_id: show.id.clone(),
            title: show.title.clone(),
            publisher: show.publisher.clone(),
            image_url: show.image_url.as_ref().map(|u| u.to_string()),
            thumbnail_url: show.thumbnail_url.as_ref().map(|u| u.to_string()),
            description: show.description.clone(),
            rss: show.rss.clone(),
            genres: show.genres.clone(),
            total_episodes: show.total_episodes,
            added_at,
        }
    }
}

/// CRUD over the saved/favorited/downloaded collections
///
/// `add` is idempotent: adding an id that is already present is a no-op
/// and keeps the original timestamp. `list` is ordered newest-added first.
pub trait LibraryStore: Send + Sync {
    fn add(&self, collection: Collection, show: &Show) -> Result<(), StoreError>;
    fn remove(&self, collection: Collection, show_id: &str) -> Result<(), StoreError>;
    fn contains(&self, collection: Collection, show_id: &str) -> Result<bool, StoreError>;
    fn list(&self, collection: Collection) -> Result<Vec<LibraryEntry>, StoreError>;
    fn count(&self, collection: Collection) -> Result<u64, StoreError>;
}

/// SQLite-backed library store (one table per collection)
pub struct SqliteLibraryStore {
    conn: Mutex<Connection>,
}

impl SqliteLibraryStore {
    /// Open (and initialize) the library database at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory database, mainly for tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        for collection in Collection::ALL {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        show_id        TEXT PRIMARY KEY,
                        title          TEXT NOT NULL,
                        publisher      TEXT NOT NULL,
                        image_url      TEXT,
                        thumbnail_url  TEXT,
                        description    TEXT NOT NULL,
                        rss            TEXT,
                        genres         TEXT NOT NULL,
                        total_episodes INTEGER NOT NULL,
                        added_at       TEXT NOT NULL
                    )",
                    collection.table()
                ),
                [],
            )?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl LibraryStore for SqliteLibraryStore {
    fn add(&self, collection: Collection, show: &Show) -> Result<(), StoreError> {
        let entry = LibraryEntry::from_show(show, Utc::now());
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {}
                     (show_id, title, publisher, image_url, thumbnail_url,
                      description, rss, genres, total_episodes, added_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                collection.table()
            ),
            params![
                entry.show_id,
                entry.title,
                entry.publisher,
                entry.image_url,
                entry.thumbnail_url,
                entry.description,
                entry.rss,
                entry.genres.join(","),
                entry.total_episodes,
                entry.added_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn remove(&self, collection: Collection, show_id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            &format!("DELETE FROM {} WHERE show_id = ?1", collection.table()),
            params![show_id],
        )?;
        Ok(())
    }

    fn contains(&self, collection: Collection, show_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE show_id = ?1",
                collection.table()
            ),
            params![show_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list(&self, collection: Collection) -> Result<Vec<LibraryEntry>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut statement = conn.prepare(&format!(
            "SELECT show_id, title, publisher, image_url, thumbnail_url,
                    description, rss, genres, total_episodes, added_at
             FROM {}
             ORDER BY added_at DESC, rowid DESC",
            collection.table()
        ))?;

        let rows = statement.query_map([], |row| {
            let genres: String = row.get(7)?;
            let added_at: String = row.get(9)?;
            Ok(LibraryEntry {
                show_id: row.get(0)?,
                title: row.get(1)?,
                publisher: row.get(2)?,
                image_url: row.get(3)?,
                thumbnail_url: row.get(4)?,
                description: row.get(5)?,
                rss: row.get(6)?,
                genres: genres
                    .split(',')
                    .filter(|g| !g.is_empty())
                    .map(String::from)
                    .collect(),
                total_episodes: row.get(8)?,
                added_at: DateTime::parse_from_rfc3339(&added_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn count(&self, collection: Collection) -> Result<u64, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// In-memory library store with the same contract, for tests and for
/// running without a database file
#[derive(Default)]
pub struct MemoryLibraryStore {
    /// Entries per collection in insertion order
    inner: Mutex<HashMap<Collection, Vec<LibraryEntry>>>,
}

impl MemoryLibraryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LibraryStore for MemoryLibraryStore {
    fn add(&self, collection: Collection, show: &Show) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        let entries = inner.entry(collection).or_default();
        if entries.iter().all(|e| e.show_id != show.id) {
            entries.push(LibraryEntry::from_show(show, Utc::now()));
        }
        Ok(())
    }

    fn remove(&self, collection: Collection, show_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(entries) = inner.get_mut(&collection) {
            entries.retain(|e| e.show_id != show_id);
        }
        Ok(())
    }

    fn contains(&self, collection: Collection, show_id: &str) -> Result<bool, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner
            .get(&collection)
            .is_some_and(|entries| entries.iter().any(|e| e.show_id == show_id)))
    }

    fn list(&self, collection: Collection) -> Result<Vec<LibraryEntry>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner
            .get(&collection)
            .map(|entries| entries.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn count(&self, collection: Collection) -> Result<u64, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.get(&collection).map_or(0, |entries| entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn show(id: &str) -> Show {
        Show {
            id: id.to_string(),
            title: format!("Show {id}"),
            publisher: "Pub".to_string(),
            image_url: None,
            thumbnail_url: None,
            total_episodes: 5,
            description: "desc".to_string(),
            rss: None,
            genres: vec!["News".to_string()],
            latest_episodes: vec![],
        }
    }

    fn stores() -> Vec<Box<dyn LibraryStore>> {
        vec![
            Box::new(SqliteLibraryStore::open_in_memory().unwrap()),
            Box::new(MemoryLibraryStore::new()),
        ]
    }

    #[test]
    fn add_remove_round_trip() {
        for store in stores() {
            let show = show("s1");

            store.add(Collection::Favorited, &show).unwrap();
            assert!(store.contains(Collection::Favorited, "s1").unwrap());
            let listed = store.list(Collection::Favorited).unwrap();
            assert!(listed.iter().any(|e| e.show_id == "s1"));

            store.remove(Collection::Favorited, "s1").unwrap();
            assert!(!store.contains(Collection::Favorited, "s1").unwrap());
            assert!(store.list(Collection::Favorited).unwrap().is_empty());
        }
    }

    #[test]
    fn add_is_idempotent() {
        for store in stores() {
            let show = show("s1");
            store.add(Collection::Saved, &show).unwrap();
            store.add(Collection::Saved, &show).unwrap();

            assert_eq!(store.count(Collection::Saved).unwrap(), 1);
            assert_eq!(store.list(Collection::Saved).unwrap().len(), 1);
        }
    }

    #[test]
    fn collections_are_independent() {
        for store in stores() {
            store.add(Collection::Favorited, &show("s1")).unwrap();

            assert!(store.contains(Collection::Favorited, "s1").unwrap());
            assert!(!store.contains(Collection::Saved, "s1").unwrap());
            assert!(!store.contains(Collection::Downloaded, "s1").unwrap());
            assert_eq!(store.count(Collection::Saved).unwrap(), 0);
            assert_eq!(store.count(Collection::Downloaded).unwrap(), 0);

            store.remove(Collection::Saved, "s1").unwrap();
            assert!(store.contains(Collection::Favorited, "s1").unwrap());
        }
    }

    #[test]
    fn list_is_newest_first() {
        for store in stores() {
            store.add(Collection::Downloaded, &show("first")).unwrap();
            store.add(Collection::Downloaded, &show("second")).unwrap();
            store.add(Collection::Downloaded, &show("third")).unwrap();

            let ids: Vec<String> = store
                .list(Collection::Downloaded)
                .unwrap()
                .into_iter()
                .map(|e| e.show_id)
                .collect();
            assert_eq!(ids, vec!["third", "second", "first"]);
        }
    }

    #[test]
    fn entries_snapshot_show_fields() {
        for store in stores() {
            let mut show = show("s1");
            show.rss = Some("https://example.com/feed.xml".to_string());
            show.genres = vec!["News".to_string(), "Tech".to_string()];

            store.add(Collection::Saved, &show).unwrap();
            let entry = &store.list(Collection::Saved).unwrap()[0];

            assert_eq!(entry.title, "Show s1");
            assert_eq!(entry.total_episodes, 5);
            assert_eq!(entry.rss.as_deref(), Some("https://example.com/feed.xml"));
            assert_eq!(entry.genres, vec!["News", "Tech"]);
        }
    }

    #[test]
    fn sqlite_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("library.db");

        {
            let store = SqliteLibraryStore::open(&path).unwrap();
            store.add(Collection::Saved, &show("s1")).unwrap();
        }

        let store = SqliteLibraryStore::open(&path).unwrap();
        assert!(store.contains(Collection::Saved, "s1").unwrap());
    }
}
